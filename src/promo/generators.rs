use rand::Rng;

/// Source of candidate promo codes. Uniqueness is checked by the caller.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniformly random fixed-width numeric codes without a leading zero,
/// e.g. 10000..=99999 for five digits
pub struct NumericCodeGenerator {
    digits: u32,
}

impl NumericCodeGenerator {
    pub const DEFAULT_DIGITS: u32 = 5;

    pub fn new(digits: u32) -> Self {
        Self {
            digits: digits.clamp(1, 18),
        }
    }

    fn bounds(&self) -> (u64, u64) {
        let low = 10u64.pow(self.digits - 1);
        let high = 10u64.pow(self.digits) - 1;
        (low, high)
    }
}

impl Default for NumericCodeGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIGITS)
    }
}

impl CodeGenerator for NumericCodeGenerator {
    fn generate(&self) -> String {
        let (low, high) = self.bounds();
        rand::rng().random_range(low..=high).to_string()
    }
}
