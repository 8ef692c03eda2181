use std::collections::VecDeque;
use std::sync::Mutex;

use tictactoe_backend::promo::CodeGenerator;

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Hands out scripted codes in order, then repeats the last one
pub struct ScriptedCodeGenerator {
    queue: Mutex<VecDeque<String>>,
    fallback: String,
}

impl ScriptedCodeGenerator {
    pub fn new(codes: &[&str]) -> Self {
        Self {
            queue: Mutex::new(codes.iter().map(|c| c.to_string()).collect()),
            fallback: codes.last().map(|c| c.to_string()).unwrap_or_default(),
        }
    }
}

impl CodeGenerator for ScriptedCodeGenerator {
    fn generate(&self) -> String {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
