pub mod generators;
pub mod handlers;
pub mod models;
pub mod service;
pub mod types;

pub use generators::{CodeGenerator, NumericCodeGenerator};
pub use models::PromoCode;
pub use service::{PromoConfig, PromoIssuer, PromoRedeemer, RedemptionPolicy};
