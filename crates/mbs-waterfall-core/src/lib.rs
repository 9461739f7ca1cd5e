pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "export")]
pub mod export;

#[cfg(feature = "prepayment")]
pub mod prepayment;

#[cfg(feature = "collateral")]
pub mod collateral;

#[cfg(feature = "cmo")]
pub mod cmo;

#[cfg(feature = "fixed_income")]
pub mod fixed_income;

#[cfg(feature = "credit_risk")]
pub mod credit_risk;

pub use error::WaterfallError;
pub use types::*;

/// Standard result type for all waterfall operations
pub type WaterfallResult<T> = Result<T, WaterfallError>;
