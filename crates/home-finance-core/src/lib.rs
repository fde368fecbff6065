pub mod error;
pub mod loan;
pub mod types;

#[cfg(feature = "analysis")]
pub mod analysis;

pub use error::HomeFinanceError;
pub use types::*;

/// Standard result type for all home-finance operations
pub type HomeFinanceResult<T> = Result<T, HomeFinanceError>;
