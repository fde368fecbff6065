pub mod investment;
pub mod opportunity;
pub mod risk;

#[cfg(feature = "stress")]
pub mod stress;
