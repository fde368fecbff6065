pub mod amortization;
pub mod composite;
pub mod strategy;
