pub mod cmo;
pub mod collateral;
pub mod export;
pub mod fixed_income;
pub mod prepayment;
pub mod waterfall;
