pub mod defaults;

pub use defaults::{hazard, hazard_rates, inverse_vasicek, vasicek_default_rate, vasicek_density};
