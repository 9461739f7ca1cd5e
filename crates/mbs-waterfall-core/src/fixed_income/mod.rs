pub mod duration;
pub mod floaters;
pub mod reinvestment;
pub mod yields;

pub use duration::{effective_duration, macaulay_duration, modified_duration};
pub use floaters::{floater_rates, FloaterInput, FloaterRates};
pub use reinvestment::{reinvestment_returns, ReinvestmentOutput};
pub use yields::{bey_from_mey, spot_from_par, zero_coupon_price, ParYield, SpotPoint};
