//! Collateral pool cash flows: the monthly waterfall (amortisation table),
//! scheduled balance factors, ARM coupon resets, loan-level descriptions and
//! PO/IO stripping of a pool by note rate.

pub mod arm;
pub mod balances;
pub mod loan;
pub mod po_io;
pub mod waterfall;

pub use arm::{arm_coupons, ArmCouponInput, ArmCouponRow};
pub use balances::{
    actual_balances, balance_percent_for_period, schedule_of_ending_balances, ScheduledBalance,
};
pub use loan::{AmortizationType, CollateralLoan};
pub use po_io::{po_io_split, PoIoInput, PoIoOutput, PoolCohort};
pub use waterfall::{
    create_waterfall, CollateralWaterfall, PsaSpeed, WaterfallInput, WaterfallRow,
    WaterfallSummary,
};
