//! Collateralised mortgage obligation structuring: sequential-pay tranches
//! with accrual (Z) bonds, pro-rata splits, and PAC/support pairs.

pub mod pac;
pub mod sequential;

pub use pac::{analyze_pac_support, PacInput, PacOutput, PacRow};
pub use sequential::{
    analyze_cmo, average_life, pro_rata_split, sequential_waterfall, ChildTranche, CmoInput,
    CmoOutput, CmoPeriod, ProRataSplit, SequentialWaterfall, Tranche, TrancheKind, TranchePeriod,
    TrancheSummary,
};
