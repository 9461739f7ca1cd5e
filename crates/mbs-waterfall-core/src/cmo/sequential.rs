use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

use crate::collateral::{create_waterfall, CollateralWaterfall, WaterfallInput, WaterfallSummary};
use crate::error::WaterfallError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::WaterfallResult;

/// Balance below which a tranche counts as retired.
const BALANCE_EPSILON: Decimal = dec!(0.01);

/// Allowed drift when pro-rata fractions are summed.
const FRACTION_TOL: Decimal = dec!(0.000000001);

const MONTHS_PER_YEAR: Decimal = dec!(12);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrancheKind {
    /// Current-pay bond: receives interest in cash each month.
    #[default]
    Sequential,
    /// Z bond: interest accretes while earlier tranches are outstanding and
    /// is used to pay them down.
    Accrual,
}

/// A bond class. Principal is paid to tranches in the order given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tranche {
    pub name: String,
    pub balance: Money,
    /// Annual coupon rate.
    pub coupon: Rate,
    #[serde(default)]
    pub kind: TrancheKind,
}

/// A child class and the fraction of the parent it receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildTranche {
    pub name: String,
    pub fraction: Decimal,
}

/// Split of one tranche's cash flows into children pro rata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProRataSplit {
    pub source_tranche: String,
    pub children: Vec<ChildTranche>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmoInput {
    #[serde(default)]
    pub collateral: WaterfallInput,
    pub tranches: Vec<Tranche>,
    #[serde(default)]
    pub splits: Vec<ProRataSplit>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One tranche in one month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranchePeriod {
    pub name: String,
    /// Balance at the start of the month.
    pub balance: Money,
    pub interest_due: Money,
    /// Interest paid in cash.
    pub interest_paid: Money,
    /// Unpaid interest added to the balance.
    pub accrued_interest: Money,
    pub principal_paid: Money,
    /// Cash received: interest paid plus principal paid.
    pub cash_flow: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmoPeriod {
    pub period: u32,
    /// Collateral interest left after all tranches are paid.
    pub remaining_interest: Money,
    /// Collateral principal left after all tranches are paid.
    pub remaining_principal: Money,
    pub tranches: Vec<TranchePeriod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrancheSummary {
    pub name: String,
    pub kind: TrancheKind,
    pub original_balance: Money,
    pub total_interest_paid: Money,
    pub total_accrued_interest: Money,
    pub total_principal_paid: Money,
    /// Weighted average life in years.
    pub weighted_average_life: Decimal,
    pub final_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequentialWaterfall {
    pub periods: Vec<CmoPeriod>,
    pub tranches: Vec<TrancheSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmoOutput {
    pub collateral: WaterfallSummary,
    pub waterfall: SequentialWaterfall,
}

/// Running state of one tranche.
#[derive(Debug, Clone)]
struct TrancheState {
    name: String,
    kind: TrancheKind,
    coupon: Rate,
    original_balance: Money,
    balance: Money,
    /// This month's entries; principal is added after the interest pass.
    current: TranchePeriod,
    principal_flows: Vec<Money>,
    total_interest_paid: Money,
    total_accrued_interest: Money,
}

impl TrancheState {
    fn new(tranche: &Tranche) -> Self {
        Self {
            name: tranche.name.clone(),
            kind: tranche.kind,
            coupon: tranche.coupon,
            original_balance: tranche.balance,
            balance: tranche.balance,
            current: empty_period(&tranche.name, tranche.balance),
            principal_flows: Vec::new(),
            total_interest_paid: Decimal::ZERO,
            total_accrued_interest: Decimal::ZERO,
        }
    }

    fn summary(&self) -> TrancheSummary {
        TrancheSummary {
            name: self.name.clone(),
            kind: self.kind,
            original_balance: self.original_balance,
            total_interest_paid: self.total_interest_paid,
            total_accrued_interest: self.total_accrued_interest,
            total_principal_paid: self.principal_flows.iter().copied().sum(),
            weighted_average_life: average_life(&self.principal_flows),
            final_balance: self.balance,
        }
    }
}

fn empty_period(name: &str, balance: Money) -> TranchePeriod {
    TranchePeriod {
        name: name.to_string(),
        balance,
        interest_due: Decimal::ZERO,
        interest_paid: Decimal::ZERO,
        accrued_interest: Decimal::ZERO,
        principal_paid: Decimal::ZERO,
        cash_flow: Decimal::ZERO,
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the collateral waterfall and allocate it to the tranches.
pub fn analyze_cmo(input: &CmoInput) -> WaterfallResult<ComputationOutput<CmoOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    validate_tranches(&input.tranches)?;

    let collateral = create_waterfall(&input.collateral)?;
    warnings.extend(collateral.warnings);
    let collateral = collateral.result;

    let tranche_total: Money = input.tranches.iter().map(|t| t.balance).sum();
    if tranche_total > input.collateral.original_balance {
        return Err(WaterfallError::InvalidInput {
            field: "tranches".into(),
            reason: format!(
                "Tranche balances {} exceed collateral balance {}",
                tranche_total, input.collateral.original_balance
            ),
        });
    }
    if tranche_total < input.collateral.original_balance {
        warnings.push(format!(
            "Tranches cover {} of {} collateral; excess principal is left unallocated",
            tranche_total, input.collateral.original_balance
        ));
    }

    let mut waterfall = sequential_waterfall(&collateral, &input.tranches)?;
    for split in &input.splits {
        waterfall = pro_rata_split(&waterfall, split)?;
    }

    for t in &waterfall.tranches {
        if t.final_balance > BALANCE_EPSILON {
            warnings.push(format!(
                "Tranche {} is not retired by the collateral; final balance {}",
                t.name,
                t.final_balance.round_dp(2)
            ));
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Sequential-pay CMO with accrual bond support",
        input,
        warnings,
        elapsed,
        CmoOutput {
            collateral: collateral.summary,
            waterfall,
        },
    ))
}

/// Allocate collateral cash to tranches month by month.
///
/// Interest: current-pay tranches take their coupon from collateral interest
/// in order. An accrual tranche's coupon is redirected into principal cash as
/// long as earlier tranches have balance that this month's principal cannot
/// retire; the redirected amount accretes to the accrual balance. Unpaid
/// interest on any tranche also accretes.
///
/// Principal: paid strictly in tranche order against start-of-month balances.
pub fn sequential_waterfall(
    collateral: &CollateralWaterfall,
    tranches: &[Tranche],
) -> WaterfallResult<SequentialWaterfall> {
    validate_tranches(tranches)?;

    let mut states: Vec<TrancheState> = tranches.iter().map(TrancheState::new).collect();
    let mut periods: Vec<CmoPeriod> = Vec::with_capacity(collateral.rows.len());

    for row in &collateral.rows {
        let mut rem_interest = row.net_interest;
        let mut rem_principal = row.total_principal;

        for state in states.iter_mut() {
            state.current = empty_period(&state.name, state.balance);
        }

        let outstanding_current_pay: Money = states
            .iter()
            .filter(|s| s.kind != TrancheKind::Accrual)
            .map(|s| s.balance)
            .sum();

        // Interest pass
        for state in states.iter_mut() {
            let due = state.balance * state.coupon / MONTHS_PER_YEAR;
            let available = due.min(rem_interest.max(Decimal::ZERO));

            let redirected = match state.kind {
                TrancheKind::Sequential => Decimal::ZERO,
                TrancheKind::Accrual => {
                    let uncovered = (outstanding_current_pay - rem_principal).max(Decimal::ZERO);
                    available.min(uncovered)
                }
            };
            let paid = available - redirected;

            rem_interest -= available;
            rem_principal += redirected;

            let accrued = due - paid;
            state.current.interest_due = due;
            state.current.interest_paid = paid;
            state.current.accrued_interest = accrued;
            state.total_interest_paid += paid;
            state.total_accrued_interest += accrued;
        }

        // Principal pass
        for state in states.iter_mut() {
            let pay = if rem_principal > Decimal::ZERO {
                state.balance.min(rem_principal)
            } else {
                Decimal::ZERO
            };
            rem_principal -= pay;

            state.current.principal_paid = pay;
            state.current.cash_flow = state.current.interest_paid + pay;
            state.principal_flows.push(pay);
            state.balance = state.balance - pay + state.current.accrued_interest;
        }

        periods.push(CmoPeriod {
            period: row.month,
            remaining_interest: rem_interest,
            remaining_principal: rem_principal,
            tranches: states.iter().map(|s| s.current.clone()).collect(),
        });
    }

    tracing::debug!(
        periods = periods.len(),
        tranches = states.len(),
        "sequential waterfall allocated"
    );

    Ok(SequentialWaterfall {
        periods,
        tranches: states.iter().map(TrancheState::summary).collect(),
    })
}

/// Replace one tranche with children that each take a fixed fraction of
/// every balance and cash flow.
pub fn pro_rata_split(
    waterfall: &SequentialWaterfall,
    split: &ProRataSplit,
) -> WaterfallResult<SequentialWaterfall> {
    if split.children.is_empty() {
        return Err(WaterfallError::InvalidInput {
            field: "children".into(),
            reason: "A split needs at least one child tranche".into(),
        });
    }
    if split.children.iter().any(|c| c.fraction < Decimal::ZERO) {
        return Err(WaterfallError::InvalidInput {
            field: "fraction".into(),
            reason: "Fractions must be non-negative".into(),
        });
    }
    let total: Decimal = split.children.iter().map(|c| c.fraction).sum();
    if (total - Decimal::ONE).abs() > FRACTION_TOL {
        return Err(WaterfallError::InvalidInput {
            field: "children".into(),
            reason: format!("Fractions sum to {total}, expected 1"),
        });
    }

    let existing: HashSet<&str> = waterfall.tranches.iter().map(|t| t.name.as_str()).collect();
    if !existing.contains(split.source_tranche.as_str()) {
        return Err(WaterfallError::InvalidInput {
            field: "source_tranche".into(),
            reason: format!("Unknown tranche '{}'", split.source_tranche),
        });
    }
    for child in &split.children {
        if child.name != split.source_tranche && existing.contains(child.name.as_str()) {
            return Err(WaterfallError::InvalidInput {
                field: "children".into(),
                reason: format!("Tranche '{}' already exists", child.name),
            });
        }
    }

    let periods = waterfall
        .periods
        .iter()
        .map(|p| CmoPeriod {
            period: p.period,
            remaining_interest: p.remaining_interest,
            remaining_principal: p.remaining_principal,
            tranches: p
                .tranches
                .iter()
                .flat_map(|t| split_period(t, split))
                .collect(),
        })
        .collect();

    let tranches = waterfall
        .tranches
        .iter()
        .flat_map(|t| split_summary(t, split))
        .collect();

    Ok(SequentialWaterfall { periods, tranches })
}

fn split_period(t: &TranchePeriod, split: &ProRataSplit) -> Vec<TranchePeriod> {
    if t.name != split.source_tranche {
        return vec![t.clone()];
    }
    split
        .children
        .iter()
        .map(|c| TranchePeriod {
            name: c.name.clone(),
            balance: t.balance * c.fraction,
            interest_due: t.interest_due * c.fraction,
            interest_paid: t.interest_paid * c.fraction,
            accrued_interest: t.accrued_interest * c.fraction,
            principal_paid: t.principal_paid * c.fraction,
            cash_flow: t.cash_flow * c.fraction,
        })
        .collect()
}

fn split_summary(t: &TrancheSummary, split: &ProRataSplit) -> Vec<TrancheSummary> {
    if t.name != split.source_tranche {
        return vec![t.clone()];
    }
    split
        .children
        .iter()
        .map(|c| TrancheSummary {
            name: c.name.clone(),
            kind: t.kind,
            original_balance: t.original_balance * c.fraction,
            total_interest_paid: t.total_interest_paid * c.fraction,
            total_accrued_interest: t.total_accrued_interest * c.fraction,
            total_principal_paid: t.total_principal_paid * c.fraction,
            weighted_average_life: t.weighted_average_life,
            final_balance: t.final_balance * c.fraction,
        })
        .collect()
}

/// Weighted average life in years of monthly principal flows (month 1 first).
pub fn average_life(principal_flows: &[Money]) -> Decimal {
    let mut numerator = Decimal::ZERO;
    let mut total = Decimal::ZERO;
    for (idx, p) in principal_flows.iter().enumerate() {
        numerator += Decimal::from(idx as u64 + 1) * p;
        total += p;
    }
    if total.is_zero() {
        Decimal::ZERO
    } else {
        numerator / total / MONTHS_PER_YEAR
    }
}

fn validate_tranches(tranches: &[Tranche]) -> WaterfallResult<()> {
    if tranches.is_empty() {
        return Err(WaterfallError::InsufficientData(
            "At least one tranche is required".into(),
        ));
    }
    let mut names: HashSet<&str> = HashSet::new();
    for t in tranches {
        if !names.insert(t.name.as_str()) {
            return Err(WaterfallError::InvalidInput {
                field: "tranches".into(),
                reason: format!("Duplicate tranche name '{}'", t.name),
            });
        }
        if t.balance < Decimal::ZERO {
            return Err(WaterfallError::InvalidInput {
                field: format!("tranches.{}.balance", t.name),
                reason: "Balance cannot be negative".into(),
            });
        }
        if t.coupon < Decimal::ZERO {
            return Err(WaterfallError::InvalidInput {
                field: format!("tranches.{}.coupon", t.name),
                reason: "Coupon cannot be negative".into(),
            });
        }
    }
    Ok(())
}
