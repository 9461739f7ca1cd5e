use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::WaterfallError;
use crate::prepayment::{cpr_curve_from_description, cpr_to_smm, MAX_CURVE_MONTHS, PSA_DESCRIPTION};
use crate::time_value::level_payment;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::WaterfallResult;

#[cfg(feature = "export")]
use crate::export::ScheduleRecord;

/// Slack allowed by the inflow/outflow checks, in currency units.
const CHECK_TOLERANCE: Decimal = dec!(1);

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Largest pool balance accepted (one quadrillion).
const MAX_ORIGINAL_BALANCE: Money = dec!(1_000_000_000_000_000);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Multiplier applied to the CPR curve: one value for every month, or a
/// month-by-month vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PsaSpeed {
    Constant(Decimal),
    Vector(Vec<Decimal>),
}

impl PsaSpeed {
    fn at(&self, idx: usize) -> Option<Decimal> {
        match self {
            PsaSpeed::Constant(s) => Some(*s),
            PsaSpeed::Vector(v) => v.get(idx).copied(),
        }
    }
}

impl Default for PsaSpeed {
    fn default() -> Self {
        PsaSpeed::Constant(Decimal::ONE)
    }
}

/// Aggregate collateral description for a pass-through pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterfallInput {
    /// Pool balance at the start of month 1.
    pub original_balance: Money,
    /// Coupon passed through to investors (annual).
    pub pass_thru_cpn: Rate,
    /// Weighted average coupon of the underlying loans (annual).
    pub wac: Rate,
    /// Weighted average remaining maturity in months; one row per month.
    pub wam: u32,
    /// Multiplier on the CPR curve (1.0 = the curve as described).
    pub psa_speed: PsaSpeed,
    /// CPR curve description, e.g. `.2 ramp 6 for 30, 6`.
    pub cpr_description: String,
    /// Annual servicing fee rate on the beginning balance.
    pub servicing_fee: Rate,
}

impl Default for WaterfallInput {
    fn default() -> Self {
        Self {
            original_balance: dec!(400_000_000),
            pass_thru_cpn: dec!(0.055),
            wac: dec!(0.06),
            wam: 358,
            psa_speed: PsaSpeed::default(),
            cpr_description: PSA_DESCRIPTION.to_string(),
            servicing_fee: Decimal::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One month of collateral cash flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallRow {
    pub month: u32,
    pub beginning_balance: Money,
    #[serde(rename = "SMM")]
    pub smm: Rate,
    pub mortgage_payments: Money,
    pub net_interest: Money,
    pub gross_coupon: Money,
    pub scheduled_principal: Money,
    pub prepayments: Money,
    pub total_principal: Money,
    pub cash_flow: Money,
    pub servicing: Money,
    pub other_fees: Money,
    pub ending_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallSummary {
    pub total_scheduled_principal: Money,
    pub total_prepayments: Money,
    pub total_net_interest: Money,
    pub total_cash_flow: Money,
    /// Weighted average life of total principal, in years.
    pub weighted_average_life: Decimal,
    pub final_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralWaterfall {
    pub rows: Vec<WaterfallRow>,
    pub summary: WaterfallSummary,
}

impl CollateralWaterfall {
    /// Column view of the waterfall in the layout the CSV export expects.
    #[cfg(feature = "export")]
    pub fn to_schedule_record(&self) -> ScheduleRecord {
        let n = self.rows.len();
        let mut record = ScheduleRecord {
            periods: Vec::with_capacity(n),
            beginning_balance: Vec::with_capacity(n),
            smm: Vec::with_capacity(n),
            mortgage_payments: Vec::with_capacity(n),
            net_interest: Vec::with_capacity(n),
            scheduled_principal: Vec::with_capacity(n),
            prepayments: Vec::with_capacity(n),
            total_principal: Vec::with_capacity(n),
            cash_flow: Vec::with_capacity(n),
        };
        for row in &self.rows {
            record.periods.push(row.month);
            record.beginning_balance.push(row.beginning_balance);
            record.smm.push(row.smm);
            record.mortgage_payments.push(row.mortgage_payments);
            record.net_interest.push(row.net_interest);
            record.scheduled_principal.push(row.scheduled_principal);
            record.prepayments.push(row.prepayments);
            record.total_principal.push(row.total_principal);
            record.cash_flow.push(row.cash_flow);
        }
        record
    }

    /// Total principal per month, in month order.
    pub fn principal_flows(&self) -> Vec<Money> {
        self.rows.iter().map(|r| r.total_principal).collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the monthly collateral waterfall.
///
/// Month `m` pays the level payment that amortises the beginning balance over
/// the `wam - m + 1` remaining months at the WAC. Prepayments are the month's
/// SMM applied to the balance left after scheduled principal. Investors
/// receive net interest at the pass-through coupon plus all principal.
pub fn create_waterfall(
    input: &WaterfallInput,
) -> WaterfallResult<ComputationOutput<CollateralWaterfall>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    validate(input)?;

    let smm_curve = monthly_smm(input)?;

    if input.pass_thru_cpn + input.servicing_fee > input.wac {
        warnings.push(format!(
            "Pass-through coupon {} plus servicing {} exceeds WAC {}; other fees are negative",
            input.pass_thru_cpn, input.servicing_fee, input.wac
        ));
    }

    let monthly_wac = input.wac / MONTHS_PER_YEAR;
    let monthly_pass_thru = input.pass_thru_cpn / MONTHS_PER_YEAR;
    let monthly_servicing = input.servicing_fee / MONTHS_PER_YEAR;

    let mut rows: Vec<WaterfallRow> = Vec::with_capacity(input.wam as usize);
    let mut beginning_balance = input.original_balance;

    for (idx, smm) in smm_curve.into_iter().enumerate() {
        let month = idx as u32 + 1;
        let remaining = input.wam - month + 1;

        let mortgage_payments = level_payment(beginning_balance, input.wac, remaining)?;
        let net_interest = beginning_balance * monthly_pass_thru;
        let gross_coupon = beginning_balance * monthly_wac;
        let scheduled_principal = mortgage_payments - gross_coupon;
        let prepayments = smm * (beginning_balance - scheduled_principal);
        let total_principal = scheduled_principal + prepayments;
        let cash_flow = net_interest + total_principal;
        let servicing = beginning_balance * monthly_servicing;
        let other_fees = mortgage_payments + prepayments - total_principal - net_interest - servicing;
        let ending_balance = beginning_balance - total_principal;

        check_inflows(
            month,
            total_principal,
            gross_coupon,
            cash_flow,
            mortgage_payments,
            prepayments,
        )?;

        rows.push(WaterfallRow {
            month,
            beginning_balance,
            smm,
            mortgage_payments,
            net_interest,
            gross_coupon,
            scheduled_principal,
            prepayments,
            total_principal,
            cash_flow,
            servicing,
            other_fees,
            ending_balance,
        });

        beginning_balance = ending_balance;
    }

    let summary = summarise(&rows);
    tracing::debug!(
        months = rows.len(),
        wal = %summary.weighted_average_life,
        "collateral waterfall built"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Collateral pass-through waterfall (level-pay amortisation with CPR curve prepayments)",
        input,
        warnings,
        elapsed,
        CollateralWaterfall { rows, summary },
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Per-month SMM: the described CPR times the speed multiplier for that month.
fn monthly_smm(input: &WaterfallInput) -> WaterfallResult<Vec<Rate>> {
    let curve = cpr_curve_from_description(&input.cpr_description)?;
    let wam = input.wam as usize;

    if curve.len() < wam {
        return Err(WaterfallError::InvalidInput {
            field: "cpr_description".into(),
            reason: format!("curve covers {} months but WAM is {}", curve.len(), wam),
        });
    }

    (0..wam)
        .map(|idx| {
            let speed = input.psa_speed.at(idx).ok_or_else(|| WaterfallError::InvalidInput {
                field: "psa_speed".into(),
                reason: format!("speed vector has no entry for month {}", idx + 1),
            })?;
            let cpr = curve[idx]
                .checked_mul(speed)
                .ok_or_else(|| WaterfallError::InvalidInput {
                    field: "psa_speed".into(),
                    reason: format!("scaled CPR overflows in month {}", idx + 1),
                })?;
            Ok(cpr_to_smm(cpr))
        })
        .collect()
}

fn check_inflows(
    month: u32,
    total_principal: Money,
    gross_coupon: Money,
    cash_flow: Money,
    mortgage_payments: Money,
    prepayments: Money,
) -> WaterfallResult<()> {
    let inflows = mortgage_payments.round_dp(2) + prepayments.round_dp(2) + CHECK_TOLERANCE;

    if total_principal.round_dp(2) + gross_coupon.round_dp(2) > inflows {
        return Err(WaterfallError::FinancialImpossibility(format!(
            "month {month}: total principal plus gross coupon exceeds mortgage payments plus prepayments"
        )));
    }
    if cash_flow > inflows {
        return Err(WaterfallError::FinancialImpossibility(format!(
            "month {month}: investor cash flow exceeds mortgage payments plus prepayments"
        )));
    }
    Ok(())
}

fn summarise(rows: &[WaterfallRow]) -> WaterfallSummary {
    let mut total_scheduled_principal = Decimal::ZERO;
    let mut total_prepayments = Decimal::ZERO;
    let mut total_net_interest = Decimal::ZERO;
    let mut total_cash_flow = Decimal::ZERO;
    let mut wal_numerator = Decimal::ZERO;

    for row in rows {
        total_scheduled_principal += row.scheduled_principal;
        total_prepayments += row.prepayments;
        total_net_interest += row.net_interest;
        total_cash_flow += row.cash_flow;
        wal_numerator += Decimal::from(row.month) * row.total_principal;
    }

    let total_principal = total_scheduled_principal + total_prepayments;
    let weighted_average_life = if total_principal > Decimal::ZERO {
        wal_numerator / total_principal / MONTHS_PER_YEAR
    } else {
        Decimal::ZERO
    };

    WaterfallSummary {
        total_scheduled_principal,
        total_prepayments,
        total_net_interest,
        total_cash_flow,
        weighted_average_life,
        final_balance: rows.last().map(|r| r.ending_balance).unwrap_or(Decimal::ZERO),
    }
}

fn validate(input: &WaterfallInput) -> WaterfallResult<()> {
    if input.original_balance <= Decimal::ZERO {
        return Err(WaterfallError::InvalidInput {
            field: "original_balance".into(),
            reason: "Original balance must be positive".into(),
        });
    }
    if input.original_balance > MAX_ORIGINAL_BALANCE {
        return Err(WaterfallError::InvalidInput {
            field: "original_balance".into(),
            reason: format!("Original balance exceeds {MAX_ORIGINAL_BALANCE}"),
        });
    }
    if input.wam == 0 {
        return Err(WaterfallError::InvalidInput {
            field: "wam".into(),
            reason: "WAM must be greater than zero".into(),
        });
    }
    if input.wam as usize > MAX_CURVE_MONTHS {
        return Err(WaterfallError::InvalidInput {
            field: "wam".into(),
            reason: format!("WAM cannot exceed {MAX_CURVE_MONTHS} months"),
        });
    }
    for (field, rate) in [("wac", input.wac), ("pass_thru_cpn", input.pass_thru_cpn)] {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(WaterfallError::InvalidInput {
                field: field.into(),
                reason: "Coupons must be between 0 and 1 (100%)".into(),
            });
        }
    }
    if input.servicing_fee < Decimal::ZERO || input.servicing_fee > Decimal::ONE {
        return Err(WaterfallError::InvalidInput {
            field: "servicing_fee".into(),
            reason: "Servicing fee must be between 0 and 1 (100%)".into(),
        });
    }
    let negative_speed = match &input.psa_speed {
        PsaSpeed::Constant(s) => *s < Decimal::ZERO,
        PsaSpeed::Vector(v) => v.iter().any(|s| *s < Decimal::ZERO),
    };
    if negative_speed {
        return Err(WaterfallError::InvalidInput {
            field: "psa_speed".into(),
            reason: "PSA speed must be non-negative".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: Decimal = dec!(0.01);

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal, msg: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "{}: expected ~{}, got {} (diff = {})",
            msg,
            expected,
            actual,
            diff
        );
    }

    fn no_prepay_input() -> WaterfallInput {
        WaterfallInput {
            original_balance: dec!(100_000),
            pass_thru_cpn: dec!(0.055),
            wac: dec!(0.06),
            wam: 360,
            psa_speed: PsaSpeed::Constant(Decimal::ZERO),
            cpr_description: PSA_DESCRIPTION.into(),
            servicing_fee: dec!(0.0025),
        }
    }

    fn run(input: &WaterfallInput) -> CollateralWaterfall {
        create_waterfall(input).unwrap().result
    }

    #[test]
    fn test_no_prepayment_first_month() {
        let out = run(&no_prepay_input());
        let m1 = &out.rows[0];
        assert_eq!(m1.month, 1);
        assert_eq!(m1.smm, Decimal::ZERO);
        assert_close(m1.mortgage_payments, dec!(599.55), TOL, "level payment");
        assert_close(m1.net_interest, dec!(458.33), TOL, "net interest");
        assert_eq!(m1.gross_coupon, dec!(500));
        assert_close(m1.scheduled_principal, dec!(99.55), TOL, "scheduled principal");
        assert_eq!(m1.prepayments, Decimal::ZERO);
        assert_close(m1.servicing, dec!(20.83), TOL, "servicing");
    }

    #[test]
    fn test_no_prepayment_amortises_to_zero() {
        let out = run(&no_prepay_input());
        assert_eq!(out.rows.len(), 360);
        assert_close(out.summary.final_balance, Decimal::ZERO, TOL, "final balance");
        assert_close(
            out.summary.total_scheduled_principal,
            dec!(100_000),
            TOL,
            "principal repaid",
        );
    }

    #[test]
    fn test_level_payment_constant_without_prepayment() {
        let out = run(&no_prepay_input());
        let first = out.rows[0].mortgage_payments;
        for row in &out.rows {
            assert_close(row.mortgage_payments, first, TOL, "payment stays level");
        }
    }

    #[test]
    fn test_balances_roll_forward() {
        let out = run(&WaterfallInput::default());
        for pair in out.rows.windows(2) {
            assert_eq!(
                pair[1].beginning_balance,
                pair[0].beginning_balance - pair[0].total_principal
            );
            assert_eq!(pair[0].ending_balance, pair[1].beginning_balance);
        }
    }

    #[test]
    fn test_row_identities() {
        let out = run(&WaterfallInput::default());
        for row in &out.rows {
            assert_eq!(row.cash_flow, row.net_interest + row.total_principal);
            assert_eq!(
                row.total_principal,
                row.scheduled_principal + row.prepayments
            );
            assert_eq!(
                row.prepayments,
                row.smm * (row.beginning_balance - row.scheduled_principal)
            );
        }
    }

    #[test]
    fn test_default_pool_first_month() {
        let out = run(&WaterfallInput::default());
        let m1 = &out.rows[0];
        assert_eq!(out.rows.len(), 358);
        assert_eq!(m1.beginning_balance, dec!(400_000_000));
        assert_close(m1.net_interest, dec!(1_833_333.33), TOL, "net interest");
        assert_eq!(m1.gross_coupon, dec!(2_000_000));
        assert_close(m1.smm, cpr_to_smm(dec!(0.002)), dec!(0.0000000001), "month 1 SMM");
        assert_close(
            m1.other_fees,
            m1.gross_coupon - m1.net_interest,
            dec!(0.000001),
            "other fees are the coupon strip",
        );
    }

    #[test]
    fn test_pool_pays_down_fully_with_prepayments() {
        let out = run(&WaterfallInput::default());
        assert_close(out.summary.final_balance, Decimal::ZERO, TOL, "final balance");
        assert!(out.summary.total_prepayments > Decimal::ZERO);
        assert!(out.summary.weighted_average_life > dec!(5));
        assert!(out.summary.weighted_average_life < dec!(15));
    }

    #[test]
    fn test_faster_speed_shortens_wal() {
        let base = run(&WaterfallInput::default());
        let fast = run(&WaterfallInput {
            psa_speed: PsaSpeed::Constant(dec!(3)),
            ..Default::default()
        });
        assert!(fast.summary.weighted_average_life < base.summary.weighted_average_life);
    }

    #[test]
    fn test_speed_vector_applied_per_month() {
        let mut speeds = vec![Decimal::ONE; 358];
        speeds[0] = Decimal::ZERO;
        let out = run(&WaterfallInput {
            psa_speed: PsaSpeed::Vector(speeds),
            ..Default::default()
        });
        assert_eq!(out.rows[0].smm, Decimal::ZERO);
        assert!(out.rows[1].smm > Decimal::ZERO);
    }

    #[test]
    fn test_short_speed_vector_rejected() {
        let result = create_waterfall(&WaterfallInput {
            psa_speed: PsaSpeed::Vector(vec![Decimal::ONE; 10]),
            ..Default::default()
        });
        assert!(matches!(result, Err(WaterfallError::InvalidInput { .. })));
    }

    #[test]
    fn test_short_curve_rejected() {
        let result = create_waterfall(&WaterfallInput {
            cpr_description: "6 for 12".into(),
            ..Default::default()
        });
        assert!(matches!(result, Err(WaterfallError::InvalidInput { .. })));
    }

    #[test]
    fn test_pass_through_above_wac_is_impossible() {
        let result = create_waterfall(&WaterfallInput {
            pass_thru_cpn: dec!(0.09),
            wac: dec!(0.06),
            ..Default::default()
        });
        assert!(matches!(
            result,
            Err(WaterfallError::FinancialImpossibility(_))
        ));
    }

    #[test]
    fn test_servicing_above_spread_warns() {
        let output = create_waterfall(&WaterfallInput {
            servicing_fee: dec!(0.01),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(output.warnings.len(), 1);
    }

    #[test]
    fn test_out_of_range_coupons_rejected() {
        let result = create_waterfall(&WaterfallInput {
            wac: dec!(3),
            pass_thru_cpn: dec!(2),
            ..Default::default()
        });
        assert!(matches!(result, Err(WaterfallError::InvalidInput { .. })));

        let result = create_waterfall(&WaterfallInput {
            servicing_fee: dec!(1.5),
            ..Default::default()
        });
        assert!(matches!(result, Err(WaterfallError::InvalidInput { .. })));
    }

    #[test]
    fn test_huge_wam_rejected() {
        for wam in [u32::MAX, MAX_CURVE_MONTHS as u32 + 1] {
            let result = create_waterfall(&WaterfallInput {
                wam,
                cpr_description: "6 for 3600".into(),
                ..Default::default()
            });
            assert!(matches!(result, Err(WaterfallError::InvalidInput { .. })));
        }
    }

    #[test]
    fn test_huge_balance_rejected() {
        for original_balance in [Decimal::MAX, MAX_ORIGINAL_BALANCE + Decimal::ONE] {
            let result = create_waterfall(&WaterfallInput {
                original_balance,
                ..Default::default()
            });
            assert!(matches!(result, Err(WaterfallError::InvalidInput { .. })));
        }
    }

    #[test]
    fn test_full_rate_long_term_overflow_is_an_error() {
        // 100% WAC over 3600 months has no representable level payment
        let result = create_waterfall(&WaterfallInput {
            wac: Decimal::ONE,
            pass_thru_cpn: dec!(0.9),
            wam: 3600,
            cpr_description: "6 for 3600".into(),
            ..Default::default()
        });
        assert!(matches!(result, Err(WaterfallError::FinancialImpossibility(_))));
    }

    #[test]
    fn test_overflowing_speed_rejected() {
        let result = create_waterfall(&WaterfallInput {
            psa_speed: PsaSpeed::Constant(Decimal::MAX),
            cpr_description: "1000".into(),
            ..Default::default()
        });
        assert!(matches!(result, Err(WaterfallError::InvalidInput { .. })));
    }

    #[test]
    fn test_psa_speed_deserialises_from_number_or_array() {
        let constant: WaterfallInput = serde_json::from_str(r#"{"psa_speed": 1.5}"#).unwrap();
        assert_eq!(constant.psa_speed, PsaSpeed::Constant(dec!(1.5)));
        assert_eq!(constant.wam, 358);

        let vector: WaterfallInput = serde_json::from_str(r#"{"psa_speed": [1, 2]}"#).unwrap();
        assert_eq!(
            vector.psa_speed,
            PsaSpeed::Vector(vec![dec!(1), dec!(2)])
        );
    }

    #[cfg(feature = "export")]
    #[test]
    fn test_schedule_record_columns_align() {
        let out = run(&WaterfallInput::default());
        let record = out.to_schedule_record();
        assert_eq!(record.len(), 358);
        record.validate_shape().unwrap();
        assert_eq!(record.periods[0], 1);
        assert_eq!(record.periods[357], 358);
        assert_eq!(record.cash_flow[10], out.rows[10].cash_flow);
        assert_eq!(record.smm[10], out.rows[10].smm);
    }
}
