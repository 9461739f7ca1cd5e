use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::sequential::average_life;
use crate::collateral::{create_waterfall, PsaSpeed, WaterfallInput};
use crate::error::WaterfallError;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::WaterfallResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacInput {
    /// Collateral pool; its `psa_speed` is the realised prepayment speed.
    #[serde(default)]
    pub collateral: WaterfallInput,
    /// Lower protection band as a PSA multiple (1.0 = 100% PSA).
    pub lower_band: Decimal,
    /// Upper protection band as a PSA multiple.
    pub upper_band: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacRow {
    pub period: u32,
    /// Collateral principal at the lower band speed.
    pub lower_band_principal: Money,
    /// Collateral principal at the upper band speed.
    pub upper_band_principal: Money,
    /// Scheduled PAC principal plus any arrears.
    pub pac_principal_due: Money,
    /// Collateral principal at the realised speed.
    pub available_principal: Money,
    pub pac_balance: Money,
    pub support_balance: Money,
    pub pac_principal_paid: Money,
    pub support_principal_paid: Money,
    /// Cumulative schedule shortfall after this month.
    pub pac_arrears: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacOutput {
    pub pac_original_balance: Money,
    pub support_original_balance: Money,
    pub pac_average_life: Decimal,
    pub support_average_life: Decimal,
    pub rows: Vec<PacRow>,
}

/// Split collateral principal into a planned amortisation class and its
/// support class.
///
/// The PAC schedule is the month-by-month minimum of collateral principal at
/// the two band speeds. Each month the PAC receives its scheduled amount plus
/// arrears, the support class absorbs what is left, and once the support class
/// is retired all principal flows to the PAC.
pub fn analyze_pac_support(input: &PacInput) -> WaterfallResult<ComputationOutput<PacOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    validate_bands(input)?;

    let at_speed = |speed: Decimal| {
        create_waterfall(&WaterfallInput {
            psa_speed: PsaSpeed::Constant(speed),
            ..input.collateral.clone()
        })
    };
    let lower = at_speed(input.lower_band)?.result;
    let upper = at_speed(input.upper_band)?.result;
    let actual = create_waterfall(&input.collateral)?;
    warnings.extend(actual.warnings);
    let actual = actual.result;

    let schedule: Vec<Money> = lower
        .rows
        .iter()
        .zip(upper.rows.iter())
        .map(|(l, u)| l.total_principal.min(u.total_principal))
        .collect();

    let pac_original: Money = schedule.iter().copied().sum();
    let support_original = (input.collateral.original_balance - pac_original).max(Decimal::ZERO);

    let mut pac_balance = pac_original;
    let mut support_balance = support_original;
    let mut arrears = Decimal::ZERO;
    let mut pac_flows: Vec<Money> = Vec::with_capacity(schedule.len());
    let mut support_flows: Vec<Money> = Vec::with_capacity(schedule.len());
    let mut rows: Vec<PacRow> = Vec::with_capacity(schedule.len());
    let mut broken_month: Option<u32> = None;

    for (idx, row) in actual.rows.iter().enumerate() {
        let scheduled = schedule[idx];
        let due = scheduled + arrears;
        let available = row.total_principal;

        let mut pac_paid = due.min(available).min(pac_balance);
        let support_paid = (available - pac_paid).min(support_balance).max(Decimal::ZERO);
        // Support retired: the PAC takes everything that is left
        pac_paid = (pac_paid + (available - pac_paid - support_paid)).min(pac_balance);

        arrears = (due - pac_paid).max(Decimal::ZERO).min(pac_balance - pac_paid);
        if arrears > dec!(0.01) && broken_month.is_none() {
            broken_month = Some(row.month);
        }

        rows.push(PacRow {
            period: row.month,
            lower_band_principal: lower.rows[idx].total_principal,
            upper_band_principal: upper.rows[idx].total_principal,
            pac_principal_due: due,
            available_principal: available,
            pac_balance,
            support_balance,
            pac_principal_paid: pac_paid,
            support_principal_paid: support_paid,
            pac_arrears: arrears,
        });

        pac_balance -= pac_paid;
        support_balance -= support_paid;
        pac_flows.push(pac_paid);
        support_flows.push(support_paid);
    }

    if let Some(month) = broken_month {
        warnings.push(format!(
            "PAC schedule missed from month {month}; realised speed is outside the protection band"
        ));
    }
    if support_original.is_zero() {
        warnings.push("Bands leave no support class; the PAC is the whole pool".into());
    }

    tracing::debug!(
        pac = %pac_original.round_dp(2),
        support = %support_original.round_dp(2),
        "PAC/support split"
    );

    let output = PacOutput {
        pac_original_balance: pac_original,
        support_original_balance: support_original,
        pac_average_life: average_life(&pac_flows),
        support_average_life: average_life(&support_flows),
        rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "PAC/support with PSA protection bands",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn validate_bands(input: &PacInput) -> WaterfallResult<()> {
    if input.lower_band < Decimal::ZERO {
        return Err(WaterfallError::InvalidInput {
            field: "lower_band".into(),
            reason: "Band speed cannot be negative".into(),
        });
    }
    if input.upper_band <= input.lower_band {
        return Err(WaterfallError::InvalidInput {
            field: "upper_band".into(),
            reason: "Upper band must exceed lower band".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn pac_input(speed: Decimal) -> PacInput {
        PacInput {
            collateral: WaterfallInput {
                original_balance: dec!(400_000_000),
                pass_thru_cpn: dec!(0.075),
                wac: dec!(0.08125),
                wam: 357,
                psa_speed: PsaSpeed::Constant(speed),
                ..Default::default()
            },
            lower_band: dec!(0.9),
            upper_band: dec!(3.0),
        }
    }

    #[test]
    fn test_pac_plus_support_equals_pool() {
        let out = analyze_pac_support(&pac_input(dec!(1.65))).unwrap().result;
        assert_eq!(
            out.pac_original_balance + out.support_original_balance,
            dec!(400_000_000)
        );
        assert!(out.pac_original_balance > Decimal::ZERO);
        assert!(out.support_original_balance > Decimal::ZERO);
    }

    #[test]
    fn test_schedule_is_band_minimum() {
        let out = analyze_pac_support(&pac_input(dec!(1.65))).unwrap().result;
        for r in &out.rows {
            assert!(r.pac_principal_due >= r.lower_band_principal.min(r.upper_band_principal));
        }
        let first = &out.rows[0];
        assert_eq!(
            first.pac_principal_due,
            first.lower_band_principal.min(first.upper_band_principal)
        );
    }

    #[test]
    fn test_within_band_pac_paid_on_schedule() {
        let out = analyze_pac_support(&pac_input(dec!(1.65))).unwrap();
        assert!(out.warnings.iter().all(|w| !w.contains("missed")));
        for r in &out.result.rows {
            if r.support_balance > dec!(0.01) {
                assert_close(r.pac_principal_paid, r.pac_principal_due, dec!(0.01), "on schedule");
            }
        }
    }

    #[test]
    fn test_principal_fully_allocated() {
        let out = analyze_pac_support(&pac_input(dec!(1.65))).unwrap().result;
        for r in &out.rows {
            assert_close(
                r.pac_principal_paid + r.support_principal_paid,
                r.available_principal,
                dec!(0.01),
                "allocation",
            );
        }
        let last = out.rows.last().unwrap();
        assert_close(
            last.pac_balance - last.pac_principal_paid,
            Decimal::ZERO,
            dec!(0.01),
            "PAC retired",
        );
    }

    #[test]
    fn test_slow_speed_breaks_schedule() {
        let out = analyze_pac_support(&pac_input(dec!(0.5))).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("missed")));
        assert!(out.result.rows.iter().any(|r| r.pac_arrears > Decimal::ZERO));
    }

    #[test]
    fn test_support_shortens_when_fast() {
        let base = analyze_pac_support(&pac_input(dec!(1.65))).unwrap().result;
        let fast = analyze_pac_support(&pac_input(dec!(2.5))).unwrap().result;
        assert!(fast.support_average_life < base.support_average_life);
    }

    #[test]
    fn test_inverted_bands_rejected() {
        let mut input = pac_input(dec!(1.65));
        input.upper_band = dec!(0.5);
        assert!(matches!(
            analyze_pac_support(&input),
            Err(WaterfallError::InvalidInput { .. })
        ));
    }
}
