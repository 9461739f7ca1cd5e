use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::WaterfallError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::WaterfallResult;

/// A group of loans sharing a note rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolCohort {
    pub balance: Money,
    pub note_rate: Rate,
}

/// Stripping a pool into a principal-only and an interest-only class at a
/// target security coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoIoInput {
    pub cohorts: Vec<PoolCohort>,
    #[serde(default = "default_base_servicing")]
    pub base_servicing: Rate,
    #[serde(default = "default_trustee_fee")]
    pub trustee_fee: Rate,
    #[serde(default = "default_security_coupon")]
    pub security_coupon: Rate,
}

fn default_base_servicing() -> Rate {
    dec!(0.0025)
}

fn default_trustee_fee() -> Rate {
    dec!(0.00009)
}

fn default_security_coupon() -> Rate {
    dec!(0.0575)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoIoCohortResult {
    pub balance: Money,
    pub note_rate: Rate,
    pub net_note_rate: Rate,
    /// Net note rate minus the security coupon.
    pub diff_net_to_coupon: Rate,
    /// Excess of net note rate over the coupon, floored at zero.
    pub net_contribution_to_wac: Rate,
    /// Share of the cohort balance carved into the PO class.
    pub po_percent: Rate,
    pub po_balance: Money,
    /// Balance that carries excess interest into the IO class.
    pub io_face: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoIoOutput {
    pub cohorts: Vec<PoIoCohortResult>,
    pub total_balance: Money,
    pub po_balance: Money,
    pub io_face: Money,
}

/// Split each cohort into PO and IO pieces.
///
/// Discount cohorts (net note rate below the coupon) contribute the
/// `(coupon - net) / coupon` share of their balance to the PO; premium cohorts
/// contribute their whole balance as IO face.
pub fn po_io_split(input: &PoIoInput) -> WaterfallResult<ComputationOutput<PoIoOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.cohorts.is_empty() {
        return Err(WaterfallError::InsufficientData(
            "PO/IO split needs at least one cohort".into(),
        ));
    }
    if input.security_coupon <= Decimal::ZERO {
        return Err(WaterfallError::DivisionByZero {
            context: "PO percent (security coupon must be positive)".into(),
        });
    }

    let fees = input.base_servicing + input.trustee_fee;
    let mut cohorts: Vec<PoIoCohortResult> = Vec::with_capacity(input.cohorts.len());
    let mut total_balance = Decimal::ZERO;
    let mut po_total = Decimal::ZERO;
    let mut io_total = Decimal::ZERO;

    for cohort in &input.cohorts {
        let net_note_rate = cohort.note_rate - fees;
        let diff = net_note_rate - input.security_coupon;
        let po_percent =
            ((input.security_coupon - net_note_rate) / input.security_coupon).max(Decimal::ZERO);
        let po_balance = po_percent * cohort.balance;
        let io_face = if diff > Decimal::ZERO {
            cohort.balance
        } else {
            Decimal::ZERO
        };

        total_balance += cohort.balance;
        po_total += po_balance;
        io_total += io_face;

        cohorts.push(PoIoCohortResult {
            balance: cohort.balance,
            note_rate: cohort.note_rate,
            net_note_rate,
            diff_net_to_coupon: diff,
            net_contribution_to_wac: diff.max(Decimal::ZERO),
            po_percent,
            po_balance,
            io_face,
        });
    }

    if io_total.is_zero() {
        warnings.push("No cohort nets above the security coupon; IO class is empty".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "PO/IO strip by cohort net note rate",
        input,
        warnings,
        elapsed,
        PoIoOutput {
            cohorts,
            total_balance,
            po_balance: po_total,
            io_face: io_total,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_cohorts() -> PoIoInput {
        PoIoInput {
            cohorts: vec![
                PoolCohort {
                    balance: dec!(1_000_000),
                    note_rate: dec!(0.05),
                },
                PoolCohort {
                    balance: dec!(2_000_000),
                    note_rate: dec!(0.07),
                },
            ],
            base_servicing: dec!(0.0025),
            trustee_fee: dec!(0.0),
            security_coupon: dec!(0.055),
        }
    }

    #[test]
    fn test_discount_cohort_feeds_po() {
        let out = po_io_split(&two_cohorts()).unwrap().result;
        let discount = &out.cohorts[0];
        // net 4.75% vs 5.5% coupon: 0.75/5.5 of balance is PO
        assert_eq!(discount.net_note_rate, dec!(0.0475));
        let expected = dec!(136_363.636363);
        assert!((discount.po_balance - expected).abs() < dec!(0.001));
        assert_eq!(discount.io_face, Decimal::ZERO);
    }

    #[test]
    fn test_premium_cohort_feeds_io() {
        let out = po_io_split(&two_cohorts()).unwrap().result;
        let premium = &out.cohorts[1];
        assert_eq!(premium.po_percent, Decimal::ZERO);
        assert_eq!(premium.io_face, dec!(2_000_000));
        assert_eq!(premium.net_contribution_to_wac, dec!(0.0125));
        assert_eq!(out.total_balance, dec!(3_000_000));
        assert_eq!(out.io_face, dec!(2_000_000));
    }

    #[test]
    fn test_defaults_from_json() {
        let input: PoIoInput =
            serde_json::from_str(r#"{"cohorts": [{"balance": 500000, "note_rate": 0.06}]}"#).unwrap();
        assert_eq!(input.base_servicing, dec!(0.0025));
        assert_eq!(input.trustee_fee, dec!(0.00009));
        assert_eq!(input.security_coupon, dec!(0.0575));
    }

    #[test]
    fn test_empty_pool_rejected() {
        let mut input = two_cohorts();
        input.cohorts.clear();
        assert!(po_io_split(&input).is_err());
    }
}
