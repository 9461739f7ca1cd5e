use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::waterfall::{PsaSpeed, WaterfallInput};
use crate::error::WaterfallError;
use crate::types::{Money, Rate};
use crate::WaterfallResult;

/// Fee key treated as the servicing strip.
const SERVICING_FEE_KEY: &str = "servicing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmortizationType {
    #[serde(rename = "fixed")]
    Fixed,
    #[serde(rename = "ARM")]
    Arm,
}

/// A single loan (or a representative loan for a homogeneous pool).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralLoan {
    pub amort_type: AmortizationType,
    /// Months since origination.
    pub age: u32,
    pub origination_balance: Money,
    pub current_balance: Money,
    /// Note rate paid by the borrower.
    pub gross_rate: Rate,
    /// Annual fee strips by name, e.g. `servicing`, `trustee`, `guarantee`.
    #[serde(default)]
    pub fees: BTreeMap<String, Rate>,
    /// Prepayment penalty rate by period label.
    #[serde(default)]
    pub prepay_penalties: BTreeMap<String, Rate>,
    pub original_amort_term: u32,
    pub average_loan_size: Money,
    pub settlement_date: NaiveDate,
}

impl CollateralLoan {
    pub fn total_fees(&self) -> Rate {
        self.fees.values().copied().sum()
    }

    /// Coupon left for investors after all fee strips.
    pub fn net_rate(&self) -> Rate {
        self.gross_rate - self.total_fees()
    }

    pub fn remaining_term(&self) -> u32 {
        self.original_amort_term.saturating_sub(self.age)
    }

    /// Loan count implied by the current balance and average size.
    pub fn implied_loan_count(&self) -> WaterfallResult<Decimal> {
        if self.average_loan_size.is_zero() {
            return Err(WaterfallError::DivisionByZero {
                context: "average loan size".into(),
            });
        }
        Ok(self.current_balance / self.average_loan_size)
    }

    /// Waterfall parameters for this loan. ARM loans are projected at their
    /// current gross rate.
    pub fn to_waterfall_input(
        &self,
        psa_speed: PsaSpeed,
        cpr_description: &str,
    ) -> WaterfallResult<WaterfallInput> {
        self.validate()?;
        Ok(WaterfallInput {
            original_balance: self.current_balance,
            pass_thru_cpn: self.net_rate(),
            wac: self.gross_rate,
            wam: self.remaining_term(),
            psa_speed,
            cpr_description: cpr_description.to_string(),
            servicing_fee: self
                .fees
                .get(SERVICING_FEE_KEY)
                .copied()
                .unwrap_or(Decimal::ZERO),
        })
    }

    fn validate(&self) -> WaterfallResult<()> {
        if self.current_balance <= Decimal::ZERO {
            return Err(WaterfallError::InvalidInput {
                field: "current_balance".into(),
                reason: "Current balance must be positive".into(),
            });
        }
        if self.current_balance > self.origination_balance {
            return Err(WaterfallError::InvalidInput {
                field: "current_balance".into(),
                reason: "Current balance exceeds origination balance".into(),
            });
        }
        if self.remaining_term() == 0 {
            return Err(WaterfallError::InvalidInput {
                field: "age".into(),
                reason: "Loan has no remaining term".into(),
            });
        }
        if self.net_rate() < Decimal::ZERO {
            return Err(WaterfallError::InvalidInput {
                field: "fees".into(),
                reason: "Fees exceed the gross rate".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_loan() -> CollateralLoan {
        let mut fees = BTreeMap::new();
        fees.insert("servicing".to_string(), dec!(0.0025));
        fees.insert("trustee".to_string(), dec!(0.0025));
        CollateralLoan {
            amort_type: AmortizationType::Fixed,
            age: 2,
            origination_balance: dec!(250_000),
            current_balance: dec!(249_500),
            gross_rate: dec!(0.065),
            fees,
            prepay_penalties: BTreeMap::new(),
            original_amort_term: 360,
            average_loan_size: dec!(249_500),
            settlement_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        }
    }

    #[test]
    fn test_waterfall_input_from_loan() {
        let input = sample_loan()
            .to_waterfall_input(PsaSpeed::Constant(dec!(1.5)), "6")
            .unwrap();
        assert_eq!(input.wam, 358);
        assert_eq!(input.wac, dec!(0.065));
        assert_eq!(input.pass_thru_cpn, dec!(0.060));
        assert_eq!(input.servicing_fee, dec!(0.0025));
        assert_eq!(input.original_balance, dec!(249_500));
    }

    #[test]
    fn test_amort_type_names() {
        let loan: AmortizationType = serde_json::from_str("\"ARM\"").unwrap();
        assert_eq!(loan, AmortizationType::Arm);
        let loan: AmortizationType = serde_json::from_str("\"fixed\"").unwrap();
        assert_eq!(loan, AmortizationType::Fixed);
        assert!(serde_json::from_str::<AmortizationType>("\"balloon\"").is_err());
    }

    #[test]
    fn test_fully_aged_loan_rejected() {
        let mut loan = sample_loan();
        loan.age = 360;
        assert!(loan.to_waterfall_input(PsaSpeed::default(), "6").is_err());
    }

    #[test]
    fn test_implied_loan_count() {
        let mut loan = sample_loan();
        loan.average_loan_size = dec!(124_750);
        assert_eq!(loan.implied_loan_count().unwrap(), dec!(2));
    }
}
