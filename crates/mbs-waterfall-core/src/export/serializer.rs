use csv::{QuoteStyle, Terminator, WriterBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::WaterfallError;
use crate::types::{Money, Rate};
use crate::WaterfallResult;

/// Fixed header row. The leading spaces on the later columns are part of the
/// published file layout and are kept as-is.
pub const CSV_HEADER: &str = "Month,Beginning Balance,SMM, Mortgage Payments, Net Interest, \
Scheduled Principal, Prepayments, Total Principal, Cash Flow";

/// Number of columns in every exported row.
const COLUMN_COUNT: usize = 9;

/// Period-indexed amortisation schedule. Every sequence carries one entry per
/// element of `periods`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub periods: Vec<u32>,
    pub beginning_balance: Vec<Money>,
    #[serde(rename = "SMM")]
    pub smm: Vec<Rate>,
    pub mortgage_payments: Vec<Money>,
    pub net_interest: Vec<Money>,
    pub scheduled_principal: Vec<Money>,
    pub prepayments: Vec<Money>,
    pub total_principal: Vec<Money>,
    pub cash_flow: Vec<Money>,
}

impl ScheduleRecord {
    /// Number of periods, as defined by `periods`.
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Value columns in export order, after the period column.
    fn value_columns(&self) -> [(&'static str, &[Decimal]); COLUMN_COUNT - 1] {
        [
            ("beginning_balance", self.beginning_balance.as_slice()),
            ("SMM", self.smm.as_slice()),
            ("mortgage_payments", self.mortgage_payments.as_slice()),
            ("net_interest", self.net_interest.as_slice()),
            ("scheduled_principal", self.scheduled_principal.as_slice()),
            ("prepayments", self.prepayments.as_slice()),
            ("total_principal", self.total_principal.as_slice()),
            ("cash_flow", self.cash_flow.as_slice()),
        ]
    }

    /// Check that every column has exactly one entry per period.
    pub fn validate_shape(&self) -> WaterfallResult<()> {
        let expected = self.periods.len();
        for (field, column) in self.value_columns() {
            if column.len() != expected {
                return Err(WaterfallError::DataShape {
                    field: field.to_string(),
                    expected,
                    actual: column.len(),
                });
            }
        }
        Ok(())
    }
}

/// Serialise a schedule into CSV text: the fixed header, then one
/// newline-terminated row per period.
pub fn schedule_to_csv(record: &ScheduleRecord) -> WaterfallResult<String> {
    record.validate_shape()?;

    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    wtr.write_record(CSV_HEADER.split(','))?;

    let columns = record.value_columns();
    let mut row: Vec<String> = Vec::with_capacity(COLUMN_COUNT);
    for (i, period) in record.periods.iter().enumerate() {
        row.clear();
        row.push(period.to_string());
        row.extend(columns.iter().map(|(_, col)| format_value(col[i])));
        wtr.write_record(&row)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| WaterfallError::SerializationError(e.to_string()))?;
    let text =
        String::from_utf8(bytes).map_err(|e| WaterfallError::SerializationError(e.to_string()))?;

    tracing::debug!(rows = record.len(), bytes = text.len(), "serialised schedule");
    Ok(text)
}

/// Shortest plain rendering of a value: trailing zeros dropped, no exponent.
fn format_value(value: Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn two_period_record() -> ScheduleRecord {
        ScheduleRecord {
            periods: vec![1, 2],
            beginning_balance: vec![dec!(1000), dec!(950)],
            smm: vec![dec!(0.01), dec!(0.01)],
            mortgage_payments: vec![dec!(50), dec!(49)],
            net_interest: vec![dec!(5), dec!(4.75)],
            scheduled_principal: vec![dec!(45), dec!(44)],
            prepayments: vec![dec!(0), dec!(0)],
            total_principal: vec![dec!(45), dec!(44)],
            cash_flow: vec![dec!(50), dec!(49)],
        }
    }

    #[test]
    fn test_two_period_scenario_exact() {
        let csv = schedule_to_csv(&two_period_record()).unwrap();
        let expected = format!(
            "{}\n1,1000,0.01,50,5,45,0,45,50\n2,950,0.01,49,4.75,44,0,44,49\n",
            CSV_HEADER
        );
        assert_eq!(csv, expected);
    }

    #[test]
    fn test_header_literal() {
        assert_eq!(
            CSV_HEADER,
            "Month,Beginning Balance,SMM, Mortgage Payments, Net Interest, Scheduled Principal, Prepayments, Total Principal, Cash Flow"
        );
    }

    #[test]
    fn test_empty_record_is_header_only() {
        let csv = schedule_to_csv(&ScheduleRecord::default()).unwrap();
        assert_eq!(csv, format!("{}\n", CSV_HEADER));
    }

    #[test]
    fn test_line_and_field_counts() {
        let csv = schedule_to_csv(&two_period_record()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in &lines[1..] {
            assert_eq!(line.split(',').count(), 9);
        }
    }

    #[test]
    fn test_trailing_zeros_dropped() {
        let mut record = two_period_record();
        record.net_interest = vec![dec!(5.000), dec!(4.7500)];
        let csv = schedule_to_csv(&record).unwrap();
        assert!(csv.contains("\n1,1000,0.01,50,5,45,0,45,50\n"));
        assert!(csv.contains("\n2,950,0.01,49,4.75,44,0,44,49\n"));
    }

    #[test]
    fn test_short_column_is_data_shape_error() {
        let mut record = two_period_record();
        record.cash_flow.pop();
        match schedule_to_csv(&record) {
            Err(WaterfallError::DataShape {
                field,
                expected,
                actual,
            }) => {
                assert_eq!(field, "cash_flow");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("Expected DataShape error, got {other:?}"),
        }
    }

    #[test]
    fn test_long_column_is_data_shape_error() {
        let mut record = two_period_record();
        record.smm.push(dec!(0.02));
        assert!(matches!(
            schedule_to_csv(&record),
            Err(WaterfallError::DataShape { .. })
        ));
    }

    #[test]
    fn test_smm_json_key_is_upper_case() {
        let json = r#"{
            "periods": [1],
            "beginning_balance": [100],
            "SMM": [0.5],
            "mortgage_payments": [10],
            "net_interest": [1],
            "scheduled_principal": [9],
            "prepayments": [45.5],
            "total_principal": [54.5],
            "cash_flow": [55.5]
        }"#;
        let record: ScheduleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.smm, vec![dec!(0.5)]);
        let csv = schedule_to_csv(&record).unwrap();
        assert!(csv.ends_with("\n1,100,0.5,10,1,9,45.5,54.5,55.5\n"));
    }

    #[test]
    fn test_negative_values_render_plainly() {
        let mut record = two_period_record();
        record.cash_flow = vec![dec!(-12.50), dec!(0.000)];
        let csv = schedule_to_csv(&record).unwrap();
        assert!(csv.contains(",-12.5\n"));
        assert!(csv.ends_with(",0\n"));
    }
}
