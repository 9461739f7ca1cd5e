use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;

use super::rates::cpr_to_smm;
use crate::error::WaterfallError;
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::WaterfallResult;

/// Curve description equivalent to 100% PSA.
pub const PSA_DESCRIPTION: &str = ".2 ramp 6 for 30, 6";

/// Base term of a curve; an open-ended segment runs this many months past
/// the month it starts in.
const CURVE_HORIZON: usize = 360;

/// Longest curve a description may expand to.
pub const MAX_CURVE_MONTHS: usize = 10 * CURVE_HORIZON;

const PERCENT: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

/// CPR curve request: a text description and a speed multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CprCurveInput {
    /// Segments such as `.2 ramp 6 for 30, 6`. Values are CPR percentages.
    pub description: String,
    /// Multiplier on every CPR (1.5 = 150% of the described curve).
    pub speed_multiplier: Decimal,
}

impl Default for CprCurveInput {
    fn default() -> Self {
        Self {
            description: PSA_DESCRIPTION.to_string(),
            speed_multiplier: Decimal::ONE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CprCurveOutput {
    /// Monthly CPR after the multiplier, capped at 100%.
    pub cpr: Vec<Rate>,
    /// Monthly SMM derived from `cpr`.
    pub smm: Vec<Rate>,
    pub months: usize,
}

/// One parsed `<start> [ramp <end>] [for <n>]` segment.
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    start: Rate,
    end: Rate,
    months: Option<usize>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Expand a text description into a monthly CPR curve (as decimals).
///
/// Segments are separated by commas. Each is `<start cpr>`, optionally
/// followed by `ramp <end cpr>` and `for <months>`; CPRs are percentages. A
/// ramp is interpolated linearly with both endpoints included. A segment
/// without `for` that starts in month `m` (1-based) spans `360 + m` months,
/// so the ramp slope does not depend on what follows; callers take the prefix
/// they need. Descriptions expanding past [`MAX_CURVE_MONTHS`] are rejected.
pub fn cpr_curve_from_description(description: &str) -> WaterfallResult<Vec<Rate>> {
    let segments = description
        .split(',')
        .map(parse_segment)
        .collect::<WaterfallResult<Vec<_>>>()?;

    let mut curve: Vec<Rate> = Vec::with_capacity(CURVE_HORIZON);
    for seg in &segments {
        let months = seg.months.unwrap_or(CURVE_HORIZON + curve.len() + 1);
        if months > MAX_CURVE_MONTHS - curve.len() {
            return Err(WaterfallError::InvalidInput {
                field: "description".into(),
                reason: format!("curve would exceed {MAX_CURVE_MONTHS} months"),
            });
        }
        curve.extend(linspace(seg.start, seg.end, months));
    }
    Ok(curve)
}

/// Build a CPR/SMM curve from a description and speed multiplier.
pub fn build_cpr_curve(input: &CprCurveInput) -> WaterfallResult<ComputationOutput<CprCurveOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.speed_multiplier < Decimal::ZERO {
        return Err(WaterfallError::InvalidInput {
            field: "speed_multiplier".into(),
            reason: "Speed multiplier must be non-negative".into(),
        });
    }

    let base = cpr_curve_from_description(&input.description)?;
    let mut capped = false;
    let cpr: Vec<Rate> = base
        .iter()
        .map(|c| {
            let scaled = c * input.speed_multiplier;
            if scaled > Decimal::ONE {
                capped = true;
                Decimal::ONE
            } else {
                scaled
            }
        })
        .collect();
    let smm: Vec<Rate> = cpr.iter().map(|c| cpr_to_smm(*c)).collect();

    if capped {
        warnings.push("Scaled CPR exceeded 100% in some months and was capped".into());
    }
    if cpr.len() < CURVE_HORIZON {
        warnings.push(format!(
            "Curve covers {} months, shorter than a {}-month term",
            cpr.len(),
            CURVE_HORIZON
        ));
    }

    let output = CprCurveOutput {
        months: cpr.len(),
        cpr,
        smm,
    };
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "CPR curve from segment description",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_segment(text: &str) -> WaterfallResult<Segment> {
    let mut words = text.split_whitespace();

    let start = match words.next() {
        Some(w) => parse_percent(w, text)?,
        None => return Err(segment_error(text, "segment is empty")),
    };
    let mut seg = Segment {
        start,
        end: start,
        months: None,
    };

    while let Some(word) = words.next() {
        let value = words
            .next()
            .ok_or_else(|| segment_error(text, &format!("'{word}' needs a value")))?;
        match word {
            "ramp" => seg.end = parse_percent(value, text)?,
            "for" => seg.months = Some(parse_months(value, text)?),
            other => return Err(segment_error(text, &format!("unexpected keyword '{other}'"))),
        }
    }

    Ok(seg)
}

/// Plain or exponent notation (`6`, `.2`, `6e0`).
fn parse_number(word: &str) -> Option<Decimal> {
    Decimal::from_str(word)
        .or_else(|_| Decimal::from_scientific(word))
        .ok()
}

fn parse_percent(word: &str, segment: &str) -> WaterfallResult<Rate> {
    let pct = parse_number(word)
        .ok_or_else(|| segment_error(segment, &format!("'{word}' is not a number")))?;
    if pct < Decimal::ZERO {
        return Err(segment_error(segment, "CPR cannot be negative"));
    }
    Ok(pct / PERCENT)
}

fn parse_months(word: &str, segment: &str) -> WaterfallResult<usize> {
    parse_number(word)
        .filter(|d| d.fract().is_zero() && *d > Decimal::ZERO)
        .and_then(|d| d.to_usize())
        .ok_or_else(|| {
            segment_error(
                segment,
                &format!("'{word}' is not a positive whole number of months"),
            )
        })
}

fn segment_error(segment: &str, reason: &str) -> WaterfallError {
    WaterfallError::InvalidInput {
        field: "description".into(),
        reason: format!("segment '{}': {}", segment.trim(), reason),
    }
}

/// `n` evenly spaced values from `start` to `end`, both included.
fn linspace(start: Rate, end: Rate, n: usize) -> Vec<Rate> {
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / Decimal::from(n - 1);
    (0..n).map(|k| start + step * Decimal::from(k)).collect()
}
