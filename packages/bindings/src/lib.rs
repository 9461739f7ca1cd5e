use napi::Result as NapiResult;
use napi_derive::napi;

use mbs_waterfall_core::cmo::{self, CmoInput, PacInput};
use mbs_waterfall_core::collateral::{self, PoIoInput, WaterfallInput};
use mbs_waterfall_core::export::{self, ScheduleRecord};
use mbs_waterfall_core::prepayment::{self, CprCurveInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Collateral
// ---------------------------------------------------------------------------

#[napi]
pub fn create_waterfall(input_json: String) -> NapiResult<String> {
    let input: WaterfallInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = collateral::create_waterfall(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn po_io_split(input_json: String) -> NapiResult<String> {
    let input: PoIoInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = collateral::po_io_split(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Serialise a schedule record and return `{filename, mime_type, content}`
/// for the host to save (blob download in a browser, file write in node).
#[napi]
pub fn export_schedule(record_json: String) -> NapiResult<String> {
    let record: ScheduleRecord = serde_json::from_str(&record_json).map_err(to_napi_error)?;
    let payload = export::download_payload(&record).map_err(to_napi_error)?;
    serde_json::to_string(&payload).map_err(to_napi_error)
}

/// Plain CSV text for a schedule record.
#[napi]
pub fn schedule_to_csv(record_json: String) -> NapiResult<String> {
    let record: ScheduleRecord = serde_json::from_str(&record_json).map_err(to_napi_error)?;
    export::schedule_to_csv(&record).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Prepayment
// ---------------------------------------------------------------------------

#[napi]
pub fn cpr_curve(input_json: String) -> NapiResult<String> {
    let input: CprCurveInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = prepayment::build_cpr_curve(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Structuring
// ---------------------------------------------------------------------------

#[napi]
pub fn cmo_waterfall(input_json: String) -> NapiResult<String> {
    let input: CmoInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = cmo::analyze_cmo(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn pac_support(input_json: String) -> NapiResult<String> {
    let input: PacInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = cmo::analyze_pac_support(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
