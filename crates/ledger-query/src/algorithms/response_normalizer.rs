//! # Response Normalizer
//!
//! Collapses the shapes endorsing peers return (plain error, wrapped JSON
//! error, binary payload, nothing) into one [`QueryResult`].
//!
//! Normalization is total: every input produces a result, nothing panics.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{
    EndorserFault, EndorserResponse, ProposalOutcome, QueryResult, STATUS_ACCEPTED_NO_RESULT,
};

/// Message used when no result sequence was produced.
pub const MSG_RESULTS_MISSING: &str = "payload results missing";

/// Message used when the first result has neither an error nor a payload.
pub const MSG_UNKNOWN_RESULTS: &str = "unknown or missing results";

/// Nested error document some chaincodes put in the error message.
#[derive(Debug, Deserialize)]
struct NestedFault {
    status: i32,
    msg: String,
}

/// Classify a raw proposal result. Only the first endorser is inspected.
pub fn classify(raw: Option<&[EndorserResponse]>) -> ProposalOutcome {
    let Some(responses) = raw else {
        return ProposalOutcome::Empty;
    };

    match responses.first() {
        Some(EndorserResponse::Error(fault)) => ProposalOutcome::EndorserError(fault.clone()),
        Some(EndorserResponse::Response(proposal)) => match &proposal.response {
            Some(body) => match &body.payload {
                Some(payload) => ProposalOutcome::PayloadSuccess {
                    status: body.status,
                    payload: payload.clone(),
                },
                None => ProposalOutcome::Unknown,
            },
            None => ProposalOutcome::Unknown,
        },
        None => ProposalOutcome::Unknown,
    }
}

/// Decode text as JSON, `None` if it is not a JSON document.
pub fn try_parse_json(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Decode payload bytes: UTF-8 (lossy), then JSON if possible, otherwise
/// the text itself as a JSON string.
pub fn decode_payload(payload: &[u8]) -> Value {
    let text = String::from_utf8_lossy(payload);
    try_parse_json(&text).unwrap_or_else(|| Value::String(text.into_owned()))
}

/// Map an endorser error onto a result, unwrapping a nested
/// `{status, msg}` document when present.
fn normalize_fault(fault: &EndorserFault) -> QueryResult {
    match serde_json::from_str::<NestedFault>(&fault.message) {
        Ok(nested) => QueryResult::failure(nested.status, nested.msg.clone(), nested.msg),
        Err(_) => QueryResult::failure(
            STATUS_ACCEPTED_NO_RESULT,
            fault.message.clone(),
            fault.message.clone(),
        ),
    }
}

/// Normalize an already classified outcome.
pub fn normalize_outcome(outcome: &ProposalOutcome) -> QueryResult {
    match outcome {
        ProposalOutcome::Empty => {
            QueryResult::failure(STATUS_ACCEPTED_NO_RESULT, MSG_RESULTS_MISSING, "")
        }
        ProposalOutcome::EndorserError(fault) => normalize_fault(fault),
        ProposalOutcome::PayloadSuccess { status, payload } => {
            QueryResult::success(*status, decode_payload(payload))
        }
        ProposalOutcome::Unknown => {
            QueryResult::failure(STATUS_ACCEPTED_NO_RESULT, MSG_UNKNOWN_RESULTS, "")
        }
    }
}

/// Normalize a raw proposal result into a [`QueryResult`].
pub fn normalize(raw: Option<&[EndorserResponse]>) -> QueryResult {
    normalize_outcome(&classify(raw))
}
