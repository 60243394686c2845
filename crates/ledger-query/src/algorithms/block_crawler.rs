//! # Block Crawler
//!
//! Turns a raw block into a [`CrawledBlock`]: header hash recomputed from
//! the header fields, one [`TransactionRecord`] per data entry (in block
//! order), and the last metadata entry as the terminal validation code.
//!
//! Envelope layout read per entry:
//!
//! ```text
//! payload.header.channel_header.{timestamp, channel_id, tx_id, type, typeString}
//! payload.data.actions[0].payload.action
//!        .proposal_response_payload.extension.results.ns_rwset
//! ```

use serde_json::Value;

use super::block_hash::hash_raw_header;
use crate::domain::{
    CrawledBlock, LedgerQueryError, RawBlock, ReadWriteSet, TransactionRecord,
};

const CHANNEL_HEADER: &str = "/payload/header/channel_header";
const ACTIONS: &str = "/payload/data/actions";
const ACTION_RESULTS: &str = "/payload/action/proposal_response_payload/extension/results";

/// Human readable name of a numeric channel header type.
pub fn header_type_name(kind: i64) -> String {
    let name = match kind {
        0 => "MESSAGE",
        1 => "CONFIG",
        2 => "CONFIG_UPDATE",
        3 => "ENDORSER_TRANSACTION",
        4 => "ORDERER_TRANSACTION",
        5 => "DELIVER_SEEK_INFO",
        6 => "CHAINCODE_PACKAGE",
        8 => "PEER_ADMIN_OPERATION",
        other => return format!("UNKNOWN({})", other),
    };
    name.to_string()
}

/// Crawl a raw block.
///
/// Returns `Ok(None)` when the data section is absent or holds no entries.
///
/// # Errors
/// - `MalformedResponse` if an entry lacks its channel header, an action
///   lacks its endorsement results, a read/write set does not decode, or
///   the metadata array is absent or empty
/// - `Encoding` if the header cannot be DER encoded
pub fn crawl_block(raw: &RawBlock) -> Result<Option<CrawledBlock>, LedgerQueryError> {
    let entries = match raw.data.as_ref() {
        Some(data) if !data.data.is_empty() => &data.data,
        _ => {
            tracing::debug!(block = raw.header.number, "Block has no data section");
            return Ok(None);
        }
    };

    let header = hash_raw_header(&raw.header)?;

    let transactions = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| extract_transaction(index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    let last_transaction_status_code = raw
        .metadata
        .as_ref()
        .and_then(|m| m.metadata.last())
        .cloned()
        .ok_or_else(|| {
            LedgerQueryError::MalformedResponse(format!(
                "block {}: metadata array is absent or empty",
                raw.header.number
            ))
        })?;

    tracing::debug!(
        block = header.number,
        transactions = transactions.len(),
        hash = %hex::encode(header.computed_block_hash),
        "Block crawled"
    );

    Ok(Some(CrawledBlock {
        header,
        transactions,
        last_transaction_status_code,
    }))
}

/// Extract one transaction record from a data entry.
pub fn extract_transaction(index: usize, entry: &Value) -> Result<TransactionRecord, LedgerQueryError> {
    let channel_header = entry.pointer(CHANNEL_HEADER).ok_or_else(|| {
        LedgerQueryError::MalformedResponse(format!("transaction {}: channel header missing", index))
    })?;

    Ok(TransactionRecord {
        timestamp: text_field(channel_header, "timestamp"),
        channel_id: text_field(channel_header, "channel_id"),
        tx_id: text_field(channel_header, "tx_id"),
        tx_type: type_label(channel_header),
        ns_read_write_sets: extract_rw_sets(index, entry)?,
    })
}

/// Read/write sets of the first chaincode action; empty without actions.
fn extract_rw_sets(index: usize, entry: &Value) -> Result<Vec<ReadWriteSet>, LedgerQueryError> {
    let Some(action) = entry
        .pointer(ACTIONS)
        .and_then(Value::as_array)
        .and_then(|actions| actions.first())
    else {
        return Ok(Vec::new());
    };

    let results = action.pointer(ACTION_RESULTS).ok_or_else(|| {
        LedgerQueryError::MalformedResponse(format!(
            "transaction {}: action without endorsement results",
            index
        ))
    })?;

    match results.get("ns_rwset") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(sets) => serde_json::from_value(sets.clone()).map_err(|e| {
            LedgerQueryError::MalformedResponse(format!(
                "transaction {}: undecodable read/write set: {}",
                index, e
            ))
        }),
    }
}

/// Scalar field rendered as text; missing fields read as empty.
fn text_field(object: &Value, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn type_label(channel_header: &Value) -> String {
    if let Some(label) = channel_header.get("typeString").and_then(Value::as_str) {
        return label.to_string();
    }
    match channel_header.get("type") {
        Some(Value::Number(n)) => n
            .as_i64()
            .map(header_type_name)
            .unwrap_or_else(|| format!("UNKNOWN({})", n)),
        Some(Value::String(s)) => match s.parse::<i64>() {
            Ok(kind) => header_type_name(kind),
            Err(_) => s.clone(),
        },
        _ => "UNKNOWN".to_string(),
    }
}
