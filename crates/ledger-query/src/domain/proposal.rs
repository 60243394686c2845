//! # Endorsement Results
//!
//! Per-endorser results of a transaction proposal, and the tagged outcome
//! they are classified into before normalization.

use serde::{Deserialize, Serialize};

/// Error object returned in place of an endorsement.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndorserFault {
    /// Raw error text. Chaincode errors often carry a JSON document
    /// `{"status": <code>, "msg": <text>}` here.
    pub message: String,
    /// Peer that produced the error, when known.
    #[serde(default)]
    pub peer: Option<String>,
}

impl EndorserFault {
    /// Create a fault with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            peer: None,
        }
    }
}

/// Chaincode response inside an endorsement.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseBody {
    /// Chaincode status (200 on success).
    pub status: i32,
    /// Chaincode message.
    #[serde(default)]
    pub message: String,
    /// Raw payload bytes.
    #[serde(default)]
    pub payload: Option<Vec<u8>>,
}

/// A successful endorsement.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposalResponse {
    /// Chaincode response, absent when the peer sent none.
    #[serde(default)]
    pub response: Option<ResponseBody>,
}

impl ProposalResponse {
    /// Endorsement carrying a payload.
    pub fn with_payload(status: i32, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            response: Some(ResponseBody {
                status,
                message: String::new(),
                payload: Some(payload.into()),
            }),
        }
    }
}

/// Result of one endorsing peer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EndorserResponse {
    /// The peer (or the transport to it) failed.
    Error(EndorserFault),
    /// The peer endorsed the proposal.
    Response(ProposalResponse),
}

/// Raw result of `send_transaction_proposal`: `None` when the client
/// produced no result sequence at all.
pub type RawProposalResult = Option<Vec<EndorserResponse>>;

/// Tagged classification of a raw proposal result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProposalOutcome {
    /// No result sequence.
    Empty,
    /// First endorser returned an error.
    EndorserError(EndorserFault),
    /// First endorser returned a payload.
    PayloadSuccess {
        /// Chaincode status.
        status: i32,
        /// Raw payload bytes.
        payload: Vec<u8>,
    },
    /// Anything else: empty sequence, missing response or payload.
    Unknown,
}
