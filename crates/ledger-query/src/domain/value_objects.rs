//! # Domain Value Objects
//!
//! Immutable request/response types of the query facade.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::errors::{LedgerQueryError, STATUS_SUCCESS};

/// Uniform result of a chaincode query.
///
/// `status_code == 200` iff the query succeeded, in which case `payload`
/// holds the decoded application data. Any other code leaves `payload`
/// empty and describes the failure in `message`/`detail`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Endorser status or taxonomy status code.
    pub status_code: i32,
    /// Decoded payload (JSON value, or JSON string for non-JSON text).
    pub payload: Option<Value>,
    /// Human readable summary.
    pub message: String,
    /// Additional failure detail.
    pub detail: String,
}

impl QueryResult {
    /// Successful result carrying a decoded payload.
    pub fn success(status_code: i32, payload: Value) -> Self {
        Self {
            status_code,
            payload: Some(payload),
            message: "Success".to_string(),
            detail: "Success".to_string(),
        }
    }

    /// Failed result with no payload.
    pub fn failure(status_code: i32, message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status_code,
            payload: None,
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// Failure tuple for a typed error.
    pub fn from_error(err: &LedgerQueryError) -> Self {
        match err {
            LedgerQueryError::Endorsement { status, message } => {
                Self::failure(*status, message.clone(), message.clone())
            }
            other => Self::failure(other.status_code(), other.to_string(), other.kind()),
        }
    }

    /// Did the query succeed?
    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_SUCCESS
    }
}

impl From<LedgerQueryError> for QueryResult {
    fn from(err: LedgerQueryError) -> Self {
        Self::from_error(&err)
    }
}

/// Organization + user a request runs as.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RequestIdentity {
    /// Organization name (key into the organization profiles).
    pub org_name: String,
    /// User name; `None` runs with the persisted default user.
    pub user_name: Option<String>,
}

impl RequestIdentity {
    /// Identity for a named user.
    pub fn new(org_name: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            org_name: org_name.into(),
            user_name: Some(user_name.into()),
        }
    }

    /// Identity using the organization's persisted default user.
    pub fn default_user(org_name: impl Into<String>) -> Self {
        Self {
            org_name: org_name.into(),
            user_name: None,
        }
    }
}

/// User credentials loaded from the client's credential store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserContext {
    /// Enrollment name.
    pub name: String,
    /// Membership service provider id.
    pub msp_id: String,
}

/// A read-only chaincode invocation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChaincodeQuery {
    /// Channel to query.
    pub channel: String,
    /// Chaincode name.
    pub chaincode: String,
    /// Chaincode function.
    pub function: String,
    /// String arguments.
    pub args: Vec<String>,
    /// Explicit endorsing peers; empty uses the organization's peers.
    #[serde(default)]
    pub targets: Vec<String>,
}

impl ChaincodeQuery {
    /// Create a query against the organization's default peers.
    pub fn new(
        channel: impl Into<String>,
        chaincode: impl Into<String>,
        function: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            chaincode: chaincode.into(),
            function: function.into(),
            args,
            targets: Vec::new(),
        }
    }
}

/// Proposal handed to the network client.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposalRequest {
    /// Endorsing peers.
    pub targets: Vec<String>,
    /// Chaincode name.
    pub chaincode_id: String,
    /// Chaincode function.
    pub fcn: String,
    /// String arguments.
    pub args: Vec<String>,
    /// Channel name.
    pub channel_id: String,
    /// Transaction id issued by the client.
    pub tx_id: String,
}

/// Which block to fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockLocator {
    /// Block sequence number.
    Number(u64),
    /// Block header hash.
    Hash(Vec<u8>),
}

impl fmt::Display for BlockLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "#{}", n),
            Self::Hash(h) => write!(f, "0x{}", hex::encode(h)),
        }
    }
}

/// Chaincode inventory selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChaincodeKind {
    /// Installed on the peer (queried with the admin identity).
    Installed,
    /// Instantiated on the channel.
    Instantiated,
}

impl ChaincodeKind {
    /// Parse the `type` discriminator: `"installed"` selects installed
    /// chaincodes, any other value selects instantiated ones.
    pub fn from_type_param(value: &str) -> Self {
        if value == "installed" {
            Self::Installed
        } else {
            Self::Instantiated
        }
    }
}

/// Chaincode descriptor as reported by a peer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChaincodeInfo {
    /// Chaincode name.
    pub name: String,
    /// Chaincode version.
    pub version: String,
    /// Source path.
    pub path: String,
}

impl ChaincodeInfo {
    /// Human readable `"name: …, version: …, path: …"` descriptor.
    pub fn descriptor(&self) -> String {
        format!(
            "name: {}, version: {}, path: {}",
            self.name, self.version, self.path
        )
    }
}

/// Channel height and tip hashes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainInfo {
    /// Number of blocks on the channel.
    pub height: u64,
    /// Hash of the tip block.
    #[serde(with = "super::entities::hex_bytes")]
    pub current_block_hash: Vec<u8>,
    /// Hash of the block before the tip.
    #[serde(with = "super::entities::hex_bytes")]
    pub previous_block_hash: Vec<u8>,
}

/// Metric labels for a facade call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryLabels {
    /// Channel name, when the call targets a channel.
    pub channel: Option<String>,
    /// Chaincode name, for chaincode queries.
    pub chaincode: Option<String>,
    /// Facade operation or chaincode function.
    pub function: String,
}

impl QueryLabels {
    /// Labels for a non-chaincode operation.
    pub fn operation(channel: Option<&str>, function: &str) -> Self {
        Self {
            channel: channel.map(str::to_string),
            chaincode: None,
            function: function.to_string(),
        }
    }

    /// Labels for a chaincode query.
    pub fn chaincode(query: &ChaincodeQuery) -> Self {
        Self {
            channel: Some(query.channel.clone()),
            chaincode: Some(query.chaincode.clone()),
            function: query.function.clone(),
        }
    }
}
