//! # Domain Errors
//!
//! Error taxonomy for ledger queries. Every variant maps onto a
//! `QueryResult` status code so failures can be reported as values.

use thiserror::Error;

/// Hash type alias (32-byte SHA-256)
pub type Hash = [u8; 32];

/// Status code reported when an operation succeeded.
pub const STATUS_SUCCESS: i32 = 200;

/// Status code reported for missing, empty or unusable results.
pub const STATUS_ACCEPTED_NO_RESULT: i32 = 202;

/// Status code reported for client-side infrastructure failures.
pub const STATUS_INTERNAL_ERROR: i32 = 500;

/// Ledger query error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerQueryError {
    /// Named user context absent and no persisted default user exists.
    #[error("Identity not found: user {user} of organization {org}")]
    IdentityNotFound {
        /// Organization name
        org: String,
        /// Requested user name
        user: String,
    },

    /// Requested channel name is unknown to the client profile.
    #[error("Channel not configured: {0}")]
    ChannelNotConfigured(String),

    /// Peer returned a structured endorsement failure.
    #[error("Endorsement failed with status {status}: {message}")]
    Endorsement {
        /// Status reported by the endorser
        status: i32,
        /// Failure message reported by the endorser
        message: String,
    },

    /// Result present but missing expected fields.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// No result sequence, or every entry empty.
    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// Binary or JSON payload failed to decode.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Transport-level failure reported by the ledger network client.
    #[error("Network error: {0}")]
    Network(String),

    /// No connection profile for the requested organization.
    #[error("Organization profile not found: {0}")]
    ProfileNotFound(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Header fields could not be DER encoded.
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl LedgerQueryError {
    /// Status code this error is reported with in a `QueryResult`.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Endorsement { status, .. } => *status,
            Self::Network(_)
            | Self::IdentityNotFound { .. }
            | Self::ProfileNotFound(_)
            | Self::Config(_)
            | Self::Encoding(_) => STATUS_INTERNAL_ERROR,
            Self::ChannelNotConfigured(_)
            | Self::MalformedResponse(_)
            | Self::EmptyResult(_)
            | Self::Decode(_) => STATUS_ACCEPTED_NO_RESULT,
        }
    }

    /// Short, stable name of the variant, used as a log/metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IdentityNotFound { .. } => "identity_not_found",
            Self::ChannelNotConfigured(_) => "channel_not_configured",
            Self::Endorsement { .. } => "endorsement",
            Self::MalformedResponse(_) => "malformed_response",
            Self::EmptyResult(_) => "empty_result",
            Self::Decode(_) => "decode",
            Self::Network(_) => "network",
            Self::ProfileNotFound(_) => "profile_not_found",
            Self::Config(_) => "config",
            Self::Encoding(_) => "encoding",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_not_found_error() {
        let err = LedgerQueryError::IdentityNotFound {
            org: "org1".to_string(),
            user: "alice".to_string(),
        };
        assert!(err.to_string().contains("alice"));
        assert_eq!(err.status_code(), STATUS_INTERNAL_ERROR);
    }

    #[test]
    fn test_channel_not_configured_is_202() {
        let err = LedgerQueryError::ChannelNotConfigured("mychannel".to_string());
        assert!(err.to_string().contains("mychannel"));
        assert_eq!(err.status_code(), STATUS_ACCEPTED_NO_RESULT);
    }

    #[test]
    fn test_endorsement_keeps_peer_status() {
        let err = LedgerQueryError::Endorsement {
            status: 404,
            message: "no such key".to_string(),
        };
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.kind(), "endorsement");
    }

    #[test]
    fn test_malformed_response_error() {
        let err = LedgerQueryError::MalformedResponse("metadata missing".to_string());
        assert!(err.to_string().contains("metadata missing"));
        assert_eq!(err.status_code(), STATUS_ACCEPTED_NO_RESULT);
    }
}
