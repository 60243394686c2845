//! # Ledger Query Configuration
//!
//! Connection profiles for the ledger network and the organizations the
//! client acts for.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::domain::LedgerQueryError;

/// Environment variable naming a JSON profile file.
pub const ENV_PROFILE_PATH: &str = "LQ_PROFILE_PATH";

/// Environment variable overriding the per-call deadline.
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "LQ_REQUEST_TIMEOUT_SECS";

/// A peer endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerEndpoint {
    /// gRPC URL, e.g. `grpcs://peer0.org1.example.com:7051`.
    pub url: String,
    /// TLS server name override.
    #[serde(default)]
    pub server_hostname: Option<String>,
}

/// Network-wide connection profile.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkProfile {
    /// Network name.
    pub name: String,
    /// Channels the client may open.
    pub channels: Vec<String>,
    /// Peers by name.
    pub peers: HashMap<String, PeerEndpoint>,
    /// Per-call deadline handed to the network client.
    pub request_timeout_secs: u64,
}

impl Default for NetworkProfile {
    fn default() -> Self {
        Self {
            name: "ledger-network".to_string(),
            channels: Vec::new(),
            peers: HashMap::new(),
            request_timeout_secs: 30,
        }
    }
}

/// Per-organization connection profile.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrgProfile {
    /// Organization name.
    pub name: String,
    /// Membership service provider id.
    pub msp_id: String,
    /// Peers owned by the organization, in preference order.
    pub peers: Vec<String>,
    /// Directory of the persisted credential store.
    pub credential_store_path: String,
    /// Admin user used for peer-level queries.
    pub admin_user: String,
}

impl OrgProfile {
    /// First configured peer, used for peer-level queries.
    pub fn first_peer(&self) -> Result<&str, LedgerQueryError> {
        self.peers.first().map(String::as_str).ok_or_else(|| {
            LedgerQueryError::Config(format!("organization {} has no peers", self.name))
        })
    }
}

/// Ledger query configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerQueryConfig {
    /// Network connection profile.
    pub network: NetworkProfile,
    /// Organization profiles by name.
    #[serde(default)]
    pub organizations: HashMap<String, OrgProfile>,
}

impl LedgerQueryConfig {
    /// Create a config for testing: one organization, one peer, one channel.
    pub fn for_testing() -> Self {
        let mut peers = HashMap::new();
        peers.insert(
            "peer0.org1".to_string(),
            PeerEndpoint {
                url: "grpc://localhost:7051".to_string(),
                server_hostname: None,
            },
        );

        let mut organizations = HashMap::new();
        organizations.insert(
            "org1".to_string(),
            OrgProfile {
                name: "org1".to_string(),
                msp_id: "Org1MSP".to_string(),
                peers: vec!["peer0.org1".to_string()],
                credential_store_path: "/tmp/ledger-query/org1".to_string(),
                admin_user: "admin".to_string(),
            },
        );

        Self {
            network: NetworkProfile {
                name: "test-network".to_string(),
                channels: vec!["mychannel".to_string()],
                peers,
                request_timeout_secs: 5,
            },
            organizations,
        }
    }

    /// Load a JSON profile file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LedgerQueryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| LedgerQueryError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| LedgerQueryError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Build from the environment: the profile file named by
    /// `LQ_PROFILE_PATH` (defaults when unset), with
    /// `LQ_REQUEST_TIMEOUT_SECS` overriding the deadline.
    pub fn from_env() -> Result<Self, LedgerQueryError> {
        let mut config = match std::env::var(ENV_PROFILE_PATH) {
            Ok(path) => Self::from_json_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(raw) = std::env::var(ENV_REQUEST_TIMEOUT_SECS) {
            config.network.request_timeout_secs = raw.trim().parse().map_err(|_| {
                LedgerQueryError::Config(format!("{} is not a number: {}", ENV_REQUEST_TIMEOUT_SECS, raw))
            })?;
        }

        Ok(config)
    }

    /// Profile of a named organization.
    pub fn org_profile(&self, org: &str) -> Result<&OrgProfile, LedgerQueryError> {
        self.organizations
            .get(org)
            .ok_or_else(|| LedgerQueryError::ProfileNotFound(org.to_string()))
    }
}
