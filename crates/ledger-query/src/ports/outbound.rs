//! # Outbound Ports
//!
//! Traits for external dependencies: the ledger network client stack and
//! the metrics backend.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::algorithms::compute_block_hash;
use crate::config::{NetworkProfile, OrgProfile};
use crate::domain::{
    ChainInfo, ChaincodeInfo, LedgerQueryError, ProcessedTransaction, ProposalRequest, QueryLabels,
    RawBlock, RawProposalResult, UserContext,
};

/// Ledger network client factory - outbound port.
#[async_trait]
pub trait LedgerNetwork: Send + Sync {
    /// Build a client handle from the organization and network profiles.
    async fn new_client(
        &self,
        org: &OrgProfile,
        network: &NetworkProfile,
    ) -> Result<Arc<dyn LedgerClient>, LedgerQueryError>;
}

/// A network client bound to one organization.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Open the credential and crypto stores.
    async fn init_credential_stores(&self) -> Result<(), LedgerQueryError>;

    /// Load a named user from the credential store.
    async fn load_user_context(&self, user: &str) -> Result<Option<UserContext>, LedgerQueryError>;

    /// Load the user persisted as the store's default.
    async fn load_persisted_user_context(&self) -> Result<Option<UserContext>, LedgerQueryError>;

    /// Channel handle, `None` when the profile does not define it.
    fn get_channel(&self, name: &str) -> Option<Arc<dyn LedgerChannel>>;

    /// Fresh transaction id for a proposal.
    fn new_transaction_id(&self) -> String;

    /// Chaincodes installed on a peer.
    async fn query_installed_chaincodes(
        &self,
        target: &str,
        use_admin: bool,
    ) -> Result<Vec<ChaincodeInfo>, LedgerQueryError>;

    /// Channels a peer has joined.
    async fn query_channels(&self, target: &str) -> Result<Vec<String>, LedgerQueryError>;
}

/// A channel handle.
#[async_trait]
pub trait LedgerChannel: Send + Sync {
    /// Channel name.
    fn name(&self) -> &str;

    /// Send a read-only proposal to the endorsing peers.
    async fn send_transaction_proposal(
        &self,
        request: ProposalRequest,
    ) -> Result<RawProposalResult, LedgerQueryError>;

    /// Block by number.
    async fn query_block(&self, number: u64) -> Result<RawBlock, LedgerQueryError>;

    /// Block by header hash.
    async fn query_block_by_hash(&self, hash: &[u8]) -> Result<RawBlock, LedgerQueryError>;

    /// Processed transaction by id.
    async fn query_transaction(&self, tx_id: &str) -> Result<ProcessedTransaction, LedgerQueryError>;

    /// Channel height and tip hashes.
    async fn query_info(&self) -> Result<ChainInfo, LedgerQueryError>;

    /// Chaincodes instantiated on the channel.
    async fn query_instantiated_chaincodes(&self) -> Result<Vec<ChaincodeInfo>, LedgerQueryError>;
}

/// Metrics backend - outbound port.
pub trait MetricsSink: Send + Sync {
    /// Increment a named counter.
    fn increment(&self, name: &str);

    /// Record a duration observation.
    fn observe(&self, name: &str, labels: &QueryLabels, seconds: f64);
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Mock ledger network. Clones share the build counter and the proposal log.
#[derive(Clone)]
pub struct MockLedgerNetwork {
    /// Users present in the credential store.
    pub users: Vec<String>,
    /// Persisted default user.
    pub persisted_user: Option<String>,
    /// Channels every client can open.
    pub channels: Vec<String>,
    /// Blocks indexed by number.
    pub blocks: Vec<RawBlock>,
    /// Transactions by id.
    pub transactions: HashMap<String, ProcessedTransaction>,
    /// Result returned for every proposal.
    pub proposal_result: RawProposalResult,
    /// Chaincodes installed on every peer.
    pub installed: Vec<ChaincodeInfo>,
    /// Chaincodes instantiated on every channel.
    pub instantiated: Vec<ChaincodeInfo>,
    /// Should return errors?
    pub should_fail: bool,
    pub builds: Arc<AtomicUsize>,
    pub proposals: Arc<Mutex<Vec<ProposalRequest>>>,
    pub profiles: Arc<Mutex<Vec<NetworkProfile>>>,
}

impl Default for MockLedgerNetwork {
    fn default() -> Self {
        Self {
            users: vec!["admin".to_string(), "user1".to_string()],
            persisted_user: Some("admin".to_string()),
            channels: vec!["mychannel".to_string()],
            blocks: Vec::new(),
            transactions: HashMap::new(),
            proposal_result: None,
            installed: Vec::new(),
            instantiated: Vec::new(),
            should_fail: false,
            builds: Arc::new(AtomicUsize::new(0)),
            proposals: Arc::new(Mutex::new(Vec::new())),
            profiles: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockLedgerNetwork {
    /// Number of clients built so far.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Proposals sent so far, in order.
    pub fn proposals(&self) -> Vec<ProposalRequest> {
        self.proposals.lock().clone()
    }

    /// Network profiles clients were built with, in order.
    pub fn network_profiles(&self) -> Vec<NetworkProfile> {
        self.profiles.lock().clone()
    }

    fn check(&self) -> Result<(), LedgerQueryError> {
        if self.should_fail {
            return Err(LedgerQueryError::Network("Mock failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerNetwork for MockLedgerNetwork {
    async fn new_client(
        &self,
        org: &OrgProfile,
        network: &NetworkProfile,
    ) -> Result<Arc<dyn LedgerClient>, LedgerQueryError> {
        self.check()?;
        self.builds.fetch_add(1, Ordering::SeqCst);
        self.profiles.lock().push(network.clone());

        let state = Arc::new(self.clone());
        let channels = self
            .channels
            .iter()
            .filter(|name| network.channels.is_empty() || network.channels.contains(name))
            .map(|name| {
                let channel: Arc<dyn LedgerChannel> = Arc::new(MockLedgerChannel {
                    name: name.clone(),
                    state: state.clone(),
                });
                (name.clone(), channel)
            })
            .collect();

        Ok(Arc::new(MockLedgerClient {
            msp_id: org.msp_id.clone(),
            state,
            channels,
        }))
    }
}

/// Client handle built by [`MockLedgerNetwork`].
pub struct MockLedgerClient {
    msp_id: String,
    state: Arc<MockLedgerNetwork>,
    channels: HashMap<String, Arc<dyn LedgerChannel>>,
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn init_credential_stores(&self) -> Result<(), LedgerQueryError> {
        self.state.check()
    }

    async fn load_user_context(&self, user: &str) -> Result<Option<UserContext>, LedgerQueryError> {
        self.state.check()?;
        Ok(self
            .state
            .users
            .iter()
            .find(|u| u.as_str() == user)
            .map(|name| UserContext {
                name: name.clone(),
                msp_id: self.msp_id.clone(),
            }))
    }

    async fn load_persisted_user_context(&self) -> Result<Option<UserContext>, LedgerQueryError> {
        self.state.check()?;
        Ok(self.state.persisted_user.as_ref().map(|name| UserContext {
            name: name.clone(),
            msp_id: self.msp_id.clone(),
        }))
    }

    fn get_channel(&self, name: &str) -> Option<Arc<dyn LedgerChannel>> {
        self.channels.get(name).cloned()
    }

    fn new_transaction_id(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    async fn query_installed_chaincodes(
        &self,
        _target: &str,
        use_admin: bool,
    ) -> Result<Vec<ChaincodeInfo>, LedgerQueryError> {
        self.state.check()?;
        if !use_admin {
            return Err(LedgerQueryError::Endorsement {
                status: 500,
                message: "access denied: admin identity required".to_string(),
            });
        }
        Ok(self.state.installed.clone())
    }

    async fn query_channels(&self, _target: &str) -> Result<Vec<String>, LedgerQueryError> {
        self.state.check()?;
        Ok(self.state.channels.clone())
    }
}

/// Channel handle built by [`MockLedgerClient`].
pub struct MockLedgerChannel {
    name: String,
    state: Arc<MockLedgerNetwork>,
}

#[async_trait]
impl LedgerChannel for MockLedgerChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_transaction_proposal(
        &self,
        request: ProposalRequest,
    ) -> Result<RawProposalResult, LedgerQueryError> {
        self.state.check()?;
        self.state.proposals.lock().push(request);
        Ok(self.state.proposal_result.clone())
    }

    async fn query_block(&self, number: u64) -> Result<RawBlock, LedgerQueryError> {
        self.state.check()?;
        self.state
            .blocks
            .iter()
            .find(|b| b.header.number == number)
            .cloned()
            .ok_or_else(|| LedgerQueryError::EmptyResult(format!("block #{} not found", number)))
    }

    async fn query_block_by_hash(&self, hash: &[u8]) -> Result<RawBlock, LedgerQueryError> {
        self.state.check()?;
        for block in &self.state.blocks {
            let h = &block.header;
            if compute_block_hash(h.number, &h.previous_hash, &h.data_hash)?.as_slice() == hash {
                return Ok(block.clone());
            }
        }
        Err(LedgerQueryError::EmptyResult(format!(
            "block 0x{} not found",
            hex::encode(hash)
        )))
    }

    async fn query_transaction(&self, tx_id: &str) -> Result<ProcessedTransaction, LedgerQueryError> {
        self.state.check()?;
        self.state
            .transactions
            .get(tx_id)
            .cloned()
            .ok_or_else(|| LedgerQueryError::EmptyResult(format!("transaction {} not found", tx_id)))
    }

    async fn query_info(&self) -> Result<ChainInfo, LedgerQueryError> {
        self.state.check()?;
        let tip = self.state.blocks.iter().max_by_key(|b| b.header.number);
        let (height, current_block_hash, previous_block_hash) = match tip {
            Some(block) => {
                let h = &block.header;
                let hash = compute_block_hash(h.number, &h.previous_hash, &h.data_hash)?;
                (h.number + 1, hash.to_vec(), h.previous_hash.clone())
            }
            None => (0, Vec::new(), Vec::new()),
        };
        Ok(ChainInfo {
            height,
            current_block_hash,
            previous_block_hash,
        })
    }

    async fn query_instantiated_chaincodes(&self) -> Result<Vec<ChaincodeInfo>, LedgerQueryError> {
        self.state.check()?;
        Ok(self.state.instantiated.clone())
    }
}

/// Metrics sink recording every call.
#[derive(Default)]
pub struct RecordingMetricsSink {
    increments: Mutex<Vec<String>>,
    observations: Mutex<Vec<(String, QueryLabels, f64)>>,
}

impl RecordingMetricsSink {
    /// Times a counter was incremented.
    pub fn count(&self, name: &str) -> usize {
        self.increments.lock().iter().filter(|n| n.as_str() == name).count()
    }

    /// Recorded observations, in order.
    pub fn observations(&self) -> Vec<(String, QueryLabels, f64)> {
        self.observations.lock().clone()
    }
}

impl MetricsSink for RecordingMetricsSink {
    fn increment(&self, name: &str) {
        self.increments.lock().push(name.to_string());
    }

    fn observe(&self, name: &str, labels: &QueryLabels, seconds: f64) {
        self.observations
            .lock()
            .push((name.to_string(), labels.clone(), seconds));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerQueryConfig;
    use crate::domain::RawBlockHeader;

    fn profiles() -> (OrgProfile, NetworkProfile) {
        let config = LedgerQueryConfig::for_testing();
        let org = config.org_profile("org1").unwrap().clone();
        (org, config.network)
    }

    #[tokio::test]
    async fn test_mock_counts_builds() {
        let network = MockLedgerNetwork::default();
        let (org, profile) = profiles();

        network.new_client(&org, &profile).await.unwrap();
        network.clone().new_client(&org, &profile).await.unwrap();
        assert_eq!(network.builds(), 2);
    }

    #[tokio::test]
    async fn test_mock_user_contexts() {
        let network = MockLedgerNetwork::default();
        let (org, profile) = profiles();
        let client = network.new_client(&org, &profile).await.unwrap();

        let user = client.load_user_context("user1").await.unwrap().unwrap();
        assert_eq!(user.msp_id, "Org1MSP");
        assert!(client.load_user_context("mallory").await.unwrap().is_none());
        assert_eq!(
            client.load_persisted_user_context().await.unwrap().unwrap().name,
            "admin"
        );
    }

    #[tokio::test]
    async fn test_mock_channel_lookup() {
        let network = MockLedgerNetwork::default();
        let (org, profile) = profiles();
        let client = network.new_client(&org, &profile).await.unwrap();

        let a = client.get_channel("mychannel").unwrap();
        let b = client.get_channel("mychannel").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name(), "mychannel");
        assert!(client.get_channel("ghost").is_none());
    }

    #[tokio::test]
    async fn test_mock_block_by_hash() {
        let header = RawBlockHeader {
            number: 3,
            previous_hash: vec![1; 32],
            data_hash: vec![2; 32],
        };
        let block = RawBlock {
            header: header.clone(),
            data: None,
            metadata: None,
        };
        let network = MockLedgerNetwork {
            blocks: vec![block.clone()],
            ..Default::default()
        };
        let (org, profile) = profiles();
        let channel = network
            .new_client(&org, &profile)
            .await
            .unwrap()
            .get_channel("mychannel")
            .unwrap();

        let hash = compute_block_hash(3, &header.previous_hash, &header.data_hash).unwrap();
        assert_eq!(channel.query_block_by_hash(&hash).await.unwrap(), block);
        assert!(channel.query_block_by_hash(&[0; 32]).await.is_err());

        let info = channel.query_info().await.unwrap();
        assert_eq!(info.height, 4);
        assert_eq!(info.current_block_hash, hash.to_vec());
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let network = MockLedgerNetwork {
            should_fail: true,
            ..Default::default()
        };
        let (org, profile) = profiles();
        assert!(matches!(
            network.new_client(&org, &profile).await,
            Err(LedgerQueryError::Network(_))
        ));
        assert_eq!(network.builds(), 0);
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingMetricsSink::default();
        sink.increment("a");
        sink.increment("a");
        sink.observe("d", &QueryLabels::operation(None, "get_channels"), 0.5);

        assert_eq!(sink.count("a"), 2);
        assert_eq!(sink.count("b"), 0);
        assert_eq!(sink.observations().len(), 1);
    }
}
