//! # Ledger Query Service
//!
//! Application service behind the [`LedgerQueryApi`] port. Each operation
//! resolves a session, issues one read-only call, routes the raw result
//! through the normalizer or the crawler, and reports a request count,
//! a duration observation and (on failure) an error count.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use super::session::SessionCache;
use crate::algorithms::{self, normalize};
use crate::config::LedgerQueryConfig;
use crate::domain::{
    BlockLocator, ChainInfo, ChaincodeKind, ChaincodeQuery, CrawledBlock, LedgerQueryError,
    ProcessedTransaction, ProposalRequest, QueryLabels, QueryResult, RawBlock, RequestIdentity,
};
use crate::ports::{LedgerNetwork, LedgerQueryApi, MetricsSink};

/// Counter incremented once per facade call.
pub const REQUESTS_TOTAL: &str = "ledger_query_requests_total";

/// Counter incremented once per failed facade call.
pub const ERRORS_TOTAL: &str = "ledger_query_errors_total";

/// Histogram of facade call durations.
pub const DURATION_SECONDS: &str = "ledger_query_duration_seconds";

/// Ledger Query Service - the read-side facade.
pub struct LedgerQueryService {
    sessions: Arc<SessionCache>,
    metrics: Arc<dyn MetricsSink>,
}

impl LedgerQueryService {
    /// Create a service with its own session cache.
    pub fn new(
        config: LedgerQueryConfig,
        network: Arc<dyn LedgerNetwork>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let sessions = Arc::new(SessionCache::new(Arc::new(config), network));
        Self::with_sessions(sessions, metrics)
    }

    /// Create a service sharing an existing session cache.
    pub fn with_sessions(sessions: Arc<SessionCache>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { sessions, metrics }
    }

    /// Session cache used by this service.
    pub fn sessions(&self) -> &Arc<SessionCache> {
        &self.sessions
    }

    /// Time one facade call and record its metrics. `failure` describes
    /// the outcome when it counts as an error.
    async fn measure<T, F, P>(&self, labels: &QueryLabels, call: F, failure: P) -> T
    where
        F: Future<Output = T> + Send,
        P: Fn(&T) -> Option<String> + Send,
    {
        let start = Instant::now();
        self.metrics.increment(REQUESTS_TOTAL);

        let outcome = call.await;

        self.metrics
            .observe(DURATION_SECONDS, labels, start.elapsed().as_secs_f64());

        if let Some(reason) = failure(&outcome) {
            self.metrics.increment(ERRORS_TOTAL);
            tracing::warn!(
                function = %labels.function,
                channel = labels.channel.as_deref().unwrap_or(""),
                chaincode = labels.chaincode.as_deref().unwrap_or(""),
                "Ledger query failed: {}",
                reason
            );
        }
        outcome
    }

    async fn instrument<T, F>(&self, labels: QueryLabels, call: F) -> Result<T, LedgerQueryError>
    where
        F: Future<Output = Result<T, LedgerQueryError>> + Send,
    {
        self.measure(&labels, call, |result| {
            result
                .as_ref()
                .err()
                .map(|e| format!("[{}] {}", e.kind(), e))
        })
        .await
    }

    async fn evaluate(
        &self,
        identity: &RequestIdentity,
        query: &ChaincodeQuery,
    ) -> Result<QueryResult, LedgerQueryError> {
        let handle = self
            .sessions
            .resolve_channel(identity, &query.channel, false)
            .await?;

        let targets = if query.targets.is_empty() {
            self.sessions
                .config()
                .org_profile(&identity.org_name)?
                .peers
                .clone()
        } else {
            query.targets.clone()
        };

        let request = ProposalRequest {
            targets,
            chaincode_id: query.chaincode.clone(),
            fcn: query.function.clone(),
            args: query.args.clone(),
            channel_id: query.channel.clone(),
            tx_id: handle.client().client().new_transaction_id(),
        };

        tracing::debug!(
            channel = %request.channel_id,
            chaincode = %request.chaincode_id,
            function = %request.fcn,
            tx_id = %request.tx_id,
            "Sending query proposal"
        );

        let raw = handle.channel().send_transaction_proposal(request).await?;
        Ok(normalize(raw.as_deref()))
    }

    async fn fetch_block(
        &self,
        identity: &RequestIdentity,
        channel: &str,
        locator: &BlockLocator,
    ) -> Result<RawBlock, LedgerQueryError> {
        let handle = self.sessions.resolve_channel(identity, channel, false).await?;
        tracing::debug!(channel, block = %locator, "Querying block");
        match locator {
            BlockLocator::Number(number) => handle.channel().query_block(*number).await,
            BlockLocator::Hash(hash) => handle.channel().query_block_by_hash(hash).await,
        }
    }
}

#[async_trait]
impl LedgerQueryApi for LedgerQueryService {
    async fn query_chaincode(&self, identity: &RequestIdentity, query: &ChaincodeQuery) -> QueryResult {
        let call = async {
            self.evaluate(identity, query)
                .await
                .unwrap_or_else(QueryResult::from)
        };
        self.measure(&QueryLabels::chaincode(query), call, |result| {
            (!result.is_success())
                .then(|| format!("status {}: {}", result.status_code, result.message))
        })
        .await
    }

    async fn get_block_by_number(
        &self,
        identity: &RequestIdentity,
        channel: &str,
        number: u64,
    ) -> Result<RawBlock, LedgerQueryError> {
        let labels = QueryLabels::operation(Some(channel), "get_block_by_number");
        self.instrument(
            labels,
            self.fetch_block(identity, channel, &BlockLocator::Number(number)),
        )
        .await
    }

    async fn get_block_by_hash(
        &self,
        identity: &RequestIdentity,
        channel: &str,
        hash: &[u8],
    ) -> Result<RawBlock, LedgerQueryError> {
        let labels = QueryLabels::operation(Some(channel), "get_block_by_hash");
        let locator = BlockLocator::Hash(hash.to_vec());
        self.instrument(labels, self.fetch_block(identity, channel, &locator))
            .await
    }

    async fn get_transaction_by_id(
        &self,
        identity: &RequestIdentity,
        channel: &str,
        tx_id: &str,
    ) -> Result<ProcessedTransaction, LedgerQueryError> {
        let labels = QueryLabels::operation(Some(channel), "get_transaction_by_id");
        self.instrument(labels, async {
            let handle = self.sessions.resolve_channel(identity, channel, false).await?;
            tracing::debug!(channel, tx_id, "Querying transaction");
            handle.channel().query_transaction(tx_id).await
        })
        .await
    }

    async fn get_channel_info(
        &self,
        identity: &RequestIdentity,
        channel: &str,
    ) -> Result<ChainInfo, LedgerQueryError> {
        let labels = QueryLabels::operation(Some(channel), "get_channel_info");
        self.instrument(labels, async {
            let handle = self.sessions.resolve_channel(identity, channel, false).await?;
            tracing::debug!(channel, "Querying channel info");
            handle.channel().query_info().await
        })
        .await
    }

    async fn get_chaincodes(
        &self,
        identity: &RequestIdentity,
        channel: &str,
        kind: ChaincodeKind,
    ) -> Result<Vec<String>, LedgerQueryError> {
        let labels = QueryLabels::operation(Some(channel), "get_chaincodes");
        self.instrument(labels, async {
            let chaincodes = match kind {
                ChaincodeKind::Installed => {
                    // Peer-level inventory is an admin query.
                    let org = self.sessions.config().org_profile(&identity.org_name)?;
                    let target = org.first_peer()?.to_string();
                    let admin = RequestIdentity::new(identity.org_name.clone(), org.admin_user.clone());
                    let handle = self.sessions.resolve_client(&admin, false).await?;
                    tracing::debug!(target = %target, user = %org.admin_user, "Querying installed chaincodes");
                    handle.client().query_installed_chaincodes(&target, true).await?
                }
                ChaincodeKind::Instantiated => {
                    let handle = self.sessions.resolve_channel(identity, channel, false).await?;
                    tracing::debug!(channel, "Querying instantiated chaincodes");
                    handle.channel().query_instantiated_chaincodes().await?
                }
            };
            Ok(chaincodes.iter().map(|c| c.descriptor()).collect())
        })
        .await
    }

    async fn get_channels(&self, identity: &RequestIdentity) -> Result<Vec<String>, LedgerQueryError> {
        let labels = QueryLabels::operation(None, "get_channels");
        self.instrument(labels, async {
            let handle = self.sessions.resolve_client(identity, false).await?;
            let target = self
                .sessions
                .config()
                .org_profile(&identity.org_name)?
                .first_peer()?
                .to_string();
            tracing::debug!(target = %target, "Querying joined channels");
            handle.client().query_channels(&target).await
        })
        .await
    }

    async fn crawl_block(
        &self,
        identity: &RequestIdentity,
        channel: &str,
        locator: &BlockLocator,
    ) -> Result<Option<CrawledBlock>, LedgerQueryError> {
        let labels = QueryLabels::operation(Some(channel), "crawl_block");
        self.instrument(labels, async {
            let raw = self.fetch_block(identity, channel, locator).await?;
            algorithms::crawl_block(&raw)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ChaincodeInfo, EndorserFault, EndorserResponse, ProposalResponse, RawBlockData,
        RawBlockHeader, RawBlockMetadata,
    };
    use crate::ports::{MockLedgerNetwork, RecordingMetricsSink};
    use serde_json::json;

    fn create_test_service(
        network: MockLedgerNetwork,
    ) -> (LedgerQueryService, Arc<RecordingMetricsSink>) {
        let metrics = Arc::new(RecordingMetricsSink::default());
        let service = LedgerQueryService::new(
            LedgerQueryConfig::for_testing(),
            Arc::new(network),
            metrics.clone(),
        );
        (service, metrics)
    }

    fn identity() -> RequestIdentity {
        RequestIdentity::new("org1", "user1")
    }

    fn mycc_query() -> ChaincodeQuery {
        ChaincodeQuery::new("mychannel", "mycc", "query", vec!["a".to_string()])
    }

    fn block_five(entries: Vec<serde_json::Value>) -> RawBlock {
        RawBlock {
            header: RawBlockHeader {
                number: 5,
                previous_hash: vec![0xAA; 32],
                data_hash: vec![0xBB; 32],
            },
            data: Some(RawBlockData { data: entries }),
            metadata: Some(RawBlockMetadata {
                metadata: vec![json!([]), json!([]), json!([0])],
            }),
        }
    }

    #[tokio::test]
    async fn test_query_chaincode_success() {
        let network = MockLedgerNetwork {
            proposal_result: Some(vec![EndorserResponse::Response(
                ProposalResponse::with_payload(200, br#"{"balance":100}"#.to_vec()),
            )]),
            ..Default::default()
        };
        let (service, metrics) = create_test_service(network.clone());

        let result = service.query_chaincode(&identity(), &mycc_query()).await;
        assert_eq!(result, QueryResult::success(200, json!({"balance": 100})));

        assert_eq!(metrics.count(REQUESTS_TOTAL), 1);
        assert_eq!(metrics.count(ERRORS_TOTAL), 0);
        let observations = metrics.observations();
        assert_eq!(observations[0].1, QueryLabels::chaincode(&mycc_query()));
    }

    #[tokio::test]
    async fn test_query_chaincode_builds_proposal() {
        let network = MockLedgerNetwork::default();
        let (service, _) = create_test_service(network.clone());

        service.query_chaincode(&identity(), &mycc_query()).await;
        let mut query = mycc_query();
        query.targets = vec!["peer1.org1".to_string()];
        service.query_chaincode(&identity(), &query).await;

        let proposals = network.proposals();
        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[0].targets, vec!["peer0.org1".to_string()]);
        assert_eq!(proposals[0].fcn, "query");
        assert_eq!(proposals[0].args, vec!["a".to_string()]);
        assert!(!proposals[0].tx_id.is_empty());
        assert_ne!(proposals[0].tx_id, proposals[1].tx_id);
        assert_eq!(proposals[1].targets, vec!["peer1.org1".to_string()]);
    }

    #[tokio::test]
    async fn test_query_chaincode_nested_error() {
        let network = MockLedgerNetwork {
            proposal_result: Some(vec![EndorserResponse::Error(EndorserFault::new(
                r#"{"status":500,"msg":"not found"}"#,
            ))]),
            ..Default::default()
        };
        let (service, metrics) = create_test_service(network);

        let result = service.query_chaincode(&identity(), &mycc_query()).await;
        assert_eq!(result, QueryResult::failure(500, "not found", "not found"));
        assert_eq!(metrics.count(ERRORS_TOTAL), 1);
    }

    #[tokio::test]
    async fn test_query_chaincode_missing_channel() {
        let (service, _) = create_test_service(MockLedgerNetwork::default());
        let query = ChaincodeQuery::new("ghost", "mycc", "query", vec![]);

        let result = service.query_chaincode(&identity(), &query).await;
        assert_eq!(result.status_code, 202);
        assert!(result.message.contains("ghost"));
        assert!(result.payload.is_none());
    }

    #[tokio::test]
    async fn test_query_chaincode_network_failure() {
        let network = MockLedgerNetwork {
            should_fail: true,
            ..Default::default()
        };
        let (service, _) = create_test_service(network);

        let result = service.query_chaincode(&identity(), &mycc_query()).await;
        assert_eq!(result.status_code, 500);
        assert_eq!(result.detail, "network");
    }

    #[tokio::test]
    async fn test_block_by_number_and_hash() {
        let block = block_five(vec![]);
        let network = MockLedgerNetwork {
            blocks: vec![block.clone()],
            ..Default::default()
        };
        let (service, metrics) = create_test_service(network);

        let by_number = service
            .get_block_by_number(&identity(), "mychannel", 5)
            .await
            .unwrap();
        assert_eq!(by_number, block);

        let hash = algorithms::compute_block_hash(5, &[0xAA; 32], &[0xBB; 32]).unwrap();
        let by_hash = service
            .get_block_by_hash(&identity(), "mychannel", &hash)
            .await
            .unwrap();
        assert_eq!(by_hash, block);
        assert_eq!(metrics.count(REQUESTS_TOTAL), 2);
    }

    #[tokio::test]
    async fn test_missing_block_counts_error() {
        let (service, metrics) = create_test_service(MockLedgerNetwork::default());

        let err = service
            .get_block_by_number(&identity(), "mychannel", 99)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerQueryError::EmptyResult(_)));
        assert_eq!(metrics.count(ERRORS_TOTAL), 1);
        assert_eq!(metrics.observations()[0].1.function, "get_block_by_number");
    }

    #[tokio::test]
    async fn test_chaincodes_by_kind() {
        let info = |name: &str| ChaincodeInfo {
            name: name.to_string(),
            version: "1.0".to_string(),
            path: format!("github.com/{}", name),
        };
        let network = MockLedgerNetwork {
            installed: vec![info("mycc"), info("othercc")],
            instantiated: vec![info("mycc")],
            ..Default::default()
        };
        let (service, _) = create_test_service(network);

        let installed = service
            .get_chaincodes(&identity(), "mychannel", ChaincodeKind::from_type_param("installed"))
            .await
            .unwrap();
        assert_eq!(installed.len(), 2);

        let instantiated = service
            .get_chaincodes(&identity(), "mychannel", ChaincodeKind::Instantiated)
            .await
            .unwrap();
        assert_eq!(
            instantiated,
            vec!["name: mycc, version: 1.0, path: github.com/mycc".to_string()]
        );
    }

    #[tokio::test]
    async fn test_installed_chaincodes_run_as_admin() {
        let network = MockLedgerNetwork::default();
        let (service, _) = create_test_service(network.clone());

        service
            .get_chaincodes(&identity(), "mychannel", ChaincodeKind::Installed)
            .await
            .unwrap();
        assert_eq!(service.sessions().len(), 1);

        let admin = service
            .sessions()
            .resolve_client(&RequestIdentity::new("org1", "admin"), false)
            .await
            .unwrap();
        assert_eq!(admin.user().name, "admin");
        assert_eq!(network.builds(), 1);
    }

    #[tokio::test]
    async fn test_request_timeout_handed_to_network_client() {
        let network = MockLedgerNetwork {
            proposal_result: Some(vec![EndorserResponse::Response(
                ProposalResponse::with_payload(200, br#"{"balance":100}"#.to_vec()),
            )]),
            ..Default::default()
        };
        let (service, metrics) = create_test_service(network.clone());

        let result = service.query_chaincode(&identity(), &mycc_query()).await;
        assert!(result.is_success());

        let profiles = network.network_profiles();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].request_timeout_secs, 5);
        assert_eq!(metrics.count(REQUESTS_TOTAL), 1);
        assert_eq!(metrics.count(ERRORS_TOTAL), 0);
    }

    #[tokio::test]
    async fn test_get_channels_and_info() {
        let network = MockLedgerNetwork {
            blocks: vec![block_five(vec![])],
            ..Default::default()
        };
        let (service, _) = create_test_service(network);

        let channels = service.get_channels(&identity()).await.unwrap();
        assert_eq!(channels, vec!["mychannel".to_string()]);

        let info = service.get_channel_info(&identity(), "mychannel").await.unwrap();
        assert_eq!(info.height, 6);
    }

    #[tokio::test]
    async fn test_crawl_block_without_transactions() {
        let network = MockLedgerNetwork {
            blocks: vec![block_five(vec![])],
            ..Default::default()
        };
        let (service, _) = create_test_service(network);

        let crawled = service
            .crawl_block(&identity(), "mychannel", &BlockLocator::Number(5))
            .await
            .unwrap();
        assert!(crawled.is_none());
    }

    #[tokio::test]
    async fn test_transaction_lookup() {
        let mut network = MockLedgerNetwork::default();
        network.transactions.insert(
            "tx-1".to_string(),
            ProcessedTransaction {
                validation_code: 0,
                transaction_envelope: json!({"payload": {}}),
            },
        );
        let (service, _) = create_test_service(network);

        let tx = service
            .get_transaction_by_id(&identity(), "mychannel", "tx-1")
            .await
            .unwrap();
        assert_eq!(tx.validation_code, 0);
        assert!(service
            .get_transaction_by_id(&identity(), "mychannel", "tx-2")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_session_shared_across_operations() {
        let network = MockLedgerNetwork {
            blocks: vec![block_five(vec![])],
            ..Default::default()
        };
        let (service, _) = create_test_service(network.clone());

        service.query_chaincode(&identity(), &mycc_query()).await;
        service.get_channel_info(&identity(), "mychannel").await.unwrap();
        service.get_channels(&identity()).await.unwrap();

        assert_eq!(network.builds(), 1);
        assert_eq!(service.sessions().len(), 1);
    }
}
