//! # Inbound Ports
//!
//! API trait defining the read operations the query facade offers.

use async_trait::async_trait;

use crate::domain::{
    BlockLocator, ChainInfo, ChaincodeKind, ChaincodeQuery, CrawledBlock, LedgerQueryError,
    ProcessedTransaction, QueryResult, RawBlock, RequestIdentity,
};

/// Ledger Query API - inbound port.
///
/// Every operation runs as `identity`. Failures are values: chaincode
/// queries fold them into the [`QueryResult`], inspection operations
/// return a [`LedgerQueryError`].
#[async_trait]
pub trait LedgerQueryApi: Send + Sync {
    /// Evaluate a read-only chaincode function.
    async fn query_chaincode(&self, identity: &RequestIdentity, query: &ChaincodeQuery) -> QueryResult;

    /// Raw block by number.
    async fn get_block_by_number(
        &self,
        identity: &RequestIdentity,
        channel: &str,
        number: u64,
    ) -> Result<RawBlock, LedgerQueryError>;

    /// Raw block by header hash.
    async fn get_block_by_hash(
        &self,
        identity: &RequestIdentity,
        channel: &str,
        hash: &[u8],
    ) -> Result<RawBlock, LedgerQueryError>;

    /// Processed transaction by id.
    async fn get_transaction_by_id(
        &self,
        identity: &RequestIdentity,
        channel: &str,
        tx_id: &str,
    ) -> Result<ProcessedTransaction, LedgerQueryError>;

    /// Channel height and tip hashes.
    async fn get_channel_info(
        &self,
        identity: &RequestIdentity,
        channel: &str,
    ) -> Result<ChainInfo, LedgerQueryError>;

    /// Installed or instantiated chaincodes as `"name: …, version: …, path: …"`.
    async fn get_chaincodes(
        &self,
        identity: &RequestIdentity,
        channel: &str,
        kind: ChaincodeKind,
    ) -> Result<Vec<String>, LedgerQueryError>;

    /// Channels joined by the organization's first peer.
    async fn get_channels(&self, identity: &RequestIdentity) -> Result<Vec<String>, LedgerQueryError>;

    /// Fetch a block and crawl it. `Ok(None)` for a block without data.
    async fn crawl_block(
        &self,
        identity: &RequestIdentity,
        channel: &str,
        locator: &BlockLocator,
    ) -> Result<Option<CrawledBlock>, LedgerQueryError>;
}
