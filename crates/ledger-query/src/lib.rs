//! # Ledger Query
//!
//! Read-side client for a permissioned, channel-partitioned ledger.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Query endorsing peers (chaincode reads, block and transaction lookups,
//! channel and chaincode inventory) and crawl raw blocks into structured
//! transaction records while recomputing each block header hash locally:
//! - Header hash: SHA-256 over the DER encoding of
//!   `(number, previous_hash, data_hash)`
//! - Read/write sets extracted per transaction, in block order
//! - Every endorsement result collapsed into one [`QueryResult`] shape
//!
//! ## Status Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 200 | Success, `payload` holds decoded data |
//! | 202 | Missing, empty or unusable result |
//! | 500 | Client-side failure (network, identity, configuration) |
//! | other | Status reported by the endorsing chaincode |
//!
//! ## Module Structure
//!
//! ```text
//! ledger-query/
//! ├── domain/          # QueryResult, blocks, transactions, errors
//! ├── algorithms/      # Header hash, block crawler, response normalizer
//! ├── ports/           # API trait (inbound) + network/metrics traits (outbound)
//! ├── adapters/        # Prometheus metrics sink
//! ├── application/     # SessionCache and LedgerQueryService
//! └── config.rs        # LedgerQueryConfig and connection profiles
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::PrometheusMetricsSink;
pub use algorithms::{classify, compute_block_hash, crawl_block, normalize};
pub use application::{ChannelHandle, ClientHandle, LedgerQueryService, SessionCache};
pub use config::{LedgerQueryConfig, NetworkProfile, OrgProfile, PeerEndpoint};
pub use domain::{
    invariant_chain_link, invariant_crawl_complete, invariant_result_contract, BlockHeader,
    BlockLocator, ChainInfo, ChaincodeInfo, ChaincodeKind, ChaincodeQuery, CrawledBlock, Hash,
    LedgerQueryError, ProcessedTransaction, ProposalOutcome, QueryResult, RawBlock, ReadWriteSet,
    RequestIdentity, TransactionRecord,
};
pub use ports::{
    LedgerChannel, LedgerClient, LedgerNetwork, LedgerQueryApi, MetricsSink, MockLedgerNetwork,
    RecordingMetricsSink,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
