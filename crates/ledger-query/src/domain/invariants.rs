//! # Domain Invariants
//!
//! Rules that must hold for every value leaving the query facade.

use super::entities::{BlockHeader, CrawledBlock};
use super::errors::STATUS_SUCCESS;
use super::value_objects::QueryResult;

/// Invariant: a result carries a payload iff it reports success.
pub fn invariant_result_contract(result: &QueryResult) -> bool {
    (result.status_code == STATUS_SUCCESS) == result.payload.is_some()
}

/// Invariant: `next` links to `prev`, i.e. the previous hash reported by
/// the peer for `next` equals the hash recomputed for `prev`.
pub fn invariant_chain_link(prev: &BlockHeader, next: &BlockHeader) -> bool {
    prev.number.checked_add(1) == Some(next.number)
        && next.previous_hash == prev.computed_block_hash
}

/// Invariant: a crawled block holds one record per data entry.
pub fn invariant_crawl_complete(block: &CrawledBlock, entry_count: usize) -> bool {
    block.transactions.len() == entry_count
}
