//! # Algorithms Module
//!
//! Header hash recomputation, block crawling and response normalization.

pub mod block_crawler;
pub mod block_hash;
pub mod response_normalizer;

pub use block_crawler::{crawl_block, extract_transaction, header_type_name};
pub use block_hash::{compute_block_hash, encode_header, hash_raw_header, Asn1Header};
pub use response_normalizer::{classify, decode_payload, normalize, normalize_outcome, try_parse_json};
