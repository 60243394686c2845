//! # Domain Entities
//!
//! Raw ledger structures as delivered by the network client, and the
//! structured records the block crawler produces from them.

use super::errors::Hash;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Raw block as returned by `query_block` / `query_block_by_hash`.
///
/// The data section holds transaction envelopes as semi-structured JSON;
/// the crawler decodes them defensively.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RawBlock {
    /// Block header.
    pub header: RawBlockHeader,
    /// Transaction data section (absent for pruned blocks).
    #[serde(default)]
    pub data: Option<RawBlockData>,
    /// Block metadata section.
    #[serde(default)]
    pub metadata: Option<RawBlockMetadata>,
}

impl RawBlock {
    /// Number of transaction entries in the data section.
    pub fn transaction_count(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.data.len())
    }
}

/// Header fields of a raw block.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawBlockHeader {
    /// Block sequence number.
    #[serde(deserialize_with = "lenient_u64")]
    pub number: u64,
    /// Header hash of the previous block.
    #[serde(with = "hex_bytes")]
    pub previous_hash: Vec<u8>,
    /// Hash over the block's data section.
    #[serde(with = "hex_bytes")]
    pub data_hash: Vec<u8>,
}

/// Data section of a raw block.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RawBlockData {
    /// Transaction envelopes in ledger order.
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Metadata section of a raw block.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RawBlockMetadata {
    /// Metadata entries; the last one carries the validation codes.
    #[serde(default)]
    pub metadata: Vec<Value>,
}

/// Transaction as returned by `query_transaction`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProcessedTransaction {
    /// Ledger-assigned validation code.
    pub validation_code: i32,
    /// Transaction envelope.
    pub transaction_envelope: Value,
}

/// Block header with an independently recomputed hash.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block sequence number.
    pub number: u64,
    /// Previous block hash as reported by the peer.
    #[serde(with = "hex_bytes")]
    pub previous_hash: Vec<u8>,
    /// Data hash as reported by the peer.
    #[serde(with = "hex_bytes")]
    pub data_hash: Vec<u8>,
    /// SHA-256 over the DER encoded `(number, previous_hash, data_hash)`.
    #[serde(with = "hex_hash")]
    pub computed_block_hash: Hash,
}

/// Key version observed by a read.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyVersion {
    /// Block that last wrote the key.
    #[serde(deserialize_with = "lenient_u64")]
    pub block_num: u64,
    /// Transaction within that block.
    #[serde(deserialize_with = "lenient_u64")]
    pub tx_num: u64,
}

/// A key read by the chaincode.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct KvRead {
    /// Ledger key.
    pub key: String,
    /// Version read; `None` when the key did not exist.
    #[serde(default)]
    pub version: Option<KeyVersion>,
}

/// A key written (or deleted) by the chaincode.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct KvWrite {
    /// Ledger key.
    pub key: String,
    /// Delete marker.
    #[serde(default)]
    pub is_delete: bool,
    /// Written value as decoded by the network client.
    #[serde(default)]
    pub value: Value,
}

/// Public read/write set of one namespace.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct KvRwSet {
    /// Keys read.
    #[serde(default)]
    pub reads: Vec<KvRead>,
    /// Range query summaries.
    #[serde(default)]
    pub range_queries_info: Vec<Value>,
    /// Keys written.
    #[serde(default)]
    pub writes: Vec<KvWrite>,
    /// Key metadata writes.
    #[serde(default)]
    pub metadata_writes: Vec<Value>,
}

/// Namespace-scoped read/write set of a chaincode invocation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReadWriteSet {
    /// Chaincode namespace.
    pub namespace: String,
    /// Public reads and writes.
    #[serde(default)]
    pub rwset: KvRwSet,
    /// Private data collection hashes.
    #[serde(default)]
    pub collection_hashed_rwset: Vec<Value>,
}

/// One transaction entry of a crawled block.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    /// Channel header timestamp, verbatim.
    pub timestamp: String,
    /// Channel id.
    pub channel_id: String,
    /// Transaction id (empty for some config transactions).
    pub tx_id: String,
    /// Human readable header type, e.g. `ENDORSER_TRANSACTION`.
    pub tx_type: String,
    /// Read/write sets in namespace order; empty when there is no action.
    pub ns_read_write_sets: Vec<ReadWriteSet>,
}

/// Result of crawling one block.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CrawledBlock {
    /// Header with recomputed hash.
    pub header: BlockHeader,
    /// Transactions in block order.
    pub transactions: Vec<TransactionRecord>,
    /// Last metadata entry, verbatim.
    pub last_transaction_status_code: Value,
}

/// Accepts a JSON number or a decimal string (64-bit values are often
/// rendered as strings by the network client).
fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(u64),
        Str(String),
    }

    match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => Ok(n),
        NumOrString::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Hex string (de)serialization for byte vectors; accepts a `0x` prefix.
pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

/// Hex string (de)serialization for 32-byte hashes.
pub(crate) mod hex_hash {
    use super::Hash;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let bytes = super::hex_bytes::deserialize(deserializer)?;
        Hash::try_from(bytes.as_slice()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_block_from_json() {
        let block: RawBlock = serde_json::from_value(json!({
            "header": {
                "number": "12",
                "previous_hash": "aabb",
                "data_hash": "0xccdd"
            },
            "data": { "data": [{}, {}] },
            "metadata": { "metadata": [[], [], [0, 0]] }
        }))
        .unwrap();

        assert_eq!(block.header.number, 12);
        assert_eq!(block.header.previous_hash, vec![0xaa, 0xbb]);
        assert_eq!(block.header.data_hash, vec![0xcc, 0xdd]);
        assert_eq!(block.transaction_count(), 2);
    }

    #[test]
    fn test_raw_block_without_data_section() {
        let block: RawBlock = serde_json::from_value(json!({
            "header": { "number": 3, "previous_hash": "", "data_hash": "" }
        }))
        .unwrap();
        assert!(block.data.is_none());
        assert_eq!(block.transaction_count(), 0);
    }

    #[test]
    fn test_read_write_set_defaults() {
        let set: ReadWriteSet = serde_json::from_value(json!({
            "namespace": "lscc",
            "rwset": {
                "reads": [{ "key": "mycc", "version": { "block_num": "3", "tx_num": 0 } }]
            }
        }))
        .unwrap();

        assert_eq!(set.namespace, "lscc");
        assert_eq!(set.rwset.reads.len(), 1);
        assert_eq!(
            set.rwset.reads[0].version,
            Some(KeyVersion { block_num: 3, tx_num: 0 })
        );
        assert!(set.rwset.writes.is_empty());
        assert!(set.collection_hashed_rwset.is_empty());
    }

    #[test]
    fn test_block_header_hash_serializes_as_hex() {
        let header = BlockHeader {
            number: 1,
            previous_hash: vec![0x01],
            data_hash: vec![0x02],
            computed_block_hash: [0xff; 32],
        };
        let value = serde_json::to_value(&header).unwrap();
        assert_eq!(value["computed_block_hash"], "ff".repeat(32));

        let back: BlockHeader = serde_json::from_value(value).unwrap();
        assert_eq!(back, header);
    }
}
