//! # Block Header Hash
//!
//! Recomputes a block header hash the way the ledger does: the header
//! fields are DER encoded as
//!
//! ```text
//! SEQUENCE {
//!     Number        INTEGER,
//!     PreviousHash  OCTET STRING,
//!     DataHash      OCTET STRING
//! }
//! ```
//!
//! and the encoding is hashed with SHA-256. Field order is part of the
//! wire contract.

use der::asn1::OctetStringRef;
use der::{Encode, Sequence};
use sha2::{Digest, Sha256};

use crate::domain::{BlockHeader, Hash, LedgerQueryError, RawBlockHeader};

/// ASN.1 view of the hashed header fields.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Asn1Header<'a> {
    /// Block number.
    pub number: u64,
    /// Previous block hash.
    pub previous_hash: OctetStringRef<'a>,
    /// Data hash.
    pub data_hash: OctetStringRef<'a>,
}

/// DER encode the hashed header fields.
pub fn encode_header(
    number: u64,
    previous_hash: &[u8],
    data_hash: &[u8],
) -> Result<Vec<u8>, LedgerQueryError> {
    let header = Asn1Header {
        number,
        previous_hash: OctetStringRef::new(previous_hash)
            .map_err(|e| LedgerQueryError::Encoding(e.to_string()))?,
        data_hash: OctetStringRef::new(data_hash)
            .map_err(|e| LedgerQueryError::Encoding(e.to_string()))?,
    };

    header
        .to_der()
        .map_err(|e| LedgerQueryError::Encoding(e.to_string()))
}

/// SHA-256 over the DER encoding of `(number, previous_hash, data_hash)`.
///
/// Pure function of its inputs.
pub fn compute_block_hash(
    number: u64,
    previous_hash: &[u8],
    data_hash: &[u8],
) -> Result<Hash, LedgerQueryError> {
    let encoded = encode_header(number, previous_hash, data_hash)?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    Ok(hasher.finalize().into())
}

/// Build a [`BlockHeader`] from raw header fields, recomputing its hash.
pub fn hash_raw_header(raw: &RawBlockHeader) -> Result<BlockHeader, LedgerQueryError> {
    let computed_block_hash = compute_block_hash(raw.number, &raw.previous_hash, &raw.data_hash)?;
    Ok(BlockHeader {
        number: raw.number,
        previous_hash: raw.previous_hash.clone(),
        data_hash: raw.data_hash.clone(),
        computed_block_hash,
    })
}
