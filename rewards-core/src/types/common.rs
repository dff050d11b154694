//! Basic Types
//!
//! Naming conventions:
//! - `_id` suffix: Primary key identifiers
//! - `_index` suffix: Positions (window index, account index)
//! - `_date` suffix: Wall-clock timestamps

use crate::error::{RewardsError, RewardsResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// EVM chain id
pub type ChainId = u64;

/// Merkle distributor window index
pub type WindowIndex = u64;

// ============================================================
// Address
// ============================================================

/// EVM address, canonicalized to lowercase `0x`-prefixed hex.
///
/// Ordering is lexicographic on the canonical string, which is the
/// ordering used to assign leaf indices inside a window.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse and canonicalize an address
    pub fn parse(value: &str) -> RewardsResult<Self> {
        let trimmed = value.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| RewardsError::InvalidAddress {
                value: value.to_string(),
            })?;

        if hex_part.len() != 40 || hex::decode(hex_part).is_err() {
            return Err(RewardsError::InvalidAddress {
                value: value.to_string(),
            });
        }

        Ok(Self(format!("0x{}", hex_part.to_ascii_lowercase())))
    }

    /// The zero address
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(40)))
    }

    /// Check if zero address
    pub fn is_zero(&self) -> bool {
        self.0[2..].bytes().all(|b| b == b'0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 20 bytes
    pub fn to_bytes(&self) -> [u8; 20] {
        let mut out = [0u8; 20];
        // Canonical form is validated hex, decode cannot fail.
        if let Ok(bytes) = hex::decode(&self.0[2..]) {
            out.copy_from_slice(&bytes);
        }
        out
    }
}

impl TryFrom<String> for Address {
    type Error = RewardsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl std::str::FromStr for Address {
    type Err = RewardsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================
// 32-byte hash
// ============================================================

/// 32-byte hash (Merkle roots, leaves, proof nodes, content digests)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Bytes32(pub [u8; 32]);

impl Bytes32 {
    /// Parse from hex (with or without `0x`)
    pub fn from_hex(s: &str) -> RewardsResult<Self> {
        let hex_part = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(hex_part).map_err(|_| RewardsError::InvalidHash {
            value: s.to_string(),
        })?;
        if bytes.len() != 32 {
            return Err(RewardsError::InvalidHash {
                value: s.to_string(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// `0x`-prefixed hex string
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Keccak-256 (EVM compatible)
    pub fn keccak256(data: &[u8]) -> Self {
        let mut hasher = Keccak256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// BLAKE3 hash, used for off-chain content digests
    pub fn blake3(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create zero hash
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl TryFrom<String> for Bytes32 {
    type Error = RewardsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Bytes32::from_hex(&value)
    }
}

impl From<Bytes32> for String {
    fn from(hash: Bytes32) -> Self {
        hash.to_hex()
    }
}

impl std::fmt::Debug for Bytes32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bytes32({}...)", &self.to_hex()[..18])
    }
}

impl std::fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for Bytes32 {
    fn default() -> Self {
        Self::zero()
    }
}

// ============================================================
// ID Types
// ============================================================

/// Natural key of a deposit: deposit ids are scoped per origin chain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositKey {
    pub origin_chain_id: ChainId,
    pub deposit_id: u64,
}

impl DepositKey {
    pub fn new(origin_chain_id: ChainId, deposit_id: u64) -> Self {
        Self {
            origin_chain_id,
            deposit_id,
        }
    }
}

impl std::fmt::Display for DepositKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.origin_chain_id, self.deposit_id)
    }
}

/// Rewards window job ID
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("job:{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================
// Event log identity
// ============================================================

/// Uniqueness key of an on-chain log record
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventKey {
    pub chain_id: ChainId,
    pub transaction_hash: String,
    pub log_index: u32,
}

impl EventKey {
    pub fn new(chain_id: ChainId, transaction_hash: impl Into<String>, log_index: u32) -> Self {
        Self {
            chain_id,
            transaction_hash: transaction_hash.into().to_ascii_lowercase(),
            log_index,
        }
    }
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.chain_id, self.transaction_hash, self.log_index)
    }
}

/// Metadata carried by every ingested log record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    #[serde(flatten)]
    pub key: EventKey,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
}

impl EventMeta {
    pub fn new(key: EventKey, block_number: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            key,
            block_number,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_canonicalization() {
        let a = Address::parse("0xAbCdEf0123456789abcdef0123456789ABCDEF01").unwrap();
        assert_eq!(a.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(a.to_bytes()[0], 0xab);
    }

    #[test]
    fn test_address_rejects_malformed() {
        assert!(Address::parse("abcdef0123456789abcdef0123456789abcdef01").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0xzzcdef0123456789abcdef0123456789abcdef01").is_err());
    }

    #[test]
    fn test_address_ordering_is_lexicographic() {
        let a = Address::parse("0x0a00000000000000000000000000000000000000").unwrap();
        let b = Address::parse("0xA100000000000000000000000000000000000000").unwrap();
        assert!(a < b);
        assert!(Address::zero().is_zero());
    }

    #[test]
    fn test_bytes32_hex_roundtrip() {
        let h = Bytes32::keccak256(b"");
        assert_eq!(
            h.to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(Bytes32::from_hex(&h.to_hex()).unwrap(), h);
        assert!(Bytes32::from_hex("0x1234").is_err());
    }

    #[test]
    fn test_address_serde() {
        let json = "\"0xABCDEF0123456789ABCDEF0123456789ABCDEF01\"";
        let a: Address = serde_json::from_str(json).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            "\"0xabcdef0123456789abcdef0123456789abcdef01\""
        );
        assert!(serde_json::from_str::<Address>("\"nope\"").is_err());
    }

    #[test]
    fn test_event_key_lowercases_hash() {
        let key = EventKey::new(1, "0xABC", 2);
        assert_eq!(key.transaction_hash, "0xabc");
        assert_eq!(key.to_string(), "1:0xabc:2");
    }
}
