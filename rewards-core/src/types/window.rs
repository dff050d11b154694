//! Merkle distributor windows and recipients
//!
//! Windows are immutable once created and unique per
//! (chain_id, contract_address, window_index).

use super::common::*;
use super::job::RewardsType;
use crate::error::RewardsResult;
use crate::fee::parse_integer;
use crate::merkle::{MerkleLeaf, MerkleTreeBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Merkle distributor contract on one chain
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionLine {
    pub chain_id: ChainId,
    pub contract_address: Address,
}

impl DistributionLine {
    pub fn new(chain_id: ChainId, contract_address: Address) -> Self {
        Self {
            chain_id,
            contract_address,
        }
    }
}

impl std::fmt::Display for DistributionLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.chain_id, self.contract_address)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleDistributorWindow {
    pub chain_id: ChainId,
    pub contract_address: Address,
    pub window_index: WindowIndex,
    pub reward_token: Address,
    /// Sum of all recipient amounts, raw units
    pub rewards_to_deposit: String,
    pub merkle_root: Bytes32,
    /// Off-chain metadata pointer (e.g. IPFS CID), set on publication
    pub ipfs_hash: Option<String>,
    pub rewards_type: RewardsType,
    pub job_id: JobId,
    pub created_at: DateTime<Utc>,
}

impl MerkleDistributorWindow {
    pub fn line(&self) -> DistributionLine {
        DistributionLine::new(self.chain_id, self.contract_address.clone())
    }

    pub fn artifact(&self) -> WindowArtifact {
        WindowArtifact {
            chain_id: self.chain_id,
            contract_address: self.contract_address.clone(),
            window_index: self.window_index,
            reward_token: self.reward_token.clone(),
            rewards_to_deposit: self.rewards_to_deposit.clone(),
            merkle_root: self.merkle_root,
        }
    }
}

/// One leaf of a window, unique per (window, address)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleDistributorRecipient {
    pub window_index: WindowIndex,
    pub address: Address,
    /// Raw reward-token units
    pub amount: String,
    pub account_index: u64,
    pub proof: Vec<Bytes32>,
    /// Breakdown metadata
    pub payload: serde_json::Value,
}

impl MerkleDistributorRecipient {
    pub fn artifact(&self) -> RecipientArtifact {
        RecipientArtifact {
            window_index: self.window_index,
            address: self.address.clone(),
            account_index: self.account_index,
            amount: self.amount.clone(),
            proof: self.proof.clone(),
        }
    }
}

// ============================================================
// Published artifacts
// ============================================================

/// Payload submitted to the distributor contract to open a window
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowArtifact {
    pub chain_id: ChainId,
    pub contract_address: Address,
    pub window_index: WindowIndex,
    pub reward_token: Address,
    pub rewards_to_deposit: String,
    pub merkle_root: Bytes32,
}

/// Per-recipient claim material
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientArtifact {
    pub window_index: WindowIndex,
    pub address: Address,
    pub account_index: u64,
    pub amount: String,
    pub proof: Vec<Bytes32>,
}

/// Recompute the root from a recipient artifact and compare
pub fn verify_recipient(root: &Bytes32, recipient: &RecipientArtifact) -> RewardsResult<bool> {
    let amount = parse_integer("amount", &recipient.amount)?;
    let leaf = MerkleLeaf::new(recipient.account_index, recipient.address.clone(), amount);
    Ok(MerkleTreeBuilder::verify(root, &leaf.hash()?, &recipient.proof))
}
