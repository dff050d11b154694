//! Claims observed on the Merkle distributor

use super::common::*;
use super::events::ClaimEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One redemption, unique per (window_index, account_index)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub window_index: WindowIndex,
    pub account_index: u64,
    pub caller: Address,
    pub account: Address,
    pub reward_token: Address,
    pub amount: String,
    pub block_number: u64,
    pub claimed_at: DateTime<Utc>,
    pub transaction_hash: String,
}

impl Claim {
    /// Uniqueness key
    pub fn key(&self) -> (WindowIndex, u64) {
        (self.window_index, self.account_index)
    }
}

impl From<&ClaimEvent> for Claim {
    fn from(event: &ClaimEvent) -> Self {
        Self {
            window_index: event.window_index,
            account_index: event.account_index,
            caller: event.caller.clone(),
            account: event.account.clone(),
            reward_token: event.reward_token.clone(),
            amount: event.amount.clone(),
            block_number: event.meta.block_number,
            claimed_at: event.meta.timestamp,
            transaction_hash: event.meta.key.transaction_hash.clone(),
        }
    }
}
