//! On-chain log records
//!
//! Each record carries an [`EventMeta`]; the event key is the
//! redelivery guard used by ingestion.

use super::common::*;
use super::deposit::{Deposit, DepositStatus, FillRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `FundsDeposited` on the origin chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositEvent {
    pub meta: EventMeta,
    pub origin_chain_id: ChainId,
    pub destination_chain_id: ChainId,
    pub deposit_id: u64,
    pub depositor: Address,
    pub recipient: Address,
    pub input_token: Address,
    pub input_amount: String,
    #[serde(default)]
    pub output_token: Option<Address>,
    #[serde(default)]
    pub output_amount: Option<String>,
    pub relayer_fee_pct: String,
    /// Referral address carried in the deposit calldata
    #[serde(default)]
    pub referral_address: Option<Address>,
}

impl DepositEvent {
    pub fn key(&self) -> DepositKey {
        DepositKey::new(self.origin_chain_id, self.deposit_id)
    }

    /// Pending deposit row. Sticky referral and output token are resolved
    /// by ingestion, not here.
    pub fn to_deposit(&self) -> Deposit {
        Deposit {
            origin_chain_id: self.origin_chain_id,
            destination_chain_id: self.destination_chain_id,
            deposit_id: self.deposit_id,
            depositor: self.depositor.clone(),
            recipient: self.recipient.clone(),
            input_token: self.input_token.clone(),
            input_amount: self.input_amount.clone(),
            output_token: self.output_token.clone(),
            output_amount: self.output_amount.clone(),
            status: DepositStatus::Pending,
            deposit_date: self.meta.timestamp,
            deposit_tx: self.meta.key.transaction_hash.clone(),
            fill_date: None,
            fill_tx: None,
            filled_amount: "0".to_string(),
            relayer_fee_pct: self.relayer_fee_pct.clone(),
            fees: None,
            price: None,
            sticky_referral_address: None,
            reward_windows: BTreeMap::new(),
        }
    }
}

/// `FilledRelay` on the destination chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillEvent {
    pub meta: EventMeta,
    pub origin_chain_id: ChainId,
    pub deposit_id: u64,
    pub relayer: Address,
    pub realized_lp_fee_pct: String,
    pub relayer_fee_pct: String,
    pub total_filled_amount: String,
}

impl FillEvent {
    pub fn key(&self) -> DepositKey {
        DepositKey::new(self.origin_chain_id, self.deposit_id)
    }

    pub fn to_record(&self) -> FillRecord {
        FillRecord {
            deposit: self.key(),
            relayer: self.relayer.clone(),
            realized_lp_fee_pct: self.realized_lp_fee_pct.clone(),
            relayer_fee_pct: self.relayer_fee_pct.clone(),
            total_filled_amount: self.total_filled_amount.clone(),
            fill_tx: self.meta.key.transaction_hash.clone(),
            fill_date: self.meta.timestamp,
        }
    }
}

/// `RequestedSpeedUpDeposit`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedUpEvent {
    pub meta: EventMeta,
    pub origin_chain_id: ChainId,
    pub deposit_id: u64,
    pub depositor: Address,
    pub new_relayer_fee_pct: String,
}

impl SpeedUpEvent {
    pub fn key(&self) -> DepositKey {
        DepositKey::new(self.origin_chain_id, self.deposit_id)
    }
}

/// Relayer refund executed from the hub pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub meta: EventMeta,
    pub root_bundle_id: u64,
    pub leaf_id: u64,
    pub l2_token: Address,
    pub relayer: Address,
    pub amount: String,
}

/// `SetPoolRebalanceRoute`: (l1Token, destinationChainId) -> destinationToken
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRebalanceRoute {
    pub meta: EventMeta,
    pub l1_token: Address,
    pub destination_chain_id: ChainId,
    pub destination_token: Address,
}

/// `Claimed` on the Merkle distributor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimEvent {
    pub meta: EventMeta,
    pub window_index: WindowIndex,
    pub account_index: u64,
    pub caller: Address,
    pub account: Address,
    pub reward_token: Address,
    pub amount: String,
}
