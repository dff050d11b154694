//! Claim Tracker
//!
//! Sole writer of claim rows. Claims come from the distributor's `Claimed`
//! events; redelivered claims are absorbed. Whether a recipient has claimed
//! is always derived from claim rows, never stored on the recipient.

use crate::error::ExecutorResult;
use rewards_core::{Address, Claim, ClaimEvent, DistributionLine, MerkleDistributorRecipient, WindowIndex};
use rewards_store::LedgerStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Recipient row joined with its claim, if any
#[derive(Clone, Debug)]
pub struct RecipientClaimStatus {
    pub recipient: MerkleDistributorRecipient,
    pub claim: Option<Claim>,
}

impl RecipientClaimStatus {
    pub fn is_claimed(&self) -> bool {
        self.claim.is_some()
    }
}

pub struct ClaimTracker<S: LedgerStore + ?Sized> {
    store: Arc<S>,
}

impl<S: LedgerStore + ?Sized> Clone for ClaimTracker<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: LedgerStore + ?Sized> ClaimTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Persist a claim. Returns `false` for an already-seen
    /// (window_index, account_index).
    pub async fn record_claim(&self, event: &ClaimEvent) -> ExecutorResult<bool> {
        let inserted = self.store.insert_claim(Claim::from(event)).await?;
        if inserted {
            info!(
                window_index = event.window_index,
                account_index = event.account_index,
                account = %event.account,
                "claim recorded"
            );
        } else {
            debug!(
                window_index = event.window_index,
                account_index = event.account_index,
                "duplicate claim ignored"
            );
        }
        Ok(inserted)
    }

    pub async fn has_claimed(&self, account: &Address, window_index: WindowIndex) -> ExecutorResult<bool> {
        Ok(self.claimed_windows(account).await?.contains(&window_index))
    }

    /// Most recent window the account claimed from
    pub async fn latest_claimed_window(&self, account: &Address) -> ExecutorResult<Option<WindowIndex>> {
        Ok(self.claimed_windows(account).await?.last().copied())
    }

    pub async fn claimed_windows(&self, account: &Address) -> ExecutorResult<BTreeSet<WindowIndex>> {
        let claims = self.store.claims_for_account(account).await?;
        Ok(claims.into_iter().map(|c| c.window_index).collect())
    }

    pub async fn claims_for_window(&self, window_index: WindowIndex) -> ExecutorResult<Vec<Claim>> {
        Ok(self.store.claims_for_window(window_index).await?)
    }

    /// Recipients of a window with their claim status
    pub async fn recipient_status(
        &self,
        line: &DistributionLine,
        window_index: WindowIndex,
    ) -> ExecutorResult<Vec<RecipientClaimStatus>> {
        let recipients = self.store.window_recipients(line, window_index).await?;
        let claims = self.store.claims_for_window(window_index).await?;

        Ok(recipients
            .into_iter()
            .map(|recipient| {
                let claim = claims
                    .iter()
                    .find(|c| c.account_index == recipient.account_index && c.account == recipient.address)
                    .cloned();
                RecipientClaimStatus { recipient, claim }
            })
            .collect())
    }
}
