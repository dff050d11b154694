//! Point-in-time ledger views

use chrono::{DateTime, Utc};
use rewards_core::{Address, Claim, Deposit, WindowIndex};
use std::collections::{BTreeSet, HashMap};

/// Deposits and claims as of one instant
#[derive(Clone, Debug)]
pub struct LedgerSnapshot {
    pub taken_at: DateTime<Utc>,
    pub deposits: Vec<Deposit>,
    pub claims: Vec<Claim>,
}

impl LedgerSnapshot {
    /// Windows each account has claimed
    pub fn claimed_windows(&self) -> HashMap<Address, BTreeSet<WindowIndex>> {
        let mut out: HashMap<Address, BTreeSet<WindowIndex>> = HashMap::new();
        for claim in &self.claims {
            out.entry(claim.account.clone())
                .or_default()
                .insert(claim.window_index);
        }
        out
    }
}
