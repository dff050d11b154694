//! Ledger Fixtures
//!
//! A JSON file standing in for the indexer: token metadata, daily prices
//! and an ordered list of on-chain records.

use crate::error::CliResult;
use rewards_core::{HistoricMarketPrice, Token};
use rewards_executor::{ChainEvent, EventIngestor, IngestSummary};
use rewards_store::{LedgerStore, PriceRepository, TokenRepository};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerFixture {
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub prices: Vec<HistoricMarketPrice>,
    /// Records in delivery order
    #[serde(default)]
    pub events: Vec<ChainEvent>,
}

impl LedgerFixture {
    pub fn from_json(json: &str) -> CliResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> CliResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Write market data into the store and ingest the records
    pub async fn load<S: LedgerStore + ?Sized>(
        self,
        store: &Arc<S>,
        ingestor: &EventIngestor<S>,
    ) -> CliResult<IngestSummary> {
        for token in self.tokens {
            store.upsert_token(token).await?;
        }
        let mut skipped = 0;
        for price in self.prices {
            if !store.insert_price(price).await? {
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!(skipped, "existing prices kept");
        }

        let summary = ingestor.ingest_all(self.events).await?;
        info!(applied = summary.applied, parked = summary.parked, "fixture loaded");
        Ok(summary)
    }
}
