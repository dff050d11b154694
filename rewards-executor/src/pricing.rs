//! Deposit Pricing
//!
//! Attaches a USD price snapshot to filled deposits. A deposit whose token
//! metadata or daily price is missing stays unpriced and is reported as a
//! gap; pricing never fails the batch.

use crate::error::ExecutorResult;
use rewards_core::fee::parse_decimal;
use rewards_core::{Address, ChainId, Deposit, DepositKey, PriceSnapshot, Token};
use rewards_store::LedgerStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Why a deposit could not be priced
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingGap {
    pub deposit: DepositKey,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingReport {
    pub priced: usize,
    pub gaps: Vec<PricingGap>,
}

pub struct DepositPricer<S: LedgerStore + ?Sized> {
    store: Arc<S>,
    reward_token: Address,
    reward_token_chain: ChainId,
}

impl<S: LedgerStore + ?Sized> DepositPricer<S> {
    pub fn new(store: Arc<S>, reward_token: Address, reward_token_chain: ChainId) -> Self {
        Self {
            store,
            reward_token,
            reward_token_chain,
        }
    }

    /// Price every filled deposit that has no snapshot yet
    pub async fn price_pending(&self) -> ExecutorResult<PricingReport> {
        let mut report = PricingReport::default();
        let reward_token = self
            .store
            .get_token(&self.reward_token, self.reward_token_chain)
            .await?;

        for deposit in self.store.list_deposits().await? {
            if !deposit.is_filled() || deposit.price.is_some() {
                continue;
            }
            match self.snapshot_for(&deposit, reward_token.as_ref()).await? {
                Ok(price) => {
                    if self.store.set_deposit_price(&deposit.key(), price).await? {
                        report.priced += 1;
                    }
                }
                Err(reason) => {
                    warn!(deposit = %deposit.key(), %reason, "deposit left unpriced");
                    report.gaps.push(PricingGap {
                        deposit: deposit.key(),
                        reason,
                    });
                }
            }
        }

        info!(priced = report.priced, gaps = report.gaps.len(), "pricing finished");
        Ok(report)
    }

    /// Outer error: storage failure. Inner error: a pricing gap.
    async fn snapshot_for(
        &self,
        deposit: &Deposit,
        reward_token: Option<&Token>,
    ) -> ExecutorResult<Result<PriceSnapshot, String>> {
        let date = deposit.deposit_date.date_naive();

        let Some(token) = self
            .store
            .get_token(&deposit.input_token, deposit.origin_chain_id)
            .await?
        else {
            return Ok(Err(format!(
                "missing token metadata for {} on chain {}",
                deposit.input_token, deposit.origin_chain_id
            )));
        };
        let Some(reward_token) = reward_token else {
            return Ok(Err(format!("missing token metadata for reward token {}", self.reward_token)));
        };

        let symbol = token.price_symbol();
        let Some(token_price) = self.store.get_price(&symbol, date).await? else {
            return Ok(Err(format!("missing {symbol} price on {date}")));
        };
        let reward_symbol = reward_token.price_symbol();
        let Some(reward_price) = self.store.get_price(&reward_symbol, date).await? else {
            return Ok(Err(format!("missing {reward_symbol} price on {date}")));
        };
        if parse_decimal("usd", &token_price.usd).is_err() || parse_decimal("usd", &reward_price.usd).is_err() {
            return Ok(Err(format!("unparsable price on {date}")));
        }

        Ok(Ok(PriceSnapshot {
            token_symbol: symbol,
            decimals: token.decimals,
            token_usd_price: token_price.usd,
            reward_token_usd_price: reward_price.usd,
            price_date: date,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ChainEvent, EventIngestor};
    use chrono::{NaiveDate, TimeZone, Utc};
    use rewards_core::fee::parse_integer;
    use rewards_core::{DepositEvent, EventKey, EventMeta, FillEvent, HistoricMarketPrice};
    use rewards_store::{DepositRepository, InMemoryLedger, PriceRepository, TokenRepository};

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{}", "0".repeat(38) + &format!("{n:02x}"))).unwrap()
    }

    async fn filled_deposit(store: &Arc<InMemoryLedger>, id: u64, token: u8) {
        let ingestor = EventIngestor::new(store.clone(), parse_integer("c", "1000000000000000000").unwrap());
        let at = Utc.with_ymd_and_hms(2022, 8, 1, 12, 0, 0).unwrap();
        ingestor
            .ingest(ChainEvent::Deposit(DepositEvent {
                meta: EventMeta::new(EventKey::new(1, format!("0xd{id}"), 0), 1, at),
                origin_chain_id: 1,
                destination_chain_id: 10,
                deposit_id: id,
                depositor: addr(1),
                recipient: addr(1),
                input_token: addr(token),
                input_amount: "1000".to_string(),
                output_token: None,
                output_amount: None,
                relayer_fee_pct: "0".to_string(),
                referral_address: None,
            }))
            .await
            .unwrap();
        ingestor
            .ingest(ChainEvent::Fill(FillEvent {
                meta: EventMeta::new(EventKey::new(10, format!("0xf{id}"), 0), 1, at),
                origin_chain_id: 1,
                deposit_id: id,
                relayer: addr(0x99),
                realized_lp_fee_pct: "0".to_string(),
                relayer_fee_pct: "0".to_string(),
                total_filled_amount: "1000".to_string(),
            }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_prices_and_reports_gaps() {
        let store = Arc::new(InMemoryLedger::new());
        let date = NaiveDate::from_ymd_opt(2022, 8, 1).unwrap();
        store.upsert_token(Token::new(addr(0xee), 1, "weth", 18)).await.unwrap();
        store.upsert_token(Token::new(addr(0xaa), 10, "ACX", 18)).await.unwrap();
        store.insert_price(HistoricMarketPrice::new("WETH", date, "1500")).await.unwrap();
        store.insert_price(HistoricMarketPrice::new("ACX", date, "0.5")).await.unwrap();

        filled_deposit(&store, 1, 0xee).await;
        filled_deposit(&store, 2, 0xbb).await;

        let pricer = DepositPricer::new(store.clone(), addr(0xaa), 10);
        let report = pricer.price_pending().await.unwrap();
        assert_eq!(report.priced, 1);
        assert_eq!(report.gaps.len(), 1);
        assert_eq!(report.gaps[0].deposit, DepositKey::new(1, 2));

        let priced = store.get_deposit_required(&DepositKey::new(1, 1)).await.unwrap();
        let snapshot = priced.price.unwrap();
        assert_eq!(snapshot.token_symbol, "WETH");
        assert_eq!(snapshot.reward_token_usd_price, "0.5");

        // second pass is a no-op for priced deposits
        let report = pricer.price_pending().await.unwrap();
        assert_eq!(report.priced, 0);
    }
}
