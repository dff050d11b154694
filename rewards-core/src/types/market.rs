//! Token metadata and daily market prices

use super::common::*;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Token metadata, keyed by (address, chain)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub address: Address,
    pub chain_id: ChainId,
    pub symbol: String,
    /// Drives fixed-point to decimal conversion
    pub decimals: u32,
}

impl Token {
    pub fn new(address: Address, chain_id: ChainId, symbol: impl Into<String>, decimals: u32) -> Self {
        Self {
            address,
            chain_id,
            symbol: symbol.into(),
            decimals,
        }
    }

    /// Price lookups are keyed by the upper-cased symbol
    pub fn price_symbol(&self) -> String {
        self.symbol.to_ascii_uppercase()
    }
}

/// USD price of a symbol on one calendar day (append-only)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricMarketPrice {
    pub symbol: String,
    pub date: NaiveDate,
    /// Decimal string
    pub usd: String,
}

impl HistoricMarketPrice {
    pub fn new(symbol: impl Into<String>, date: NaiveDate, usd: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into().to_ascii_uppercase(),
            date,
            usd: usd.into(),
        }
    }
}
