/*
[INPUT]:  Market and token reference data fetched over REST
[OUTPUT]: Thread-safe lookups keyed by market id / token ticker
[POS]:    Reference data layer - shared by enhancer and stream handlers
[UPDATE]: When reference data shape or readiness rules change
*/

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::{Market, ReferenceSet, Token};

/// A market together with its base and quote tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketReference {
    pub market: Market,
    pub base: Token,
    pub quote: Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub tokens: usize,
    pub markets: usize,
    pub initialized: bool,
}

#[derive(Debug, Default)]
struct Tables {
    tokens: HashMap<String, Token>,
    markets: HashMap<String, Market>,
}

/// Market/token cache shared between REST and WebSocket consumers.
///
/// The cache is ready only once it has been marked initialized and both tables
/// are non-empty. Readers never block on the network.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    tables: RwLock<Tables>,
    initialized: AtomicBool,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace all tokens
    pub fn set_tokens(&self, tokens: Vec<Token>) {
        let mut tables = self.write();
        tables.tokens = tokens
            .into_iter()
            .map(|token| (token.ticker.clone(), token))
            .collect();
    }

    /// Replace all markets
    pub fn set_markets(&self, markets: Vec<Market>) {
        let mut tables = self.write();
        tables.markets = markets
            .into_iter()
            .map(|market| (market.id.clone(), market))
            .collect();
    }

    /// Load a full reference set and mark the cache initialized
    pub fn populate(&self, reference: ReferenceSet) {
        {
            let mut tables = self.write();
            tables.tokens = reference
                .tokens
                .into_iter()
                .map(|token| (token.ticker.clone(), token))
                .collect();
            tables.markets = reference
                .markets
                .into_iter()
                .map(|market| (market.id.clone(), market))
                .collect();
        }
        self.mark_initialized();
        tracing::info!(
            tokens = self.read().tokens.len(),
            markets = self.read().markets.len(),
            "reference cache populated"
        );
    }

    pub fn token(&self, ticker: &str) -> Option<Token> {
        self.read().tokens.get(ticker).cloned()
    }

    pub fn market(&self, market_id: &str) -> Option<Market> {
        self.read().markets.get(market_id).cloned()
    }

    pub fn tokens(&self) -> Vec<Token> {
        let mut tokens: Vec<Token> = self.read().tokens.values().cloned().collect();
        tokens.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        tokens
    }

    pub fn markets(&self) -> Vec<Market> {
        let mut markets: Vec<Market> = self.read().markets.values().cloned().collect();
        markets.sort_by(|a, b| a.id.cmp(&b.id));
        markets
    }

    pub fn has_token(&self, ticker: &str) -> bool {
        self.read().tokens.contains_key(ticker)
    }

    pub fn has_market(&self, market_id: &str) -> bool {
        self.read().markets.contains_key(market_id)
    }

    /// Resolve a market and both of its tokens under one read lock
    pub fn lookup(&self, market_id: &str) -> Option<MarketReference> {
        let tables = self.read();
        let market = tables.markets.get(market_id)?;
        let base = tables.tokens.get(&market.base_ticker)?;
        let quote = tables.tokens.get(&market.quote_ticker)?;
        Some(MarketReference {
            market: market.clone(),
            base: base.clone(),
            quote: quote.clone(),
        })
    }

    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        if !self.initialized.load(Ordering::Acquire) {
            return false;
        }
        let tables = self.read();
        !tables.tokens.is_empty() && !tables.markets.is_empty()
    }

    pub fn clear(&self) {
        let mut tables = self.write();
        tables.tokens.clear();
        tables.markets.clear();
        self.initialized.store(false, Ordering::Release);
    }

    pub fn stats(&self) -> CacheStats {
        let tables = self.read();
        CacheStats {
            tokens: tables.tokens.len(),
            markets: tables.markets.len(),
            initialized: self.initialized.load(Ordering::Acquire),
        }
    }
}
