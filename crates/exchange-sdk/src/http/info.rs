/*
[INPUT]:  Market ids, token tickers, candle ranges
[OUTPUT]: Reference data (markets, tokens) and OHLCV candles
[POS]:    HTTP layer - public info endpoints (POST /api/info, POST /api/candles)
[UPDATE]: When adding new info queries or changing response format
*/

use crate::http::{ExchangeError, ExchangeHttpClient, Result};
use crate::types::{
    Candle, CandleInterval, CandlesRequest, CandlesResponse, InfoRequest, InfoResponse, Market,
    ReferenceSet, Token,
};

const INFO_ENDPOINT: &str = "/api/info";
const CANDLES_ENDPOINT: &str = "/api/candles";

impl ExchangeHttpClient {
    async fn info(&self, request: InfoRequest) -> Result<InfoResponse> {
        self.post_json(INFO_ENDPOINT, &request).await
    }

    /// List every market
    pub async fn get_markets(&self) -> Result<Vec<Market>> {
        match self.info(InfoRequest::AllMarkets).await? {
            InfoResponse::AllMarkets { markets } => Ok(markets),
            other => Err(unexpected("all_markets", &other)),
        }
    }

    pub async fn get_market(&self, market_id: &str) -> Result<Market> {
        let request = InfoRequest::MarketDetails {
            market_id: market_id.to_string(),
        };
        match self.info(request).await? {
            InfoResponse::MarketDetails { market } => Ok(market),
            other => Err(unexpected("market_details", &other)),
        }
    }

    /// List every token
    pub async fn get_tokens(&self) -> Result<Vec<Token>> {
        match self.info(InfoRequest::AllTokens).await? {
            InfoResponse::AllTokens { tokens } => Ok(tokens),
            other => Err(unexpected("all_tokens", &other)),
        }
    }

    pub async fn get_token(&self, ticker: &str) -> Result<Token> {
        let request = InfoRequest::TokenDetails {
            ticker: ticker.to_string(),
        };
        match self.info(request).await? {
            InfoResponse::TokenDetails { token } => Ok(token),
            other => Err(unexpected("token_details", &other)),
        }
    }

    /// Fetch markets and tokens concurrently
    pub async fn fetch_reference_set(&self) -> Result<ReferenceSet> {
        let (markets, tokens) = tokio::try_join!(self.get_markets(), self.get_tokens())?;
        Ok(ReferenceSet { markets, tokens })
    }

    /// OHLCV candles for `market_id` between `from` and `to` (unix seconds, inclusive).
    /// `count_back` keeps only the most recent bars before `to`.
    pub async fn get_candles(
        &self,
        market_id: &str,
        interval: CandleInterval,
        from: i64,
        to: i64,
        count_back: Option<u32>,
    ) -> Result<Vec<Candle>> {
        if from > to {
            return Err(ExchangeError::validation(format!(
                "candle range starts after it ends: from={from} to={to}"
            )));
        }
        let request = CandlesRequest {
            market_id: market_id.to_string(),
            interval,
            from,
            to,
            count_back,
        };
        let response: CandlesResponse = self.post_json(CANDLES_ENDPOINT, &request).await?;
        Ok(response.candles)
    }
}

fn unexpected(expected: &str, got: &InfoResponse) -> ExchangeError {
    let kind = match got {
        InfoResponse::TokenDetails { .. } => "token_details",
        InfoResponse::MarketDetails { .. } => "market_details",
        InfoResponse::AllMarkets { .. } => "all_markets",
        InfoResponse::AllTokens { .. } => "all_tokens",
    };
    ExchangeError::InvalidResponse(format!("expected {expected} response, got {kind}"))
}
