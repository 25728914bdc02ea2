/*
[INPUT]:  User address and optional filters
[OUTPUT]: Account data (orders, balances, trades)
[POS]:    HTTP layer - account endpoints (POST /api/user)
[UPDATE]: When adding new account queries or changing response format
*/

use crate::http::{ExchangeError, ExchangeHttpClient, Result};
use crate::types::{Balance, Order, Trade, UserRequest, UserResponse};

const USER_ENDPOINT: &str = "/api/user";

impl ExchangeHttpClient {
    /// Query orders for a user, optionally filtered by market and status
    pub async fn get_orders(
        &self,
        user_address: &str,
        market_id: Option<&str>,
        status: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Order>> {
        let request = UserRequest::Orders {
            user_address: user_address.to_string(),
            market_id: market_id.map(str::to_string),
            status: status.map(str::to_string),
            limit,
        };
        match self.post_json(USER_ENDPOINT, &request).await? {
            UserResponse::Orders { orders } => Ok(orders),
            _ => Err(ExchangeError::InvalidResponse(
                "expected orders response".to_string(),
            )),
        }
    }

    pub async fn get_balances(&self, user_address: &str) -> Result<Vec<Balance>> {
        let request = UserRequest::Balances {
            user_address: user_address.to_string(),
        };
        match self.post_json(USER_ENDPOINT, &request).await? {
            UserResponse::Balances { balances } => Ok(balances),
            _ => Err(ExchangeError::InvalidResponse(
                "expected balances response".to_string(),
            )),
        }
    }

    pub async fn get_trades(
        &self,
        user_address: &str,
        market_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Trade>> {
        let request = UserRequest::Trades {
            user_address: user_address.to_string(),
            market_id: market_id.map(str::to_string),
            limit,
        };
        match self.post_json(USER_ENDPOINT, &request).await? {
            UserResponse::Trades { trades } => Ok(trades),
            _ => Err(ExchangeError::InvalidResponse(
                "expected trades response".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::http::ExchangeHttpClient;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_balances() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/user"))
            .and(body_json(json!({ "type": "balances", "user_address": "0xabc" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "balances",
                "balances": [{
                    "user_address": "0xabc",
                    "token_ticker": "USDC",
                    "amount": "1500000000",
                    "open_interest": "0",
                    "updated_at": "2024-01-01T00:00:00Z"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ExchangeHttpClient::new(&server.uri()).expect("client init");
        let balances = client.get_balances("0xabc").await.expect("get_balances failed");

        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].amount, "1500000000");
    }
}
