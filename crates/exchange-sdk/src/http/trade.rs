/*
[INPUT]:  Signed order parameters
[OUTPUT]: Placed orders, fills and cancellation results
[POS]:    HTTP layer - trading endpoints (POST /api/trade)
[UPDATE]: When adding new trading operations or changing response format
*/

use crate::http::{ExchangeError, ExchangeHttpClient, Result};
use crate::types::{
    OrderPlaced, OrderType, OrdersCancelled, Side, TradeRequest, TradeResponse,
};

const TRADE_ENDPOINT: &str = "/api/trade";

/// Parameters for a new order. Price and size are in atoms.
#[derive(Debug, Clone)]
pub struct PlaceOrderParams {
    pub user_address: String,
    pub market_id: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: String,
    pub size: String,
    pub signature: String,
}

impl ExchangeHttpClient {
    pub async fn place_order(&self, params: PlaceOrderParams) -> Result<OrderPlaced> {
        let request = TradeRequest::PlaceOrder {
            user_address: params.user_address,
            market_id: params.market_id,
            side: params.side,
            order_type: params.order_type,
            price: params.price,
            size: params.size,
            signature: params.signature,
        };
        match self.post_json(TRADE_ENDPOINT, &request).await? {
            TradeResponse::PlaceOrder { order, trades } => Ok(OrderPlaced { order, trades }),
            _ => Err(ExchangeError::InvalidResponse(
                "expected place_order response".to_string(),
            )),
        }
    }

    /// Cancel one order, returning the cancelled id
    pub async fn cancel_order(
        &self,
        user_address: &str,
        order_id: &str,
        signature: &str,
    ) -> Result<String> {
        let request = TradeRequest::CancelOrder {
            user_address: user_address.to_string(),
            order_id: order_id.to_string(),
            signature: signature.to_string(),
        };
        match self.post_json(TRADE_ENDPOINT, &request).await? {
            TradeResponse::CancelOrder { order_id } => Ok(order_id),
            _ => Err(ExchangeError::InvalidResponse(
                "expected cancel_order response".to_string(),
            )),
        }
    }

    pub async fn cancel_all_orders(
        &self,
        user_address: &str,
        market_id: Option<&str>,
        signature: &str,
    ) -> Result<OrdersCancelled> {
        let request = TradeRequest::CancelAllOrders {
            user_address: user_address.to_string(),
            market_id: market_id.map(str::to_string),
            signature: signature.to_string(),
        };
        match self.post_json(TRADE_ENDPOINT, &request).await? {
            TradeResponse::CancelAllOrders {
                cancelled_order_ids,
                count,
            } => Ok(OrdersCancelled {
                cancelled_order_ids,
                count,
            }),
            _ => Err(ExchangeError::InvalidResponse(
                "expected cancel_all_orders response".to_string(),
            )),
        }
    }
}
