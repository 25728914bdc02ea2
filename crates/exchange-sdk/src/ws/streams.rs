/*
[INPUT]:  Market ids / user addresses and typed consumer callbacks
[OUTPUT]: Filtered, display-ready stream callbacks with an unsubscribe handle
[POS]:    WebSocket layer - convenience subscriptions on top of WebSocketClient
[UPDATE]: When adding stream kinds or changing filtering rules
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::warn;

use super::client::{Shared, WebSocketClient};
use super::dispatcher::{Handler, Registration, handler};
use super::message::{BalanceUpdate, MessageKind, OrderUpdate, ServerMessage, Subscription};
use crate::enhancement::{EnhancedOrderbook, EnhancedTrade, Enhancer};

/// Handle for one façade subscription.
///
/// Dropping it does not unsubscribe; call [`StreamSubscription::unsubscribe`].
#[must_use = "call unsubscribe() to stop the stream"]
#[derive(Debug)]
pub struct StreamSubscription {
    shared: Arc<Shared>,
    registration: Registration,
    subscription: Subscription,
    active: AtomicBool,
}

impl StreamSubscription {
    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Remove the callback and release the subscription reference. Idempotent.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        self.registration.remove();
        self.shared.unsubscribe(&self.subscription);
    }
}

impl WebSocketClient {
    fn attach(
        &self,
        subscription: Subscription,
        kind: MessageKind,
        handler: Handler,
    ) -> StreamSubscription {
        // Handler first so nothing pushed right after the subscribe is missed.
        let registration = self.shared.handlers.register(kind, handler);
        self.shared.subscribe(&subscription);
        StreamSubscription {
            shared: Arc::clone(&self.shared),
            registration,
            subscription,
            active: AtomicBool::new(true),
        }
    }

    /// Trades for one market, with display values
    pub fn on_trades<F>(&self, market_id: &str, callback: F) -> StreamSubscription
    where
        F: Fn(EnhancedTrade) + Send + Sync + 'static,
    {
        let market = market_id.to_string();
        let enhancer = self.enhancer.clone();
        let skipped = Arc::clone(&self.shared.skipped_not_ready);

        let trade_handler = handler(move |message| {
            let ServerMessage::Trade { trade } = message else {
                return Ok(());
            };
            if trade.market_id != market {
                return Ok(());
            }
            if !ready(&enhancer, &skipped, "trade", &market) {
                return Ok(());
            }
            match enhancer.enhance_ws_trade(trade) {
                Ok(enhanced) => callback(enhanced),
                Err(err) => warn!(
                    market_id = %market,
                    trade_id = %trade.id,
                    error = %err,
                    "trade dropped"
                ),
            }
            Ok(())
        });

        self.attach(Subscription::trades(market_id), MessageKind::Trade, trade_handler)
    }

    /// Order book snapshots for one market, with display values
    pub fn on_orderbook<F>(&self, market_id: &str, callback: F) -> StreamSubscription
    where
        F: Fn(EnhancedOrderbook) + Send + Sync + 'static,
    {
        let market = market_id.to_string();
        let enhancer = self.enhancer.clone();
        let skipped = Arc::clone(&self.shared.skipped_not_ready);

        let book_handler = handler(move |message| {
            let ServerMessage::Orderbook { orderbook } = message else {
                return Ok(());
            };
            if orderbook.market_id != market {
                return Ok(());
            }
            if !ready(&enhancer, &skipped, "orderbook", &market) {
                return Ok(());
            }
            match enhancer.enhance_orderbook(orderbook) {
                Ok(enhanced) => callback(enhanced),
                Err(err) => warn!(market_id = %market, error = %err, "orderbook dropped"),
            }
            Ok(())
        });

        self.attach(Subscription::orderbook(market_id), MessageKind::Orderbook, book_handler)
    }

    /// Order status changes on the user's channel
    pub fn on_user_orders<F>(&self, user_address: &str, callback: F) -> StreamSubscription
    where
        F: Fn(OrderUpdate) + Send + Sync + 'static,
    {
        let order_handler = handler(move |message| {
            if let ServerMessage::Order(update) = message {
                callback(update.clone());
            }
            Ok(())
        });

        self.attach(Subscription::user(user_address), MessageKind::Order, order_handler)
    }

    /// Trades where the user is buyer or seller, with display values
    pub fn on_user_trades<F>(&self, user_address: &str, callback: F) -> StreamSubscription
    where
        F: Fn(EnhancedTrade) + Send + Sync + 'static,
    {
        let user = user_address.to_string();
        let enhancer = self.enhancer.clone();
        let skipped = Arc::clone(&self.shared.skipped_not_ready);

        let trade_handler = handler(move |message| {
            let ServerMessage::Trade { trade } = message else {
                return Ok(());
            };
            let involved = trade.buyer_address.eq_ignore_ascii_case(&user)
                || trade.seller_address.eq_ignore_ascii_case(&user);
            if !involved {
                return Ok(());
            }
            if !ready(&enhancer, &skipped, "user trade", &trade.market_id) {
                return Ok(());
            }
            match enhancer.enhance_ws_trade(trade) {
                Ok(enhanced) => callback(enhanced),
                Err(err) => warn!(
                    user_address = %user,
                    trade_id = %trade.id,
                    error = %err,
                    "user trade dropped"
                ),
            }
            Ok(())
        });

        self.attach(Subscription::user(user_address), MessageKind::Trade, trade_handler)
    }

    /// Balance changes on the user's channel
    pub fn on_user_balances<F>(&self, user_address: &str, callback: F) -> StreamSubscription
    where
        F: Fn(BalanceUpdate) + Send + Sync + 'static,
    {
        let balance_handler = handler(move |message| {
            if let ServerMessage::Balance(update) = message {
                callback(update.clone());
            }
            Ok(())
        });

        self.attach(Subscription::user(user_address), MessageKind::Balance, balance_handler)
    }
}

fn ready(enhancer: &Enhancer, skipped: &AtomicU64, stream: &str, market_id: &str) -> bool {
    if enhancer.cache().is_ready() {
        return true;
    }
    skipped.fetch_add(1, Ordering::Relaxed);
    warn!(stream, market_id, "message received before reference cache initialized; skipping");
    false
}
