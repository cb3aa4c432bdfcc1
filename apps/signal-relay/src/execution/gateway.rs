//! Session-managed gateway to the broker bridge.
//!
//! Every failure (network, non-2xx, non-success return code) is converted
//! into an outcome value at this boundary. Callers never see an error type:
//! the pipeline must always acknowledge the inbound event, so nothing here
//! is allowed to propagate as a hard failure.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::broker::api_types::{AccountInfoResponse, RETCODE_DONE};
use crate::broker::{BridgeClient, BrokerError, DealRequest, PositionData, TradeResult, order_type_code};
use crate::models::{AccountSnapshot, OrderKind, Trade, TradeStatus};

/// Robot tag attached to every order this gateway places.
const MAGIC: i64 = 99_999;

/// Default slippage tolerance in points.
const DEVIATION: u32 = 10;

/// Broker surface the gateway depends on. Implemented by [`BridgeClient`]
/// and by test doubles.
#[async_trait]
pub trait BrokerPort: Send + Sync {
    /// Submit a deal.
    async fn send_deal(&self, deal: DealRequest) -> Result<TradeResult, BrokerError>;
    /// Update stop/target on a position.
    async fn modify(&self, ticket: i64, sl: Decimal, tp: Decimal)
    -> Result<TradeResult, BrokerError>;
    /// Fetch account info.
    async fn account_info(&self) -> Result<AccountInfoResponse, BrokerError>;
    /// Fetch open positions.
    async fn open_positions(&self) -> Result<Vec<PositionData>, BrokerError>;
}

#[async_trait]
impl BrokerPort for BridgeClient {
    async fn send_deal(&self, deal: DealRequest) -> Result<TradeResult, BrokerError> {
        Self::send_deal(self, deal).await
    }

    async fn modify(
        &self,
        ticket: i64,
        sl: Decimal,
        tp: Decimal,
    ) -> Result<TradeResult, BrokerError> {
        Self::modify(self, ticket, sl, tp).await
    }

    async fn account_info(&self) -> Result<AccountInfoResponse, BrokerError> {
        Self::account_info(self).await
    }

    async fn open_positions(&self) -> Result<Vec<PositionData>, BrokerError> {
        Self::open_positions(self).await
    }
}

/// Result of placing an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// The bridge accepted the order.
    Placed {
        /// Ticket the bridge assigned.
        ticket: Option<i64>,
    },
    /// The bridge refused the order or the call failed.
    Rejected {
        /// Human-readable reason, surfaced to the notifier.
        message: String,
    },
}

/// Result of closing a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The offsetting deal went through.
    Closed {
        /// Price the position was flattened at.
        exit_price: Decimal,
    },
    /// No live position with that ticket.
    NotFound,
    /// The bridge refused the offsetting deal or the call failed.
    Rejected {
        /// Human-readable reason.
        message: String,
    },
}

/// Result of modifying a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifyOutcome {
    /// Levels updated.
    Modified,
    /// The bridge refused or the call failed.
    Rejected {
        /// Human-readable reason.
        message: String,
    },
}

/// Gateway from pipeline trades to bridge deals.
#[derive(Debug)]
pub struct ExecutionGateway<B: BrokerPort> {
    broker: B,
}

impl<B: BrokerPort> ExecutionGateway<B> {
    /// Wrap a broker client.
    #[must_use]
    pub const fn new(broker: B) -> Self {
        Self { broker }
    }

    /// Submit a trade to the bridge, transitioning its status in place.
    ///
    /// Success moves the trade to `Open` (market) or leaves it `Pending`
    /// (limit acknowledged, not filled). Any failure moves it to `Error`.
    pub async fn place_order(&self, trade: &mut Trade) -> PlaceOutcome {
        let pending = trade.kind == OrderKind::Limit;
        let deal = DealRequest {
            action: "TRADE_ACTION_DEAL".to_string(),
            symbol: trade.symbol.clone(),
            volume: trade.quantity,
            order_type: order_type_code(trade.direction, pending),
            price: if pending { trade.entry } else { Decimal::ZERO },
            sl: trade.stop_loss,
            tp: trade.take_profit,
            comment: format!("relay {}", trade.id),
            magic: MAGIC,
            deviation: DEVIATION,
        };

        match self.broker.send_deal(deal).await {
            Ok(result) if result.retcode == RETCODE_DONE => {
                trade.ticket = result.order;
                trade.status = if pending {
                    TradeStatus::Pending
                } else {
                    TradeStatus::Open
                };
                tracing::info!(
                    trade_id = %trade.id,
                    symbol = %trade.symbol,
                    ticket = ?trade.ticket,
                    status = %trade.status,
                    "Order placed"
                );
                PlaceOutcome::Placed {
                    ticket: result.order,
                }
            }
            Ok(result) => {
                trade.status = TradeStatus::Error;
                let message = result
                    .comment
                    .unwrap_or_else(|| format!("order refused ({})", result.retcode));
                tracing::warn!(trade_id = %trade.id, %message, "Order rejected by bridge");
                PlaceOutcome::Rejected { message }
            }
            Err(e) => {
                trade.status = TradeStatus::Error;
                tracing::warn!(trade_id = %trade.id, error = %e, "Order placement failed");
                PlaceOutcome::Rejected {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Flatten the live position with `ticket` by submitting an offsetting
    /// market deal of the same volume.
    pub async fn close_position(&self, ticket: i64) -> CloseOutcome {
        let positions = match self.broker.open_positions().await {
            Ok(positions) => positions,
            Err(e) => {
                return CloseOutcome::Rejected {
                    message: e.to_string(),
                };
            }
        };

        let Some(position) = positions.into_iter().find(|p| p.ticket == ticket) else {
            return CloseOutcome::NotFound;
        };

        let deal = DealRequest {
            action: "TRADE_ACTION_DEAL".to_string(),
            symbol: position.symbol.clone(),
            volume: position.volume,
            order_type: order_type_code(position.direction().opposite(), false),
            price: Decimal::ZERO,
            sl: Decimal::ZERO,
            tp: Decimal::ZERO,
            comment: format!("Close Position {ticket}"),
            magic: MAGIC,
            deviation: DEVIATION,
        };

        match self.broker.send_deal(deal).await {
            Ok(result) if result.retcode == RETCODE_DONE => {
                tracing::info!(ticket, symbol = %position.symbol, "Position closed");
                CloseOutcome::Closed {
                    exit_price: position.price_current,
                }
            }
            Ok(result) => CloseOutcome::Rejected {
                message: result
                    .comment
                    .unwrap_or_else(|| format!("close refused ({})", result.retcode)),
            },
            Err(e) => CloseOutcome::Rejected {
                message: e.to_string(),
            },
        }
    }

    /// Update stop/target on an existing position.
    pub async fn modify_position(&self, ticket: i64, sl: Decimal, tp: Decimal) -> ModifyOutcome {
        match self.broker.modify(ticket, sl, tp).await {
            Ok(result) if result.retcode == RETCODE_DONE => ModifyOutcome::Modified,
            Ok(result) => ModifyOutcome::Rejected {
                message: result
                    .comment
                    .unwrap_or_else(|| format!("modify refused ({})", result.retcode)),
            },
            Err(e) => ModifyOutcome::Rejected {
                message: e.to_string(),
            },
        }
    }

    /// Fetch a read-only account snapshot. `None` when the bridge is
    /// unreachable; callers fall back to the configured balance.
    pub async fn account_snapshot(&self) -> Option<AccountSnapshot> {
        match self.broker.account_info().await {
            Ok(info) => Some(AccountSnapshot {
                login: info.login,
                currency: info.currency,
                balance: info.balance,
                equity: info.equity,
                margin: info.margin,
                free_margin: info.balance - info.margin,
                leverage: info.leverage,
                open_positions: info.positions,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Account snapshot unavailable");
                None
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetCategory, Direction};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    /// Scripted broker double. Returns canned responses without I/O.
    #[derive(Default)]
    struct StubBroker {
        deal_result: Option<TradeResult>,
        deal_error: Option<BrokerError>,
        positions: Vec<PositionData>,
        sent: Mutex<Vec<DealRequest>>,
    }

    #[async_trait]
    impl BrokerPort for StubBroker {
        async fn send_deal(&self, deal: DealRequest) -> Result<TradeResult, BrokerError> {
            self.sent.lock().unwrap().push(deal);
            if let Some(e) = &self.deal_error {
                return Err(e.clone());
            }
            Ok(self.deal_result.clone().unwrap_or(TradeResult {
                retcode: RETCODE_DONE.to_string(),
                order: Some(1001),
                comment: None,
            }))
        }

        async fn modify(
            &self,
            _ticket: i64,
            _sl: Decimal,
            _tp: Decimal,
        ) -> Result<TradeResult, BrokerError> {
            Ok(self.deal_result.clone().unwrap_or(TradeResult {
                retcode: RETCODE_DONE.to_string(),
                order: None,
                comment: None,
            }))
        }

        async fn account_info(&self) -> Result<AccountInfoResponse, BrokerError> {
            Err(BrokerError::Network("down".to_string()))
        }

        async fn open_positions(&self) -> Result<Vec<PositionData>, BrokerError> {
            Ok(self.positions.clone())
        }
    }

    fn trade(kind: OrderKind) -> Trade {
        Trade {
            id: "TRD-1".to_string(),
            created_at: Utc::now(),
            symbol: "EURUSD".to_string(),
            direction: Direction::Buy,
            kind,
            entry: dec!(1.0900),
            stop_loss: dec!(1.0880),
            take_profit: dec!(1.0950),
            targets: vec![],
            quantity: dec!(0.10),
            category: AssetCategory::Forex,
            confidence: Some(0.7),
            risk_reward: dec!(2.5),
            status: TradeStatus::Pending,
            ticket: None,
            exit_price: None,
            closed_at: None,
            pnl: None,
            pnl_percent: None,
        }
    }

    fn position(ticket: i64) -> PositionData {
        PositionData {
            ticket,
            symbol: "EURUSD".to_string(),
            position_type: 0,
            volume: dec!(0.10),
            price_open: dec!(1.0900),
            time_open: 0,
            price_current: dec!(1.0930),
            profit: dec!(30),
            comment: String::new(),
        }
    }

    #[tokio::test]
    async fn market_order_opens_on_done() {
        let gateway = ExecutionGateway::new(StubBroker::default());
        let mut t = trade(OrderKind::Market);

        let outcome = gateway.place_order(&mut t).await;
        assert_eq!(outcome, PlaceOutcome::Placed { ticket: Some(1001) });
        assert_eq!(t.status, TradeStatus::Open);
        assert_eq!(t.ticket, Some(1001));

        let sent = gateway.broker.sent.lock().unwrap();
        assert_eq!(sent[0].order_type, 0);
        assert_eq!(sent[0].price, Decimal::ZERO);
    }

    #[tokio::test]
    async fn limit_order_stays_pending_and_carries_price() {
        let gateway = ExecutionGateway::new(StubBroker::default());
        let mut t = trade(OrderKind::Limit);

        let outcome = gateway.place_order(&mut t).await;
        assert!(matches!(outcome, PlaceOutcome::Placed { .. }));
        assert_eq!(t.status, TradeStatus::Pending);

        let sent = gateway.broker.sent.lock().unwrap();
        assert_eq!(sent[0].order_type, 2);
        assert_eq!(sent[0].price, dec!(1.0900));
    }

    #[tokio::test]
    async fn non_done_retcode_rejects_without_error() {
        let broker = StubBroker {
            deal_result: Some(TradeResult {
                retcode: "TRADE_RETCODE_NO_MONEY".to_string(),
                order: None,
                comment: Some("not enough money".to_string()),
            }),
            ..Default::default()
        };
        let gateway = ExecutionGateway::new(broker);
        let mut t = trade(OrderKind::Market);

        let outcome = gateway.place_order(&mut t).await;
        assert_eq!(
            outcome,
            PlaceOutcome::Rejected {
                message: "not enough money".to_string()
            }
        );
        assert_eq!(t.status, TradeStatus::Error);
        assert!(t.ticket.is_none());
    }

    #[tokio::test]
    async fn network_failure_becomes_rejection() {
        let broker = StubBroker {
            deal_error: Some(BrokerError::Network("connection refused".to_string())),
            ..Default::default()
        };
        let gateway = ExecutionGateway::new(broker);
        let mut t = trade(OrderKind::Market);

        let outcome = gateway.place_order(&mut t).await;
        assert!(matches!(outcome, PlaceOutcome::Rejected { .. }));
        assert_eq!(t.status, TradeStatus::Error);
    }

    #[tokio::test]
    async fn close_submits_offsetting_deal() {
        let broker = StubBroker {
            positions: vec![position(7)],
            ..Default::default()
        };
        let gateway = ExecutionGateway::new(broker);

        let outcome = gateway.close_position(7).await;
        assert_eq!(
            outcome,
            CloseOutcome::Closed {
                exit_price: dec!(1.0930)
            }
        );

        let sent = gateway.broker.sent.lock().unwrap();
        // Buy position closes with a sell deal of the same volume.
        assert_eq!(sent[0].order_type, 1);
        assert_eq!(sent[0].volume, dec!(0.10));
    }

    #[tokio::test]
    async fn close_distinguishes_missing_position() {
        let gateway = ExecutionGateway::new(StubBroker::default());
        assert_eq!(gateway.close_position(404).await, CloseOutcome::NotFound);
    }

    #[tokio::test]
    async fn modify_reports_done_retcode() {
        let gateway = ExecutionGateway::new(StubBroker::default());
        let outcome = gateway.modify_position(7, dec!(1.0870), dec!(1.0960)).await;
        assert_eq!(outcome, ModifyOutcome::Modified);
    }

    #[tokio::test]
    async fn modify_surfaces_bridge_rejection() {
        let broker = StubBroker {
            deal_result: Some(TradeResult {
                retcode: "TRADE_RETCODE_INVALID_STOPS".to_string(),
                order: None,
                comment: Some("invalid stops".to_string()),
            }),
            ..Default::default()
        };
        let gateway = ExecutionGateway::new(broker);

        let outcome = gateway.modify_position(7, dec!(1.0870), dec!(1.0960)).await;
        assert_eq!(
            outcome,
            ModifyOutcome::Rejected {
                message: "invalid stops".to_string()
            }
        );
    }

    #[tokio::test]
    async fn account_snapshot_none_when_unreachable() {
        let gateway = ExecutionGateway::new(StubBroker::default());
        assert!(gateway.account_snapshot().await.is_none());
    }
}
