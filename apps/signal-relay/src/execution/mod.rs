//! Order execution: gateway to the broker bridge and the open-trade guard.

mod gateway;
mod tracker;

pub use gateway::{BrokerPort, CloseOutcome, ExecutionGateway, ModifyOutcome, PlaceOutcome};
pub use tracker::{TradeTracker, TrackerRejection};
