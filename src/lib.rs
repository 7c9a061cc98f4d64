pub mod types;
pub mod color;
pub mod transaction;
pub mod signing;
pub mod artifact;
pub mod ledger;
pub mod pipeline;
pub mod pool;
pub mod dispatch;
pub mod source;
pub mod config;
pub mod metrics;
