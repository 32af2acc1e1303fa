//! Progressive validation of wildfire insurance claims.
//!
//! A claim packet is scored against a weighted rule constitution, enriched with
//! additional evidence between passes, and re-scored until it reaches the target
//! score or the stage budget runs out.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
