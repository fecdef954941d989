//! State module for tracking pipeline progress
//!
//! # Components
//!
//! - `UnitState`: stage of one (domain, crawler, extractor) unit of work
//! - `HostState`: per-host request timing for politeness delays

mod host_state;
mod unit_state;

pub use host_state::HostState;
pub use unit_state::UnitState;
