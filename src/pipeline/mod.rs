//! Pipeline module: the unit matrix and its runner
//!
//! This module contains:
//! - Unit identity, per-unit state tracking and report entries
//! - The runner that drives fetch, extract, compare and escalation
//! - Planning of unit lists from a domain matrix or an artifact store
//! - Domain list loading

mod domains;
mod plan;
mod runner;
mod unit;

pub use domains::{load_domains, parse_domains};
pub use plan::{plan_from_store, plan_matrix, PlanFilter};
pub use runner::{RunMode, RunOptions, RunOutcome, Runner};
pub use unit::{FailureStage, UnitEntry, UnitFailure, UnitKey, UnitStatus};
