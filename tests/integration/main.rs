//! Integration tests for the benchmark pipeline

mod common;
mod pipeline_tests;
mod replay_tests;
