//! Palaver: vote ledger, feed ranking, and cache coherence for a community platform.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
