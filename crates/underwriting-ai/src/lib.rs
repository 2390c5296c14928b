//! Decision reconciliation, scoring, and triage for the underwriting game.
//!
//! Underwriters mark each of a fixed set of properties as prioritized or discarded; the
//! `workflows::underwriting` module reconciles those choices against the AI model's
//! propensity predictions and exposes the result over HTTP.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
