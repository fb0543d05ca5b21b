//! Scoring, ranking, and live refresh engine for creator contest leaderboards.
//!
//! The crate turns raw per-submission engagement metrics into explainable
//! scores, orders entrants into a stable leaderboard, and keeps that
//! leaderboard fresh while a contest is live. HTTP exposure, configuration,
//! and telemetry live alongside the engine so the API service stays thin.

pub mod config;
pub mod contests;
pub mod error;
pub mod telemetry;
