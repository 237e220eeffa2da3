//! Short-lived link service for field interventions
//!
//! This library backs the fieldlink server: it issues expiry-bounded
//! `/track` and `/diag` capability links for field interventions, gates
//! anonymous client access on the matching horizon, takes in diagnostic
//! photos, and pushes record changes to the professional's dashboard in
//! realtime.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
