//! BDD step definitions for farmwatch service

pub mod dashboard_steps;
pub mod session_steps;
pub mod telemetry_steps;
