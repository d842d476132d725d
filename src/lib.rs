//! Real-estate investment data lookups and the agent wiring around them.
//!
//! The lookups (postal geography, Census demographics, FEMA flood history,
//! read-only BigQuery) are exposed as capabilities on a [`agents::Coordinator`],
//! which an agent runtime drives. The report agent turns gathered data into an
//! interoffice memo through a hosted Gemini model.

pub mod agents;
pub mod census;
pub mod config;
pub mod console;
pub mod error;
pub mod fema;
pub mod gemini;
pub mod geo;
pub mod orchestrator;
pub mod tools;
pub mod types;
pub mod warehouse;

pub use config::Config;
pub use error::LookupError;
