//! Switchyard - capability orchestration engine
//!
//! Maps abstract capabilities (e.g. `market_analysis`) to ranked sets of
//! interchangeable backends and dispatches requests through them with
//! bounded attempts, cascading fallback, per-backend admission control and
//! role/resource/action authorization.
//!
//! ```text
//! Registry -> CapabilityTable -> AdmissionControl / PolicyEngine -> Dispatcher
//! ```
//!
//! [`engine::Engine`] wires the components together and is what the admin
//! API and CLI drive.

pub mod admission;
pub mod api;
pub mod capability;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod policy;
pub mod registry;
pub mod telemetry;

pub use engine::{Engine, EngineError};
