//! # switchboard-srv: controller host
//!
//! Runs a [`Controller`](switchboard_core::Controller) on the configured
//! endpoint in front of an in-memory media server, so the control plane can
//! be driven without a real media pipeline.
//!
//! - [`config`]: TOML configuration
//! - [`media`]: the simulated media server
//! - [`service`]: wiring of controller, broadcaster and media server

pub mod config;
pub mod media;
pub mod service;
