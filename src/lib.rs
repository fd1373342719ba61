//! Smart Home Bridge - Alexa v3 smart-home protocol translation
//!
//! This library turns device patterns detected on a home-automation platform
//! into assistant endpoints:
//! - Directive routing to the controls behind an endpoint
//! - Value conversion between backing states and assistant units
//! - Discovery, state reports and proactive change reports
//! - Per-endpoint and daily admission control
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Assistant (directives/events)           │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Device Manager                       │
//! │  Handlers  │  Rate Limiter  │  Devices  │  Controls  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Platform                           │
//! │   State Store  │  Transport  │  Control Detector     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod capabilities;
pub mod config;
pub mod context;
pub mod controls;
pub mod device;
pub mod device_manager;
pub mod error;
pub mod handlers;
pub mod platform;
pub mod properties;
pub mod protocol;
pub mod rate_limiter;
pub mod response;

pub use capabilities::{Capability, CapabilityKind};
pub use config::Config;
pub use context::BridgeContext;
pub use controls::{Control, ControlKind};
pub use device::Device;
pub use device_manager::DeviceManager;
pub use error::{Error, Result};
pub use platform::{
    ControlDetector, DetectedControl, MemoryStateStore, MemoryTransport, StateStore,
    StaticDetector, Transport,
};
pub use properties::{Property, PropertyKind};
pub use protocol::{Directive, ReportedProperty, endpoint_id};
pub use rate_limiter::{RateLimitError, RateLimiter};
pub use response::{AlexaResponse, ChangeCause, DirectiveError};
