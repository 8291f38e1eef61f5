//! DataDome bot protection relay for Zentinel
//!
//! Describes each inbound request to the DataDome validation API, applies the
//! verdict (allow, redirect, block) and forwards the protective headers the
//! service hands back.
//!
//! # Features
//!
//! - Request describer with static-asset and loopback bypass
//! - Verdict client with a hard deadline and fail-open fallback
//! - `Set-Cookie` domain correction for public-suffix scoped cookies
//! - Edge middleware and single-route wrapper for axum
//!
//! # Example
//!
//! ```ignore
//! use axum::{middleware, routing::get, Router};
//! use zentinel_agent_datadome::{relay, BotGuard, DataDomeConfig, VerdictClient};
//!
//! let client = VerdictClient::new(DataDomeConfig::with_server_key(key))?;
//! let guard = BotGuard::new(client);
//!
//! let app = Router::new()
//!     .route("/", get(index))
//!     .route_layer(middleware::from_fn_with_state(guard, relay::edge_middleware));
//! ```

pub mod client;
pub mod config;
pub mod describer;
pub mod error;
pub mod payload;
pub mod relay;
pub mod verdict;

pub use client::{Classifier, VerdictClient};
pub use config::DataDomeConfig;
pub use describer::{InboundRequest, RequestDescriptor, SkipReason};
pub use error::{SetupError, ValidationError};
pub use payload::{FormValue, VerdictPayload};
pub use relay::{BotGuard, Inspection};
pub use verdict::{RelayHeaders, Verdict, VerdictKind};
