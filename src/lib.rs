//! Client-side API access for the inventory admin console.
//!
//! The console's screens (units, categories, products, suppliers, customers,
//! orders, purchases, subscriptions, employees, dashboards, reports) all go
//! through [`ApiClient`]: bearer auth on every request, every response body
//! decrypted from its envelope, one generic update routed by entity kind.

pub mod api;
pub mod config;
pub mod crypto;

pub use api::{ApiClient, ApiError, EntityKind};
pub use config::ConsoleConfig;
