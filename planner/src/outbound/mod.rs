//! Outbound adapters implementing domain ports for external collaborators.
//!
//! - **routing_http**: reqwest-backed client for the routing backend's route
//!   and search-ahead endpoints.
//! - **headless_map**: in-memory map library used by the CLI and behaviour
//!   tests where no browser widget exists.
//!
//! Adapters are thin translators that convert between domain types and
//! transport representations. They contain no business logic.

pub mod headless_map;
pub mod routing_http;
