//! appkit: an application shell on axum.
//!
//! Request paths are matched against registered route patterns and
//! dispatched to a template or an action; a session-backed `Auth` gates
//! firewalled routes. The binary in `main.rs` wires everything from the
//! environment; embedders can assemble a `Dispatcher` with their own
//! actions and controllers instead.

pub mod api;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod finder;
pub mod http;
pub mod middleware;
pub mod repos;
pub mod routing;
pub mod services;
pub mod state;
