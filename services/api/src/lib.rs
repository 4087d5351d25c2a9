//! Preceptor API Library Crate
//!
//! This library contains all the core logic for the Preceptor web service:
//! the application state, API handlers, routing, and configuration. The
//! `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
