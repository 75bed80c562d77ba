//! Bootstrap sequencing for the seefood backend.
//!
//! Brings the API server into a ready state: waits for the database to
//! accept connections (bounded backoff, deadline, cancellation), runs an
//! ordered list of idempotent setup steps (preflight, migrations, static
//! assets, account seeding), and hands the process over to the server.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod launch;
pub mod logging;
pub mod models;
pub mod probe;
pub mod repository;
pub mod secrets;
pub mod setup;

pub use config::Config;
pub use error::{Error, Result};
