//! `rollcall` - A student registration record book
//!
//! This library provides the core functionality for accepting student
//! registrations, persisting them to a flat JSON record book, and serving
//! the list back out.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod record;
pub mod registry;
pub mod server;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{Record, Submission};
pub use registry::Registry;
pub use server::RegistrationServer;
pub use store::{DecodeErrorPolicy, RecordStore};
