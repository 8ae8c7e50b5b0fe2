//! Chapterwatch - manga metadata resolution across scanlation sites.
//!
//! This library provides functionality for:
//! - Reading title metadata and the latest chapter from manga sites
//! - Normalizing chapter labels, numbers and release dates
//! - Searching one or all sites behind a shared rate-limited queue

pub mod config;
pub mod console;
pub mod error;
pub mod normalize;
pub mod queue;
pub mod resolver;
pub mod search;
pub mod sites;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod testutil;

// Re-export commonly used types
pub use config::Config;
pub use console::Console;
pub use error::{ConfigError, SiteError};
pub use queue::RequestQueue;
pub use resolver::{AltSource, Resolver, SiteHealth};
pub use sites::{Site, SiteLoginState, SiteReachability, SiteRegistry, SiteType, Title};
pub use transport::{ReqwestTransport, Transport};
