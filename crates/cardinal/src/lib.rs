//! Cardinal - client SDK for the Cardinal moderation and leveling API.
//!
//! # Quick Start
//!
//! ```no_run
//! use cardinal::{ApiConfig, Client};
//!
//! # async fn run() -> cardinal::CardinalResult<()> {
//! cardinal::telemetry::init_tracing().ok();
//!
//! let client = Client::new(ApiConfig::load()?);
//! client.login(std::env::var("CARDINAL_TOKEN").unwrap_or_default()).await?;
//!
//! if let Some(guild) = client.guilds().resolve("1234").await? {
//!     if let Some(member) = guild.members().resolve("5678").await? {
//!         member.add_xp(25).await?;
//!         println!("level {}", member.level());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `cardinal_error` - error types
//! - `cardinal_interface` - the `Transport` trait and response types
//! - `cardinal_cache` - identity-preserving entity cache
//! - `cardinal_api` - HTTP transport, configuration, connect handshake
//! - `cardinal_client` - client, entities and managers
//!
//! This crate re-exports everything for convenience.

pub use cardinal_api::*;
pub use cardinal_cache::{Entity, EntityCache, WeakEntityCache};
pub use cardinal_client::*;
pub use cardinal_error::*;
pub use cardinal_interface::*;

pub mod telemetry;
