//! Domain types and configuration shared across the shoerev workspace.
//!
//! Everything here is storage- and transport-agnostic: the database gateway,
//! the source adapters, and the collector all speak in these types.

pub mod app_config;
pub mod config;
pub mod error;
pub mod mention;
pub mod report;
pub mod shoes;
pub mod store;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, CoreError};
pub use mention::{IdentityKey, MentionCandidate, MentionSource, RawItem, SourceKind};
pub use report::{RunReportEntry, RunStatus};
pub use shoes::{load_shoes, Shoe, ShoeConfig, ShoesFile};
pub use store::{MentionStore, PersistenceError, ShoeCatalog, UpsertOutcome};
