//! Typed, transactional persistence for DocBuilder.
//!
//! A single JSON snapshot on disk, guarded by one reader-writer lock
//! per store instance, exposed through six narrow sub-stores
//! (repositories, builds, schedules, statistics, configuration,
//! daemon info) plus a cooperative transaction boundary.

pub mod builds;
pub mod configuration;
pub mod daemon_info;
pub mod models;
pub mod repositories;
pub mod schedules;
pub mod snapshot;
pub mod statistics;
pub mod store;

pub use builds::Builds;
pub use configuration::{Configuration, LAST_GLOBAL_DOC_FILES_HASH};
pub use daemon_info::DaemonInfoStore;
pub use models::{
    derive_name_from_url, Build, BuildStatus, ConfigurationBag, DaemonInfo, DaemonStatus,
    Repository, Schedule, ScheduleTrigger, Statistics,
};
pub use repositories::Repositories;
pub use schedules::Schedules;
pub use snapshot::{Snapshot, FORMAT_VERSION};
pub use statistics::StatisticsStore;
pub use store::StateStore;

pub use docbuilder_core::error::{Error, ErrorCategory, ErrorSeverity, Result};
