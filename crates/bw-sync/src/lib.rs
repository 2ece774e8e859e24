//! Remote content synchronization for Beeweb.
//!
//! Mirrors Markdown files from remote repositories into the local content
//! directory:
//! - [`Manifest`]: last-known `{path, sha}` listing per group
//! - [`RemoteSource`]: tree listing and raw downloads ([`GithubSource`])
//! - [`sync_group`]: diff, concurrent fetch, all-or-nothing write
//! - [`Syncer`]: runs every group and tracks when the last check ran
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bw_config::Config;
//! use bw_sync::Syncer;
//!
//! let config = Config::load(None, None)?;
//! let syncer = Syncer::from_config(&config)?;
//! if syncer.is_due() {
//!     let report = syncer.run_cycle();
//!     println!("changed: {}", report.changed());
//! }
//! # Ok(())
//! # }
//! ```

mod cycle;
mod error;
mod manifest;
mod remote;
mod schedule;

pub use cycle::{CycleReport, GroupReport, Syncer, sync_group};
pub use error::SyncError;
pub use manifest::{Manifest, ManifestEntry};
pub use remote::{GithubSource, RemoteEntry, RemoteSource, create_agent, markdown_manifest};
pub use schedule::SyncState;
