//! Merge engine for vaultsync replicas.
//!
//! Reconciles two independently edited replicas without a central
//! authority, using wall-clock timestamps in place of a vector clock:
//!
//! 1. The source tree is walked and matched to the target by identifier,
//!    creating, relocating and resolving nodes per [`MergeMode`].
//! 2. Both tombstone ledgers are unioned and applied to the merged tree.
//! 3. Custom icons missing from the target are copied.
//!
//! Re-merging an unchanged source is a no-op for every policy except
//! [`MergeMode::KeepBoth`], which adds a fresh backup copy each time.
//!
//! ```ignore
//! let mut merger = Merger::new(&source, &mut target);
//! let report = merger.merge()?;
//! for change in report.changes() {
//!     println!("{change}");
//! }
//! ```

mod change;
mod config;
mod conflict;
mod deletions;
mod error;
mod history;
mod merger;

pub use change::Change;
pub use config::MergeConfig;
pub use error::{MergeError, MergeResult};
pub use history::merge_history;
pub use merger::{MergeReport, Merger};
pub use vaultsync_model::MergeMode;
