//! Reader for epidemic-simulator results directories.
//!
//! A results tree is produced externally by the simulator; this crate
//! resolves locations within it and presents job/run output as tabular
//! records. The architecture separates:
//!
//! - **[`resolve`]** (with [`env`] and [`error`]): the path-resolution and
//!   precedence engine. Pure lookups and existence checks, read-only,
//!   idempotent; every caller goes through a [`ResolveRequest`].
//! - **Readers** ([`job`], [`run`], [`table`], [`snapshot`], [`keys`]):
//!   consume resolved paths and parse the fixed on-disk layout beneath them.
//! - **[`insert`]**: the one writer, for merging jobs between trees.

pub mod env;
pub mod error;
pub mod insert;
pub mod job;
pub mod keys;
pub mod logging;
pub mod resolve;
pub mod run;
pub mod snapshot;
pub mod table;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use env::{EnvSource, ProcessEnv};
pub use error::ResolveError;
pub use job::{CountType, Interval, Job, JobStatus};
pub use resolve::ResolveRequest;
pub use run::{ParamValue, Run};
pub use snapshot::Snapshot;
pub use table::Table;
