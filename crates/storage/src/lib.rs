//! SQLite-backed storage of run reports.
//!
//! Every run of the harness can be persisted as an ordered list of case
//! records, so past runs can be listed and inspected after the process
//! exits.
//!
//! # Core Concepts
//!
//! - [`ReportStore`] wraps a SQLite database. Runs are opened with
//!   [`ReportStore::begin_run`], filled with [`ReportStore::append`] and
//!   closed with [`ReportStore::finish_run`]; [`ReportStore::save_report`]
//!   does all three for a finished [`harness::Report`].
//! - [`CaseRecord`] is one case's report plus its position in the run.
//! - [`RunId`] is a UUID identifying a run. It displays as a string, so the
//!   CLI can match runs by prefix.
//!
//! # Example
//!
//! ```no_run
//! use harness::Report;
//! use storage::ReportStore;
//!
//! let store = ReportStore::open("runs.db")?;
//! let run_id = store.save_report(&Report::default())?;
//!
//! for summary in store.list_runs()? {
//!     println!("{}: {} cases, {} not passed", summary.id, summary.case_count, summary.not_passed);
//! }
//! let _report = store.load_report(run_id)?;
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod record;
mod store;

pub use error::{Error, Result};
pub use record::{CaseRecord, RunId};
pub use store::{ReportStore, RunSummary};
