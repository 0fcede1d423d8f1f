//! Process launcher for the external capture and transcode programs.
//!
//! Processes are started non-blocking and returned as a [`ProcessHandle`]
//! the caller polls, waits on with a bound, or terminates. The external
//! programs are opaque: only their exit status and the tail of their stderr
//! are observed.
//!
//! # Example
//!
//! ```ignore
//! use recwatch_core::process::{CommandSpec, ProcessLauncher, TokioProcessLauncher};
//!
//! let launcher = TokioProcessLauncher::new();
//! launcher.validate(Path::new("streamlink"), "--version").await?;
//!
//! let mut handle = launcher
//!     .launch(&CommandSpec::new("streamlink", ["https://example.com/alice", "best"]))
//!     .await?;
//!
//! match handle.wait_timeout(Duration::from_secs(4)).await? {
//!     Some(exit) => println!("exited early: {}", exit),
//!     None => println!("running as pid {}", handle.id()),
//! }
//! ```

mod error;
mod tokio_launcher;
mod traits;
mod types;

pub use error::ProcessError;
pub use tokio_launcher::{TokioProcessHandle, TokioProcessLauncher};
pub use traits::{ProcessHandle, ProcessLauncher};
pub use types::{CommandSpec, ExitOutcome};
