//! File probe: on-demand filesystem queries used by the recorder.
//!
//! The recorder never touches the filesystem directly; everything goes
//! through a [`FileProbe`] so tests can run against a temp dir or a fake.

mod error;
mod local;
mod traits;

pub use error::ProbeError;
pub use local::LocalFileProbe;
pub use traits::FileProbe;
