pub mod catalog;
pub mod config;
pub mod probe;
pub mod process;
pub mod recorder;
pub mod task;
pub mod testing;

pub use catalog::{CatalogError, CatalogSource, HttpCatalogSource};
pub use config::{
    load_config, load_config_from_str, validate_config, write_default_config, Config,
    ConfigError, SanitizedConfig,
};
pub use probe::{FileProbe, LocalFileProbe, ProbeError};
pub use process::{
    CommandSpec, ExitOutcome, ProcessError, ProcessHandle, ProcessLauncher, TokioProcessLauncher,
};
pub use recorder::{CycleReport, Recorder, RecorderError, RecorderSettings, RecorderStatus};
pub use task::{Task, TaskKind, TaskStore, TaskStoreError};
