pub mod config;
pub mod discover;
pub mod error;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod table;

pub use config::StudyConfig;
pub use discover::{discover_waves, WaveFile};
pub use error::WaveError;
pub use merge::{accumulate, full_join, join, JoinKind, MergeStep};
pub use process::{load_wave, DuplicatePolicy, LoadOptions};
pub use table::WaveTable;
