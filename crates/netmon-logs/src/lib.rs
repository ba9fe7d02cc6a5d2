//! netmon logs - records, size-based rotation, and the rotating writer
//!
//! The active file is `<directory>/<file_name>`; rotated backups sit next
//! to it as `<file_name>.1` (newest) up to `<file_name>.<max_backup_files>`.
//! Every line has the form `<timestamp> [<LEVEL>] [<source>] - <message>`.

mod fallback;
mod record;
mod rotation;
mod writer;

pub use fallback::{ConsoleFallback, Fallback, MemoryFallback};
pub use record::{Level, ParseRecordError, Record};
pub use rotation::{existing_backups, rotate_files, RotationPolicy, RotationReport};
pub use writer::RotatingWriter;
