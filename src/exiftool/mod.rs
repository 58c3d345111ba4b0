//! Batch metadata extraction through a persistent ExifTool process
//!
//! One [`ExifToolSession`] owns one `exiftool -stay_open True` worker and can
//! run any number of batches on it. Results come back aligned with the input
//! paths, with `None` for files that do not exist.

pub mod binary;
pub mod channel;
pub mod progress;
pub mod protocol;
pub mod reconcile;
pub mod record;
pub mod session;

#[cfg(all(test, unix))]
pub(crate) mod mock;

pub use binary::{is_installed, ExifToolBinary, WorkerLauncher};
pub use progress::{LogProgress, ProgressObserver};
pub use reconcile::{ExistenceMask, ReconciledResult};
pub use record::MetadataRecord;
pub use session::{ExifToolSession, SessionState};
