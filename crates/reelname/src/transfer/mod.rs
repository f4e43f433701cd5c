//! Transfer queue: bounded concurrent copies to local and SSH destinations.

pub mod local;
pub mod progress;
pub mod runner;
pub mod scheduler;
pub mod sftp;

pub use local::copy_local;
pub use progress::{
    NoopObserver, TransferEvent, TransferObserver, TransferOutcome, TransferProgress,
    TransferProgressBroadcaster,
};
pub use runner::{process_transfer, TransferContext};
pub use scheduler::{TransferRequest, TransferScheduler};
pub use sftp::{copy_sftp, test_connection};
