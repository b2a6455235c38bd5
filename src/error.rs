//! Errors surfaced by [`TransferHub::wait`](crate::TransferHub::wait).
//!
//! Per-transfer failures (driver errors and timeouts) are not errors of the
//! hub: they are recorded on the [`Transfer`](crate::Transfer) itself. The
//! variants here mean the multiplexing call could not be made at all, and no
//! transfer can make progress until the caller intervenes.

use std::io;
use std::os::unix::io::RawFd;

/// Fatal failure of the multiplexing wait.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The poll/select call failed for a reason other than interruption.
    #[error("multiplexing wait failed: {0}")]
    Poll(#[from] io::Error),

    /// The select backend cannot represent this descriptor in an `fd_set`.
    #[error("descriptor {fd} exceeds the select() limit of {limit}")]
    DescriptorOutOfRange { fd: RawFd, limit: usize },
}

/// Result type for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;
