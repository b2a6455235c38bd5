//! Transport driver contract.
//!
//! A driver moves bytes over one kind of descriptor (plain socket, pipe, a
//! TLS wrapper, ...). The hub only calls it after the descriptor has been
//! reported ready, so implementations are expected to make a single
//! non-blocking attempt and report what happened.

use std::os::unix::io::RawFd;

/// Value of a descriptor that is not open.
pub const UNSET_FD: RawFd = -1;

/// Result of a single driver attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// This many bytes were moved. May be less than requested.
    Success(usize),
    /// The descriptor had nothing to offer after all. Not an error.
    WouldBlock,
    /// The transfer cannot continue. The text ends up in
    /// [`Transfer::error_message`](crate::Transfer::error_message).
    Failed(String),
}

/// The read/write/disconnect capability set of a transport.
///
/// # Example
///
/// ```
/// use std::os::unix::io::RawFd;
/// use transfer_hub::{Driver, Outcome};
///
/// struct Null;
///
/// impl Driver for Null {
///     fn read_data(&self, _fd: RawFd, _buf: &mut [u8]) -> Outcome {
///         Outcome::WouldBlock
///     }
///
///     fn write_data(&self, _fd: RawFd, buf: &[u8]) -> Outcome {
///         Outcome::Success(buf.len())
///     }
///
///     fn disconnect(&self, fd: &mut RawFd) {
///         *fd = -1;
///     }
/// }
/// ```
pub trait Driver {
    /// Reads up to `buf.len()` bytes from `fd` into `buf`.
    fn read_data(&self, fd: RawFd, buf: &mut [u8]) -> Outcome;

    /// Writes up to `buf.len()` bytes from `buf` to `fd`.
    fn write_data(&self, fd: RawFd, buf: &[u8]) -> Outcome;

    /// Closes `fd` and sets it to [`UNSET_FD`]. Must be a no-op when `fd` is
    /// already unset.
    fn disconnect(&self, fd: &mut RawFd);
}
