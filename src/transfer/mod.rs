//! One read or write operation driven by a [`TransferHub`](crate::TransferHub).
//!
//! A [`Transfer`] borrows its buffer from the caller for as long as it lives,
//! so the hub never copies or owns the bytes it moves. The caller configures
//! the transfer, hands it to the hub with
//! [`add`](crate::TransferHub::add), and gets it back, with its final status
//! and progress, from [`remove`](crate::TransferHub::remove).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use transfer_hub::{SocketDriver, Status, Transfer};
//!
//! let mut buffer = [0u8; 64];
//! let transfer = Transfer::read(Arc::new(SocketDriver), 3, &mut buffer)
//!     .with_min_len(4)
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(transfer.status(), Status::Unregistered);
//! assert_eq!(transfer.max_len(), 64);
//! ```

pub mod driver;

use driver::{Driver, UNSET_FD};

use std::fmt;
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Text reported by [`Transfer::error_message`] for a timed-out transfer.
pub const TIMEOUT_MESSAGE: &str = "timeout occurred";

/// Whether a transfer moves bytes in or out of its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Lifecycle of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Not yet added to a hub.
    Unregistered,
    /// Fewer than `min_len` bytes moved so far.
    Pending,
    /// At least `min_len` bytes moved. While fewer than `max_len` bytes have
    /// moved, a hub still holding the transfer keeps filling it, and a later
    /// failure can still turn it into [`Status::Errored`].
    Completed,
    /// The driver failed or the transfer timed out.
    Errored,
}

pub(crate) enum Buffer<'a> {
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

impl Buffer<'_> {
    fn len(&self) -> usize {
        match self {
            Buffer::Read(buf) => buf.len(),
            Buffer::Write(buf) => buf.len(),
        }
    }
}

/// A byte transfer over a single descriptor.
pub struct Transfer<'a> {
    pub(crate) driver: Option<Arc<dyn Driver>>,
    pub(crate) fd: RawFd,
    pub(crate) buffer: Buffer<'a>,
    pub(crate) min_len: usize,
    pub(crate) max_len: usize,
    pub(crate) transferred_len: usize,
    pub(crate) timeout: Option<Duration>,
    pub(crate) deadline: Option<Instant>,
    pub(crate) status: Status,
    pub(crate) error: Option<String>,
}

impl<'a> Transfer<'a> {
    /// Creates an unset transfer: no driver, no descriptor, empty buffer.
    pub fn new() -> Self {
        Self {
            driver: None,
            fd: UNSET_FD,
            buffer: Buffer::Read(&mut []),
            min_len: 0,
            max_len: 0,
            transferred_len: 0,
            timeout: None,
            deadline: None,
            status: Status::Unregistered,
            error: None,
        }
    }

    /// Creates a transfer that reads from `fd` into `buffer`.
    ///
    /// Both `min_len` and `max_len` start out as `buffer.len()`, so the
    /// transfer completes once the buffer is full.
    pub fn read(driver: Arc<dyn Driver>, fd: RawFd, buffer: &'a mut [u8]) -> Self {
        let len = buffer.len();

        Self {
            driver: Some(driver),
            fd,
            buffer: Buffer::Read(buffer),
            min_len: len,
            max_len: len,
            ..Self::new()
        }
    }

    /// Creates a transfer that writes `buffer` to `fd`.
    pub fn write(driver: Arc<dyn Driver>, fd: RawFd, buffer: &'a [u8]) -> Self {
        let len = buffer.len();

        Self {
            driver: Some(driver),
            fd,
            buffer: Buffer::Write(buffer),
            min_len: len,
            max_len: len,
            ..Self::new()
        }
    }

    /// Sets the number of bytes after which the transfer counts as completed.
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    /// Sets the number of bytes the hub may move at most.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Sets the inactivity timeout. A zero duration means no timeout.
    ///
    /// The clock restarts on every readiness cycle that does not fail, even
    /// one that moves zero bytes, so this bounds the gap between attempts
    /// rather than the gap between delivered bytes.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout).filter(|timeout| !timeout.is_zero());
        self
    }

    /// Returns the transfer to the state of [`Transfer::new`].
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn direction(&self) -> Direction {
        match self.buffer {
            Buffer::Read(_) => Direction::Read,
            Buffer::Write(_) => Direction::Write,
        }
    }

    pub fn descriptor(&self) -> RawFd {
        self.fd
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Bytes moved since the transfer was last added to a hub.
    pub fn transferred_len(&self) -> usize {
        self.transferred_len
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// The bytes moved so far: received data for a read, sent data for a
    /// write.
    pub fn data(&self) -> &[u8] {
        match &self.buffer {
            Buffer::Read(buf) => &buf[..self.transferred_len],
            Buffer::Write(buf) => &buf[..self.transferred_len],
        }
    }

    /// True when the transfer errored because its deadline passed.
    pub fn is_timed_out(&self) -> bool {
        self.status == Status::Errored && self.error.is_none()
    }

    /// Describes why the transfer errored.
    ///
    /// # Panics
    ///
    /// Panics if the status is not [`Status::Errored`].
    pub fn error_message(&self) -> &str {
        assert_eq!(
            self.status,
            Status::Errored,
            "error_message() called on a transfer that did not error"
        );

        self.error.as_deref().unwrap_or(TIMEOUT_MESSAGE)
    }

    /// Closes the descriptor through the driver. Does nothing on an unset
    /// transfer.
    pub fn disconnect(&mut self) {
        if let Some(driver) = &self.driver {
            driver.disconnect(&mut self.fd);
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.max_len.saturating_sub(self.transferred_len)
    }

    /// Pending, or completed with room left in the buffer.
    pub(crate) fn wants_progress(&self) -> bool {
        match self.status {
            Status::Pending => true,
            Status::Completed => self.transferred_len < self.max_len,
            Status::Unregistered | Status::Errored => false,
        }
    }

    pub(crate) fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for Transfer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Transfer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transfer")
            .field("direction", &self.direction())
            .field("fd", &self.fd)
            .field("min_len", &self.min_len)
            .field("max_len", &self.max_len)
            .field("transferred_len", &self.transferred_len)
            .field("timeout", &self.timeout)
            .field("status", &self.status)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
