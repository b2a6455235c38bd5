//! Readiness multiplexing backends.
//!
//! The hub describes what it waits for as an [`InterestSet`]: one entry per
//! selected transfer, in selection order. A [`Poller`] blocks until at least
//! one entry is ready or the timeout elapses, and marks the ready entries.
//!
//! - [`poll`]: `poll(2)`, no descriptor limit (default)
//! - [`select`]: `select(2)` over `fd_set`s, descriptors below `FD_SETSIZE`

pub mod poll;
pub mod select;

use crate::error::Result;
use crate::transfer::Direction;

use std::os::unix::io::RawFd;
use std::time::Duration;

/// Kind of readiness an entry waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Readable,
    Writable,
}

impl From<Direction> for Interest {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Read => Interest::Readable,
            Direction::Write => Interest::Writable,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    fd: RawFd,
    interest: Interest,
    ready: bool,
}

/// Descriptors to wait on, and which of them turned out ready.
///
/// The same descriptor may appear more than once, e.g. when one transfer
/// reads a socket while another writes it.
#[derive(Debug, Default)]
pub struct InterestSet {
    entries: Vec<Entry>,
}

impl InterestSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, not ready, and returns its index.
    pub fn push(&mut self, fd: RawFd, interest: Interest) -> usize {
        self.entries.push(Entry {
            fd,
            interest,
            ready: false,
        });

        self.entries.len() - 1
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<(RawFd, Interest)> {
        self.entries
            .get(index)
            .map(|entry| (entry.fd, entry.interest))
    }

    pub fn iter(&self) -> impl Iterator<Item = (RawFd, Interest)> + '_ {
        self.entries.iter().map(|entry| (entry.fd, entry.interest))
    }

    pub fn set_ready(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            entry.ready = true;
        }
    }

    pub fn is_ready(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|entry| entry.ready)
    }

    /// Highest descriptor in the set.
    pub fn max_fd(&self) -> Option<RawFd> {
        self.entries.iter().map(|entry| entry.fd).max()
    }
}

/// A blocking readiness wait over an [`InterestSet`].
///
/// Implementations block for at most `timeout` (forever when `None`), mark
/// every ready entry with [`InterestSet::set_ready`] and return how many they
/// marked. An interrupted wait must be reported as
/// [`HubError::Poll`](crate::HubError::Poll) with
/// [`io::ErrorKind::Interrupted`](std::io::ErrorKind::Interrupted); the hub
/// retries those.
pub trait Poller {
    fn poll(&mut self, set: &mut InterestSet, timeout: Option<Duration>) -> Result<usize>;
}
