use crate::error::{HubError, Result};
use crate::hub::deadline;
use crate::hub::poller::{InterestSet, Poller};
use crate::transfer::driver::{Outcome, UNSET_FD};
use crate::transfer::{Buffer, Status, Transfer};
use crate::utils::slab::{Key, Slab};

use std::io;
use std::time::Instant;
use tracing::{debug, trace};

/// Handle to a transfer registered with a [`TransferHub`].
///
/// Ids are never reused: once a transfer is removed, its id stops resolving
/// even if another transfer takes its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferId(Key);

/// A set of in-flight transfers and the multiplexing wait that drives them.
///
/// The hub owns each [`Transfer`] between [`add`](Self::add) and
/// [`remove`](Self::remove); the transfers in turn borrow their buffers from
/// the caller for `'a`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use transfer_hub::{SocketDriver, Status, Transfer, TransferHub};
///
/// # fn run(fd: i32) -> transfer_hub::Result<()> {
/// let mut buffer = [0u8; 512];
/// let mut hub = TransferHub::new();
///
/// let id = hub.add(
///     Transfer::read(Arc::new(SocketDriver), fd, &mut buffer)
///         .with_min_len(1)
///         .with_timeout(Duration::from_secs(10)),
/// );
///
/// while hub.get(id).map(|t| t.status()) == Some(Status::Pending) {
///     hub.wait()?;
/// }
///
/// let transfer = hub.remove(id).unwrap();
/// println!("received {} bytes", transfer.transferred_len());
/// # Ok(())
/// # }
/// ```
pub struct TransferHub<'a> {
    transfers: Slab<Transfer<'a>>,
    poller: Box<dyn Poller>,
    interests: InterestSet,
    selected: Vec<Key>,
}

impl<'a> TransferHub<'a> {
    /// Creates a hub with the default `poll(2)` backend.
    pub fn new() -> Self {
        crate::HubBuilder::new().build()
    }

    pub(crate) fn with_poller(poller: Box<dyn Poller>, capacity: usize) -> Self {
        Self {
            transfers: Slab::new(capacity),
            poller,
            interests: InterestSet::new(),
            selected: Vec::with_capacity(capacity),
        }
    }

    /// Registers a transfer and makes it pending.
    ///
    /// Progress is reset to zero, the deadline is computed from the timeout
    /// and any error left over from a previous registration is cleared.
    ///
    /// # Panics
    ///
    /// Panics if the transfer has no driver, its descriptor is unset,
    /// `min_len > max_len`, or the buffer is shorter than `max_len`.
    pub fn add(&mut self, mut transfer: Transfer<'a>) -> TransferId {
        assert!(transfer.driver.is_some(), "transfer has no driver");
        assert_ne!(transfer.fd, UNSET_FD, "transfer descriptor is unset");
        assert!(
            transfer.min_len <= transfer.max_len,
            "min_len {} exceeds max_len {}",
            transfer.min_len,
            transfer.max_len
        );
        assert!(
            transfer.max_len <= transfer.buffer_len(),
            "max_len {} exceeds buffer length {}",
            transfer.max_len,
            transfer.buffer_len()
        );

        transfer.transferred_len = 0;
        transfer.status = Status::Pending;
        transfer.deadline = deadline::deadline_from(Instant::now(), transfer.timeout);
        transfer.error = None;

        trace!(
            fd = transfer.fd,
            direction = ?transfer.direction(),
            min_len = transfer.min_len,
            max_len = transfer.max_len,
            "transfer registered"
        );

        TransferId(self.transfers.insert(transfer))
    }

    /// Unregisters a transfer and hands it back, leaving its status as is.
    ///
    /// Returns `None` if `id` is not registered.
    pub fn remove(&mut self, id: TransferId) -> Option<Transfer<'a>> {
        let transfer = self.transfers.remove(id.0)?;
        trace!(fd = transfer.fd, status = ?transfer.status, "transfer removed");

        Some(transfer)
    }

    pub fn get(&self, id: TransferId) -> Option<&Transfer<'a>> {
        self.transfers.get(id.0)
    }

    pub fn contains(&self, id: TransferId) -> bool {
        self.transfers.get(id.0).is_some()
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.len() == 0
    }

    /// Ids of every registered transfer, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = TransferId> + '_ {
        self.transfers.iter().map(|(key, _)| TransferId(key))
    }

    /// Blocks until a pending transfer completes, a transfer errors or times
    /// out.
    ///
    /// Returns immediately when no transfer is pending or still has room in
    /// its buffer. Each pass waits until the earliest deadline among the
    /// transfers (at least one millisecond), moves bytes on every ready
    /// descriptor, and expires transfers whose deadline passed.
    ///
    /// The hub writes nothing to the user. It only emits `tracing` events at
    /// `TRACE` and `DEBUG` level (driver error text included), which stay
    /// silent unless the application installs a subscriber.
    ///
    /// # Errors
    ///
    /// Fails only when the multiplexing call itself fails. No transfer is
    /// touched in that case, and the hub cannot make progress until the
    /// cause is fixed.
    pub fn wait(&mut self) -> Result<()> {
        loop {
            let earliest = self.select();
            if self.selected.is_empty() {
                return Ok(());
            }

            let timeout = earliest.map(|at| deadline::time_to_wait(at, Instant::now()));
            trace!(transfers = self.selected.len(), ?timeout, "waiting for readiness");

            match self.poller.poll(&mut self.interests, timeout) {
                Ok(_) => {}
                Err(HubError::Poll(error)) if error.kind() == io::ErrorKind::Interrupted => {
                    debug!("multiplexing wait interrupted, retrying");
                    continue;
                }
                Err(error) => return Err(error),
            }

            if self.resolve(Instant::now()) {
                return Ok(());
            }
        }
    }

    /// Picks the transfers to wait on and fills the interest set for them.
    /// Returns their earliest deadline.
    fn select(&mut self) -> Option<Instant> {
        self.selected.clear();
        self.interests.clear();

        let mut earliest = None;
        for (key, transfer) in self.transfers.iter() {
            if !transfer.wants_progress() {
                continue;
            }

            self.interests.push(transfer.fd, transfer.direction().into());
            earliest = deadline::earliest(earliest, transfer.deadline);
            self.selected.push(key);
        }

        earliest
    }

    /// Applies the outcome of one multiplexing call. Returns true if any
    /// transfer completed, errored or timed out.
    fn resolve(&mut self, now: Instant) -> bool {
        let mut event = false;

        for (index, key) in self.selected.iter().enumerate() {
            let Some(transfer) = self.transfers.get_mut(*key) else {
                continue;
            };

            event |= if self.interests.is_ready(index) {
                attempt(transfer, now)
            } else {
                expire(transfer, now)
            };
        }

        event
    }
}

impl Default for TransferHub<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Moves bytes on a ready transfer.
fn attempt(transfer: &mut Transfer<'_>, now: Instant) -> bool {
    let remaining = transfer.remaining();

    let outcome = if remaining == 0 {
        Outcome::Success(0)
    } else {
        let Some(driver) = transfer.driver.as_ref() else {
            return false;
        };

        let range = transfer.transferred_len..transfer.max_len;
        match &mut transfer.buffer {
            Buffer::Read(buf) => driver.read_data(transfer.fd, &mut buf[range]),
            Buffer::Write(buf) => driver.write_data(transfer.fd, &buf[range]),
        }
    };

    match outcome {
        Outcome::Failed(message) => {
            debug!(fd = transfer.fd, error = %message, "transfer failed");
            transfer.status = Status::Errored;
            transfer.error = Some(message);
            true
        }
        Outcome::WouldBlock => false,
        Outcome::Success(len) => {
            transfer.transferred_len += len.min(remaining);
            transfer.deadline = deadline::deadline_from(now, transfer.timeout);

            if transfer.status == Status::Pending && transfer.transferred_len >= transfer.min_len {
                transfer.status = Status::Completed;
                return true;
            }

            false
        }
    }
}

/// Times out a transfer that was not ready, if its deadline passed.
fn expire(transfer: &mut Transfer<'_>, now: Instant) -> bool {
    if !deadline::is_expired(transfer.deadline, now) {
        return false;
    }

    debug!(fd = transfer.fd, "transfer timed out");
    transfer.status = Status::Errored;
    transfer.error = None;
    true
}
