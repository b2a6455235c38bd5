//! Fluent builder for [`TransferHub`] construction.
//!
//! Chooses the multiplexing backend the hub waits with and how much room to
//! reserve for transfers up front.

use crate::hub::core::TransferHub;
use crate::hub::poller::Poller;
use crate::hub::poller::poll::PollPoller;
use crate::hub::poller::select::SelectPoller;

/// Built-in multiplexing backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    /// `poll(2)`. No limit on descriptor values.
    #[default]
    Poll,
    /// `select(2)`. Descriptors must be below `FD_SETSIZE`.
    Select,
}

/// Builder for constructing [`TransferHub`] instances with fluent API.
///
/// # Example
/// ```
/// use transfer_hub::{Backend, HubBuilder};
///
/// let hub = HubBuilder::new().backend(Backend::Select).capacity(16).build();
/// assert!(hub.is_empty());
/// ```
pub struct HubBuilder {
    backend: Backend,
    poller: Option<Box<dyn Poller>>,
    capacity: usize,
}

impl Default for HubBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HubBuilder {
    /// Creates a builder for a `poll(2)`-backed hub.
    pub fn new() -> Self {
        Self {
            backend: Backend::Poll,
            poller: None,
            capacity: 0,
        }
    }

    /// Selects one of the built-in backends.
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Uses a custom backend. Takes precedence over [`backend`](Self::backend).
    pub fn poller(mut self, poller: Box<dyn Poller>) -> Self {
        self.poller = Some(poller);
        self
    }

    /// Reserves room for this many transfers.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Consumes the builder and constructs the hub.
    pub fn build<'a>(self) -> TransferHub<'a> {
        let poller = self.poller.unwrap_or_else(|| match self.backend {
            Backend::Poll => Box::new(PollPoller::new()),
            Backend::Select => Box::new(SelectPoller::new()),
        });

        TransferHub::with_poller(poller, self.capacity)
    }
}
