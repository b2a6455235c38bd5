//! Readiness-multiplexed transfer engine for non-blocking descriptors.
//!
//! This crate drives many partial reads and writes over file descriptors
//! (usually sockets) to completion with a single blocking multiplexing call,
//! enforcing per-transfer byte counts and inactivity timeouts.
//!
//! # Architecture
//!
//! - **Transfer**: one read or write over a descriptor, with a borrowed
//!   buffer, `min_len`/`max_len` bounds, a timeout and a status
//! - **Driver**: the read/write/disconnect capability set of a transport
//! - **TransferHub**: the set of registered transfers and the wait loop that
//!   moves their bytes
//! - **Poller**: the `poll(2)` or `select(2)` call the hub blocks in
//! - **HubBuilder**: fluent builder choosing the backend
//! - **net::socket**: a socket driver and non-blocking socket helpers
//!
//! The hub never spawns threads and never calls back into the caller: each
//! [`TransferHub::wait`] blocks until at least one transfer completes,
//! errors or times out, then returns.

mod builder;
mod error;
mod hub;
pub mod net;
mod transfer;
mod utils;

pub use builder::{Backend, HubBuilder};
pub use error::{HubError, Result};
pub use hub::core::{TransferHub, TransferId};
pub use hub::poller::poll::PollPoller;
pub use hub::poller::select::SelectPoller;
pub use hub::poller::{Interest, InterestSet, Poller};
pub use net::socket::SocketDriver;
pub use transfer::driver::{Driver, Outcome, UNSET_FD};
pub use transfer::{Direction, Status, TIMEOUT_MESSAGE, Transfer};
