//! The transfer hub: membership plus the multiplexed wait.
//!
//! - [`core`]: [`TransferHub`](core::TransferHub) and its wait loop
//! - [`deadline`]: deadline arithmetic shared by the wait loop
//! - [`poller`]: `poll(2)` and `select(2)` backends

pub mod core;
pub(crate) mod deadline;
pub mod poller;
