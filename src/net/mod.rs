//! TCP networking primitives.
//!
//! - [`socket`]: [`SocketDriver`](socket::SocketDriver) plus helpers to
//!   create, bind, accept and connect non-blocking sockets

pub mod socket;
