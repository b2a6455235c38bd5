use super::{Interest, InterestSet, Poller};
use crate::error::Result;

use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT, c_int, nfds_t, pollfd};
use std::io;
use std::time::Duration;

/// [`Poller`] backed by `poll(2)`.
///
/// Hangup, error and invalid-descriptor conditions count as ready for either
/// interest, the way `select(2)` reports them: the driver call that follows
/// is what turns them into a transfer error.
#[derive(Debug, Default)]
pub struct PollPoller {
    fds: Vec<pollfd>,
}

impl PollPoller {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Poller for PollPoller {
    fn poll(&mut self, set: &mut InterestSet, timeout: Option<Duration>) -> Result<usize> {
        self.fds.clear();
        self.fds.extend(set.iter().map(|(fd, interest)| pollfd {
            fd,
            events: match interest {
                Interest::Readable => POLLIN,
                Interest::Writable => POLLOUT,
            },
            revents: 0,
        }));

        let timeout_ms = timeout.map_or(-1, timeout_millis);
        let result =
            unsafe { libc::poll(self.fds.as_mut_ptr(), self.fds.len() as nfds_t, timeout_ms) };

        if result < 0 {
            return Err(io::Error::last_os_error().into());
        }

        let mut ready = 0;
        for (index, fd) in self.fds.iter().enumerate() {
            if fd.revents & (fd.events | POLLHUP | POLLERR | POLLNVAL) != 0 {
                set.set_ready(index);
                ready += 1;
            }
        }

        Ok(ready)
    }
}

/// Rounds up so a wait never ends before the deadline it was computed for.
fn timeout_millis(timeout: Duration) -> c_int {
    timeout.as_micros().div_ceil(1000).min(c_int::MAX as u128) as c_int
}
