#![allow(dead_code)]

use std::collections::VecDeque;
use std::os::unix::io::RawFd;
use std::sync::Mutex;

use transfer_hub::net::socket;
use transfer_hub::{Driver, Outcome, Status, TransferHub, TransferId};

/// Non-blocking pipe, returned as (read end, write end).
pub fn pipe() -> (RawFd, RawFd) {
    let mut fds = [0i32; 2];
    let res = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert_eq!(res, 0, "pipe() failed");

    socket::set_nonblocking(fds[0]).expect("nonblocking read end");
    socket::set_nonblocking(fds[1]).expect("nonblocking write end");

    (fds[0], fds[1])
}

/// A pipe whose read end stays readable until closed.
pub fn readable_pipe() -> (RawFd, RawFd) {
    let (rfd, wfd) = pipe();
    write_all(wfd, b"x");
    (rfd, wfd)
}

pub fn write_all(fd: RawFd, data: &[u8]) {
    let wrote = unsafe { libc::write(fd, data.as_ptr() as *const _, data.len()) };
    assert_eq!(wrote, data.len() as isize, "short pipe write");
}

pub fn read_some(fd: RawFd, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut _, buf.len()) };
    assert!(n >= 0, "pipe read failed");
    buf.truncate(n as usize);
    buf
}

pub fn close(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

pub fn status(hub: &TransferHub<'_>, id: TransferId) -> Status {
    hub.get(id).expect("registered transfer").status()
}

/// Driver that replays a fixed list of outcomes and records every request.
///
/// Reads fill the first `n` bytes of the buffer with `fill` on
/// `Success(n)`. Once the script runs out every call would block.
pub struct ScriptedDriver {
    outcomes: Mutex<VecDeque<Outcome>>,
    requests: Mutex<Vec<usize>>,
    fill: u8,
}

impl ScriptedDriver {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
            fill: 0xAB,
        }
    }

    /// Requested lengths, one per driver call.
    pub fn requests(&self) -> Vec<usize> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next(&self, requested: usize) -> Outcome {
        self.requests.lock().unwrap().push(requested);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::WouldBlock)
    }
}

impl Driver for ScriptedDriver {
    fn read_data(&self, _fd: RawFd, buf: &mut [u8]) -> Outcome {
        let outcome = self.next(buf.len());
        if let Outcome::Success(n) = outcome {
            buf[..n].fill(self.fill);
        }
        outcome
    }

    fn write_data(&self, _fd: RawFd, buf: &[u8]) -> Outcome {
        self.next(buf.len())
    }

    fn disconnect(&self, fd: &mut RawFd) {
        *fd = -1;
    }
}
