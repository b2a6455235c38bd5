use super::{Interest, InterestSet, Poller};
use crate::error::{HubError, Result};

use libc::{FD_ISSET, FD_SET, FD_SETSIZE, FD_ZERO, fd_set, suseconds_t, time_t, timeval};
use std::io;
use std::mem;
use std::ptr;
use std::time::Duration;

/// [`Poller`] backed by `select(2)`.
///
/// Only descriptors below `FD_SETSIZE` can be waited on; anything larger
/// fails the wait with [`HubError::DescriptorOutOfRange`].
#[derive(Debug, Default)]
pub struct SelectPoller;

impl SelectPoller {
    pub fn new() -> Self {
        Self
    }
}

impl Poller for SelectPoller {
    fn poll(&mut self, set: &mut InterestSet, timeout: Option<Duration>) -> Result<usize> {
        let limit = FD_SETSIZE as usize;
        let mut read_set: fd_set = unsafe { mem::zeroed() };
        let mut write_set: fd_set = unsafe { mem::zeroed() };

        unsafe {
            FD_ZERO(&mut read_set);
            FD_ZERO(&mut write_set);
        }

        for (fd, interest) in set.iter() {
            if fd < 0 || fd as usize >= limit {
                return Err(HubError::DescriptorOutOfRange { fd, limit });
            }

            let target = match interest {
                Interest::Readable => &mut read_set,
                Interest::Writable => &mut write_set,
            };
            unsafe { FD_SET(fd, target) };
        }

        let max_fd = set.max_fd().unwrap_or(-1);

        let mut tv = timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        let tv_ptr = match timeout {
            Some(timeout) => {
                tv.tv_sec = timeout.as_secs().min(i32::MAX as u64) as time_t;
                tv.tv_usec = timeout.subsec_micros() as suseconds_t;
                &mut tv as *mut timeval
            }
            None => ptr::null_mut(),
        };

        let result = unsafe {
            libc::select(
                max_fd + 1,
                &mut read_set,
                &mut write_set,
                ptr::null_mut(),
                tv_ptr,
            )
        };

        if result < 0 {
            return Err(io::Error::last_os_error().into());
        }

        let mut ready = 0;
        for index in 0..set.len() {
            let Some((fd, interest)) = set.get(index) else {
                continue;
            };

            let source = match interest {
                Interest::Readable => &read_set,
                Interest::Writable => &write_set,
            };

            if unsafe { FD_ISSET(fd, source) } {
                set.set_ready(index);
                ready += 1;
            }
        }

        Ok(ready)
    }
}
