//! Non-blocking TCP sockets and the driver that moves bytes over them.
//!
//! The helpers here are thin wrappers over the socket calls, meant to be
//! used around a [`TransferHub`](crate::TransferHub): sockets are switched
//! to non-blocking mode, connections and accepts never block, and waiting
//! for them to go through is done by registering a zero-length transfer.
//!
//! # Example
//!
//! ```no_run
//! use std::net::{Ipv4Addr, SocketAddrV4};
//! use transfer_hub::net::socket;
//!
//! # fn dial() -> std::io::Result<i32> {
//! let fd = socket::create()?;
//! socket::set_nonblocking(fd)?;
//! socket::connect(fd, SocketAddrV4::new(Ipv4Addr::LOCALHOST, 8080))?;
//! // Wait for writability with a zero-length write transfer, then:
//! socket::connect_check(fd)?;
//! # Ok(fd)
//! # }
//! ```

use crate::transfer::driver::{Driver, Outcome, UNSET_FD};

use libc::{
    AF_INET, EINPROGRESS, F_GETFL, F_SETFL, O_NONBLOCK, SO_ERROR, SO_REUSEADDR, SOCK_STREAM,
    SOL_SOCKET, c_int, c_void, fcntl, in_addr, sa_family_t, sockaddr, sockaddr_in, socklen_t,
};
use std::io;
use std::mem;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::unix::io::RawFd;

/// [`Driver`] for stream sockets, using `read(2)` and `write(2)`.
///
/// Works for any stream descriptor, pipes included. A zero-byte result means
/// the peer is gone and is reported as a failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketDriver;

impl Driver for SocketDriver {
    fn read_data(&self, fd: RawFd, buf: &mut [u8]) -> Outcome {
        if buf.is_empty() {
            return Outcome::Success(0);
        }

        let result = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut c_void, buf.len()) };
        classify(result, "cannot read data")
    }

    fn write_data(&self, fd: RawFd, buf: &[u8]) -> Outcome {
        if buf.is_empty() {
            return Outcome::Success(0);
        }

        let result = unsafe { libc::write(fd, buf.as_ptr() as *const c_void, buf.len()) };
        classify(result, "cannot send data")
    }

    fn disconnect(&self, fd: &mut RawFd) {
        close(fd);
    }
}

fn classify(result: isize, action: &str) -> Outcome {
    if result > 0 {
        return Outcome::Success(result as usize);
    }

    if result == 0 {
        return Outcome::Failed(format!("{action}: remote side closed connection"));
    }

    let error = io::Error::last_os_error();
    match error.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Outcome::WouldBlock,
        _ => Outcome::Failed(format!("{action}: {error}")),
    }
}

/// Creates an IPv4 stream socket.
pub fn create() -> io::Result<RawFd> {
    let fd = unsafe { libc::socket(AF_INET, SOCK_STREAM, 0) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(fd)
}

/// Closes `fd`, if open, and sets it to [`UNSET_FD`].
pub fn close(fd: &mut RawFd) {
    if *fd == UNSET_FD {
        return;
    }

    unsafe { libc::close(*fd) };
    *fd = UNSET_FD;
}

pub fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(fd, F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    if unsafe { fcntl(fd, F_SETFL, flags | O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Binds `fd` to `port` on every local interface, allowing address reuse.
/// Port 0 picks an ephemeral port; see [`local_addr`].
pub fn bind(fd: RawFd, port: u16) -> io::Result<()> {
    let reuse: c_int = 1;
    let result = unsafe {
        libc::setsockopt(
            fd,
            SOL_SOCKET,
            SO_REUSEADDR,
            &reuse as *const c_int as *const c_void,
            mem::size_of::<c_int>() as socklen_t,
        )
    };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }

    let addr = to_sockaddr(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
    let result = unsafe {
        libc::bind(
            fd,
            &addr as *const sockaddr_in as *const sockaddr,
            mem::size_of::<sockaddr_in>() as socklen_t,
        )
    };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

pub fn listen(fd: RawFd) -> io::Result<()> {
    if unsafe { libc::listen(fd, 128) } != 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Accepts a pending connection and makes it non-blocking.
///
/// Returns `Ok(None)` when no connection is waiting, which can happen even
/// after the listener was reported readable.
pub fn accept(fd: RawFd) -> io::Result<Option<RawFd>> {
    let mut client = unsafe { libc::accept(fd, std::ptr::null_mut(), std::ptr::null_mut()) };

    if client < 0 {
        let error = io::Error::last_os_error();
        if error.kind() == io::ErrorKind::WouldBlock {
            return Ok(None);
        }

        return Err(error);
    }

    if let Err(error) = set_nonblocking(client) {
        close(&mut client);
        return Err(error);
    }

    Ok(Some(client))
}

/// Starts connecting `fd` to `addr`.
///
/// On a non-blocking socket the connection is usually still in progress
/// when this returns; wait for writability, then call [`connect_check`].
pub fn connect(fd: RawFd, addr: SocketAddrV4) -> io::Result<()> {
    let addr = to_sockaddr(addr);
    let result = unsafe {
        libc::connect(
            fd,
            &addr as *const sockaddr_in as *const sockaddr,
            mem::size_of::<sockaddr_in>() as socklen_t,
        )
    };

    if result < 0 {
        let error = io::Error::last_os_error();
        if error.raw_os_error() == Some(EINPROGRESS) || error.kind() == io::ErrorKind::WouldBlock
        {
            return Ok(());
        }

        return Err(error);
    }

    Ok(())
}

/// Reports whether a connection started by [`connect`] went through.
pub fn connect_check(fd: RawFd) -> io::Result<()> {
    let mut error: c_int = 0;
    let mut length = mem::size_of::<c_int>() as socklen_t;

    let result = unsafe {
        libc::getsockopt(
            fd,
            SOL_SOCKET,
            SO_ERROR,
            &mut error as *mut c_int as *mut c_void,
            &mut length,
        )
    };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }

    if error != 0 {
        return Err(io::Error::from_raw_os_error(error));
    }

    Ok(())
}

/// Address `fd` is bound to.
pub fn local_addr(fd: RawFd) -> io::Result<SocketAddrV4> {
    let mut addr: sockaddr_in = unsafe { mem::zeroed() };
    let mut length = mem::size_of::<sockaddr_in>() as socklen_t;

    let result = unsafe {
        libc::getsockname(
            fd,
            &mut addr as *mut sockaddr_in as *mut sockaddr,
            &mut length,
        )
    };
    if result < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(SocketAddrV4::new(
        Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr)),
        u16::from_be(addr.sin_port),
    ))
}

fn to_sockaddr(addr: SocketAddrV4) -> sockaddr_in {
    let mut raw: sockaddr_in = unsafe { mem::zeroed() };

    #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
    {
        raw.sin_len = mem::size_of::<sockaddr_in>() as u8;
    }

    raw.sin_family = AF_INET as sa_family_t;
    raw.sin_port = addr.port().to_be();
    raw.sin_addr = in_addr {
        s_addr: u32::from(*addr.ip()).to_be(),
    };

    raw
}
