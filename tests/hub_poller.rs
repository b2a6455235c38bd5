mod common;

use common::ScriptedDriver;

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use transfer_hub::{
    Backend, HubBuilder, HubError, Interest, InterestSet, Outcome, Poller, Status, Transfer,
};

// Descriptor never handed to a real syscall: the scripted poller decides
// readiness and the scripted driver does the I/O.
const FAKE_FD: i32 = 1000;

enum Step {
    Interrupt,
    Fail,
    Idle,
    // Sleeps for the given time, then reports nothing ready.
    Pause(Duration),
    ReadyAll,
}

#[derive(Default)]
struct Record {
    timeouts: Vec<Option<Duration>>,
    interests: Vec<Vec<(i32, Interest)>>,
}

struct ScriptedPoller {
    script: VecDeque<Step>,
    record: Arc<Mutex<Record>>,
}

impl ScriptedPoller {
    fn new(script: Vec<Step>) -> (Box<Self>, Arc<Mutex<Record>>) {
        let record = Arc::new(Mutex::new(Record::default()));
        let poller = Box::new(Self {
            script: script.into(),
            record: record.clone(),
        });

        (poller, record)
    }
}

impl Poller for ScriptedPoller {
    fn poll(
        &mut self,
        set: &mut InterestSet,
        timeout: Option<Duration>,
    ) -> transfer_hub::Result<usize> {
        {
            let mut record = self.record.lock().unwrap();
            record.timeouts.push(timeout);
            record.interests.push(set.iter().collect());
        }

        match self.script.pop_front().unwrap_or(Step::ReadyAll) {
            Step::Interrupt => Err(io::Error::from(io::ErrorKind::Interrupted).into()),
            Step::Fail => Err(io::Error::from_raw_os_error(libc::EBADF).into()),
            Step::Idle => {
                std::thread::sleep(timeout.unwrap_or(Duration::from_millis(1)));
                Ok(0)
            }
            Step::Pause(delay) => {
                std::thread::sleep(delay);
                Ok(0)
            }
            Step::ReadyAll => {
                for index in 0..set.len() {
                    set.set_ready(index);
                }
                Ok(set.len())
            }
        }
    }
}

#[test]
fn interrupted_wait_is_retried() {
    let (poller, record) = ScriptedPoller::new(vec![Step::Interrupt, Step::ReadyAll]);
    let driver = Arc::new(ScriptedDriver::new(vec![Outcome::Success(3)]));
    let mut buffer = [0u8; 3];

    let mut hub = HubBuilder::new().poller(poller).build();
    let id = hub.add(Transfer::read(driver, FAKE_FD, &mut buffer));

    hub.wait().expect("interruption is not an error");

    assert_eq!(hub.get(id).unwrap().status(), Status::Completed);
    assert_eq!(record.lock().unwrap().timeouts.len(), 2);
}

#[test]
fn failed_wait_is_fatal() {
    let (poller, _record) = ScriptedPoller::new(vec![Step::Fail]);
    let driver = Arc::new(ScriptedDriver::new(vec![Outcome::Success(3)]));
    let mut buffer = [0u8; 3];

    let mut hub = HubBuilder::new().poller(poller).build();
    let id = hub.add(Transfer::read(driver.clone(), FAKE_FD, &mut buffer));

    let error = hub.wait().expect_err("poll failure must surface");

    assert!(matches!(error, HubError::Poll(ref e) if e.raw_os_error() == Some(libc::EBADF)));
    assert_eq!(hub.get(id).unwrap().status(), Status::Pending);
    assert_eq!(driver.calls(), 0);
}

#[test]
fn interest_set_follows_direction_and_progress() {
    let script = vec![Step::ReadyAll, Step::ReadyAll, Step::ReadyAll];
    let (poller, record) = ScriptedPoller::new(script);
    let reader = Arc::new(ScriptedDriver::new(vec![
        Outcome::Success(2),
        Outcome::Success(1),
        Outcome::Success(1),
    ]));
    let writer = Arc::new(ScriptedDriver::new(vec![
        Outcome::Success(1),
        Outcome::Success(3),
    ]));
    let mut inbound = [0u8; 4];
    let outbound = [7u8; 4];

    let mut hub = HubBuilder::new().poller(poller).build();
    let read_id = hub.add(Transfer::read(reader, 10, &mut inbound).with_min_len(2));
    let write_id = hub.add(Transfer::write(writer, 11, &outbound));

    // Reader reaches min_len; the writer is still short.
    hub.wait().expect("first wait");
    assert_eq!(hub.get(read_id).unwrap().status(), Status::Completed);
    assert_eq!(hub.get(write_id).unwrap().status(), Status::Pending);

    // The completed reader still has room, so it is waited on with the writer.
    hub.wait().expect("second wait");
    assert_eq!(hub.get(write_id).unwrap().status(), Status::Completed);

    // Only the reader has room left; filling it ends the wait.
    hub.wait().expect("third wait");
    assert_eq!(hub.get(read_id).unwrap().transferred_len(), 4);

    let record = record.lock().unwrap();
    let sorted = |pass: usize| {
        let mut interests = record.interests[pass].clone();
        interests.sort_by_key(|(fd, _)| *fd);
        interests
    };

    let both = vec![(10, Interest::Readable), (11, Interest::Writable)];
    assert_eq!(record.interests.len(), 3);
    assert_eq!(sorted(0), both);
    assert_eq!(sorted(1), both);
    assert_eq!(sorted(2), vec![(10, Interest::Readable)]);
}

#[test]
fn zero_byte_progress_restarts_the_timeout() {
    // Every idle pause is shorter than the timeout, but together they run
    // far past it. Only the reset on each empty success keeps it alive.
    let mut script = Vec::new();
    for _ in 0..30 {
        script.push(Step::Pause(Duration::from_millis(8)));
        script.push(Step::ReadyAll);
    }
    let (poller, _record) = ScriptedPoller::new(script);

    let mut outcomes = vec![Outcome::Success(0); 30];
    outcomes.push(Outcome::Success(1));
    let driver = Arc::new(ScriptedDriver::new(outcomes));
    let mut buffer = [0u8; 1];

    let mut hub = HubBuilder::new().poller(poller).build();
    let id = hub.add(
        Transfer::read(driver.clone(), FAKE_FD, &mut buffer)
            .with_timeout(Duration::from_millis(20)),
    );

    let start = Instant::now();
    hub.wait().expect("wait");

    let transfer = hub.get(id).unwrap();
    assert_eq!(transfer.status(), Status::Completed);
    assert!(!transfer.is_timed_out());
    assert_eq!(transfer.transferred_len(), 1);
    assert_eq!(driver.calls(), 31);
    assert!(start.elapsed() >= Duration::from_millis(200));
}

#[test]
fn infinite_timeouts_block_without_limit() {
    let (poller, record) = ScriptedPoller::new(vec![Step::ReadyAll]);
    let driver = Arc::new(ScriptedDriver::new(vec![Outcome::Success(1)]));
    let mut buffer = [0u8; 1];

    let mut hub = HubBuilder::new().poller(poller).build();
    hub.add(Transfer::read(driver, FAKE_FD, &mut buffer));
    hub.wait().expect("wait");

    assert_eq!(record.lock().unwrap().timeouts, vec![None]);
}

#[test]
fn wait_uses_earliest_deadline() {
    let (poller, record) = ScriptedPoller::new(vec![Step::ReadyAll]);
    let mut first = [0u8; 1];
    let mut second = [0u8; 1];

    let mut hub = HubBuilder::new().poller(poller).build();
    hub.add(
        Transfer::read(
            Arc::new(ScriptedDriver::new(vec![Outcome::Success(1)])),
            FAKE_FD,
            &mut first,
        )
        .with_timeout(Duration::from_secs(30)),
    );
    hub.add(
        Transfer::read(
            Arc::new(ScriptedDriver::new(vec![Outcome::Success(1)])),
            FAKE_FD + 1,
            &mut second,
        )
        .with_timeout(Duration::from_millis(250)),
    );
    hub.wait().expect("wait");

    let timeout = record.lock().unwrap().timeouts[0].expect("finite timeout");
    assert!(timeout <= Duration::from_millis(250));
    assert!(timeout > Duration::from_millis(100));
}

#[test]
fn expired_deadline_waits_at_least_one_millisecond() {
    let script = (0..8).map(|_| Step::Idle).collect();
    let (poller, record) = ScriptedPoller::new(script);
    let driver = Arc::new(ScriptedDriver::new(Vec::new()));
    let mut buffer = [0u8; 1];

    let mut hub = HubBuilder::new().poller(poller).build();
    let id = hub.add(
        Transfer::read(driver, FAKE_FD, &mut buffer).with_timeout(Duration::from_millis(2)),
    );
    hub.wait().expect("wait");

    assert!(hub.get(id).unwrap().is_timed_out());
    for timeout in &record.lock().unwrap().timeouts {
        assert!(timeout.expect("finite timeout") >= Duration::from_millis(1));
    }
}

#[test]
fn would_block_on_ready_descriptor_is_not_an_error() {
    let (poller, record) = ScriptedPoller::new(vec![Step::ReadyAll, Step::ReadyAll]);
    let driver = Arc::new(ScriptedDriver::new(vec![
        Outcome::WouldBlock,
        Outcome::Success(2),
    ]));
    let mut buffer = [0u8; 2];

    let mut hub = HubBuilder::new().poller(poller).build();
    let id = hub.add(Transfer::read(driver.clone(), FAKE_FD, &mut buffer));
    hub.wait().expect("wait");

    assert_eq!(hub.get(id).unwrap().status(), Status::Completed);
    assert_eq!(driver.calls(), 2);
    assert_eq!(record.lock().unwrap().timeouts.len(), 2);
}

#[test]
fn select_backend_rejects_descriptors_beyond_fd_setsize() {
    let driver = Arc::new(ScriptedDriver::new(Vec::new()));
    let mut buffer = [0u8; 1];
    let huge_fd = libc::FD_SETSIZE as i32 + 10;

    let mut hub = HubBuilder::new().backend(Backend::Select).build();
    hub.add(Transfer::read(driver, huge_fd, &mut buffer));

    let error = hub.wait().expect_err("select cannot watch this descriptor");
    assert!(matches!(
        error,
        HubError::DescriptorOutOfRange { fd, .. } if fd == huge_fd
    ));
}
