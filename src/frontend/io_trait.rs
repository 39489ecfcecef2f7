//! Trait abstraction for frontend and timing operations to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;

use crate::diseqc::protocol::{BurstSelector, CommandFrame, ReplyFrame, ToneMode, Voltage};

/// Trait for DVB frontend SEC (satellite equipment control) operations
///
/// Each call maps to one driver ioctl and blocks until the driver is done.
#[async_trait]
pub trait FrontendIo: Send {
    /// Switch the 22 kHz continuous tone on or off
    async fn set_tone(&mut self, tone: ToneMode) -> io::Result<()>;

    /// Set the LNB supply voltage
    async fn set_voltage(&mut self, voltage: Voltage) -> io::Result<()>;

    /// Transmit one DiSEqC master command
    async fn send_master_cmd(&mut self, frame: &CommandFrame) -> io::Result<()>;

    /// Transmit a mini-DiSEqC tone burst
    async fn send_burst(&mut self, burst: BurstSelector) -> io::Result<()>;

    /// Wait up to `timeout` for a DiSEqC 2.x slave reply
    async fn recv_slave_reply(&mut self, timeout: Duration) -> io::Result<ReplyFrame>;
}

/// Trait for the settle delays between hardware steps
#[async_trait]
pub trait Sleeper: Send {
    async fn sleep(&mut self, duration: Duration);
}

/// Sleeper backed by the Tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    /// One recorded frontend call or sleep, in call order
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        Tone(ToneMode),
        Voltage(Voltage),
        Frame(Vec<u8>),
        Burst(BurstSelector),
        Reply,
        Sleep(Duration),
    }

    /// Kind of frontend call, for failure injection
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum CallKind {
        Tone,
        Voltage,
        Frame,
        Burst,
        Reply,
    }

    /// Mock frontend for testing
    ///
    /// Successful calls are appended to a shared event log. The sleeper returned
    /// by [`MockFrontend::sleeper`] logs into the same list, so tests can check
    /// the full choreography including delays.
    #[derive(Clone)]
    pub struct MockFrontend {
        pub events: Arc<Mutex<Vec<Event>>>,
        pub replies: Arc<Mutex<VecDeque<io::Result<ReplyFrame>>>>,
        failures: Arc<Mutex<Vec<(CallKind, usize)>>>,
        counts: Arc<Mutex<HashMap<CallKind, usize>>>,
    }

    impl MockFrontend {
        pub fn new() -> Self {
            Self {
                events: Arc::new(Mutex::new(Vec::new())),
                replies: Arc::new(Mutex::new(VecDeque::new())),
                failures: Arc::new(Mutex::new(Vec::new())),
                counts: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        /// Sleeper sharing this frontend's event log
        pub fn sleeper(&self) -> MockSleeper {
            MockSleeper {
                events: Arc::clone(&self.events),
            }
        }

        /// Make the `nth` (0-based) call of `kind` fail
        pub fn fail_call(&self, kind: CallKind, nth: usize) {
            self.failures.lock().unwrap().push((kind, nth));
        }

        /// Queue a slave reply; with an empty queue replies time out
        pub fn push_reply(&self, bytes: &[u8]) {
            self.replies.lock().unwrap().push_back(Ok(ReplyFrame::new(bytes)));
        }

        pub fn get_events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        /// Hardware calls only, sleeps filtered out
        pub fn get_calls(&self) -> Vec<Event> {
            self.get_events()
                .into_iter()
                .filter(|e| !matches!(e, Event::Sleep(_)))
                .collect()
        }

        pub fn get_frames(&self) -> Vec<Vec<u8>> {
            self.get_events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Frame(bytes) => Some(bytes),
                    _ => None,
                })
                .collect()
        }

        pub fn get_sleeps(&self) -> Vec<Duration> {
            self.get_events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Sleep(d) => Some(d),
                    _ => None,
                })
                .collect()
        }

        pub fn reply_requests(&self) -> usize {
            self.counts.lock().unwrap().get(&CallKind::Reply).copied().unwrap_or(0)
        }

        fn check(&self, kind: CallKind) -> io::Result<()> {
            let mut counts = self.counts.lock().unwrap();
            let count = counts.entry(kind).or_insert(0);
            let nth = *count;
            *count += 1;

            if self.failures.lock().unwrap().contains(&(kind, nth)) {
                return Err(io::Error::new(io::ErrorKind::Other, format!("Mock {:?} error", kind)));
            }
            Ok(())
        }

        fn record(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[async_trait]
    impl FrontendIo for MockFrontend {
        async fn set_tone(&mut self, tone: ToneMode) -> io::Result<()> {
            self.check(CallKind::Tone)?;
            self.record(Event::Tone(tone));
            Ok(())
        }

        async fn set_voltage(&mut self, voltage: Voltage) -> io::Result<()> {
            self.check(CallKind::Voltage)?;
            self.record(Event::Voltage(voltage));
            Ok(())
        }

        async fn send_master_cmd(&mut self, frame: &CommandFrame) -> io::Result<()> {
            self.check(CallKind::Frame)?;
            self.record(Event::Frame(frame.as_bytes().to_vec()));
            Ok(())
        }

        async fn send_burst(&mut self, burst: BurstSelector) -> io::Result<()> {
            self.check(CallKind::Burst)?;
            self.record(Event::Burst(burst));
            Ok(())
        }

        async fn recv_slave_reply(&mut self, _timeout: Duration) -> io::Result<ReplyFrame> {
            self.check(CallKind::Reply)?;
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(io::Error::new(io::ErrorKind::TimedOut, "Mock reply timeout")));
            if reply.is_ok() {
                self.record(Event::Reply);
            }
            reply
        }
    }

    /// Sleeper that returns immediately and records the requested duration
    #[derive(Clone)]
    pub struct MockSleeper {
        pub events: Arc<Mutex<Vec<Event>>>,
    }

    #[async_trait]
    impl Sleeper for MockSleeper {
        async fn sleep(&mut self, duration: Duration) {
            self.events.lock().unwrap().push(Event::Sleep(duration));
        }
    }
}
