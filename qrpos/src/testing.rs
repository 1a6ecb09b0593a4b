//! Scripted in-memory device for tests

use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::RgbImage;
use parking_lot::Mutex;

use qrpos_core::constants::{screens, verbs};
use qrpos_transport::{Error, Result, Transport};

const KNOWN_VERBS: &[&str] = &[
    verbs::SENDING,
    verbs::DELETE,
    verbs::CLEAR,
    verbs::FREE_SIZE,
    verbs::FILE_INFO,
    verbs::SET_TIMER,
    verbs::START_ROTATION,
    verbs::STOP_ROTATION,
    screens::WELCOME,
    screens::TOTAL,
    screens::QR_CODE,
    screens::SUCCESS,
    screens::FAIL,
    screens::CANCEL,
];

type ErrorFactory = Box<dyn Fn() -> Error + Send>;

#[derive(Default)]
struct FakeState {
    connected: bool,
    writes: Vec<Vec<u8>>,
    queued: VecDeque<String>,
    read_calls: usize,
    reads_since_write: usize,
    discards: usize,
    connect_calls: usize,
    disconnects: usize,
    connect_failures: usize,
    connect_error: Option<ErrorFactory>,
    fail_writes: bool,
    fail_discard: bool,
    replies: HashMap<String, Vec<String>>,
    silent_chunks: Vec<usize>,
    chunks_seen: usize,
}

impl FakeState {
    fn respond(&mut self, data: &[u8]) {
        match command_verb(data) {
            Some(verb) => {
                let lines = self
                    .replies
                    .get(&verb)
                    .cloned()
                    .unwrap_or_else(|| default_reply(&verb));
                self.queued.extend(lines);
            }
            None => {
                let index = self.chunks_seen;
                self.chunks_seen += 1;
                if !self.silent_chunks.contains(&index) {
                    self.queued.push_back("OK".into());
                }
            }
        }
    }
}

fn command_verb(data: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(data).ok()?;
    let line = text.strip_suffix('\n')?;
    let verb = line.split("**").next()?;
    KNOWN_VERBS.contains(&verb).then(|| verb.to_string())
}

fn default_reply(verb: &str) -> Vec<String> {
    let lines: &[&str] = match verb {
        verbs::SENDING => &["Ready to start receiving", "exit"],
        verbs::FREE_SIZE => &["free 12345", "exit"],
        verbs::FILE_INFO => &["1.jpeg 2048", "2.jpeg 4096", "exit"],
        verbs::START_ROTATION => &["rotation started"],
        verbs::STOP_ROTATION => &["rotation stopped"],
        v if v == screens::WELCOME || v.starts_with("Display") => &["screen ok"],
        _ => &["done", "exit"],
    };
    lines.iter().map(|s| s.to_string()).collect()
}

/// In-memory transport that answers like the terminal firmware
pub(crate) struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

/// Inspection and scripting handle for a `FakeTransport`
#[derive(Clone)]
pub(crate) struct FakeHandle {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    /// Fake device with default replies for every command
    pub(crate) fn device() -> (Self, FakeHandle) {
        let state = Arc::new(Mutex::new(FakeState::default()));
        (
            Self {
                state: state.clone(),
            },
            FakeHandle { state },
        )
    }
}

impl FakeHandle {
    pub(crate) fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    /// Every write that was a text command, without the newline
    pub(crate) fn commands(&self) -> Vec<String> {
        self.writes()
            .iter()
            .filter(|w| command_verb(w).is_some())
            .map(|w| String::from_utf8_lossy(&w[..w.len() - 1]).into_owned())
            .collect()
    }

    /// Every write that was raw chunk data
    pub(crate) fn chunks(&self) -> Vec<Vec<u8>> {
        self.writes()
            .into_iter()
            .filter(|w| command_verb(w).is_none())
            .collect()
    }

    pub(crate) fn read_calls(&self) -> usize {
        self.state.lock().read_calls
    }

    /// Reads issued since the most recent write
    pub(crate) fn reads_since_write(&self) -> usize {
        self.state.lock().reads_since_write
    }

    pub(crate) fn discards(&self) -> usize {
        self.state.lock().discards
    }

    pub(crate) fn connect_calls(&self) -> usize {
        self.state.lock().connect_calls
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.state.lock().disconnects
    }

    /// Fail the next `count` connection attempts
    pub(crate) fn fail_connects(&self, count: usize, error: impl Fn() -> Error + Send + 'static) {
        let mut state = self.state.lock();
        state.connect_failures = count;
        state.connect_error = Some(Box::new(error));
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub(crate) fn fail_discard(&self, fail: bool) {
        self.state.lock().fail_discard = fail;
    }

    /// Replace the reply to a command verb
    pub(crate) fn reply(&self, verb: &str, lines: &[&str]) {
        self.state.lock().replies.insert(
            verb.to_string(),
            lines.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// Never acknowledge the chunk with this index
    pub(crate) fn silence_chunk(&self, index: usize) {
        self.state.lock().silent_chunks.push(index);
    }

    /// Queue unsolicited input
    pub(crate) fn push_lines(&self, lines: &[&str]) {
        self.state
            .lock()
            .queued
            .extend(lines.iter().map(|s| s.to_string()));
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.connect_calls += 1;

        if state.connected {
            return Err(Error::AlreadyConnected);
        }

        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            if let Some(factory) = &state.connect_error {
                return Err(factory());
            }
        }

        state.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.connected {
            state.connected = false;
            state.disconnects += 1;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(Error::NotConnected);
        }
        if state.fail_writes {
            return Err(Error::Io(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged")));
        }

        state.writes.push(data.to_vec());
        state.reads_since_write = 0;
        state.respond(data);
        Ok(())
    }

    async fn read_line(&mut self, _timeout: Duration) -> Result<Option<String>> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(Error::NotConnected);
        }

        state.read_calls += 1;
        state.reads_since_write += 1;
        Ok(state.queued.pop_front())
    }

    async fn discard_input(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.discards += 1;
        if state.fail_discard {
            return Err(Error::Io(io::Error::other("clear failed")));
        }
        state.queued.clear();
        Ok(())
    }

    fn port_name(&self) -> String {
        "fake".into()
    }
}

/// Write a PNG of noise so it does not compress below a few chunks
pub(crate) fn noise_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let mut seed: u32 = 0x2545_F491;
    let image = RgbImage::from_fn(width, height, |_, _| {
        let mut px = [0u8; 3];
        for channel in &mut px {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            *channel = (seed & 0xFF) as u8;
        }
        image::Rgb(px)
    });

    let path = dir.join(name);
    image.save(&path).expect("write fixture image");
    path
}
