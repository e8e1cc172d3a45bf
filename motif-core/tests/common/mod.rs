#![allow(dead_code)]
//! Test harness utilities for motif-core integration tests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use motif_core::playlist::Session;
use motif_core::transport::TestTransport;
use motif_types::{Channel, ChannelId, CompletionEvent, Melody, MelodyId, Note};

/// A short ascending phrase, one note per pitch, back to back.
pub fn make_melody(id: u32, pitches: &[u8]) -> Melody {
    let notes = pitches
        .iter()
        .enumerate()
        .map(|(i, &p)| Note::new(p, i as f64 * 0.25, 0.25, 0.8))
        .collect();
    Melody::with_notes(MelodyId::new(id), format!("melody {}", id), notes)
}

/// A channel holding one two-note melody per id.
pub fn make_channel(id: u32, melody_ids: &[u32]) -> Channel {
    let mut channel = Channel::new(ChannelId::new(id), format!("channel {}", id));
    for &m in melody_ids {
        channel.add_melody(make_melody(m, &[60, 64]));
    }
    channel
}

/// Session with `count` channels, channel `i` holding melodies `10*i+1 ..= 10*i+3`.
pub fn make_session(count: u32) -> Session {
    Session::new(
        (0..count)
            .map(|i| make_channel(i, &[10 * i + 1, 10 * i + 2, 10 * i + 3]))
            .collect(),
    )
}

pub fn make_transport() -> Arc<TestTransport> {
    Arc::new(TestTransport::new())
}

/// Completion event stamped now, so it always postdates prior sends.
pub fn done(target: u32) -> CompletionEvent {
    CompletionEvent::new(target)
}

/// Wait for the next event on `rx`, panicking after `timeout`.
pub fn recv_within(rx: &Receiver<CompletionEvent>, timeout: Duration) -> CompletionEvent {
    match rx.recv_timeout(timeout) {
        Ok(event) => event,
        Err(e) => panic!("no completion event within {:?}: {}", timeout, e),
    }
}

/// Poll `check` until it returns true or `timeout` passes.
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    check()
}
