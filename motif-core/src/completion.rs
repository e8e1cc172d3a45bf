//! Listener for the engine's completion notifications.
//!
//! The engine sends `/done <targetIndex>` when a one-shot playback finishes.
//! A background thread receives these over UDP and forwards them to the host
//! loop as [`CompletionEvent`]s. Player state never lives here, so a socket
//! failure and the rebind that follows lose nothing but in-flight datagrams.

use std::collections::VecDeque;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use rosc::{OscPacket, OscType};

use motif_types::CompletionEvent;

const RECV_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSettings {
    pub bind: SocketAddr,
    pub address: String,
    /// Number of recent events kept for diagnostics.
    pub history: usize,
    pub reconnect_delay: Duration,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            bind: (Ipv4Addr::LOCALHOST, 7001).into(),
            address: "/done".to_string(),
            history: 100,
            reconnect_delay: Duration::from_millis(500),
        }
    }
}

type History = Arc<Mutex<VecDeque<CompletionEvent>>>;

pub struct CompletionListener {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    history: History,
    recv_thread: Option<JoinHandle<()>>,
}

impl CompletionListener {
    /// Bind the listening socket and start the receive thread.
    ///
    /// Events arrive on the returned receiver in the order they were received.
    /// The channel disconnects once the listener is shut down.
    pub fn spawn(settings: CompletionSettings) -> io::Result<(Self, Receiver<CompletionEvent>)> {
        let socket = bind(settings.bind)?;
        // Rebinds reuse the resolved port even when the configured one was 0.
        let local_addr = socket.local_addr()?;
        log::info!(target: "completion", "listening for {} on {}", settings.address, local_addr);

        let (tx, rx) = crossbeam_channel::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let history: History = Arc::new(Mutex::new(VecDeque::with_capacity(settings.history)));

        let worker = Worker {
            socket: Some(socket),
            local_addr,
            settings,
            tx,
            shutdown: Arc::clone(&shutdown),
            history: Arc::clone(&history),
        };
        let recv_thread = thread::Builder::new()
            .name("motif-completion".to_string())
            .spawn(move || worker.run())?;

        Ok((
            Self {
                local_addr,
                shutdown,
                history,
                recv_thread: Some(recv_thread),
            },
            rx,
        ))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Most recent completion events, oldest first.
    pub fn history(&self) -> Vec<CompletionEvent> {
        match self.history.lock() {
            Ok(history) => history.iter().copied().collect(),
            Err(poisoned) => poisoned.into_inner().iter().copied().collect(),
        }
    }

    /// Stop the receive thread and wait for it to exit.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.recv_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CompletionListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn bind(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind(addr)?;
    socket.set_read_timeout(Some(RECV_TIMEOUT))?;
    Ok(socket)
}

struct Worker {
    socket: Option<UdpSocket>,
    local_addr: SocketAddr,
    settings: CompletionSettings,
    tx: Sender<CompletionEvent>,
    shutdown: Arc<AtomicBool>,
    history: History,
}

impl Worker {
    fn run(mut self) {
        let mut buf = [0u8; 4096];
        while !self.shutdown.load(Ordering::Relaxed) {
            let Some(socket) = self.socket.as_ref() else {
                self.rebind();
                continue;
            };
            match socket.recv(&mut buf) {
                Ok(n) => {
                    if !self.handle_datagram(&buf[..n]) {
                        log::debug!(target: "completion", "host loop gone, stopping listener");
                        return;
                    }
                }
                Err(ref e)
                    if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
                {
                    continue
                }
                Err(e) => {
                    log::warn!(target: "completion", "receive failed on {}: {}", self.local_addr, e);
                    self.socket = None;
                }
            }
        }
    }

    fn rebind(&mut self) {
        sleep_unless_shutdown(self.settings.reconnect_delay, &self.shutdown);
        if self.shutdown.load(Ordering::Relaxed) {
            return;
        }
        match bind(self.local_addr) {
            Ok(socket) => {
                log::info!(target: "completion", "rebound completion socket on {}", self.local_addr);
                self.socket = Some(socket);
            }
            Err(e) => log::warn!(target: "completion", "rebind on {} failed: {}", self.local_addr, e),
        }
    }

    /// Returns false once the receiving side of the channel has been dropped.
    fn handle_datagram(&self, bytes: &[u8]) -> bool {
        let packet = match rosc::decoder::decode_udp(bytes) {
            Ok((_, packet)) => packet,
            Err(e) => {
                log::warn!(target: "completion", "dropping undecodable packet ({} bytes): {:?}", bytes.len(), e);
                return true;
            }
        };
        for target_index in parse_completion(&packet, &self.settings.address) {
            let event = CompletionEvent::new(target_index);
            self.remember(event);
            log::debug!(target: "completion", "target {} finished", target_index);
            if self.tx.send(event).is_err() {
                return false;
            }
        }
        true
    }

    fn remember(&self, event: CompletionEvent) {
        if self.settings.history == 0 {
            return;
        }
        let mut history = match self.history.lock() {
            Ok(history) => history,
            Err(poisoned) => poisoned.into_inner(),
        };
        while history.len() >= self.settings.history {
            history.pop_front();
        }
        history.push_back(event);
    }
}

fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) {
    let mut remaining = total;
    while !remaining.is_zero() && !shutdown.load(Ordering::Relaxed) {
        let step = remaining.min(RECV_TIMEOUT);
        thread::sleep(step);
        remaining -= step;
    }
}

/// Target indices announced by a packet. Bundles are searched recursively;
/// messages on other addresses and malformed arguments are logged and skipped.
pub fn parse_completion(packet: &OscPacket, address: &str) -> Vec<u32> {
    let mut targets = Vec::new();
    collect_targets(packet, address, &mut targets);
    targets
}

fn collect_targets(packet: &OscPacket, address: &str, out: &mut Vec<u32>) {
    match packet {
        OscPacket::Message(msg) => {
            if msg.addr != address {
                log::debug!(target: "completion", "ignoring message on {}", msg.addr);
                return;
            }
            match msg.args.as_slice() {
                [arg] => match target_arg(arg) {
                    Some(target) => out.push(target),
                    None => log::warn!(target: "completion", "{} with unusable argument {:?}", address, arg),
                },
                args => log::warn!(target: "completion", "{} expects one argument, got {}", address, args.len()),
            }
        }
        OscPacket::Bundle(bundle) => {
            for p in &bundle.content {
                collect_targets(p, address, out);
            }
        }
    }
}

fn target_arg(arg: &OscType) -> Option<u32> {
    match *arg {
        OscType::Int(i) => u32::try_from(i).ok(),
        OscType::Long(l) => u32::try_from(l).ok(),
        OscType::Float(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f32 => {
            Some(f as u32)
        }
        _ => None,
    }
}
