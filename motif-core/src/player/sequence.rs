use std::sync::Arc;
use std::time::{Duration, Instant};

use motif_types::{CompletionEvent, PlaylistItem};

use super::PlayerError;
use crate::codec::{encode, EncodeOptions};
use crate::transport::EngineTransport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceOptions {
    /// Wrap to the first item after the last one finishes.
    pub sequence_loop: bool,
    /// Treat an item as finished once it has been in flight this long.
    /// `None` waits for the engine indefinitely.
    pub watchdog: Option<Duration>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SequenceState {
    #[default]
    Idle,
    AwaitingCompletion,
    Advancing,
    Stopped,
}

/// What a completion (or watchdog expiry) did to the sequence.
#[derive(Debug)]
pub enum SequenceProgress {
    /// Not for the in-flight item, or nothing is in flight.
    Ignored,
    Advanced { index: usize },
    /// Sequence loop restarted at item 0.
    Wrapped,
    /// Last item finished without sequence loop.
    Finished,
    /// Sending the next item failed; the player is stopped.
    Failed(PlayerError),
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    target_index: u32,
    sent_at: Instant,
}

/// Plays a playlist one item at a time, sending item N+1 only after the
/// engine reports item N finished.
///
/// Every item is sent one-shot whatever its own loop flag says. A completion
/// only counts if it names the in-flight item's target and was received after
/// that item was sent, so notifications queued from an earlier run cannot
/// advance a fresh one. When the watchdog skips an item, the late completion
/// the engine still owes for it is swallowed instead of finishing the next one.
pub struct SequencePlayer<T: EngineTransport> {
    transport: Arc<T>,
    options: SequenceOptions,
    playlist: Vec<PlaylistItem>,
    index: usize,
    state: SequenceState,
    in_flight: Option<InFlight>,
    /// Targets of items the watchdog gave up on whose completion hasn't arrived.
    superseded: Vec<u32>,
}

impl<T: EngineTransport> SequencePlayer<T> {
    pub fn new(transport: Arc<T>, options: SequenceOptions) -> Self {
        Self {
            transport,
            options,
            playlist: Vec::new(),
            index: 0,
            state: SequenceState::Idle,
            in_flight: None,
            superseded: Vec::new(),
        }
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, SequenceState::AwaitingCompletion | SequenceState::Advancing)
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_item(&self) -> Option<&PlaylistItem> {
        if self.is_playing() {
            self.playlist.get(self.index)
        } else {
            None
        }
    }

    pub fn playlist(&self) -> &[PlaylistItem] {
        &self.playlist
    }

    pub fn options(&self) -> SequenceOptions {
        self.options
    }

    pub fn set_sequence_loop(&mut self, enabled: bool) {
        self.options.sequence_loop = enabled;
    }

    /// Target the player is waiting on, if any.
    pub fn awaiting_target(&self) -> Option<u32> {
        self.in_flight.map(|f| f.target_index)
    }

    /// Start from item 0.
    ///
    /// An empty playlist is reported and changes nothing. Starting while a run
    /// is active is refused; call [`stop`](Self::stop) first.
    pub fn start(&mut self, playlist: Vec<PlaylistItem>) -> Result<(), PlayerError> {
        if self.is_playing() {
            return Err(PlayerError::AlreadyPlaying);
        }
        if playlist.is_empty() {
            log::debug!(target: "player::sequence", "start with empty playlist");
            return Err(PlayerError::EmptyPlaylist);
        }

        log::info!(target: "player::sequence", "starting sequence of {} items", playlist.len());
        self.playlist = playlist;
        self.index = 0;
        self.state = SequenceState::AwaitingCompletion;
        if let Err(e) = self.send_current() {
            self.halt();
            return Err(e);
        }
        Ok(())
    }

    /// React to an engine completion notification.
    pub fn handle_completion(&mut self, event: &CompletionEvent) -> SequenceProgress {
        let Some(in_flight) = self.in_flight else {
            log::debug!(target: "player::sequence", "completion for target {} with nothing in flight", event.target_index);
            return SequenceProgress::Ignored;
        };
        if self.state != SequenceState::AwaitingCompletion {
            return SequenceProgress::Ignored;
        }
        if let Some(pos) = self.superseded.iter().position(|&t| t == event.target_index) {
            self.superseded.swap_remove(pos);
            log::debug!(
                target: "player::sequence",
                "late completion for target {} after watchdog skip",
                event.target_index
            );
            return SequenceProgress::Ignored;
        }
        if event.target_index != in_flight.target_index {
            log::debug!(
                target: "player::sequence",
                "completion for target {} while waiting on {}",
                event.target_index,
                in_flight.target_index
            );
            return SequenceProgress::Ignored;
        }
        if event.received_at < in_flight.sent_at {
            log::debug!(target: "player::sequence", "stale completion for target {}", event.target_index);
            return SequenceProgress::Ignored;
        }
        self.advance()
    }

    /// Advance past an item that has been in flight longer than the watchdog
    /// allows. Returns `None` when the watchdog is disabled or not expired.
    pub fn poll_watchdog(&mut self, now: Instant) -> Option<SequenceProgress> {
        let timeout = self.options.watchdog?;
        let in_flight = self.in_flight?;
        if self.state != SequenceState::AwaitingCompletion {
            return None;
        }
        if now.saturating_duration_since(in_flight.sent_at) < timeout {
            return None;
        }
        log::warn!(
            target: "player::sequence",
            "no completion from target {} after {:?}, advancing",
            in_flight.target_index,
            timeout
        );
        let progress = self.advance();
        if self.is_playing() {
            self.superseded.push(in_flight.target_index);
        }
        Some(progress)
    }

    /// Stop the run. The state changes immediately; the engine is asked to
    /// silence the in-flight target on a best-effort basis.
    pub fn stop(&mut self) -> Result<(), PlayerError> {
        let in_flight = self.in_flight;
        self.halt();
        if let Some(in_flight) = in_flight {
            log::info!(target: "player::sequence", "stopping, target {} in flight", in_flight.target_index);
            self.transport.stop_target(in_flight.target_index)?;
        }
        Ok(())
    }

    fn advance(&mut self) -> SequenceProgress {
        self.state = SequenceState::Advancing;
        self.in_flight = None;

        let next = self.index + 1;
        let progress = if next < self.playlist.len() {
            self.index = next;
            SequenceProgress::Advanced { index: next }
        } else if self.options.sequence_loop {
            self.index = 0;
            SequenceProgress::Wrapped
        } else {
            log::info!(target: "player::sequence", "sequence finished");
            self.halt();
            return SequenceProgress::Finished;
        };

        self.state = SequenceState::AwaitingCompletion;
        match self.send_current() {
            Ok(()) => progress,
            Err(e) => {
                log::warn!(target: "player::sequence", "send of item {} failed: {}", self.index, e);
                self.halt();
                SequenceProgress::Failed(e)
            }
        }
    }

    fn send_current(&mut self) -> Result<(), PlayerError> {
        let item = &self.playlist[self.index];
        let payload = encode(
            &item.melody,
            EncodeOptions {
                looping: false,
                target_index: item.resolved_layer,
                output_mode: Some(item.output_mode),
            },
        )?;
        let sent_at = Instant::now();
        self.transport.send_melody(&payload)?;
        log::debug!(
            target: "player::sequence",
            "item {} ({}) sent to target {}",
            self.index,
            item.melody.name,
            item.resolved_layer
        );
        self.in_flight = Some(InFlight {
            target_index: item.resolved_layer,
            sent_at,
        });
        Ok(())
    }

    fn halt(&mut self) {
        self.state = SequenceState::Stopped;
        self.index = 0;
        self.in_flight = None;
        self.superseded.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{TestTransport, TransportOp};
    use motif_types::{ChannelId, Melody, MelodyId, Note, OutputMode};

    fn item(id: u32, layer: u32) -> PlaylistItem {
        PlaylistItem {
            melody: Melody::with_notes(MelodyId::new(id), format!("m{}", id), vec![Note::new(60, 0.0, 0.5, 0.8)]),
            channel_id: ChannelId::new(layer),
            output_mode: OutputMode::SequentialNotes,
            resolved_layer: layer,
            looping: true,
        }
    }

    fn player(options: SequenceOptions) -> (Arc<TestTransport>, SequencePlayer<TestTransport>) {
        let transport = Arc::new(TestTransport::new());
        (Arc::clone(&transport), SequencePlayer::new(transport, options))
    }

    #[test]
    fn start_sends_first_item_one_shot() {
        let (transport, mut player) = player(SequenceOptions::default());
        player.start(vec![item(1, 0), item(2, 1)]).unwrap();

        assert_eq!(player.state(), SequenceState::AwaitingCompletion);
        assert_eq!(player.awaiting_target(), Some(0));
        assert_eq!(
            transport.operations(),
            vec![TransportOp::SendMelody {
                route: crate::transport::Route::SequentialNotes,
                target_index: 0,
                looping: false,
                name: "m1".into(),
            }]
        );
    }

    #[test]
    fn empty_playlist_is_reported() {
        let (transport, mut player) = player(SequenceOptions::default());
        assert!(matches!(player.start(Vec::new()), Err(PlayerError::EmptyPlaylist)));
        assert_eq!(player.state(), SequenceState::Idle);
        assert!(transport.operations().is_empty());
    }

    #[test]
    fn start_while_playing_is_refused() {
        let (transport, mut player) = player(SequenceOptions::default());
        player.start(vec![item(1, 0)]).unwrap();
        assert!(matches!(player.start(vec![item(2, 0)]), Err(PlayerError::AlreadyPlaying)));
        assert_eq!(transport.sent_targets(), vec![0]);
    }

    #[test]
    fn wrong_target_and_stale_events_are_ignored() {
        let (transport, mut player) = player(SequenceOptions::default());
        let before = Instant::now();
        player.start(vec![item(1, 3), item(2, 4)]).unwrap();

        assert!(matches!(player.handle_completion(&CompletionEvent::new(9)), SequenceProgress::Ignored));
        assert!(matches!(
            player.handle_completion(&CompletionEvent::at(3, before)),
            SequenceProgress::Ignored
        ));
        assert_eq!(player.current_index(), 0);
        assert_eq!(transport.sent_targets(), vec![3]);
    }

    #[test]
    fn finishes_without_loop() {
        let (_, mut player) = player(SequenceOptions::default());
        player.start(vec![item(1, 0), item(2, 1)]).unwrap();
        assert!(matches!(
            player.handle_completion(&CompletionEvent::new(0)),
            SequenceProgress::Advanced { index: 1 }
        ));
        assert!(matches!(player.handle_completion(&CompletionEvent::new(1)), SequenceProgress::Finished));
        assert_eq!(player.state(), SequenceState::Stopped);
        assert_eq!(player.current_index(), 0);
        assert!(matches!(player.handle_completion(&CompletionEvent::new(1)), SequenceProgress::Ignored));
    }

    #[test]
    fn failed_send_stops_the_run() {
        let (transport, mut player) = player(SequenceOptions::default());
        transport.fail_target(1);
        player.start(vec![item(1, 0), item(2, 1)]).unwrap();
        assert!(matches!(
            player.handle_completion(&CompletionEvent::new(0)),
            SequenceProgress::Failed(PlayerError::Transport(_))
        ));
        assert_eq!(player.state(), SequenceState::Stopped);
        assert_eq!(player.awaiting_target(), None);
    }

    #[test]
    fn failed_first_send_is_returned() {
        let (transport, mut player) = player(SequenceOptions::default());
        transport.fail_target(0);
        assert!(matches!(player.start(vec![item(1, 0)]), Err(PlayerError::Transport(_))));
        assert!(!player.is_playing());
    }

    #[test]
    fn empty_melody_fails_before_sending() {
        let (transport, mut player) = player(SequenceOptions::default());
        let mut empty = item(1, 0);
        empty.melody = Melody::new(MelodyId::new(1), "empty");
        assert!(matches!(player.start(vec![empty]), Err(PlayerError::Codec(_))));
        assert!(transport.operations().is_empty());
    }

    #[test]
    fn stop_severs_completion_handling() {
        let (transport, mut player) = player(SequenceOptions::default());
        player.start(vec![item(1, 2), item(2, 2)]).unwrap();
        player.stop().unwrap();

        assert_eq!(player.state(), SequenceState::Stopped);
        assert!(transport.operations().contains(&TransportOp::StopTarget(2)));
        assert!(matches!(player.handle_completion(&CompletionEvent::new(2)), SequenceProgress::Ignored));
        assert_eq!(transport.sent_targets(), vec![2]);
    }

    #[test]
    fn restart_ignores_completion_from_previous_run() {
        let (transport, mut player) = player(SequenceOptions::default());
        player.start(vec![item(1, 0), item(2, 0)]).unwrap();
        // Completion of the first run received but not yet handled.
        let stale = CompletionEvent::new(0);
        player.stop().unwrap();
        std::thread::sleep(Duration::from_millis(2));
        player.start(vec![item(1, 0), item(2, 0)]).unwrap();

        assert!(matches!(player.handle_completion(&stale), SequenceProgress::Ignored));
        assert_eq!(player.current_index(), 0);
        assert_eq!(transport.sent_targets(), vec![0, 0]);
    }

    #[test]
    fn watchdog_advances_stalled_item() {
        let (transport, mut player) = player(SequenceOptions {
            sequence_loop: false,
            watchdog: Some(Duration::from_millis(200)),
        });
        player.start(vec![item(1, 0), item(2, 1)]).unwrap();

        assert!(player.poll_watchdog(Instant::now()).is_none());
        let later = Instant::now() + Duration::from_secs(1);
        assert!(matches!(player.poll_watchdog(later), Some(SequenceProgress::Advanced { index: 1 })));
        assert_eq!(transport.sent_targets(), vec![0, 1]);
    }

    #[test]
    fn late_completion_after_watchdog_does_not_skip_next_item() {
        let (transport, mut player) = player(SequenceOptions {
            sequence_loop: false,
            watchdog: Some(Duration::from_millis(10)),
        });
        player.start(vec![item(1, 0), item(2, 0), item(3, 0)]).unwrap();

        let later = Instant::now() + Duration::from_millis(20);
        assert!(matches!(player.poll_watchdog(later), Some(SequenceProgress::Advanced { index: 1 })));

        // The engine's overdue report for item 0 arrives after item 1 went out.
        assert!(matches!(player.handle_completion(&CompletionEvent::new(0)), SequenceProgress::Ignored));
        assert_eq!(player.current_index(), 1);
        assert_eq!(transport.sent_targets(), vec![0, 0]);

        // Item 1's own completion still advances.
        assert!(matches!(
            player.handle_completion(&CompletionEvent::new(0)),
            SequenceProgress::Advanced { index: 2 }
        ));
        assert_eq!(transport.sent_targets(), vec![0, 0, 0]);
    }

    #[test]
    fn stop_forgets_watchdog_skips() {
        let (_, mut player) = player(SequenceOptions {
            sequence_loop: false,
            watchdog: Some(Duration::from_millis(10)),
        });
        player.start(vec![item(1, 0), item(2, 0)]).unwrap();
        player.poll_watchdog(Instant::now() + Duration::from_millis(20));
        player.stop().unwrap();

        player.start(vec![item(1, 0), item(2, 0)]).unwrap();
        assert!(matches!(
            player.handle_completion(&CompletionEvent::new(0)),
            SequenceProgress::Advanced { index: 1 }
        ));
    }

    #[test]
    fn watchdog_disabled_by_default() {
        let (_, mut player) = player(SequenceOptions::default());
        player.start(vec![item(1, 0)]).unwrap();
        assert!(player.poll_watchdog(Instant::now() + Duration::from_secs(3600)).is_none());
        assert!(player.is_playing());
    }
}
