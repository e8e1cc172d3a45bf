use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use motif_types::{ChannelId, CompletionEvent, MelodyId, PlaylistItem};

use super::PlayerError;
use crate::codec::{encode, EncodeOptions};
use crate::transport::{EngineTransport, TransportError};

/// Retry schedule for stop-all. Attempt `n` (1-based) is followed by a pause
/// of `backoff * n` before the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// What a channel is currently looping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayingSlot {
    pub melody_id: MelodyId,
    pub target_index: u32,
}

#[derive(Debug, Default)]
pub struct StartReport {
    pub started: Vec<ChannelId>,
    pub failed: Vec<(ChannelId, PlayerError)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// The engine acknowledged stop-all; nothing is playing.
    Stopped,
    /// Stop-all kept failing; the playing set now mirrors what the engine
    /// reports as active.
    Reconciled { still_playing: Vec<ChannelId> },
}

/// Loops one melody per channel, all channels at once.
///
/// Bookkeeping is per channel: a channel only enters the playing set once its
/// own send was accepted, and leaves it once its own stop was.
pub struct MultiChannelPlayer<T: EngineTransport> {
    transport: Arc<T>,
    policy: StopPolicy,
    playing: BTreeMap<ChannelId, PlayingSlot>,
}

impl<T: EngineTransport> MultiChannelPlayer<T> {
    pub fn new(transport: Arc<T>, policy: StopPolicy) -> Self {
        Self {
            transport,
            policy,
            playing: BTreeMap::new(),
        }
    }

    pub fn is_playing(&self) -> bool {
        !self.playing.is_empty()
    }

    pub fn is_channel_playing(&self, channel: ChannelId) -> bool {
        self.playing.contains_key(&channel)
    }

    pub fn playing(&self) -> &BTreeMap<ChannelId, PlayingSlot> {
        &self.playing
    }

    /// Send every item looping. Channels whose send fails are reported and
    /// left out of the playing set; the others are unaffected.
    pub fn start_all(&mut self, items: Vec<PlaylistItem>) -> Result<StartReport, PlayerError> {
        if items.is_empty() {
            log::debug!(target: "player::multi", "start_all with nothing armed");
            return Err(PlayerError::EmptyPlaylist);
        }

        let mut report = StartReport::default();
        let mut accepted = Vec::with_capacity(items.len());
        for item in &items {
            match self.send(item) {
                Ok(slot) => accepted.push((item.channel_id, slot)),
                Err(e) => {
                    log::warn!(target: "player::multi", "channel {} failed to start: {}", item.channel_id, e);
                    report.failed.push((item.channel_id, e));
                }
            }
        }

        for (channel, slot) in accepted {
            self.playing.insert(channel, slot);
            report.started.push(channel);
        }
        log::info!(
            target: "player::multi",
            "{} channels looping, {} failed",
            report.started.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Start (or replace) the loop on a single channel.
    pub fn start_track(&mut self, item: &PlaylistItem) -> Result<(), PlayerError> {
        let slot = self.send(item)?;
        self.playing.insert(item.channel_id, slot);
        Ok(())
    }

    /// Stop every channel.
    ///
    /// Stop-all is retried per the [`StopPolicy`]. If it never succeeds, the
    /// engine's list of active targets decides which channels stay marked as
    /// playing. When that query fails too, the playing set is left unchanged
    /// and the last stop error is returned.
    pub fn stop_all(&mut self) -> Result<StopOutcome, PlayerError> {
        let attempts = self.policy.attempts.max(1);
        let mut last_error: Option<TransportError> = None;
        for attempt in 1..=attempts {
            match self.transport.stop_all() {
                Ok(()) => {
                    log::info!(target: "player::multi", "stopped {} channels", self.playing.len());
                    self.playing.clear();
                    return Ok(StopOutcome::Stopped);
                }
                Err(e) => {
                    log::warn!(target: "player::multi", "stop-all attempt {}/{} failed: {}", attempt, attempts, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        std::thread::sleep(self.policy.backoff * attempt);
                    }
                }
            }
        }

        match self.transport.active_targets() {
            Ok(active) => {
                self.playing.retain(|_, slot| active.contains(&slot.target_index));
                let still_playing: Vec<ChannelId> = self.playing.keys().copied().collect();
                log::warn!(
                    target: "player::multi",
                    "stop-all failed, reconciled with engine: {} channels still active",
                    still_playing.len()
                );
                Ok(StopOutcome::Reconciled { still_playing })
            }
            Err(query_error) => {
                log::warn!(
                    target: "player::multi",
                    "stop-all failed and engine state unavailable ({}), keeping {} channels marked playing",
                    query_error,
                    self.playing.len()
                );
                Err(match last_error {
                    Some(e) => PlayerError::Transport(e),
                    None => PlayerError::Transport(query_error),
                })
            }
        }
    }

    /// Stop one channel by its routing target.
    pub fn stop_track(&mut self, channel: ChannelId) -> Result<(), PlayerError> {
        let Some(slot) = self.playing.get(&channel).copied() else {
            return Err(PlayerError::ChannelNotPlaying(channel));
        };
        self.transport.stop_target(slot.target_index)?;
        self.playing.remove(&channel);
        log::debug!(target: "player::multi", "channel {} stopped, {} still playing", channel, self.playing.len());
        Ok(())
    }

    /// Looping playback never completes; notifications are only logged.
    pub fn handle_completion(&self, event: &CompletionEvent) {
        log::debug!(
            target: "player::multi",
            "ignoring completion for target {} during looped playback",
            event.target_index
        );
    }

    fn send(&self, item: &PlaylistItem) -> Result<PlayingSlot, PlayerError> {
        let payload = encode(
            &item.melody,
            EncodeOptions {
                looping: true,
                target_index: item.resolved_layer,
                output_mode: Some(item.output_mode),
            },
        )?;
        self.transport.send_melody(&payload)?;
        Ok(PlayingSlot {
            melody_id: item.melody.id,
            target_index: item.resolved_layer,
        })
    }
}
