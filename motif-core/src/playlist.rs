//! Playlist construction from the current selection.
//!
//! The `Session` is the explicit context the players are built from: the
//! channel list plus which melodies the user has selected, in selection order.
//! Playlists are rebuilt from it every time playback starts and hold copies,
//! so later edits to the session never reach an in-flight playlist.

use motif_types::{Channel, ChannelId, MelodyId, PlaylistItem};

/// Ordered set of selected `(channel, melody)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    entries: Vec<(ChannelId, MelodyId)>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair at the end of the selection order. Re-selecting is a no-op.
    pub fn select(&mut self, channel: ChannelId, melody: MelodyId) {
        if !self.is_selected(channel, melody) {
            self.entries.push((channel, melody));
        }
    }

    pub fn deselect(&mut self, channel: ChannelId, melody: MelodyId) {
        self.entries.retain(|&entry| entry != (channel, melody));
    }

    /// Toggle a pair; returns whether it is selected afterwards.
    pub fn toggle(&mut self, channel: ChannelId, melody: MelodyId) -> bool {
        if self.is_selected(channel, melody) {
            self.deselect(channel, melody);
            false
        } else {
            self.entries.push((channel, melody));
            true
        }
    }

    pub fn is_selected(&self, channel: ChannelId, melody: MelodyId) -> bool {
        self.entries.contains(&(channel, melody))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, MelodyId)> + '_ {
        self.entries.iter().copied()
    }

    /// Channels in the order their first melody was selected.
    pub fn channel_order(&self) -> Vec<ChannelId> {
        let mut order: Vec<ChannelId> = Vec::new();
        for (channel, _) in &self.entries {
            if !order.contains(channel) {
                order.push(*channel);
            }
        }
        order
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub channels: Vec<Channel>,
    pub selection: Selection,
}

impl Session {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self {
            channels,
            selection: Selection::new(),
        }
    }

    /// Channel with its position in the channel list.
    pub fn channel(&self, id: ChannelId) -> Option<(usize, &Channel)> {
        self.channels.iter().enumerate().find(|(_, c)| c.id == id)
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.id == id)
    }

    /// Engine target for a channel: its configured index, else its position.
    pub fn resolve_layer(position: usize, channel: &Channel) -> u32 {
        channel.target_index.unwrap_or(position as u32)
    }

    fn item(&self, channel_id: ChannelId, melody_id: MelodyId, looping: bool) -> Option<PlaylistItem> {
        let Some((position, channel)) = self.channel(channel_id) else {
            log::debug!(target: "playlist", "selected channel {} no longer exists", channel_id);
            return None;
        };
        let Some(melody) = channel.melody(melody_id) else {
            log::debug!(target: "playlist", "selected melody {} missing from channel {}", melody_id, channel_id);
            return None;
        };
        Some(PlaylistItem {
            melody: melody.clone(),
            channel_id,
            output_mode: channel.output_mode,
            resolved_layer: Self::resolve_layer(position, channel),
            looping,
        })
    }
}

/// Every selected melody, grouped by channel in channel-selection order and
/// in melody-selection order within a channel.
pub fn build_sequential(session: &Session) -> Vec<PlaylistItem> {
    let mut items = Vec::with_capacity(session.selection.len());
    for channel_id in session.selection.channel_order() {
        for (selected_channel, melody_id) in session.selection.iter() {
            if selected_channel != channel_id {
                continue;
            }
            if let Some(item) = session.item(channel_id, melody_id, false) {
                items.push(item);
            }
        }
    }
    items
}

/// The armed melody of each channel: the first one selected for it.
/// Ordered by channel-selection order.
pub fn build_simultaneous(session: &Session) -> Vec<PlaylistItem> {
    session
        .selection
        .channel_order()
        .into_iter()
        .filter_map(|channel_id| {
            session
                .selection
                .iter()
                .filter(|&(c, _)| c == channel_id)
                .find_map(|(_, melody_id)| session.item(channel_id, melody_id, true))
        })
        .collect()
}
