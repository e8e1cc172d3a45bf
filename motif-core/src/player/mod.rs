//! Playback coordination.
//!
//! Both players are plain state machines owned by the host loop. They react to
//! two kinds of input, user actions (method calls) and completion events the
//! host forwards from the [`CompletionListener`](crate::completion::CompletionListener),
//! and never spawn threads of their own.

mod multi;
mod sequence;

pub use multi::{MultiChannelPlayer, PlayingSlot, StartReport, StopOutcome, StopPolicy};
pub use sequence::{SequenceOptions, SequencePlayer, SequenceProgress, SequenceState};

use thiserror::Error;

use motif_types::ChannelId;

use crate::codec::CodecError;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("nothing selected to play")]
    EmptyPlaylist,
    #[error("player is already running, stop it first")]
    AlreadyPlaying,
    #[error("channel {0} is not playing")]
    ChannelNotPlaying(ChannelId),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
