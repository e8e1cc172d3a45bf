//! Looping playback across channels.

mod common;

use common::{done, make_session, make_transport};
use motif_core::player::{MultiChannelPlayer, PlayerError, StopOutcome, StopPolicy};
use motif_core::playlist::build_simultaneous;
use motif_core::transport::TransportOp;
use motif_types::{ChannelId, MelodyId};
use std::time::Duration;

fn policy() -> StopPolicy {
    StopPolicy { attempts: 2, backoff: Duration::ZERO }
}

#[test]
fn failing_channel_is_left_out_of_playing_set() {
    let mut session = make_session(2);
    session.selection.select(ChannelId::new(0), MelodyId::new(1));
    session.selection.select(ChannelId::new(1), MelodyId::new(11));

    let transport = make_transport();
    transport.fail_target(1);
    let mut player = MultiChannelPlayer::new(transport.clone(), policy());
    let report = player.start_all(build_simultaneous(&session)).unwrap();

    assert_eq!(report.started, vec![ChannelId::new(0)]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, ChannelId::new(1));
    assert!(player.is_channel_playing(ChannelId::new(0)));
    assert!(!player.is_channel_playing(ChannelId::new(1)));
    assert_eq!(transport.sent_targets(), vec![0, 1]);
}

#[test]
fn armed_melody_is_first_selected() {
    let mut session = make_session(1);
    session.selection.select(ChannelId::new(0), MelodyId::new(3));
    session.selection.select(ChannelId::new(0), MelodyId::new(1));

    let transport = make_transport();
    let mut player = MultiChannelPlayer::new(transport.clone(), policy());
    player.start_all(build_simultaneous(&session)).unwrap();

    assert_eq!(player.playing()[&ChannelId::new(0)].melody_id, MelodyId::new(3));
    assert_eq!(
        transport.count(|op| matches!(op, TransportOp::SendMelody { looping: true, .. })),
        1
    );
}

#[test]
fn nothing_armed_is_an_error() {
    let session = make_session(2);
    let transport = make_transport();
    let mut player = MultiChannelPlayer::new(transport.clone(), policy());
    assert!(matches!(
        player.start_all(build_simultaneous(&session)),
        Err(PlayerError::EmptyPlaylist)
    ));
    assert!(transport.operations().is_empty());
}

#[test]
fn completions_do_not_touch_looping_channels() {
    let mut session = make_session(2);
    session.selection.select(ChannelId::new(0), MelodyId::new(1));
    session.selection.select(ChannelId::new(1), MelodyId::new(11));

    let transport = make_transport();
    let mut player = MultiChannelPlayer::new(transport.clone(), policy());
    player.start_all(build_simultaneous(&session)).unwrap();
    player.handle_completion(&done(0));
    player.handle_completion(&done(42));
    assert_eq!(player.playing().len(), 2);
}

#[test]
fn stop_all_then_stop_track_errors() {
    let mut session = make_session(2);
    session.selection.select(ChannelId::new(0), MelodyId::new(1));
    session.selection.select(ChannelId::new(1), MelodyId::new(11));

    let transport = make_transport();
    let mut player = MultiChannelPlayer::new(transport.clone(), policy());
    player.start_all(build_simultaneous(&session)).unwrap();
    assert_eq!(player.stop_all().unwrap(), StopOutcome::Stopped);
    assert!(!player.is_playing());
    assert!(matches!(
        player.stop_track(ChannelId::new(0)),
        Err(PlayerError::ChannelNotPlaying(_))
    ));
}

#[test]
fn unreachable_engine_keeps_stale_state_and_reports() {
    let mut session = make_session(1);
    session.selection.select(ChannelId::new(0), MelodyId::new(1));

    let transport = make_transport();
    let mut player = MultiChannelPlayer::new(transport.clone(), policy());
    player.start_all(build_simultaneous(&session)).unwrap();

    transport.fail_stop_all(2);
    assert!(player.stop_all().is_err());
    assert!(player.is_playing());
    assert_eq!(transport.count(|op| *op == TransportOp::StopAll), 2);
    assert_eq!(transport.count(|op| *op == TransportOp::QueryActive), 1);

    // The engine recovers; the next stop-all clears everything.
    assert_eq!(player.stop_all().unwrap(), StopOutcome::Stopped);
    assert!(!player.is_playing());
}
