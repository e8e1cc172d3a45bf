//! Live note capture.
//!
//! Input sources publish [`NoteEvent`]s on a [`NoteEventBus`]; a [`Recorder`]
//! subscribes for the length of one session and turns note-on/off pairs into
//! [`RawInputEvent`]s for the quantizer.

use std::collections::HashMap;

use crossbeam_channel::Receiver;

use motif_types::{Note, RawInputEvent};

use crate::quantize::{process_recording, QuantizeSettings};

/// A key press or release, timed in milliseconds since the session started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    NoteOn { pitch: u8, velocity: u8, at_ms: u64 },
    NoteOff { pitch: u8, at_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&NoteEvent) + Send>;

/// Typed publish/subscribe fan-out for note events.
#[derive(Default)]
pub struct NoteEventBus {
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl NoteEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&NoteEvent) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver to every subscriber in subscription order.
    pub fn publish(&mut self, event: &NoteEvent) {
        for (_, subscriber) in &mut self.subscribers {
            subscriber(event);
        }
    }
}

pub struct Recorder {
    subscription: SubscriptionId,
    incoming: Receiver<NoteEvent>,
    events: Vec<RawInputEvent>,
    /// Index into `events` of the note currently held on each pitch.
    held: HashMap<u8, usize>,
}

impl Recorder {
    /// Begin a session by subscribing to `bus`.
    pub fn start(bus: &mut NoteEventBus) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let subscription = bus.subscribe(move |event| {
            let _ = tx.send(*event);
        });
        log::debug!(target: "recording", "recording session started");
        Self {
            subscription,
            incoming: rx,
            events: Vec::new(),
            held: HashMap::new(),
        }
    }

    /// Events captured so far. Held notes have no `off_time`.
    pub fn events(&mut self) -> &[RawInputEvent] {
        self.drain();
        &self.events
    }

    /// End the session, unsubscribe, and run the captured events through the
    /// quantizer.
    pub fn finish(mut self, bus: &mut NoteEventBus, settings: &QuantizeSettings) -> Vec<Note> {
        bus.unsubscribe(self.subscription);
        self.drain();
        if !self.held.is_empty() {
            log::debug!(target: "recording", "{} notes still held at end of session", self.held.len());
        }
        let notes = process_recording(&self.events, settings);
        log::info!(
            target: "recording",
            "session finished: {} events -> {} notes",
            self.events.len(),
            notes.len()
        );
        notes
    }

    fn drain(&mut self) {
        while let Ok(event) = self.incoming.try_recv() {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: NoteEvent) {
        match event {
            NoteEvent::NoteOn { pitch, velocity, at_ms } => {
                // Retriggering a held key ends the previous note.
                self.release(pitch, at_ms);
                if velocity == 0 {
                    return;
                }
                self.held.insert(pitch, self.events.len());
                self.events.push(RawInputEvent::new(
                    pitch,
                    f64::from(velocity.min(127)) / 127.0,
                    at_ms as f64,
                    None,
                ));
            }
            NoteEvent::NoteOff { pitch, at_ms } => {
                if !self.release(pitch, at_ms) {
                    log::debug!(target: "recording", "note-off for {} without note-on", pitch);
                }
            }
        }
    }

    fn release(&mut self, pitch: u8, at_ms: u64) -> bool {
        match self.held.remove(&pitch) {
            Some(index) => {
                let event = &mut self.events[index];
                event.off_time = Some((at_ms as f64).max(event.on_time));
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::TimingMode;
    use std::sync::{Arc, Mutex};

    #[test]
    fn bus_fans_out_and_unsubscribes() {
        let mut bus = NoteEventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let a = {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |e| seen.lock().unwrap().push(("a", *e)))
        };
        let _b = {
            let seen = Arc::clone(&seen);
            bus.subscribe(move |e| seen.lock().unwrap().push(("b", *e)))
        };

        let on = NoteEvent::NoteOn { pitch: 60, velocity: 100, at_ms: 0 };
        bus.publish(&on);
        assert!(bus.unsubscribe(a));
        assert!(!bus.unsubscribe(a));
        bus.publish(&NoteEvent::NoteOff { pitch: 60, at_ms: 10 });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], ("a", on));
        assert_eq!(seen[1], ("b", on));
        assert_eq!(seen[2].0, "b");
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn recorder_pairs_on_and_off() {
        let mut bus = NoteEventBus::new();
        let mut recorder = Recorder::start(&mut bus);
        bus.publish(&NoteEvent::NoteOn { pitch: 60, velocity: 127, at_ms: 0 });
        bus.publish(&NoteEvent::NoteOn { pitch: 64, velocity: 127, at_ms: 100 });
        bus.publish(&NoteEvent::NoteOff { pitch: 60, at_ms: 480 });

        let events = recorder.events().to_vec();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].off_time, Some(480.0));
        assert_eq!(events[0].velocity, 1.0);
        assert_eq!(events[1].off_time, None);
    }

    #[test]
    fn retrigger_closes_held_note() {
        let mut bus = NoteEventBus::new();
        let mut recorder = Recorder::start(&mut bus);
        bus.publish(&NoteEvent::NoteOn { pitch: 62, velocity: 64, at_ms: 0 });
        bus.publish(&NoteEvent::NoteOn { pitch: 62, velocity: 64, at_ms: 250 });
        bus.publish(&NoteEvent::NoteOff { pitch: 62, at_ms: 500 });

        let events = recorder.events().to_vec();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].off_time, Some(250.0));
        assert_eq!(events[1].off_time, Some(500.0));
    }

    #[test]
    fn finish_unsubscribes_and_quantizes() {
        let mut bus = NoteEventBus::new();
        let recorder = Recorder::start(&mut bus);
        bus.publish(&NoteEvent::NoteOn { pitch: 60, velocity: 90, at_ms: 0 });
        bus.publish(&NoteEvent::NoteOff { pitch: 60, at_ms: 500 });
        bus.publish(&NoteEvent::NoteOn { pitch: 67, velocity: 90, at_ms: 500 });
        bus.publish(&NoteEvent::NoteOff { pitch: 67, at_ms: 1000 });

        let settings = QuantizeSettings { timing: TimingMode::Raw, ..QuantizeSettings::default() };
        let notes = recorder.finish(&mut bus, &settings);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].pitch, 67);
        assert!((notes[1].start_time - 0.5).abs() < 1e-9);
    }
}
