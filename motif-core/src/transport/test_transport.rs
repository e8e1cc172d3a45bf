use std::collections::HashSet;
use std::sync::Mutex;

use super::{EngineTransport, Route, TransportError, TransportResult};
use crate::codec::WirePayload;

/// An operation recorded by `TestTransport` for assertion in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportOp {
    SendMelody {
        route: Route,
        target_index: u32,
        looping: bool,
        name: String,
    },
    StopAll,
    StopTarget(u32),
    QueryActive,
}

#[derive(Default)]
struct Faults {
    failing_targets: HashSet<u32>,
    stop_all_failures: u32,
    active: Option<Vec<u32>>,
}

/// A test transport that records all operations into a vector for assertions.
/// Operations succeed unless a fault has been injected. Uses `Mutex` for
/// interior mutability so the transport is `Send + Sync` (needed for
/// `Arc<TestTransport>` sharing).
///
/// Failed requests are still recorded.
#[derive(Default)]
pub struct TestTransport {
    ops: Mutex<Vec<TransportOp>>,
    faults: Mutex<Faults>,
}

impl TestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return all recorded operations.
    pub fn operations(&self) -> Vec<TransportOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Clear recorded operations.
    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }

    /// Count operations matching a predicate.
    pub fn count<F: Fn(&TransportOp) -> bool>(&self, f: F) -> usize {
        self.ops.lock().unwrap().iter().filter(|op| f(op)).count()
    }

    /// Target indices of every melody send, in order.
    pub fn sent_targets(&self) -> Vec<u32> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                TransportOp::SendMelody { target_index, .. } => Some(*target_index),
                _ => None,
            })
            .collect()
    }

    /// Make every send and stop addressed to `target_index` fail.
    pub fn fail_target(&self, target_index: u32) {
        self.faults.lock().unwrap().failing_targets.insert(target_index);
    }

    pub fn heal_target(&self, target_index: u32) {
        self.faults.lock().unwrap().failing_targets.remove(&target_index);
    }

    /// Make the next `count` stop-all requests fail.
    pub fn fail_stop_all(&self, count: u32) {
        self.faults.lock().unwrap().stop_all_failures = count;
    }

    /// Answer for `active_targets`; `None` makes the query unsupported.
    pub fn set_active_targets(&self, targets: Option<Vec<u32>>) {
        self.faults.lock().unwrap().active = targets;
    }

    fn record(&self, op: TransportOp) {
        self.ops.lock().unwrap().push(op);
    }

    fn check_target(&self, target_index: u32) -> TransportResult {
        if self.faults.lock().unwrap().failing_targets.contains(&target_index) {
            return Err(TransportError::Rejected(format!("target {} unavailable", target_index)));
        }
        Ok(())
    }
}

impl EngineTransport for TestTransport {
    fn send_melody(&self, payload: &WirePayload) -> TransportResult {
        self.record(TransportOp::SendMelody {
            route: Route::for_payload(payload),
            target_index: payload.metadata.target_index,
            looping: payload.metadata.looping,
            name: payload.metadata.name.clone(),
        });
        self.check_target(payload.metadata.target_index)
    }

    fn stop_all(&self) -> TransportResult {
        self.record(TransportOp::StopAll);
        let mut faults = self.faults.lock().unwrap();
        if faults.stop_all_failures > 0 {
            faults.stop_all_failures -= 1;
            return Err(TransportError::Rejected("stop-all failed".to_string()));
        }
        Ok(())
    }

    fn stop_target(&self, target_index: u32) -> TransportResult {
        self.record(TransportOp::StopTarget(target_index));
        self.check_target(target_index)
    }

    fn active_targets(&self) -> TransportResult<Vec<u32>> {
        self.record(TransportOp::QueryActive);
        self.faults
            .lock()
            .unwrap()
            .active
            .clone()
            .ok_or(TransportError::Unsupported("active target query"))
    }
}
