//! Observers notified after every exercise state change

use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use crate::snapshot::ExerciseSnapshot;

/// Receives a snapshot after each successful state change
///
/// Rejected operations never notify.
pub trait ExerciseObserver: Send {
    fn on_snapshot(&mut self, snapshot: &ExerciseSnapshot);
}

impl ExerciseObserver for mpsc::Sender<ExerciseSnapshot> {
    fn on_snapshot(&mut self, snapshot: &ExerciseSnapshot) {
        // A dropped receiver just stops listening.
        let _ = self.send(snapshot.clone());
    }
}

/// Collects every snapshot it sees; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct SnapshotRecorder {
    seen: Arc<Mutex<Vec<ExerciseSnapshot>>>,
}

impl SnapshotRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<ExerciseSnapshot> {
        match self.seen.lock() {
            Ok(seen) => seen.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.seen.lock() {
            Ok(seen) => seen.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExerciseObserver for SnapshotRecorder {
    fn on_snapshot(&mut self, snapshot: &ExerciseSnapshot) {
        match self.seen.lock() {
            Ok(mut seen) => seen.push(snapshot.clone()),
            Err(poisoned) => poisoned.into_inner().push(snapshot.clone()),
        }
    }
}
