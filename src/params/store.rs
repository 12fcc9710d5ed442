//! Parameter store — atomic value cells shared by the audio and control contexts.
//!
//! Values live as `f32` bit patterns in `AtomicU32` cells. Reads and writes are
//! lock-free from any thread. Control-side writes that change a cell are
//! announced on a bounded change queue; when the queue is full the oldest
//! entry is evicted so observers always end on the latest value.
//!
//! Writes from the audio context never touch the queue. They only set a bit
//! in a dirty mask, and the control side turns those bits into notifications
//! with [`ParamStore::publish_pending`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use super::layout::ParamLayout;
use crate::error::GateError;

/// A parameter write observed by the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamChange {
    pub index: usize,
    pub value: f32,
}

/// Flat key → value mapping used for persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSnapshot(pub BTreeMap<String, f32>);

impl ParamSnapshot {
    pub fn to_json(&self) -> Result<String, GateError> {
        serde_json::to_string(self).map_err(GateError::InvalidState)
    }

    pub fn from_json(json: &str) -> Result<Self, GateError> {
        serde_json::from_str(json).map_err(GateError::InvalidState)
    }

    pub fn get(&self, key: &str) -> Option<f32> {
        self.0.get(key).copied()
    }
}

pub struct ParamStore {
    layout: ParamLayout,
    cells: Vec<AtomicU32>,
    dirty: Vec<AtomicU64>,
    changes_tx: Sender<ParamChange>,
    changes_rx: Receiver<ParamChange>,
}

impl ParamStore {
    pub fn new(layout: ParamLayout, change_queue_capacity: usize) -> Self {
        let cells = layout
            .specs()
            .iter()
            .map(|spec| AtomicU32::new(spec.default.to_bits()))
            .collect();
        let dirty = (0..layout.len().div_ceil(64))
            .map(|_| AtomicU64::new(0))
            .collect();
        let (changes_tx, changes_rx) = crossbeam_channel::bounded(change_queue_capacity.max(1));
        ParamStore {
            layout,
            cells,
            dirty,
            changes_tx,
            changes_rx,
        }
    }

    /// Store with the standard gate layout.
    pub fn standard(change_queue_capacity: usize) -> Self {
        Self::new(ParamLayout::standard(), change_queue_capacity)
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    /// Current plain value. Audio-safe.
    #[inline]
    pub fn value(&self, index: usize) -> f32 {
        f32::from_bits(self.cells[index].load(Ordering::Relaxed))
    }

    /// Current value mapped into 0..1. Audio-safe.
    pub fn normalized(&self, index: usize) -> f32 {
        self.layout.spec(index).range.to_normalized(self.value(index))
    }

    /// Write a plain value, snapped and clamped into the parameter's range.
    /// Returns the value actually stored. Non-finite input is ignored.
    pub fn set_value(&self, index: usize, value: f32) -> f32 {
        match self.write(index, value) {
            Some(stored) => {
                self.notify(ParamChange { index, value: stored });
                stored
            }
            None => self.value(index),
        }
    }

    /// Audio-side write of a value given in 0..1. Lock-free; a change only
    /// marks the cell dirty for the next [`publish_pending`](Self::publish_pending).
    pub fn set_normalized_from_audio(&self, index: usize, normalized: f32) -> f32 {
        if !normalized.is_finite() {
            return self.value(index);
        }
        let plain = self.layout.spec(index).range.from_normalized(normalized);
        match self.write(index, plain) {
            Some(stored) => {
                self.dirty[index / 64].fetch_or(1_u64 << (index % 64), Ordering::Release);
                stored
            }
            None => self.value(index),
        }
    }

    /// Snap and store. Returns the stored value if the cell changed.
    fn write(&self, index: usize, value: f32) -> Option<f32> {
        if !value.is_finite() {
            return None;
        }
        let stored = self.layout.spec(index).range.snap(value);
        let previous = self.cells[index].swap(stored.to_bits(), Ordering::Relaxed);
        (previous != stored.to_bits()).then_some(stored)
    }

    /// Write a value given in 0..1.
    pub fn set_normalized(&self, index: usize, normalized: f32) -> f32 {
        if !normalized.is_finite() {
            return self.value(index);
        }
        let plain = self.layout.spec(index).range.from_normalized(normalized);
        self.set_value(index, plain)
    }

    pub fn index(&self, key: &str) -> Result<usize, GateError> {
        self.layout
            .index_of(key)
            .ok_or_else(|| GateError::UnknownParameter { key: key.to_string() })
    }

    pub fn get(&self, key: &str) -> Result<f32, GateError> {
        Ok(self.value(self.index(key)?))
    }

    pub fn set(&self, key: &str, value: f32) -> Result<f32, GateError> {
        let index = self.index(key)?;
        Ok(self.set_value(index, value))
    }

    /// A receiver for change notifications. All receivers share one queue.
    pub fn changes(&self) -> Receiver<ParamChange> {
        self.changes_rx.clone()
    }

    /// Announce cells written from the audio context since the last call.
    /// Control side only. Returns how many changes were queued.
    pub fn publish_pending(&self) -> usize {
        let mut published = 0;
        for (word, bits) in self.dirty.iter().enumerate() {
            let mut mask = bits.swap(0, Ordering::Acquire);
            while mask != 0 {
                let index = word * 64 + mask.trailing_zeros() as usize;
                mask &= mask - 1;
                self.notify(ParamChange {
                    index,
                    value: self.value(index),
                });
                published += 1;
            }
        }
        published
    }

    pub fn snapshot(&self) -> ParamSnapshot {
        let values = self
            .layout
            .specs()
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.key.clone(), self.value(i)))
            .collect();
        ParamSnapshot(values)
    }

    /// Apply a snapshot. Unknown keys are skipped, missing keys keep their
    /// current value. Returns how many entries were applied.
    pub fn restore(&self, snapshot: &ParamSnapshot) -> usize {
        let mut applied = 0;
        for (key, &value) in &snapshot.0 {
            match self.layout.index_of(key) {
                Some(index) => {
                    self.set_value(index, value);
                    applied += 1;
                }
                None => {
                    log::warn!(target: "gate::params", "ignoring unknown parameter '{key}' in saved state");
                }
            }
        }
        log::debug!(target: "gate::params", "restored {applied} of {} parameters", snapshot.0.len());
        applied
    }

    pub fn reset_to_defaults(&self) {
        for (index, spec) in self.layout.specs().iter().enumerate() {
            self.set_value(index, spec.default);
        }
    }

    fn notify(&self, change: ParamChange) {
        if let Err(TrySendError::Full(change)) = self.changes_tx.try_send(change) {
            // Drop the oldest entry; a racing observer may already have made room
            let _ = self.changes_rx.try_recv();
            if self.changes_tx.try_send(change).is_err() {
                log::trace!(target: "gate::params", "change for {} dropped", change.index);
            }
        }
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::standard(1024)
    }
}
