//! Transport tracking — block start beat and per-sample beat increment.
//!
//! When the host is playing and reports a beat position, that position wins.
//! Otherwise an internal beat accumulator carries on from the previous block,
//! so gating continues seamlessly while host sync drops in and out.

use crate::config::TransportMode;

/// What the host reports about its transport for one block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PositionInfo {
    pub bpm: Option<f64>,
    /// Beat position in quarter notes.
    pub ppq_position: Option<f64>,
    pub is_playing: bool,
}

/// Host transport query.
pub trait PlayHead {
    /// `None` when the host has no position information for this block.
    fn position(&self) -> Option<PositionInfo>;
}

impl PlayHead for PositionInfo {
    fn position(&self) -> Option<PositionInfo> {
        Some(*self)
    }
}

/// Timing derived for one block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportState {
    pub start_beat: f64,
    pub beats_per_sample: f64,
    pub is_host_synced: bool,
}

impl TransportState {
    /// Exact beat of sample `offset` within the block.
    #[inline]
    pub fn beat_at(&self, offset: usize) -> f64 {
        self.start_beat + offset as f64 * self.beats_per_sample
    }
}

/// Why a block was muted instead of rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFault {
    /// The host has no transport at all.
    NoPlayHead,
    /// The transport exists but returned no position for this block.
    NoPosition,
    /// Host-only mode and the host is stopped or missing tempo/position.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct TransportTracker {
    mode: TransportMode,
    fallback_bpm: f64,
    accumulator: f64,
}

impl TransportTracker {
    pub fn new(mode: TransportMode, fallback_bpm: f64) -> Self {
        TransportTracker {
            mode,
            fallback_bpm,
            accumulator: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Beat the next unsynced block would start from.
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Query the play head and derive this block's timing.
    pub fn resolve(
        &mut self,
        play_head: Option<&dyn PlayHead>,
        num_samples: usize,
        sample_rate: f64,
    ) -> Result<TransportState, TransportFault> {
        let play_head = play_head.ok_or(TransportFault::NoPlayHead)?;
        let position = play_head.position().ok_or(TransportFault::NoPosition)?;
        self.advance(&position, num_samples, sample_rate)
    }

    pub fn advance(
        &mut self,
        position: &PositionInfo,
        num_samples: usize,
        sample_rate: f64,
    ) -> Result<TransportState, TransportFault> {
        let host_bpm = position.bpm.filter(|bpm| bpm.is_finite() && *bpm > 0.0);
        let host_beat = position.ppq_position.filter(|ppq| ppq.is_finite());

        if self.mode == TransportMode::HostOnly
            && (!position.is_playing || host_bpm.is_none() || host_beat.is_none())
        {
            return Err(TransportFault::Stopped);
        }

        let bpm = host_bpm.unwrap_or(self.fallback_bpm);
        let beats_per_sample = bpm / (sample_rate * 60.0);

        let (start_beat, is_host_synced) = match host_beat {
            Some(beat) if position.is_playing => (beat, true),
            _ => (self.accumulator, false),
        };
        self.accumulator = start_beat + num_samples as f64 * beats_per_sample;

        Ok(TransportState {
            start_beat,
            beats_per_sample,
            is_host_synced,
        })
    }
}
