//! DSP Engine — the rhythmic gate's real-time signal path.
//!
//! Everything reachable from [`processor::GateProcessor::process`] is safe to
//! run inside an audio callback: no allocation, no locks, no blocking.

pub mod gate;
pub mod link;
pub mod metric;
pub mod pan;
pub mod processor;
pub mod renderer;
pub mod sequencer;
pub mod transport;
