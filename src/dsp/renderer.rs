//! Offline renderer — drives a [`GateProcessor`] over whole buffers and
//! encodes the main bus to WAV.

use super::processor::GateProcessor;
use super::transport::{PlayHead, PositionInfo};
use crate::error::GateError;

/// A play head that moves forward one block at a time.
#[derive(Debug, Clone)]
pub struct OfflineTransport {
    pub bpm: f64,
    pub ppq_position: f64,
    pub is_playing: bool,
}

impl OfflineTransport {
    /// A playing transport starting at beat 0.
    pub fn new(bpm: f64) -> Self {
        OfflineTransport {
            bpm,
            ppq_position: 0.0,
            is_playing: true,
        }
    }

    pub fn advance(&mut self, num_samples: usize, sample_rate: f64) {
        if self.is_playing {
            self.ppq_position += num_samples as f64 * self.bpm / (sample_rate * 60.0);
        }
    }
}

impl PlayHead for OfflineTransport {
    fn position(&self) -> Option<PositionInfo> {
        Some(PositionInfo {
            bpm: Some(self.bpm),
            ppq_position: Some(self.ppq_position),
            is_playing: self.is_playing,
        })
    }
}

/// Planar stereo output of both buses.
#[derive(Debug, Clone, Default)]
pub struct RenderedBuses {
    pub main: [Vec<f32>; 2],
    pub aux: [Vec<f32>; 2],
}

impl RenderedBuses {
    pub fn len(&self) -> usize {
        self.main[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.main[0].is_empty()
    }
}

/// Render planar stereo `input` through `processor` in blocks of `block_size`.
pub fn render_offline(
    processor: &mut GateProcessor,
    transport: &mut OfflineTransport,
    input: &[Vec<f32>],
    block_size: usize,
) -> Result<RenderedBuses, GateError> {
    if input.len() != 2 {
        return Err(GateError::ChannelMismatch {
            expected: 2,
            found: input.len(),
        });
    }
    let total = input[0].len().min(input[1].len());
    let block_size = block_size.max(1);

    let mut buses = RenderedBuses {
        main: [vec![0.0; total], vec![0.0; total]],
        aux: [vec![0.0; total], vec![0.0; total]],
    };

    let mut start = 0;
    while start < total {
        let end = (start + block_size).min(total);
        let [main_left, main_right] = &mut buses.main;
        let [aux_left, aux_right] = &mut buses.aux;
        let play_head: &dyn PlayHead = &*transport;
        processor.process(
            Some(play_head),
            [&input[0][start..end], &input[1][start..end]],
            [&mut main_left[start..end], &mut main_right[start..end]],
            [&mut aux_left[start..end], &mut aux_right[start..end]],
        );
        transport.advance(end - start, processor.sample_rate());
        start = end;
    }

    Ok(buses)
}

/// Encode the main bus as 16-bit stereo PCM WAV bytes.
pub fn encode_wav(buses: &RenderedBuses, sample_rate: u32) -> Vec<u8> {
    let [left, right] = &buses.main;
    let mut pcm = Vec::with_capacity(left.len() * 2);
    for (&l, &r) in left.iter().zip(right.iter()) {
        pcm.push(to_i16(l));
        pcm.push(to_i16(r));
    }
    encode_pcm(&pcm, sample_rate, 2)
}

fn to_i16(sample: f32) -> i16 {
    (sample as f64 * 32767.0).round().clamp(-32768.0, 32767.0) as i16
}

fn encode_pcm(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}
