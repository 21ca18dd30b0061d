use log::{debug, info};
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{DecodedAudio, SampleTap};
use crate::error::{Result, VisualizerError};
use crate::player::Transport;

/// Mono frames collected before a chunk is sent to the analyser.
const TAP_CHUNK_FRAMES: usize = 256;

/// Frame position shared between a playing source and the UI thread.
#[derive(Debug, Clone, Default)]
pub struct PlayheadPosition(Arc<AtomicU64>);

impl PlayheadPosition {
    pub fn frame(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, frame: u64) {
        self.0.store(frame, Ordering::Relaxed);
    }
}

/// Plays decoded audio forever from a starting frame, feeding the mono mix
/// to the analyser as it goes.
pub struct LoopingSource {
    audio: Arc<DecodedAudio>,
    frame: usize,
    channel: usize,
    tap: Option<SampleTap>,
    pending: Vec<f32>,
    frame_sum: f32,
    position: PlayheadPosition,
}

impl LoopingSource {
    pub fn new(audio: Arc<DecodedAudio>, offset: Duration, tap: Option<SampleTap>) -> Self {
        let frames = audio.frames();
        let start = if frames == 0 {
            0
        } else {
            (offset.as_secs_f64() * audio.sample_rate as f64).round() as usize % frames
        };

        let position = PlayheadPosition::default();
        position.set(start as u64);

        Self {
            audio,
            frame: start,
            channel: 0,
            tap,
            pending: Vec::with_capacity(TAP_CHUNK_FRAMES),
            frame_sum: 0.0,
            position,
        }
    }

    pub fn position(&self) -> PlayheadPosition {
        self.position.clone()
    }

    fn finish_frame(&mut self) {
        let channels = self.audio.channels as usize;
        self.pending.push(self.frame_sum / channels as f32);
        self.frame_sum = 0.0;
        self.channel = 0;

        self.frame += 1;
        if self.frame >= self.audio.frames() {
            self.frame = 0;
        }
        self.position.set(self.frame as u64);

        if self.pending.len() >= TAP_CHUNK_FRAMES {
            let chunk = std::mem::replace(&mut self.pending, Vec::with_capacity(TAP_CHUNK_FRAMES));
            if let Some(tap) = &self.tap {
                tap.push(chunk);
            }
        }
    }
}

impl Iterator for LoopingSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let channels = self.audio.channels as usize;
        if self.audio.frames() == 0 {
            return None;
        }

        let sample = self.audio.samples[self.frame * channels + self.channel];
        self.frame_sum += sample;
        self.channel += 1;
        if self.channel == channels {
            self.finish_frame();
        }

        Some(sample)
    }
}

impl Source for LoopingSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.audio.channels
    }

    fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

struct ActiveSource {
    sink: Sink,
    position: PlayheadPosition,
    sample_rate: u32,
}

/// rodio-backed transport: one output stream, a fresh sink per start.
pub struct AudioPlayback {
    #[allow(dead_code)]
    stream: OutputStream,
    stream_handle: OutputStreamHandle,
    tap: SampleTap,
    active: Option<ActiveSource>,
}

impl AudioPlayback {
    pub fn new(tap: SampleTap) -> Result<Self> {
        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| VisualizerError::Audio(e.to_string()))?;
        info!("Audio output stream opened");

        Ok(Self {
            stream,
            stream_handle,
            tap,
            active: None,
        })
    }
}

impl Transport for AudioPlayback {
    fn start(&mut self, audio: Arc<DecodedAudio>, offset: Duration) -> Result<()> {
        self.stop();

        let sample_rate = audio.sample_rate;
        let source = LoopingSource::new(audio, offset, Some(self.tap.stamped()));
        let position = source.position();

        let sink = Sink::try_new(&self.stream_handle).map_err(|e| VisualizerError::Audio(e.to_string()))?;
        sink.append(source);

        info!("Playback started at {:.2}s", offset.as_secs_f64());
        self.active = Some(ActiveSource {
            sink,
            position,
            sample_rate,
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.sink.stop();
            debug!("Playback source stopped");
        }
    }

    fn current_time(&self) -> Duration {
        match &self.active {
            Some(active) => {
                Duration::from_secs_f64(active.position.frame() as f64 / active.sample_rate as f64)
            }
            None => Duration::ZERO,
        }
    }
}
