use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::trace;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Analysis window used when nothing else is configured.
pub const DEFAULT_WINDOW_SIZE: usize = 1024;

/// Chunks the audio thread may queue before new ones are dropped.
const TAP_CAPACITY: usize = 64;

/// Byte value the analyser reports for silence.
pub const SILENCE: u8 = 128;

/// Sending half handed to the playback source. Never blocks.
///
/// Each tap is stamped with the analyser generation it was made in; chunks
/// from a generation older than the last `Analyser::reset` are discarded.
#[derive(Clone)]
pub struct SampleTap {
    sender: Sender<(u64, Vec<f32>)>,
    generation: Arc<AtomicU64>,
    stamp: u64,
}

impl SampleTap {
    /// Queues a mono chunk. Returns false when the chunk was dropped.
    pub fn push(&self, chunk: Vec<f32>) -> bool {
        match self.sender.try_send((self.stamp, chunk)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// A copy of this tap stamped with the analyser's current generation.
    pub fn stamped(&self) -> SampleTap {
        SampleTap {
            sender: self.sender.clone(),
            generation: Arc::clone(&self.generation),
            stamp: self.generation.load(Ordering::Acquire),
        }
    }
}

/// Time-domain analyser: keeps the most recent `window_size` mono samples
/// of whatever is playing and reports them as unsigned bytes.
pub struct Analyser {
    receiver: Receiver<(u64, Vec<f32>)>,
    tap: SampleTap,
    generation: Arc<AtomicU64>,
    window: VecDeque<f32>,
    window_size: usize,
}

impl Analyser {
    pub fn new(window_size: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(TAP_CAPACITY);
        let window_size = window_size.max(1);
        let generation = Arc::new(AtomicU64::new(0));

        Self {
            receiver,
            tap: SampleTap {
                sender,
                generation: Arc::clone(&generation),
                stamp: 0,
            },
            generation,
            window: std::iter::repeat(0.0).take(window_size).collect(),
            window_size,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn tap(&self) -> SampleTap {
        self.tap.stamped()
    }

    /// Moves every queued chunk of the current generation into the window.
    pub fn refresh(&mut self) {
        let current = self.generation.load(Ordering::Acquire);
        let mut received = 0;
        let mut stale = 0;
        while let Ok((stamp, chunk)) = self.receiver.try_recv() {
            if stamp != current {
                stale += chunk.len();
                continue;
            }
            received += chunk.len();
            self.push_samples(&chunk);
        }
        if received > 0 || stale > 0 {
            trace!("Analyser took {} samples, dropped {} stale", received, stale);
        }
    }

    /// Forgets the current window and anything still queued. Taps stamped
    /// before the reset stop counting, so a source that is still winding
    /// down cannot leak into the next one.
    pub fn reset(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        while self.receiver.try_recv().is_ok() {}
        self.window.iter_mut().for_each(|s| *s = 0.0);
    }

    fn push_samples(&mut self, samples: &[f32]) {
        // Only the tail can survive in the window
        let start = samples.len().saturating_sub(self.window_size);
        for &sample in &samples[start..] {
            self.window.pop_front();
            self.window.push_back(sample);
        }
    }

    /// Writes the current window as bytes, 128 being silence. Copies at most
    /// `min(out.len(), window_size)` values.
    pub fn byte_time_domain_data(&self, out: &mut [u8]) {
        for (byte, &sample) in out.iter_mut().zip(self.window.iter()) {
            *byte = sample_to_byte(sample);
        }
    }

    /// Refreshes and returns a freshly allocated snapshot.
    pub fn snapshot(&mut self) -> Vec<u8> {
        self.refresh();
        let mut data = vec![SILENCE; self.window_size];
        self.byte_time_domain_data(&mut data);
        data
    }
}

/// Maps [-1, 1] onto [0, 255] with 0.0 landing on 128.
pub fn sample_to_byte(sample: f32) -> u8 {
    if !sample.is_finite() {
        return SILENCE;
    }
    (128.0 * (1.0 + sample)).clamp(0.0, 255.0) as u8
}
