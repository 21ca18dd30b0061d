pub mod analyser;
pub mod decoder;
pub mod playback;

pub use analyser::{Analyser, SampleTap, DEFAULT_WINDOW_SIZE};
pub use decoder::{check_extension, decode_bytes, AudioLoader, DecodedAudio, LoadOutcome, TokioLoader};
pub use playback::{AudioPlayback, LoopingSource, PlayheadPosition};
