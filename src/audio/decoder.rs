use log::{info, warn};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Result, VisualizerError};

/// File extensions the open command accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["wav", "mp3"];

/// Fully decoded PCM, interleaved by channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Returns the lowercased extension if the file can be opened.
pub fn check_extension(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        _ => Err(VisualizerError::UnsupportedFileType {
            path: path.to_path_buf(),
        }),
    }
}

/// Decodes a complete in-memory file. `extension` is only a probe hint.
pub fn decode_bytes(bytes: Vec<u8>, extension: &str) -> Result<DecodedAudio> {
    let stream = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(extension);

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| VisualizerError::decode(format!("unrecognised format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| VisualizerError::decode("no decodable audio track"))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| VisualizerError::decode(format!("unsupported codec: {}", e)))?;

    let mut samples = Vec::new();
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16).unwrap_or(0);
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut sample_buffer: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(VisualizerError::decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let capacity = decoded.capacity() as u64;

                // Packets can grow (the first mp3 frame is often short)
                let needed = capacity as usize * spec.channels.count();
                if sample_buffer.as_ref().map_or(true, |b| b.capacity() < needed) {
                    sample_buffer = Some(SampleBuffer::new(capacity, spec));
                }
                if let Some(buffer) = sample_buffer.as_mut() {
                    buffer.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buffer.samples());
                }

                channels = spec.channels.count() as u16;
                sample_rate = spec.rate;
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(VisualizerError::decode(e.to_string())),
        }
    }

    if samples.is_empty() || channels == 0 {
        return Err(VisualizerError::decode("file contains no audio frames"));
    }

    let audio = DecodedAudio::new(samples, channels, sample_rate);
    info!(
        "Decoded {} frames ({} ch @ {}Hz, {:.2}s)",
        audio.frames(),
        audio.channels,
        audio.sample_rate,
        audio.duration().as_secs_f64()
    );
    Ok(audio)
}

/// Result of one load request, tagged with the file it was for.
#[derive(Debug)]
pub struct LoadOutcome {
    pub path: PathBuf,
    pub result: Result<Arc<DecodedAudio>>,
}

/// Starts reading and decoding a file without blocking the caller.
pub trait AudioLoader {
    fn request(&mut self, path: PathBuf);
}

/// Reads with `tokio::fs`, decodes on the blocking pool and hands the
/// outcome to a completion callback.
pub struct TokioLoader {
    runtime: tokio::runtime::Runtime,
    on_complete: Arc<dyn Fn(LoadOutcome) + Send + Sync>,
}

impl TokioLoader {
    pub fn new(on_complete: impl Fn(LoadOutcome) + Send + Sync + 'static) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("ringscope-loader")
            .enable_all()
            .build()?;

        Ok(Self {
            runtime,
            on_complete: Arc::new(on_complete),
        })
    }
}

impl AudioLoader for TokioLoader {
    fn request(&mut self, path: PathBuf) {
        let on_complete = Arc::clone(&self.on_complete);
        self.runtime.spawn(async move {
            let result = load_file(&path).await.map_err(|e| e.with_path(path.clone()));
            on_complete(LoadOutcome { path, result });
        });
    }
}

async fn load_file(path: &Path) -> Result<Arc<DecodedAudio>> {
    let extension = check_extension(path)?;
    info!("Loading audio file: {}", path.display());

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| VisualizerError::decode(format!("could not read file: {}", e)))?;
    let audio = tokio::task::spawn_blocking(move || decode_bytes(bytes, &extension))
        .await
        .map_err(|e| VisualizerError::decode(format!("decoder task failed: {}", e)))??;

    Ok(Arc::new(audio))
}
