use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, VisualizerError>;

/// Everything the visualizer reports back to the user or the log.
#[derive(Debug, thiserror::Error)]
pub enum VisualizerError {
    #[error("Unsupported file type: {} (only .wav and .mp3 can be opened)", .path.display())]
    UnsupportedFileType { path: PathBuf },

    #[error("Failed to decode {}: {reason}", describe(.path))]
    DecodeFailure {
        path: Option<PathBuf>,
        reason: String,
    },

    #[error("No active audio source")]
    NoActiveSource,

    #[error("No audio file loaded")]
    NothingLoaded,

    #[error("Draw error: {0}")]
    Draw(String),

    #[error("Audio output error: {0}")]
    Audio(String),

    #[error("Preset error: {0}")]
    Preset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "audio".to_string(),
    }
}

impl VisualizerError {
    pub fn decode<T: Into<String>>(reason: T) -> Self {
        Self::DecodeFailure {
            path: None,
            reason: reason.into(),
        }
    }

    /// Attaches the file a decode failure belongs to.
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::DecodeFailure { reason, .. } => Self::DecodeFailure {
                path: Some(path.into()),
                reason,
            },
            other => other,
        }
    }
}
