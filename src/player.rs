use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

use crate::audio::DecodedAudio;
use crate::error::{Result, VisualizerError};

/// Something that can play decoded audio from an offset and report where it is.
pub trait Transport {
    /// Starts a looping source at `offset`, replacing any current one.
    fn start(&mut self, audio: Arc<DecodedAudio>, offset: Duration) -> Result<()>;

    /// Stops the current source, if any.
    fn stop(&mut self);

    /// Position of the current source within its buffer.
    fn current_time(&self) -> Duration;
}

#[derive(Debug, Default, Clone)]
pub struct PlayerState {
    pub audio: Option<Arc<DecodedAudio>>,
    pub position: Duration,
    pub active: bool,
}

/// Play/pause/resume over one loaded buffer.
pub struct Player<T: Transport> {
    transport: T,
    state: PlayerState,
}

impl<T: Transport> Player<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: PlayerState::default(),
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.state.active
    }

    /// Makes `audio` the current buffer and rewinds to the start.
    pub fn load(&mut self, audio: Arc<DecodedAudio>) {
        if self.state.active {
            self.transport.stop();
            self.state.active = false;
        }
        self.state.audio = Some(audio);
        self.state.position = Duration::ZERO;
    }

    /// Restarts from the stored position. Calling it while playing restarts
    /// the source from that same position.
    pub fn play(&mut self) -> Result<()> {
        let audio = self.state.audio.clone().ok_or(VisualizerError::NothingLoaded)?;

        if self.state.active {
            self.transport.stop();
            self.state.active = false;
        }

        self.transport.start(audio, self.state.position)?;
        self.state.active = true;
        info!("Playing from {:.2}s", self.state.position.as_secs_f64());
        Ok(())
    }

    /// Records the current time as the resume point and stops the source.
    pub fn pause(&mut self) -> Result<()> {
        if !self.state.active {
            return Err(VisualizerError::NoActiveSource);
        }

        self.state.position = self.transport.current_time();
        self.transport.stop();
        self.state.active = false;
        debug!("Paused at {:.2}s", self.state.position.as_secs_f64());
        Ok(())
    }
}
