use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};

use crate::audio::{analyser::SILENCE, check_extension, Analyser, AudioLoader, LoadOutcome};
use crate::effects::{RenderMode, ScopePreset};
use crate::error::{Result, VisualizerError};
use crate::graphics::mapper::{line_points, map_frame_with, WallClock};
use crate::graphics::{Canvas, FrameScheduler, RenderLoop, TickOutcome};
use crate::player::{Player, Transport};

/// What the controls panel shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlsView {
    pub file_name: Option<String>,
    pub loading: Option<String>,
    pub playing: bool,
    pub status: Option<String>,
}

/// Owns everything the open/play/pause commands touch.
pub struct Visualizer<T: Transport, L: AudioLoader> {
    player: Player<T>,
    loader: L,
    analyser: Analyser,
    render_loop: RenderLoop,
    canvas: Canvas,
    preset: ScopePreset,
    snapshot: Vec<u8>,
    pending: Option<PathBuf>,
    current: Option<PathBuf>,
    status: Option<String>,
}

impl<T: Transport, L: AudioLoader> Visualizer<T, L> {
    pub fn new(
        player: Player<T>,
        loader: L,
        analyser: Analyser,
        render_loop: RenderLoop,
        canvas: Canvas,
        preset: ScopePreset,
    ) -> Self {
        let snapshot = vec![SILENCE; analyser.window_size()];
        Self {
            player,
            loader,
            analyser,
            render_loop,
            canvas,
            preset,
            snapshot,
            pending: None,
            current: None,
            status: None,
        }
    }

    pub fn player(&self) -> &Player<T> {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player<T> {
        &mut self.player
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn preset(&self) -> &ScopePreset {
        &self.preset
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    /// Validates the extension and starts loading. Unsupported files never
    /// reach the loader.
    pub fn open(&mut self, path: PathBuf) -> Result<()> {
        check_extension(&path)?;

        info!("Opening {}", path.display());
        self.pending = Some(path.clone());
        self.loader.request(path);
        Ok(())
    }

    /// Applies a finished load: the new buffer plays from the start.
    pub fn on_loaded(&mut self, outcome: LoadOutcome) -> Result<()> {
        if self.pending.as_ref() != Some(&outcome.path) {
            debug!("Ignoring stale load of {}", outcome.path.display());
            return Ok(());
        }
        self.pending = None;

        let audio = outcome.result?;
        self.player.load(audio);
        self.analyser.reset();
        self.current = Some(outcome.path);
        self.play()
    }

    /// Starts (or restarts) playback from the stored position along with a
    /// single render loop. Success clears the status line.
    pub fn play(&mut self) -> Result<()> {
        self.player.play()?;
        self.render_loop.start();
        self.status = None;
        Ok(())
    }

    /// Cancels the render loop and stops playback, remembering where.
    pub fn pause(&mut self) -> Result<()> {
        self.render_loop.stop();
        self.player.pause()
    }

    pub fn toggle(&mut self) -> Result<()> {
        if self.player.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    /// One display refresh worth of work.
    pub fn frame<S: FrameScheduler + ?Sized>(&mut self, scheduler: &S, clock: WallClock) -> TickOutcome {
        let analyser = &mut self.analyser;
        let snapshot = &mut self.snapshot;
        let canvas = &mut self.canvas;
        let preset = &self.preset;

        self.render_loop
            .tick(scheduler, || draw_frame(analyser, snapshot, canvas, preset, clock))
    }

    /// Recreates the canvas for a new surface size. Zero sizes (minimised
    /// windows) keep the old canvas.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        if width == self.canvas.width() && height == self.canvas.height() {
            return Ok(());
        }
        self.canvas = Canvas::new(width, height)?;
        debug!("Canvas resized to {}x{}", width, height);
        Ok(())
    }

    /// Logs an error and keeps it for the status line. Pausing with nothing
    /// playing is not worth telling the user about.
    pub fn report(&mut self, err: VisualizerError) {
        match err {
            VisualizerError::NoActiveSource => debug!("{}", err),
            VisualizerError::UnsupportedFileType { .. } | VisualizerError::NothingLoaded => {
                warn!("{}", err);
                self.status = Some(err.to_string());
            }
            _ => {
                error!("{}", err);
                self.status = Some(err.to_string());
            }
        }
    }

    pub fn controls_view(&self) -> ControlsView {
        let name = |path: &PathBuf| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        };

        ControlsView {
            file_name: self.current.as_ref().map(name),
            loading: self.pending.as_ref().map(name),
            playing: self.player.is_playing(),
            status: self.status.clone(),
        }
    }
}

fn draw_frame(
    analyser: &mut Analyser,
    snapshot: &mut Vec<u8>,
    canvas: &mut Canvas,
    preset: &ScopePreset,
    clock: WallClock,
) -> Result<()> {
    analyser.refresh();
    snapshot.resize(analyser.window_size(), SILENCE);
    analyser.byte_time_domain_data(snapshot);

    canvas.wash(preset.parameters.background)?;

    let geometry = canvas.geometry();
    match preset.mode {
        RenderMode::RingFill => {
            let frame = map_frame_with(snapshot, geometry, clock, &preset.mapper_style());
            canvas.fill_ring(&frame)
        }
        RenderMode::RingStroke => {
            let frame = map_frame_with(snapshot, geometry, clock, &preset.mapper_style());
            canvas.stroke_ring(&frame, preset.parameters.line_width)
        }
        RenderMode::Line => canvas.stroke_line(
            &line_points(snapshot, geometry),
            preset.parameters.line_color,
            preset.parameters.line_width,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::PresetManager;
    use crate::graphics::render_loop::tests::CountingScheduler;
    use crate::graphics::DrawFailurePolicy;
    use crate::player::tests::{tone, FakeTransport};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingLoader {
        requests: Vec<PathBuf>,
    }

    impl AudioLoader for RecordingLoader {
        fn request(&mut self, path: PathBuf) {
            self.requests.push(path);
        }
    }

    fn visualizer() -> Visualizer<FakeTransport, RecordingLoader> {
        visualizer_with("ring", DrawFailurePolicy::LogAndContinue)
    }

    fn visualizer_with(preset: &str, policy: DrawFailurePolicy) -> Visualizer<FakeTransport, RecordingLoader> {
        Visualizer::new(
            Player::new(FakeTransport::default()),
            RecordingLoader::default(),
            Analyser::new(256),
            RenderLoop::new(policy),
            Canvas::new(400, 300).unwrap(),
            PresetManager::new().get(preset).unwrap().clone(),
        )
    }

    fn loaded(path: &str) -> LoadOutcome {
        LoadOutcome {
            path: PathBuf::from(path),
            result: Ok(tone()),
        }
    }

    #[test]
    fn unsupported_extension_changes_nothing() {
        let mut visualizer = visualizer();
        let before = visualizer.controls_view();

        let err = visualizer.open(PathBuf::from("track.ogg")).unwrap_err();
        assert!(matches!(err, VisualizerError::UnsupportedFileType { .. }));
        assert!(visualizer.loader().requests.is_empty());
        assert_eq!(visualizer.controls_view(), before);
        assert!(!visualizer.render_loop().is_running());
    }

    #[test]
    fn successful_load_plays_from_the_start() {
        let mut visualizer = visualizer();
        visualizer.open(PathBuf::from("/music/song.mp3")).unwrap();
        assert_eq!(visualizer.loader().requests, vec![PathBuf::from("/music/song.mp3")]);
        assert_eq!(visualizer.controls_view().loading.as_deref(), Some("song.mp3"));

        visualizer.on_loaded(loaded("/music/song.mp3")).unwrap();
        assert!(visualizer.is_playing());
        assert!(visualizer.render_loop().is_running());
        assert_eq!(visualizer.player().transport().starts, vec![Duration::ZERO]);

        let view = visualizer.controls_view();
        assert_eq!(view.file_name.as_deref(), Some("song.mp3"));
        assert_eq!(view.loading, None);
    }

    #[test]
    fn decode_failure_is_reported_not_fatal() {
        let mut visualizer = visualizer();
        visualizer.open(PathBuf::from("broken.wav")).unwrap();

        let err = visualizer
            .on_loaded(LoadOutcome {
                path: PathBuf::from("broken.wav"),
                result: Err(VisualizerError::decode("bad header").with_path("broken.wav")),
            })
            .unwrap_err();
        visualizer.report(err);

        assert!(!visualizer.is_playing());
        assert_eq!(visualizer.status(), Some("Failed to decode broken.wav: bad header"));
        assert_eq!(visualizer.controls_view().loading, None);
    }

    #[test]
    fn stale_load_is_ignored() {
        let mut visualizer = visualizer();
        visualizer.open(PathBuf::from("first.wav")).unwrap();
        visualizer.open(PathBuf::from("second.wav")).unwrap();

        visualizer.on_loaded(loaded("first.wav")).unwrap();
        assert!(!visualizer.is_playing());

        visualizer.on_loaded(loaded("second.wav")).unwrap();
        assert_eq!(visualizer.current_file(), Some(Path::new("second.wav")));
    }

    #[test]
    fn pause_resumes_at_recorded_offset() {
        let mut visualizer = visualizer();
        visualizer.open(PathBuf::from("a.wav")).unwrap();
        visualizer.on_loaded(loaded("a.wav")).unwrap();

        visualizer.player_mut().transport_mut().clock = Duration::from_millis(1750);
        visualizer.pause().unwrap();
        assert!(!visualizer.render_loop().is_running());

        visualizer.play().unwrap();
        assert_eq!(
            visualizer.player().transport().starts,
            vec![Duration::ZERO, Duration::from_millis(1750)]
        );
        assert!(visualizer.render_loop().is_running());
    }

    #[test]
    fn pause_with_nothing_playing_still_cancels_loop() {
        let mut visualizer = visualizer();
        let err = visualizer.pause().unwrap_err();
        assert!(matches!(err, VisualizerError::NoActiveSource));

        visualizer.report(err);
        assert_eq!(visualizer.status(), None);
    }

    #[test]
    fn play_before_open_is_surfaced() {
        let mut visualizer = visualizer();
        let err = visualizer.play().unwrap_err();
        visualizer.report(err);

        assert_eq!(visualizer.status(), Some("No audio file loaded"));
        assert!(!visualizer.render_loop().is_running());
    }

    #[test]
    fn successful_play_clears_the_status_line() {
        let mut visualizer = visualizer();
        visualizer.open(PathBuf::from("a.wav")).unwrap();
        visualizer.on_loaded(loaded("a.wav")).unwrap();

        let err = visualizer.open(PathBuf::from("cover.png")).unwrap_err();
        visualizer.report(err);
        assert!(visualizer.status().is_some());

        visualizer.pause().unwrap();
        visualizer.play().unwrap();
        assert_eq!(visualizer.status(), None);
        assert_eq!(visualizer.current_file(), Some(Path::new("a.wav")));
    }

    #[test]
    fn frames_only_draw_while_playing() {
        let mut visualizer = visualizer();
        let scheduler = CountingScheduler::default();
        let clock = WallClock::from_unix_seconds(0.0);

        assert_eq!(visualizer.frame(&scheduler, clock), TickOutcome::Idle);
        assert_eq!(visualizer.canvas().pixel(200, 150), Some([0, 0, 0, 0]));

        visualizer.open(PathBuf::from("a.wav")).unwrap();
        visualizer.on_loaded(loaded("a.wav")).unwrap();
        assert_eq!(visualizer.frame(&scheduler, clock), TickOutcome::Drawn);
        assert_eq!(scheduler.requests.get(), 1);
        assert!(visualizer.canvas().pixel(200, 150).unwrap()[3] > 0);

        visualizer.toggle().unwrap();
        assert_eq!(visualizer.frame(&scheduler, clock), TickOutcome::Idle);
        assert_eq!(scheduler.requests.get(), 1);
    }

    #[test]
    fn line_preset_draws_a_trace() {
        let mut visualizer = visualizer_with("line", DrawFailurePolicy::Stop);
        let scheduler = CountingScheduler::default();
        visualizer.open(PathBuf::from("a.wav")).unwrap();
        visualizer.on_loaded(loaded("a.wav")).unwrap();

        assert_eq!(
            visualizer.frame(&scheduler, WallClock::from_unix_seconds(0.0)),
            TickOutcome::Drawn
        );
        assert!(visualizer.render_loop().is_running());
    }

    #[test]
    fn resize_replaces_canvas_but_ignores_zero() {
        let mut visualizer = visualizer();
        visualizer.resize(0, 0).unwrap();
        assert_eq!(visualizer.canvas().width(), 400);

        visualizer.resize(800, 600).unwrap();
        assert_eq!((visualizer.canvas().width(), visualizer.canvas().height()), (800, 600));
    }
}
