//! Ringscope: a looping audio player that draws its waveform as a ring.
//!
//! Decoding, playback, the analyser, the ring mapper, the raster canvas and
//! the controller live here and run without a window. `graphics::engine` and
//! `ui` put the canvas and the controls on screen; `main.rs` wires them to
//! the winit event loop.

pub mod app;
pub mod audio;
pub mod effects;
pub mod error;
pub mod graphics;
pub mod player;
pub mod ui;

pub use app::{ControlsView, Visualizer};
pub use error::{Result, VisualizerError};
