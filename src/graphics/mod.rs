pub mod canvas;
pub mod engine;
pub mod mapper;
pub mod render_loop;

pub use canvas::Canvas;
pub use engine::GraphicsEngine;
pub use mapper::{map_frame, CanvasGeometry, ColorGradient, RingFrame, RingPoint, WallClock};
pub use render_loop::{AnimationHandle, DrawFailurePolicy, FrameScheduler, RenderLoop, TickOutcome};
