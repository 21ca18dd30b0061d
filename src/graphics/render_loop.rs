use log::{debug, error, trace, warn};

use crate::error::Result;

/// Host facility that calls back once on the next display refresh.
pub trait FrameScheduler {
    fn request_frame(&self);
}

impl FrameScheduler for winit::window::Window {
    fn request_frame(&self) {
        self.request_redraw();
    }
}

/// Opaque token for the one animation allowed to be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationHandle(u64);

/// What to do when painting a frame fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DrawFailurePolicy {
    /// Log the failure and try again on the next frame.
    #[default]
    #[value(name = "continue")]
    LogAndContinue,
    /// Log the failure and cancel the animation.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No animation is active; nothing was scheduled or drawn.
    Idle,
    Drawn,
    /// Drawing failed. `cancelled` tells whether the policy stopped the loop.
    Failed { cancelled: bool },
}

/// Self-rescheduling per-frame loop with explicit cancellation.
#[derive(Debug, Default)]
pub struct RenderLoop {
    next_id: u64,
    handle: Option<AnimationHandle>,
    policy: DrawFailurePolicy,
    frames: u64,
}

impl RenderLoop {
    pub fn new(policy: DrawFailurePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> DrawFailurePolicy {
        self.policy
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<AnimationHandle> {
        self.handle
    }

    /// Frames drawn successfully since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Installs a fresh handle, cancelling any previous one first.
    pub fn start(&mut self) -> AnimationHandle {
        if let Some(previous) = self.handle.take() {
            debug!("Replacing animation {:?}", previous);
        }
        self.next_id += 1;
        let handle = AnimationHandle(self.next_id);
        self.handle = Some(handle);
        debug!("Render loop started ({:?})", handle);
        handle
    }

    /// Invalidates the current handle. Returns it if one was active.
    pub fn stop(&mut self) -> Option<AnimationHandle> {
        let cancelled = self.handle.take();
        if let Some(handle) = cancelled {
            debug!("Render loop stopped ({:?})", handle);
        }
        cancelled
    }

    /// Runs one frame: schedules the next one, then draws.
    pub fn tick<S, F>(&mut self, scheduler: &S, draw: F) -> TickOutcome
    where
        S: FrameScheduler + ?Sized,
        F: FnOnce() -> Result<()>,
    {
        if self.handle.is_none() {
            return TickOutcome::Idle;
        }

        // Scheduled first so a failed draw cannot end the animation by itself
        scheduler.request_frame();

        match draw() {
            Ok(()) => {
                self.frames += 1;
                trace!("Frame {} drawn", self.frames);
                TickOutcome::Drawn
            }
            Err(e) => match self.policy {
                DrawFailurePolicy::LogAndContinue => {
                    warn!("Frame failed, retrying next frame: {}", e);
                    TickOutcome::Failed { cancelled: false }
                }
                DrawFailurePolicy::Stop => {
                    error!("Frame failed, stopping render loop: {}", e);
                    self.stop();
                    TickOutcome::Failed { cancelled: true }
                }
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::VisualizerError;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    pub(crate) struct CountingScheduler {
        pub requests: Cell<usize>,
    }

    impl FrameScheduler for CountingScheduler {
        fn request_frame(&self) {
            self.requests.set(self.requests.get() + 1);
        }
    }

    #[test]
    fn stopped_loop_neither_schedules_nor_draws() {
        let mut render_loop = RenderLoop::default();
        let scheduler = CountingScheduler::default();
        let drawn = Cell::new(false);

        let outcome = render_loop.tick(&scheduler, || {
            drawn.set(true);
            Ok(())
        });

        assert_eq!(outcome, TickOutcome::Idle);
        assert_eq!(scheduler.requests.get(), 0);
        assert!(!drawn.get());
    }

    #[test]
    fn schedules_before_drawing() {
        let mut render_loop = RenderLoop::default();
        let scheduler = CountingScheduler::default();
        render_loop.start();

        let seen_at_draw = RefCell::new(None);
        let outcome = render_loop.tick(&scheduler, || {
            *seen_at_draw.borrow_mut() = Some(scheduler.requests.get());
            Ok(())
        });

        assert_eq!(outcome, TickOutcome::Drawn);
        assert_eq!(*seen_at_draw.borrow(), Some(1));
        assert_eq!(render_loop.frames(), 1);
    }

    #[test]
    fn start_replaces_previous_handle() {
        let mut render_loop = RenderLoop::default();
        let first = render_loop.start();
        let second = render_loop.start();

        assert_ne!(first, second);
        assert_eq!(render_loop.handle(), Some(second));
        assert_eq!(render_loop.stop(), Some(second));
        assert_eq!(render_loop.stop(), None);
        assert!(!render_loop.is_running());
    }

    #[test]
    fn failure_keeps_running_by_default() {
        let mut render_loop = RenderLoop::new(DrawFailurePolicy::LogAndContinue);
        let scheduler = CountingScheduler::default();
        render_loop.start();

        let outcome = render_loop.tick(&scheduler, || Err(VisualizerError::Draw("boom".to_string())));
        assert_eq!(outcome, TickOutcome::Failed { cancelled: false });
        assert!(render_loop.is_running());

        render_loop.tick(&scheduler, || Ok(()));
        assert_eq!(scheduler.requests.get(), 2);
        assert_eq!(render_loop.frames(), 1);
    }

    #[test]
    fn stop_policy_cancels_after_failure() {
        let mut render_loop = RenderLoop::new(DrawFailurePolicy::Stop);
        let scheduler = CountingScheduler::default();
        render_loop.start();

        let outcome = render_loop.tick(&scheduler, || Err(VisualizerError::Draw("boom".to_string())));
        assert_eq!(outcome, TickOutcome::Failed { cancelled: true });
        assert!(!render_loop.is_running());

        // The frame requested before the failure arrives and finds nothing to do
        assert_eq!(render_loop.tick(&scheduler, || Ok(())), TickOutcome::Idle);
        assert_eq!(scheduler.requests.get(), 1);
    }
}
