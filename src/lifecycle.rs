//! Canvas lifecycle: context acquisition, program build, DPR-aware resizing,
//! the per-frame loop, context-loss handling and teardown.
//!
//! The runtime is written against two traits so it can run on the host under
//! test: [`GraphicsBackend`] is the GL context plus the program and buffers
//! built on it, [`EffectHost`] is the environment (surface box, device pixel
//! ratio, clock, frame scheduler, event listeners).

use tracing::{debug, error, info, warn};

use crate::config::{Capability, EffectConfig, RecoveryPolicy};
use crate::error::EffectError;
use crate::shader::{ProgramOptions, ShaderSources, Uniforms};
use crate::surface::{PixelSize, SurfaceState};

/// Handle returned by the host frame scheduler.
pub type FrameId = i32;

/// A graphics context with the effect program loaded into it.
pub trait GraphicsBackend {
    /// Largest renderbuffer edge the backend can allocate.
    fn max_renderbuffer_size(&self) -> u32;

    /// Compile and link the program, upload the quad, resolve uniforms.
    /// Any partially built state must be released on error.
    fn build_program(&mut self, sources: &ShaderSources) -> Result<(), EffectError>;

    /// Reallocate the backing store and set the viewport.
    fn resize_backing(&mut self, size: PixelSize);

    fn set_uniforms(&mut self, uniforms: &Uniforms);

    fn draw(&mut self);
}

/// Event listeners the runtime keeps attached while mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    Resize,
    ContextLost,
    ContextRestored,
}

impl Listener {
    pub const ALL: [Listener; 3] = [Self::Resize, Self::ContextLost, Self::ContextRestored];
}

/// The environment the effect is mounted into.
pub trait EffectHost {
    type Backend: GraphicsBackend;

    /// Request a graphics context from the surface. `None` means unsupported.
    fn acquire_context(&mut self) -> Option<Self::Backend>;

    /// Displayed size of the surface in CSS pixels.
    fn css_size(&self) -> (f64, f64);

    fn device_pixel_ratio(&self) -> f64;

    fn viewport_width(&self) -> f64;

    /// Monotonic clock in milliseconds.
    fn now_ms(&self) -> f64;

    fn request_frame(&mut self) -> Option<FrameId>;

    fn cancel_frame(&mut self, id: FrameId);

    /// Returns `false` when the listener could not be registered.
    fn attach(&mut self, listener: Listener) -> bool;

    fn detach(&mut self, listener: Listener);

    fn reload_page(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Acquiring,
    Running,
    ContextLost,
    Unrecoverable,
    TornDown,
}

/// One mounted lightning effect. Owns its graphics context exclusively.
pub struct EffectRuntime<H: EffectHost> {
    host: H,
    backend: Option<H::Backend>,
    config: EffectConfig,
    capability: Capability,
    surface: Option<SurfaceState>,
    state: LifecycleState,
    pending_frame: Option<FrameId>,
    attached: Vec<Listener>,
    start_ms: f64,
    frames_drawn: u64,
}

impl<H: EffectHost> EffectRuntime<H> {
    pub fn new(host: H, config: EffectConfig) -> Self {
        Self {
            host,
            backend: None,
            config: config.sanitized(),
            capability: Capability::Desktop,
            surface: None,
            state: LifecycleState::Uninitialized,
            pending_frame: None,
            attached: Vec::new(),
            start_ms: 0.0,
            frames_drawn: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    /// Replace the configuration; the next frame picks it up.
    pub fn set_config(&mut self, config: EffectConfig) {
        self.config = config.sanitized();
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn surface(&self) -> Option<&SurfaceState> {
        self.surface.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn pending_frame(&self) -> Option<FrameId> {
        self.pending_frame
    }

    pub fn attached_listeners(&self) -> &[Listener] {
        &self.attached
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    fn transition(&mut self, next: LifecycleState) {
        debug!(from = ?self.state, to = ?next, "effect state");
        self.state = next;
    }

    /// Acquire the context, build the program, size the surface and start the
    /// frame loop. Failures are logged and leave the instance `Unrecoverable`.
    pub fn mount(&mut self) -> LifecycleState {
        if self.state != LifecycleState::Uninitialized {
            warn!(state = ?self.state, "mount called twice");
            return self.state;
        }
        self.transition(LifecycleState::Acquiring);

        if let Err(err) = self.acquire() {
            error!(%err, "lightning effect disabled");
            self.backend = None;
            self.transition(LifecycleState::Unrecoverable);
            return self.state;
        }

        self.resize();
        for listener in Listener::ALL {
            if self.host.attach(listener) {
                self.attached.push(listener);
            } else {
                warn!(?listener, "failed to attach listener");
            }
        }

        self.start_ms = self.host.now_ms();
        self.transition(LifecycleState::Running);
        self.schedule_frame();
        self.state
    }

    fn acquire(&mut self) -> Result<(), EffectError> {
        let mut backend = self
            .host
            .acquire_context()
            .ok_or(EffectError::UnsupportedBackend)?;

        self.capability = Capability::from_viewport_width(self.host.viewport_width());
        let sources = ShaderSources::new(ProgramOptions {
            octaves: self.capability.octaves(),
        });
        backend.build_program(&sources)?;

        info!(
            capability = ?self.capability,
            max_size = backend.max_renderbuffer_size(),
            "lightning program ready"
        );
        self.surface = Some(SurfaceState::new(backend.max_renderbuffer_size()));
        self.backend = Some(backend);
        Ok(())
    }

    /// Match the backing store to the surface box. No-op when unchanged.
    pub fn resize(&mut self) {
        let (Some(surface), Some(backend)) = (self.surface.as_mut(), self.backend.as_mut()) else {
            return;
        };
        let (css_width, css_height) = self.host.css_size();
        let dpr = self.host.device_pixel_ratio();
        if let Some(size) = surface.resize(css_width, css_height, dpr) {
            debug!(width = size.width, height = size.height, dpr, "resize backing store");
            backend.resize_backing(size);
        }
    }

    fn check_dpr_drift(&mut self) {
        let dpr = self.host.device_pixel_ratio();
        if self.surface.as_ref().is_some_and(|s| s.dpr_drifted(dpr)) {
            debug!(dpr, "device pixel ratio changed");
            self.resize();
        }
    }

    fn schedule_frame(&mut self) {
        match self.host.request_frame() {
            Some(id) => self.pending_frame = Some(id),
            None => error!("failed to schedule animation frame"),
        }
    }

    /// Frame callback body. Resizing always happens before the draw.
    pub fn on_frame(&mut self) {
        self.pending_frame = None;
        match self.state {
            LifecycleState::Running => {
                self.check_dpr_drift();
                self.draw();
                self.schedule_frame();
            }
            // Draws are no-ops on a lost context; keep ticking until restored.
            LifecycleState::ContextLost => self.schedule_frame(),
            _ => {}
        }
    }

    fn draw(&mut self) {
        let (Some(surface), Some(backend)) = (self.surface.as_ref(), self.backend.as_mut()) else {
            return;
        };
        // A zero-sized surface would feed a zero resolution to the shader.
        if !surface.is_drawable() {
            return;
        }
        let size = surface.size();
        let time = ((self.host.now_ms() - self.start_ms) / 1000.0) as f32;
        backend.set_uniforms(&Uniforms::new(&self.config, size.width, size.height, time));
        backend.draw();
        self.frames_drawn += 1;
    }

    pub fn on_resize(&mut self) {
        if matches!(
            self.state,
            LifecycleState::Running | LifecycleState::ContextLost
        ) {
            self.resize();
        }
    }

    /// Returns whether the default teardown should be suppressed.
    pub fn on_context_lost(&mut self) -> bool {
        if self.state == LifecycleState::Running {
            warn!("graphics context lost");
            self.transition(LifecycleState::ContextLost);
        }
        true
    }

    pub fn on_context_restored(&mut self) {
        if self.state != LifecycleState::ContextLost {
            return;
        }
        match self.config.recovery {
            RecoveryPolicy::ReloadPage => {
                info!("graphics context restored, reloading page");
                self.stop_frames();
                self.transition(LifecycleState::Unrecoverable);
                self.host.reload_page();
            }
            RecoveryPolicy::Rebuild => self.rebuild(),
        }
    }

    fn rebuild(&mut self) {
        let sources = ShaderSources::new(ProgramOptions {
            octaves: self.capability.octaves(),
        });
        let result = match self.backend.as_mut() {
            Some(backend) => backend.build_program(&sources),
            None => Err(EffectError::UnsupportedBackend),
        };
        match result {
            Ok(()) => {
                info!("graphics context restored, program rebuilt");
                if let Some(surface) = self.surface.as_mut() {
                    surface.invalidate();
                }
                self.resize();
                self.transition(LifecycleState::Running);
            }
            Err(err) => {
                error!(%err, "rebuild after context restore failed");
                self.stop_frames();
                self.transition(LifecycleState::Unrecoverable);
            }
        }
    }

    fn stop_frames(&mut self) {
        if let Some(id) = self.pending_frame.take() {
            self.host.cancel_frame(id);
        }
    }

    /// Cancel the frame loop, detach every listener and free the context.
    /// Safe to call more than once.
    pub fn unmount(&mut self) {
        if self.state == LifecycleState::TornDown {
            return;
        }
        self.stop_frames();
        for listener in self.attached.drain(..) {
            self.host.detach(listener);
        }
        self.backend = None;
        self.transition(LifecycleState::TornDown);
    }
}

impl<H: EffectHost> Drop for EffectRuntime<H> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct NullBackend;

    impl GraphicsBackend for NullBackend {
        fn max_renderbuffer_size(&self) -> u32 {
            4096
        }
        fn build_program(&mut self, _: &ShaderSources) -> Result<(), EffectError> {
            Ok(())
        }
        fn resize_backing(&mut self, _: PixelSize) {}
        fn set_uniforms(&mut self, _: &Uniforms) {}
        fn draw(&mut self) {}
    }

    #[derive(Default)]
    struct CountingHost {
        next_frame: FrameId,
        frames_requested: u32,
    }

    impl EffectHost for CountingHost {
        type Backend = NullBackend;
        fn acquire_context(&mut self) -> Option<NullBackend> {
            Some(NullBackend)
        }
        fn css_size(&self) -> (f64, f64) {
            (320.0, 200.0)
        }
        fn device_pixel_ratio(&self) -> f64 {
            1.0
        }
        fn viewport_width(&self) -> f64 {
            320.0
        }
        fn now_ms(&self) -> f64 {
            0.0
        }
        fn request_frame(&mut self) -> Option<FrameId> {
            self.next_frame += 1;
            self.frames_requested += 1;
            Some(self.next_frame)
        }
        fn cancel_frame(&mut self, _: FrameId) {}
        fn attach(&mut self, _: Listener) -> bool {
            true
        }
        fn detach(&mut self, _: Listener) {}
        fn reload_page(&mut self) {}
    }

    #[test]
    fn narrow_viewport_mounts_in_mobile_mode() {
        let mut rt = EffectRuntime::new(CountingHost::default(), EffectConfig::default());
        assert_eq!(rt.mount(), LifecycleState::Running);
        assert_eq!(rt.capability(), Capability::Mobile);
    }

    #[test]
    fn second_mount_is_ignored() {
        let mut rt = EffectRuntime::new(CountingHost::default(), EffectConfig::default());
        rt.mount();
        rt.mount();
        assert_eq!(rt.host().frames_requested, 1);
        assert_eq!(rt.attached_listeners().len(), 3);
    }

    #[test]
    fn each_frame_reschedules_once() {
        let mut rt = EffectRuntime::new(CountingHost::default(), EffectConfig::default());
        rt.mount();
        for _ in 0..5 {
            rt.on_frame();
        }
        assert_eq!(rt.frames_drawn(), 5);
        assert_eq!(rt.host().frames_requested, 6);
        assert_eq!(rt.pending_frame(), Some(6));
    }
}
