//! Browser side of the effect lifecycle: frame scheduling, listeners, and the
//! `LightningEffect` class exported to JavaScript.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{error, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, EventTarget, HtmlCanvasElement, Window};

use super::render::WebGlBackend;
use crate::config::EffectConfig;
use crate::lifecycle::{EffectHost, EffectRuntime, FrameId, LifecycleState, Listener};

type SharedRuntime = Rc<RefCell<EffectRuntime<BrowserHost>>>;
type WeakRuntime = Weak<RefCell<EffectRuntime<BrowserHost>>>;

/// Run `f` against the runtime if it is still alive and not already borrowed.
fn with_runtime(weak: &WeakRuntime, f: impl FnOnce(&mut EffectRuntime<BrowserHost>)) {
    let Some(rt) = weak.upgrade() else {
        return;
    };
    match rt.try_borrow_mut() {
        Ok(mut rt) => f(&mut rt),
        Err(_) => warn!("effect callback re-entered, skipped"),
    };
}

pub struct BrowserHost {
    window: Window,
    canvas: HtmlCanvasElement,
    on_frame: Closure<dyn FnMut(f64)>,
    on_resize: Closure<dyn FnMut()>,
    on_context_lost: Closure<dyn FnMut(Event)>,
    on_context_restored: Closure<dyn FnMut()>,
}

impl BrowserHost {
    fn new(window: Window, canvas: HtmlCanvasElement, runtime: WeakRuntime) -> Self {
        let on_frame = {
            let runtime = runtime.clone();
            Closure::wrap(Box::new(move |_ts: f64| {
                with_runtime(&runtime, |rt| rt.on_frame());
            }) as Box<dyn FnMut(f64)>)
        };
        let on_resize = {
            let runtime = runtime.clone();
            Closure::wrap(Box::new(move || {
                with_runtime(&runtime, |rt| rt.on_resize());
            }) as Box<dyn FnMut()>)
        };
        let on_context_lost = {
            let runtime = runtime.clone();
            Closure::wrap(Box::new(move |event: Event| {
                with_runtime(&runtime, |rt| {
                    if rt.on_context_lost() {
                        event.prevent_default();
                    }
                });
            }) as Box<dyn FnMut(Event)>)
        };
        let on_context_restored = Closure::wrap(Box::new(move || {
            with_runtime(&runtime, |rt| rt.on_context_restored());
        }) as Box<dyn FnMut()>);

        Self {
            window,
            canvas,
            on_frame,
            on_resize,
            on_context_lost,
            on_context_restored,
        }
    }

    fn listener_target(&self, listener: Listener) -> (&EventTarget, &'static str, &js_sys::Function) {
        match listener {
            Listener::Resize => (
                AsRef::<EventTarget>::as_ref(&self.window),
                "resize",
                self.on_resize.as_ref().unchecked_ref(),
            ),
            Listener::ContextLost => (
                AsRef::<EventTarget>::as_ref(&self.canvas),
                "webglcontextlost",
                self.on_context_lost.as_ref().unchecked_ref(),
            ),
            Listener::ContextRestored => (
                AsRef::<EventTarget>::as_ref(&self.canvas),
                "webglcontextrestored",
                self.on_context_restored.as_ref().unchecked_ref(),
            ),
        }
    }
}

impl EffectHost for BrowserHost {
    type Backend = WebGlBackend;

    fn acquire_context(&mut self) -> Option<WebGlBackend> {
        WebGlBackend::acquire(&self.canvas)
    }

    fn css_size(&self) -> (f64, f64) {
        let rect = self.canvas.get_bounding_client_rect();
        (rect.width(), rect.height())
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.device_pixel_ratio()
    }

    fn viewport_width(&self) -> f64 {
        self.window
            .inner_width()
            .ok()
            .and_then(|w| w.as_f64())
            .unwrap_or(0.0)
    }

    fn now_ms(&self) -> f64 {
        self.window.performance().map(|p| p.now()).unwrap_or(0.0)
    }

    fn request_frame(&mut self) -> Option<FrameId> {
        self.window
            .request_animation_frame(self.on_frame.as_ref().unchecked_ref())
            .ok()
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if let Err(err) = self.window.cancel_animation_frame(id) {
            warn!(?err, "cancelAnimationFrame failed");
        }
    }

    fn attach(&mut self, listener: Listener) -> bool {
        let (target, event, callback) = self.listener_target(listener);
        target.add_event_listener_with_callback(event, callback).is_ok()
    }

    fn detach(&mut self, listener: Listener) {
        let (target, event, callback) = self.listener_target(listener);
        if let Err(err) = target.remove_event_listener_with_callback(event, callback) {
            warn!(?err, event, "removeEventListener failed");
        }
    }

    fn reload_page(&mut self) {
        if let Err(err) = self.window.location().reload() {
            error!(?err, "page reload failed");
        }
    }
}

/// Mount a runtime on `canvas` and start it.
pub fn mount(canvas: HtmlCanvasElement, config: EffectConfig) -> Result<SharedRuntime, JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let runtime = Rc::new_cyclic(|weak: &WeakRuntime| {
        RefCell::new(EffectRuntime::new(
            BrowserHost::new(window, canvas, weak.clone()),
            config,
        ))
    });
    let state = runtime.borrow_mut().mount();
    if state != LifecycleState::Running {
        warn!(?state, "lightning effect did not start");
    }
    Ok(runtime)
}

/// Procedural lightning rendered into a canvas.
///
/// Failures never throw after construction; the canvas just stays blank.
#[wasm_bindgen]
pub struct LightningEffect {
    runtime: SharedRuntime,
}

impl LightningEffect {
    pub(crate) fn from_runtime(runtime: SharedRuntime) -> Self {
        Self { runtime }
    }

    fn update(&self, f: impl FnOnce(&mut EffectConfig)) {
        let Ok(mut rt) = self.runtime.try_borrow_mut() else {
            warn!("effect busy, config change dropped");
            return;
        };
        let mut config = rt.config().clone();
        f(&mut config);
        rt.set_config(config);
    }
}

#[wasm_bindgen]
impl LightningEffect {
    /// `config` is an optional JSON object, e.g. `{"hue":142,"speed":1.1}`.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, config: Option<String>) -> Result<LightningEffect, JsValue> {
        super::init_logging();
        let config = match config {
            Some(json) => EffectConfig::from_json(&json)?,
            None => EffectConfig::default(),
        };
        Ok(Self {
            runtime: mount(canvas, config)?,
        })
    }

    #[wasm_bindgen(js_name = setHue)]
    pub fn set_hue(&self, hue: f32) {
        self.update(|c| c.hue = hue);
    }

    #[wasm_bindgen(js_name = setOffset)]
    pub fn set_offset(&self, x: f32, y: f32) {
        self.update(|c| {
            c.x_offset = x;
            c.y_offset = y;
        });
    }

    #[wasm_bindgen(js_name = setSpeed)]
    pub fn set_speed(&self, speed: f32) {
        self.update(|c| c.speed = speed);
    }

    #[wasm_bindgen(js_name = setIntensity)]
    pub fn set_intensity(&self, intensity: f32) {
        self.update(|c| c.intensity = intensity);
    }

    #[wasm_bindgen(js_name = setSize)]
    pub fn set_size(&self, size: f32) {
        self.update(|c| c.size = size);
    }

    #[wasm_bindgen(js_name = setActive)]
    pub fn set_active(&self, active: bool) {
        self.update(|c| c.active = active);
    }

    /// Replace the whole configuration from JSON; omitted keys take defaults.
    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&self, json: &str) -> Result<(), JsValue> {
        let config = EffectConfig::from_json(json)?;
        self.update(|c| *c = config);
        Ok(())
    }

    /// `"Running"`, `"ContextLost"`, `"Unrecoverable"`, ...
    pub fn state(&self) -> String {
        self.runtime
            .try_borrow()
            .map(|rt| format!("{:?}", rt.state()))
            .unwrap_or_else(|_| "Busy".to_owned())
    }

    /// Stop rendering and detach from the page. Idempotent.
    pub fn unmount(&self) {
        match self.runtime.try_borrow_mut() {
            Ok(mut rt) => rt.unmount(),
            Err(_) => error!("unmount while effect callback is running"),
        }
    }
}
