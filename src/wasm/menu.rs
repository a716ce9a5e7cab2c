//! DOM rendering of the bubble menu and the `BubbleMenu` class exported to
//! JavaScript.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::Function;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, Document, Event, EventTarget, HtmlElement, Window};

use crate::menu::layout::Viewport;
use crate::menu::scroll::{ScrollLockTarget, ScrollWarning};
use crate::menu::timeline::Pose;
use crate::menu::{BubbleMenu, MenuConfig, MenuHost, MenuItem};

type FrameSlot = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

struct PageHost {
    window: Window,
    on_open_change: Option<Function>,
}

impl MenuHost for PageHost {
    fn viewport(&self) -> Viewport {
        let read = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        Viewport::new(read(self.window.inner_width()), read(self.window.inner_height()))
    }

    fn open_changed(&mut self, open: bool) {
        if let Some(callback) = &self.on_open_change {
            if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from_bool(open)) {
                warn!(?err, "open-change callback threw");
            }
        }
    }

    fn random(&mut self) -> f64 {
        js_sys::Math::random()
    }
}

struct BodyScroll {
    body: HtmlElement,
}

impl ScrollLockTarget for BodyScroll {
    fn set_scroll_locked(&self, locked: bool) {
        set_style(&self.body, "overflow", if locked { "hidden" } else { "" });
    }
}

fn set_style(el: &HtmlElement, property: &str, value: &str) {
    if let Err(err) = el.style().set_property(property, value) {
        debug!(?err, property, "style update failed");
    }
}

fn passive_options() -> AddEventListenerOptions {
    let options = AddEventListenerOptions::new();
    options.set_passive(true);
    options
}

fn create(document: &Document, tag: &str, css: &str) -> Result<HtmlElement, JsValue> {
    let el: HtmlElement = document.create_element(tag)?.dyn_into()?;
    el.style().set_css_text(css);
    Ok(el)
}

struct MenuView {
    nav: HtmlElement,
    toggle: HtmlElement,
    bars: [HtmlElement; 2],
    overlay: HtmlElement,
    buttons: Vec<HtmlElement>,
    warning: HtmlElement,
}

impl MenuView {
    fn build(
        document: &Document,
        container: &HtmlElement,
        body: &HtmlElement,
        config: &MenuConfig,
        items: &[MenuItem],
    ) -> Result<Self, JsValue> {
        let position = if config.use_fixed_position { "fixed" } else { "relative" };
        let nav = create(
            document,
            "nav",
            &format!(
                "position:{position};left:0;right:0;display:flex;align-items:center;\
                 justify-content:flex-end;pointer-events:none;z-index:1001;"
            ),
        )?;
        nav.set_class_name("bubble-menu");

        let toggle = create(
            document,
            "button",
            "display:inline-flex;flex-direction:column;align-items:center;justify-content:center;\
             pointer-events:auto;width:44px;height:44px;cursor:pointer;background:transparent;border:0;",
        )?;
        toggle.set_attribute("type", "button")?;
        toggle.set_attribute("aria-label", &config.menu_aria_label)?;
        toggle.set_attribute("aria-pressed", "false")?;

        let bar_css = format!(
            "display:block;width:22px;height:2px;background:{};transition:transform 0.25s ease;",
            config.menu_content_color
        );
        let bars = [
            create(document, "span", &bar_css)?,
            create(document, "span", &format!("{bar_css}margin-top:5px;"))?,
        ];
        for bar in &bars {
            toggle.append_child(bar)?;
        }
        nav.append_child(&toggle)?;
        container.append_child(&nav)?;

        let overlay = create(
            document,
            "div",
            "position:fixed;inset:0;z-index:1000;display:none;justify-content:center;\
             align-items:center;pointer-events:auto;background:rgba(255,255,255,0.1);\
             backdrop-filter:blur(12px);",
        )?;
        let orbit = create(
            document,
            "div",
            "position:absolute;top:70%;left:70%;pointer-events:none;",
        )?;
        let mut buttons = Vec::with_capacity(items.len());
        for item in items {
            let button = create(
                document,
                "button",
                &format!(
                    "position:absolute;border-radius:9999px;padding:0 24px;min-height:56px;\
                     display:flex;align-items:center;justify-content:center;\
                     background:rgba(15,23,42,0.7);border:1px solid {};color:{};cursor:pointer;\
                     pointer-events:auto;z-index:1100;white-space:nowrap;opacity:0;",
                    item.border_color(),
                    config.menu_content_color
                ),
            )?;
            button.set_text_content(Some(&item.label));
            orbit.append_child(&button)?;
            buttons.push(button);
        }
        overlay.append_child(&orbit)?;

        let warning = create(
            document,
            "div",
            "position:fixed;bottom:15rem;left:50%;transform:translateX(-50%);background:#000;\
             padding:1rem;border-radius:0.25rem;z-index:1200;display:none;color:#4ade80;\
             text-align:center;cursor:pointer;",
        )?;
        warning.set_text_content(Some(ScrollWarning::MESSAGE));
        overlay.append_child(&warning)?;
        body.append_child(&overlay)?;

        Ok(Self {
            nav,
            toggle,
            bars,
            overlay,
            buttons,
            warning,
        })
    }

    fn render(&self, open: bool, warning_visible: bool, poses: &[Pose], animating: bool) {
        if let Err(err) = self
            .toggle
            .set_attribute("aria-pressed", if open { "true" } else { "false" })
        {
            debug!(?err, "aria-pressed update failed");
        }
        let (top, bottom) = if open {
            ("translateY(4px) rotate(45deg)", "translateY(-4px) rotate(-45deg)")
        } else {
            ("none", "none")
        };
        set_style(&self.bars[0], "transform", top);
        set_style(&self.bars[1], "transform", bottom);

        set_style(
            &self.overlay,
            "display",
            if open || animating { "flex" } else { "none" },
        );
        for (button, pose) in self.buttons.iter().zip(poses) {
            let transform = format!(
                "translate(-50%, -50%) translate({:.2}px, {:.2}px) scale({:.3})",
                pose.x, pose.y, pose.scale
            );
            set_style(button, "transform", &transform);
            set_style(button, "opacity", &format!("{:.3}", pose.opacity));
        }
        set_style(
            &self.warning,
            "display",
            if open && warning_visible { "block" } else { "none" },
        );
    }

    fn remove(&self) {
        self.nav.remove();
        self.overlay.remove();
    }
}

struct MenuState {
    menu: BubbleMenu<PageHost>,
    view: MenuView,
    window: Window,
    document: Document,
    frame: Option<i32>,
}

impl MenuState {
    fn now(&self) -> f64 {
        self.window.performance().map(|p| p.now()).unwrap_or(0.0) / 1000.0
    }

    /// Paint the current poses and keep the frame loop alive while tweens run.
    fn refresh(&mut self, slot: &FrameSlot) {
        let now = self.now();
        let animating = self.menu.is_animating(now);
        let poses = self.menu.poses(now);
        self.view.render(
            self.menu.is_open(),
            self.menu.warning_visible(),
            &poses,
            animating,
        );
        if animating && self.frame.is_none() {
            if let Some(cb) = slot.borrow().as_ref() {
                self.frame = self
                    .window
                    .request_animation_frame(cb.as_ref().unchecked_ref())
                    .ok();
            }
        }
    }

    fn scroll_to(&self, href: &str) {
        match self.document.query_selector(href) {
            Ok(Some(target)) => target.scroll_into_view(),
            Ok(None) => debug!(href, "menu target not found"),
            Err(err) => warn!(?err, href, "invalid menu target selector"),
        }
    }
}

fn handler(
    state: &Rc<RefCell<MenuState>>,
    slot: &FrameSlot,
    f: impl Fn(&mut MenuState) + 'static,
) -> Closure<dyn FnMut(Event)> {
    let state: Weak<RefCell<MenuState>> = Rc::downgrade(state);
    let slot = Rc::downgrade(slot);
    Closure::wrap(Box::new(move |_event: Event| {
        let (Some(state), Some(slot)) = (state.upgrade(), slot.upgrade()) else {
            return;
        };
        let Ok(mut st) = state.try_borrow_mut() else {
            warn!("menu event re-entered, skipped");
            return;
        };
        f(&mut st);
        st.refresh(&slot);
    }) as Box<dyn FnMut(Event)>)
}

/// Radial popup navigation menu mounted into a container element.
#[wasm_bindgen(js_name = BubbleMenu)]
pub struct BubbleMenuWidget {
    state: Rc<RefCell<MenuState>>,
    slot: FrameSlot,
    listeners: Vec<(EventTarget, &'static str, Closure<dyn FnMut(Event)>)>,
}

#[wasm_bindgen(js_class = BubbleMenu)]
impl BubbleMenuWidget {
    /// `config` is optional JSON (`{"items":[{"label":"About","href":"#about"}]}`);
    /// `on_open_change` receives the new open state on every toggle.
    #[wasm_bindgen(constructor)]
    pub fn new(
        container: HtmlElement,
        config: Option<String>,
        on_open_change: Option<Function>,
    ) -> Result<BubbleMenuWidget, JsValue> {
        super::init_logging();
        let config = match config {
            Some(json) => MenuConfig::from_json(&json)?,
            None => MenuConfig::default(),
        };
        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;
        let body = document.body().ok_or("no body")?;

        let host = PageHost {
            window: window.clone(),
            on_open_change,
        };
        let scroll = Rc::new(BodyScroll { body: body.clone() });
        let menu = BubbleMenu::new(config, host, scroll);
        let view = MenuView::build(&document, &container, &body, menu.config(), menu.items())?;

        let state = Rc::new(RefCell::new(MenuState {
            menu,
            view,
            window: window.clone(),
            document,
            frame: None,
        }));
        let slot: FrameSlot = Rc::new(RefCell::new(None));

        {
            let state = Rc::downgrade(&state);
            let weak_slot = Rc::downgrade(&slot);
            *slot.borrow_mut() = Some(Closure::wrap(Box::new(move |_ts: f64| {
                let (Some(state), Some(slot)) = (state.upgrade(), weak_slot.upgrade()) else {
                    return;
                };
                if let Ok(mut st) = state.try_borrow_mut() {
                    st.frame = None;
                    st.refresh(&slot);
                }
            }) as Box<dyn FnMut(f64)>));
        }

        let mut widget = Self {
            state: Rc::clone(&state),
            slot: Rc::clone(&slot),
            listeners: Vec::new(),
        };

        let (toggle, buttons, warning) = {
            let st = state.borrow();
            (
                st.view.toggle.clone(),
                st.view.buttons.clone(),
                st.view.warning.clone(),
            )
        };

        widget.listen(
            toggle.into(),
            "click",
            handler(&state, &slot, |st| {
                let now = st.now();
                st.menu.toggle(now);
            }),
        )?;
        for (index, button) in buttons.into_iter().enumerate() {
            widget.listen(
                button.into(),
                "click",
                handler(&state, &slot, move |st| {
                    let now = st.now();
                    if let Some(href) = st.menu.activate(index, now) {
                        st.scroll_to(&href);
                    }
                }),
            )?;
        }
        widget.listen(
            warning.into(),
            "click",
            handler(&state, &slot, |st| st.menu.dismiss_warning()),
        )?;
        for event in ["wheel", "touchmove"] {
            widget.listen_passive(
                window.clone().into(),
                event,
                handler(&state, &slot, |st| {
                    if st.menu.on_scroll_attempt() {
                        debug!("scroll attempted while menu open");
                    }
                }),
            )?;
        }

        state.borrow_mut().refresh(&slot);
        Ok(widget)
    }

    /// Flip the menu; returns the new open state.
    pub fn toggle(&self) -> bool {
        let Ok(mut st) = self.state.try_borrow_mut() else {
            warn!("menu busy, toggle ignored");
            return false;
        };
        let now = st.now();
        let open = st.menu.toggle(now);
        st.refresh(&self.slot);
        open
    }

    #[wasm_bindgen(js_name = isOpen)]
    pub fn is_open(&self) -> bool {
        self.state
            .try_borrow()
            .map(|st| st.menu.is_open())
            .unwrap_or(false)
    }

    /// Remove the menu from the page, releasing the scroll lock. Idempotent.
    pub fn destroy(&mut self) {
        for (target, event, callback) in self.listeners.drain(..) {
            if let Err(err) =
                target.remove_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
            {
                warn!(?err, event, "removeEventListener failed");
            }
        }
        if let Ok(mut st) = self.state.try_borrow_mut() {
            if let Some(id) = st.frame.take() {
                if let Err(err) = st.window.cancel_animation_frame(id) {
                    warn!(?err, "cancelAnimationFrame failed");
                }
            }
            let now = st.now();
            st.menu.shutdown(now);
            st.view.remove();
        }
        self.slot.borrow_mut().take();
    }
}

impl BubbleMenuWidget {
    fn listen(
        &mut self,
        target: EventTarget,
        event: &'static str,
        callback: Closure<dyn FnMut(Event)>,
    ) -> Result<(), JsValue> {
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        self.listeners.push((target, event, callback));
        Ok(())
    }

    /// Like [`listen`](Self::listen) but promises never to `preventDefault`,
    /// so the browser can keep scrolling on its fast path.
    fn listen_passive(
        &mut self,
        target: EventTarget,
        event: &'static str,
        callback: Closure<dyn FnMut(Event)>,
    ) -> Result<(), JsValue> {
        target.add_event_listener_with_callback_and_add_event_listener_options(
            event,
            callback.as_ref().unchecked_ref(),
            &passive_options(),
        )?;
        self.listeners.push((target, event, callback));
        Ok(())
    }
}

impl Drop for BubbleMenuWidget {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use wasm_bindgen::JsValue;
    use wasm_bindgen_test::*;

    use super::passive_options;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn scroll_listeners_are_passive() {
        let options = passive_options();
        let passive = js_sys::Reflect::get(&options, &JsValue::from_str("passive")).unwrap();
        assert_eq!(passive.as_bool(), Some(true));
    }
}
