//! Radial popup menu: item layout, burst-open / collapse animation, idle
//! float, scroll lock and the scroll warning.

pub mod easing;
pub mod layout;
pub mod scroll;
pub mod timeline;

use std::rc::Rc;

use serde::Deserialize;
use tracing::debug;

use crate::error::EffectError;
use easing::Easing;
use layout::{Layout, Viewport};
use scroll::{ScrollLock, ScrollLockTarget, ScrollWarning};
use timeline::{Pose, Property, Repeat, Timeline, TweenHandle, TweenSpec};

pub const DEFAULT_ACCENT: &str = "#16a34a";

/// Vertical travel of the idle float, in CSS pixels.
pub const FLOAT_AMPLITUDE: f64 = 8.0;
pub const FLOAT_MIN_PERIOD: f64 = 3.0;
pub const FLOAT_PERIOD_JITTER: f64 = 1.5;

pub const CLOSE_DURATION: f64 = 0.25;
pub const CLOSE_STAGGER: f64 = 0.04;

/// Border color for a menu label.
pub fn border_color(label: &str) -> &'static str {
    match label {
        "About" => "#16a34a",
        "Work" => "#4ade80",
        "Contact" => "#12b886",
        _ => DEFAULT_ACCENT,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MenuItem {
    pub label: String,
    /// Selector of the section to scroll to.
    pub href: String,
}

impl MenuItem {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
        }
    }

    pub fn border_color(&self) -> &'static str {
        border_color(&self.label)
    }
}

pub fn default_items() -> Vec<MenuItem> {
    vec![
        MenuItem::new("About", "#about"),
        MenuItem::new("Work", "#work"),
        MenuItem::new("Contact", "#contact"),
    ]
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MenuConfig {
    /// An empty list means the default sections.
    pub items: Vec<MenuItem>,
    pub menu_aria_label: String,
    pub menu_content_color: String,
    pub use_fixed_position: bool,
    pub animation_ease: String,
    /// Seconds.
    pub animation_duration: f64,
    /// Seconds between consecutive items.
    pub stagger_delay: f64,
    /// Pixel spacing of the compact layouts.
    pub spacing: f64,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            menu_aria_label: "Toggle menu".to_owned(),
            menu_content_color: "#e5e7eb".to_owned(),
            use_fixed_position: true,
            animation_ease: "back.out(1.7)".to_owned(),
            animation_duration: 0.65,
            stagger_delay: 0.08,
            spacing: layout::DEFAULT_SPACING,
        }
    }
}

impl MenuConfig {
    pub fn from_json(json: &str) -> Result<Self, EffectError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn resolved_items(&self) -> Vec<MenuItem> {
        if self.items.is_empty() {
            default_items()
        } else {
            self.items.clone()
        }
    }
}

/// What the menu needs from the page around it.
pub trait MenuHost {
    fn viewport(&self) -> Viewport;

    /// Called with the new state on every open/close, so the page can dim itself.
    fn open_changed(&mut self, open: bool);

    /// Uniform sample in `[0, 1)`, used for stagger jitter and float periods.
    fn random(&mut self) -> f64;
}

pub struct BubbleMenu<H: MenuHost> {
    config: MenuConfig,
    items: Vec<MenuItem>,
    ease: Easing,
    host: H,
    scroll_target: Rc<dyn ScrollLockTarget>,
    scroll_lock: Option<ScrollLock>,
    warning: ScrollWarning,
    open: bool,
    timeline: Timeline,
    float_tweens: Vec<TweenHandle>,
    layout: Option<Layout>,
}

impl<H: MenuHost> BubbleMenu<H> {
    pub fn new(config: MenuConfig, host: H, scroll_target: Rc<dyn ScrollLockTarget>) -> Self {
        let items = config.resolved_items();
        let ease = Easing::parse(&config.animation_ease);
        Self {
            timeline: Timeline::new(items.len()),
            config,
            items,
            ease,
            host,
            scroll_target,
            scroll_lock: None,
            warning: ScrollWarning::default(),
            open: false,
            float_tweens: Vec::new(),
            layout: None,
        }
    }

    pub fn config(&self) -> &MenuConfig {
        &self.config
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Slots of the current open session; `None` while closed.
    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn warning_visible(&self) -> bool {
        self.warning.is_visible()
    }

    pub fn scroll_locked(&self) -> bool {
        self.scroll_lock.is_some()
    }

    pub fn toggle(&mut self, now: f64) -> bool {
        self.set_open(!self.open, now);
        self.open
    }

    pub fn set_open(&mut self, open: bool, now: f64) {
        if open == self.open {
            return;
        }
        self.open = open;
        self.host.open_changed(open);
        if open {
            self.warning.arm();
            self.scroll_lock = Some(ScrollLock::acquire(Rc::clone(&self.scroll_target)));
            self.animate_open(now);
        } else {
            self.warning.disarm();
            self.scroll_lock = None;
            self.animate_close(now);
        }
    }

    /// Close the menu and hand back the anchor the item points to.
    pub fn activate(&mut self, index: usize, now: f64) -> Option<String> {
        if !self.open {
            return None;
        }
        let href = self.items.get(index)?.href.clone();
        debug!(index, %href, "menu item activated");
        self.set_open(false, now);
        Some(href)
    }

    /// Wheel or touch-move while the menu is up. Returns `true` when the
    /// warning was just shown.
    pub fn on_scroll_attempt(&mut self) -> bool {
        self.open && self.warning.on_scroll_attempt()
    }

    pub fn dismiss_warning(&mut self) {
        self.warning.dismiss();
    }

    /// Tear down without animating: release the scroll lock, stop all tweens
    /// and tell the host the menu is gone if it was open.
    pub fn shutdown(&mut self, now: f64) {
        self.kill_tweens(now);
        for i in 0..self.items.len() {
            self.timeline.set(i, Pose::COLLAPSED);
        }
        self.layout = None;
        self.warning.disarm();
        self.scroll_lock = None;
        if self.open {
            self.open = false;
            self.host.open_changed(false);
        }
    }

    pub fn poses(&self, now: f64) -> Vec<Pose> {
        self.timeline.sample_all(now)
    }

    /// Whether any tween will still move an item after `now`.
    pub fn is_animating(&mut self, now: f64) -> bool {
        self.timeline.prune(now);
        !self.timeline.is_empty()
    }

    fn kill_tweens(&mut self, now: f64) {
        for handle in self.float_tweens.drain(..) {
            self.timeline.cancel(handle, now);
        }
        self.timeline.cancel_all(now);
    }

    fn animate_open(&mut self, now: f64) {
        self.kill_tweens(now);

        let layout = layout::compute(self.items.len(), self.host.viewport(), self.config.spacing);
        debug!(kind = ?layout.kind, count = layout.slots.len(), "menu layout");

        let duration = self.config.animation_duration;
        let stagger = self.config.stagger_delay;
        for (i, slot) in layout.slots.iter().enumerate() {
            let jitter = (self.host.random() * 2.0 - 1.0) * stagger * 0.25;
            let delay = (i as f64 * stagger + jitter).max(0.0);

            self.timeline.set(i, Pose::COLLAPSED);
            let target = Pose {
                x: slot.x,
                y: slot.y,
                scale: 1.0,
                opacity: 1.0,
            };
            for property in Property::ALL {
                self.timeline.schedule(
                    now,
                    TweenSpec {
                        item: i,
                        property,
                        from: Pose::COLLAPSED.get(property),
                        to: target.get(property),
                        duration,
                        delay,
                        easing: self.ease,
                        repeat: Repeat::Once,
                    },
                );
            }

            let drift = if self.host.random() > 0.5 {
                FLOAT_AMPLITUDE
            } else {
                -FLOAT_AMPLITUDE
            };
            let period = FLOAT_MIN_PERIOD + self.host.random() * FLOAT_PERIOD_JITTER;
            let handle = self.timeline.schedule(
                now,
                TweenSpec {
                    item: i,
                    property: Property::Y,
                    from: slot.y,
                    to: slot.y + drift,
                    duration: period,
                    delay: duration + delay,
                    easing: Easing::SineInOut,
                    repeat: Repeat::YoyoForever,
                },
            );
            self.float_tweens.push(handle);
        }
        self.layout = Some(layout);
    }

    fn animate_close(&mut self, now: f64) {
        self.kill_tweens(now);
        self.layout = None;

        for i in 0..self.items.len() {
            let current = self.timeline.sample(i, now);
            for property in Property::ALL {
                self.timeline.schedule(
                    now,
                    TweenSpec {
                        item: i,
                        property,
                        from: current.get(property),
                        to: Pose::COLLAPSED.get(property),
                        duration: CLOSE_DURATION,
                        delay: i as f64 * CLOSE_STAGGER,
                        easing: Easing::Power3In,
                        repeat: Repeat::Once,
                    },
                );
            }
        }
    }
}
