#![cfg(not(target_arch = "wasm32"))]

use std::cell::Cell;
use std::f64::consts::PI;
use std::rc::Rc;

use lightning_wasm::menu::layout::{self, LayoutKind, Slot, Viewport};
use lightning_wasm::menu::scroll::ScrollLockTarget;
use lightning_wasm::menu::timeline::Pose;
use lightning_wasm::menu::{BubbleMenu, MenuConfig, MenuHost, MenuItem};
use proptest::prelude::*;

struct TestHost {
    viewport: Viewport,
    notified: Vec<bool>,
}

impl MenuHost for TestHost {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn open_changed(&mut self, open: bool) {
        self.notified.push(open);
    }

    fn random(&mut self) -> f64 {
        0.5
    }
}

#[derive(Default)]
struct Body {
    locked: Cell<bool>,
}

impl ScrollLockTarget for Body {
    fn set_scroll_locked(&self, locked: bool) {
        self.locked.set(locked);
    }
}

fn items(n: usize) -> Vec<MenuItem> {
    (0..n)
        .map(|i| MenuItem::new(format!("Item {i}"), format!("#s{i}")))
        .collect()
}

fn menu(width: f64, height: f64, n: usize) -> (BubbleMenu<TestHost>, Rc<Body>) {
    let body = Rc::new(Body::default());
    let config = MenuConfig {
        items: items(n),
        ..MenuConfig::default()
    };
    let host = TestHost {
        viewport: Viewport::new(width, height),
        notified: Vec::new(),
    };
    (BubbleMenu::new(config, host, body.clone()), body)
}

fn slots(m: &BubbleMenu<TestHost>) -> Vec<Slot> {
    m.layout().map(|l| l.slots.clone()).unwrap_or_default()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Comfortably past the open animation of a three-item menu.
const SETTLED: f64 = 2.0;

#[test]
fn wide_viewport_fans_items_on_an_arc() {
    let (mut m, _) = menu(1024.0, 768.0, 3);
    m.toggle(0.0);

    let layout = m.layout().cloned().unwrap_or_else(|| panic!("no layout while open"));
    assert_eq!(layout.kind, LayoutKind::Arc);

    let base = 768.0 * 0.2;
    let angles = [-0.45 * PI, 0.0, 0.45 * PI];
    let factors = [0.95, 0.97, 0.99];
    for ((slot, angle), factor) in layout.slots.iter().zip(angles).zip(factors) {
        let radius = base * factor;
        assert!(close(slot.x, angle.cos() * radius), "{slot:?}");
        assert!(close(slot.y, angle.sin() * radius), "{slot:?}");
    }
    let radii: Vec<f64> = layout.slots.iter().map(|s| s.x.hypot(s.y)).collect();
    assert!(radii.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn narrow_viewport_with_three_items_forms_a_triangle() {
    let (mut m, _) = menu(375.0, 667.0, 3);
    m.toggle(0.0);
    assert_eq!(m.layout().map(|l| l.kind), Some(LayoutKind::Triangle));
    assert_eq!(
        slots(&m),
        vec![
            Slot { x: 0.0, y: -110.0 },
            Slot { x: -93.5, y: 55.0 },
            Slot { x: 93.5, y: 55.0 },
        ]
    );
}

#[test]
fn narrow_viewport_with_four_items_forms_a_row() {
    let (mut m, _) = menu(375.0, 667.0, 4);
    m.toggle(0.0);
    assert_eq!(m.layout().map(|l| l.kind), Some(LayoutKind::Row));
    let xs: Vec<f64> = slots(&m).iter().map(|s| s.x).collect();
    assert_eq!(xs, vec![-165.0, -55.0, 55.0, 165.0]);
    assert!(slots(&m).iter().all(|s| s.y == 0.0));
}

#[test]
fn reopening_reuses_the_same_slots() {
    let (mut m, _) = menu(1280.0, 800.0, 3);
    m.toggle(0.0);
    let first = slots(&m);
    m.toggle(SETTLED);
    assert!(m.layout().is_none());
    m.toggle(2.0 * SETTLED);
    assert_eq!(slots(&m), first);
}

#[test]
fn open_animation_settles_on_the_slots() {
    let (mut m, _) = menu(1280.0, 800.0, 3);
    m.toggle(0.0);
    let target = slots(&m);

    let poses = m.poses(SETTLED);
    for (pose, slot) in poses.iter().zip(&target) {
        assert!(close(pose.x, slot.x));
        assert!(close(pose.scale, 1.0));
        assert!(close(pose.opacity, 1.0));
        assert!((pose.y - slot.y).abs() <= 8.0 + 1e-9);
    }
    // The idle float keeps the menu animating while open.
    assert!(m.is_animating(SETTLED));
}

#[test]
fn rapid_toggling_ends_in_a_clean_open_state() {
    let (mut m, _) = menu(1280.0, 800.0, 3);
    m.toggle(0.0);
    m.toggle(0.05);
    m.toggle(0.1);
    assert!(m.is_open());
    let target = slots(&m);

    let now = 0.1 + SETTLED;
    for (pose, slot) in m.poses(now).iter().zip(&target) {
        assert!(close(pose.x, slot.x), "x {} vs {}", pose.x, slot.x);
        assert!(close(pose.scale, 1.0));
        assert!(close(pose.opacity, 1.0));
        assert!((pose.y - slot.y).abs() <= 8.0 + 1e-9);
    }
}

#[test]
fn open_starts_from_the_collapsed_pose() {
    let (mut m, _) = menu(1280.0, 800.0, 3);
    m.toggle(0.0);
    let c = Pose::COLLAPSED;
    for p in m.poses(0.0) {
        assert!(close(p.x, c.x) && close(p.y, c.y), "{p:?}");
        assert!(close(p.scale, c.scale) && close(p.opacity, c.opacity), "{p:?}");
    }
}

#[test]
fn close_collapses_every_item_and_stops() {
    let (mut m, _) = menu(1280.0, 800.0, 3);
    m.toggle(0.0);
    m.toggle(SETTLED);

    let done = SETTLED + 0.25 + 2.0 * 0.04 + 0.01;
    assert!(!m.is_animating(done));
    for pose in m.poses(done) {
        assert!(close(pose.x, 0.0) && close(pose.y, 0.0));
        assert!(close(pose.scale, 0.3));
        assert!(close(pose.opacity, 0.0));
    }
}

#[test]
fn scroll_lock_follows_open_state() {
    let (mut m, body) = menu(1280.0, 800.0, 3);
    m.toggle(0.0);
    assert!(body.locked.get());
    assert!(m.scroll_locked());
    m.toggle(1.0);
    assert!(!body.locked.get());
    assert!(!m.scroll_locked());
}

#[test]
fn dropping_an_open_menu_releases_scroll() {
    let (mut m, body) = menu(1280.0, 800.0, 3);
    m.toggle(0.0);
    drop(m);
    assert!(!body.locked.get());
}

#[test]
fn shutdown_releases_scroll_and_notifies() {
    let (mut m, body) = menu(1280.0, 800.0, 3);
    m.toggle(0.0);
    m.shutdown(0.3);
    assert!(!body.locked.get());
    assert!(!m.is_open());
    assert!(!m.is_animating(0.3));
    assert_eq!(m.host().notified, vec![true, false]);
}

#[test]
fn scroll_warning_shows_once_per_session() {
    let (mut m, _) = menu(1280.0, 800.0, 3);
    assert!(!m.on_scroll_attempt());

    m.toggle(0.0);
    assert!(m.on_scroll_attempt());
    assert!(m.warning_visible());
    assert!(!m.on_scroll_attempt());

    m.dismiss_warning();
    assert!(!m.warning_visible());
    assert!(!m.on_scroll_attempt());
    assert!(!m.warning_visible());

    m.toggle(1.0);
    m.toggle(2.0);
    assert!(m.on_scroll_attempt());
}

#[test]
fn closing_hides_the_warning() {
    let (mut m, _) = menu(1280.0, 800.0, 3);
    m.toggle(0.0);
    m.on_scroll_attempt();
    m.toggle(1.0);
    assert!(!m.warning_visible());
}

#[test]
fn activating_an_item_closes_and_returns_its_anchor() {
    let (mut m, _) = menu(1280.0, 800.0, 3);
    assert_eq!(m.activate(1, 0.0), None);

    m.toggle(0.0);
    assert_eq!(m.activate(7, 0.5), None);
    assert!(m.is_open());
    assert_eq!(m.activate(1, 0.5).as_deref(), Some("#s1"));
    assert!(!m.is_open());
    assert_eq!(m.host().notified, vec![true, false]);
}

#[test]
fn default_menu_has_the_three_sections() {
    let body = Rc::new(Body::default());
    let host = TestHost {
        viewport: Viewport::new(1280.0, 800.0),
        notified: Vec::new(),
    };
    let m = BubbleMenu::new(MenuConfig::default(), host, body);
    let anchors: Vec<&str> = m.items().iter().map(|i| i.href.as_str()).collect();
    assert_eq!(anchors, ["#about", "#work", "#contact"]);
    assert_eq!(m.items()[0].border_color(), "#16a34a");
}

proptest! {
    #[test]
    fn layout_is_a_pure_function(
        count in 0usize..8,
        width in 200.0f64..2000.0,
        height in 200.0f64..2000.0,
        spacing in 40.0f64..200.0,
    ) {
        let vp = Viewport::new(width, height);
        let a = layout::compute(count, vp, spacing);
        let b = layout::compute(count, vp, spacing);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.slots.len(), count);
    }

    #[test]
    fn arc_angles_span_the_spread(count in 2usize..10) {
        let first = layout::arc_angle(0, count);
        let last = layout::arc_angle(count - 1, count);
        prop_assert!((last - first - layout::ARC_SPREAD).abs() < 1e-9);
        prop_assert!((first + last).abs() < 1e-9);
    }
}
