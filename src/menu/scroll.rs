//! Page scroll locking while the menu is open, and the one-shot warning shown
//! when the user tries to scroll anyway.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

/// Whatever actually blocks page scrolling (the document body in a browser).
pub trait ScrollLockTarget {
    fn set_scroll_locked(&self, locked: bool);
}

/// Scroll stays locked for as long as this guard lives.
pub struct ScrollLock {
    target: Rc<dyn ScrollLockTarget>,
}

impl ScrollLock {
    pub fn acquire(target: Rc<dyn ScrollLockTarget>) -> Self {
        debug!("scroll locked");
        target.set_scroll_locked(true);
        Self { target }
    }
}

impl Drop for ScrollLock {
    fn drop(&mut self) {
        debug!("scroll unlocked");
        self.target.set_scroll_locked(false);
    }
}

impl fmt::Debug for ScrollLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollLock").finish_non_exhaustive()
    }
}

/// Shows at most once per open session until dismissed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrollWarning {
    armed: bool,
    visible: bool,
}

impl ScrollWarning {
    pub const MESSAGE: &'static str =
        "You cannot scroll while the menu is open. Click here to acknowledge.";

    /// Start a new open session.
    pub fn arm(&mut self) {
        self.armed = true;
        self.visible = false;
    }

    /// Returns `true` when this attempt made the warning appear.
    pub fn on_scroll_attempt(&mut self) -> bool {
        if !self.armed {
            return false;
        }
        self.armed = false;
        self.visible = true;
        true
    }

    pub fn dismiss(&mut self) {
        self.visible = false;
    }

    /// End the session: hide and stop reacting until re-armed.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Body(Cell<bool>);

    impl ScrollLockTarget for Body {
        fn set_scroll_locked(&self, locked: bool) {
            self.0.set(locked);
        }
    }

    #[test]
    fn guard_releases_on_drop() {
        let body = Rc::new(Body::default());
        let guard = ScrollLock::acquire(body.clone());
        assert!(body.0.get());
        drop(guard);
        assert!(!body.0.get());
    }

    #[test]
    fn warning_fires_once_per_session() {
        let mut w = ScrollWarning::default();
        assert!(!w.on_scroll_attempt());
        w.arm();
        assert!(w.on_scroll_attempt());
        assert!(!w.on_scroll_attempt());
        w.dismiss();
        assert!(!w.is_visible());
        assert!(!w.on_scroll_attempt());
        w.arm();
        assert!(w.on_scroll_attempt());
    }
}
