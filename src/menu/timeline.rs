//! A small tween timeline: schedule property animations on indexed items,
//! cancel them by handle, and sample every item's pose at any time.
//!
//! Time is supplied by the caller in seconds, so sampling is a pure function
//! of the scheduled tweens and `now`.

use super::easing::Easing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    X,
    Y,
    Scale,
    Opacity,
}

impl Property {
    pub const ALL: [Property; 4] = [Self::X, Self::Y, Self::Scale, Self::Opacity];
}

/// Transform and opacity of one item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub opacity: f64,
}

impl Pose {
    /// Gathered at the pivot, shrunk and invisible.
    pub const COLLAPSED: Pose = Pose {
        x: 0.0,
        y: 0.0,
        scale: 0.3,
        opacity: 0.0,
    };

    pub fn get(&self, property: Property) -> f64 {
        match property {
            Property::X => self.x,
            Property::Y => self.y,
            Property::Scale => self.scale,
            Property::Opacity => self.opacity,
        }
    }

    pub fn set(&mut self, property: Property, value: f64) {
        match property {
            Property::X => self.x = value,
            Property::Y => self.y = value,
            Property::Scale => self.scale = value,
            Property::Opacity => self.opacity = value,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::COLLAPSED
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Once,
    /// Run forward, then backward, forever.
    YoyoForever,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenSpec {
    pub item: usize,
    pub property: Property,
    pub from: f64,
    pub to: f64,
    /// Seconds per pass.
    pub duration: f64,
    /// Seconds after scheduling before the tween starts.
    pub delay: f64,
    pub easing: Easing,
    pub repeat: Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenHandle(u64);

#[derive(Debug, Clone)]
struct Scheduled {
    handle: TweenHandle,
    spec: TweenSpec,
    start: f64,
}

impl Scheduled {
    /// `None` before the tween starts.
    fn value_at(&self, now: f64) -> Option<f64> {
        if now < self.start {
            return None;
        }
        let spec = &self.spec;
        let elapsed = now - self.start;
        let progress = if spec.duration <= 0.0 {
            1.0
        } else {
            match spec.repeat {
                Repeat::Once => (elapsed / spec.duration).min(1.0),
                Repeat::YoyoForever => {
                    let cycles = elapsed / spec.duration;
                    let pass = cycles.floor();
                    let frac = cycles - pass;
                    if pass as u64 % 2 == 0 {
                        frac
                    } else {
                        1.0 - frac
                    }
                }
            }
        };
        Some(spec.from + (spec.to - spec.from) * spec.easing.apply(progress))
    }

    fn finished_at(&self, now: f64) -> bool {
        self.spec.repeat == Repeat::Once && now >= self.start + self.spec.duration.max(0.0)
    }
}

/// Tweens for a fixed set of items.
#[derive(Debug, Clone)]
pub struct Timeline {
    bases: Vec<Pose>,
    tweens: Vec<Scheduled>,
    next_handle: u64,
}

impl Timeline {
    pub fn new(items: usize) -> Self {
        Self {
            bases: vec![Pose::COLLAPSED; items],
            tweens: Vec::new(),
            next_handle: 0,
        }
    }

    pub fn items(&self) -> usize {
        self.bases.len()
    }

    /// Jump an item to `pose` immediately. Running tweens still override it.
    pub fn set(&mut self, item: usize, pose: Pose) {
        if let Some(base) = self.bases.get_mut(item) {
            *base = pose;
        }
    }

    pub fn schedule(&mut self, now: f64, spec: TweenSpec) -> TweenHandle {
        self.next_handle += 1;
        let handle = TweenHandle(self.next_handle);
        self.tweens.push(Scheduled {
            handle,
            spec,
            start: now + spec.delay.max(0.0),
        });
        handle
    }

    pub fn is_scheduled(&self, handle: TweenHandle) -> bool {
        self.tweens.iter().any(|t| t.handle == handle)
    }

    /// Number of tweens not yet cancelled or pruned.
    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    /// Stop a tween, leaving its property at the value it has at `now`.
    pub fn cancel(&mut self, handle: TweenHandle, now: f64) -> bool {
        let Some(index) = self.tweens.iter().position(|t| t.handle == handle) else {
            return false;
        };
        let spec = self.tweens[index].spec;
        let current = self.sample(spec.item, now).get(spec.property);
        self.tweens.remove(index);
        if let Some(base) = self.bases.get_mut(spec.item) {
            base.set(spec.property, current);
        }
        true
    }

    /// Stop every tween of every item, freezing each where it is at `now`.
    pub fn cancel_all(&mut self, now: f64) {
        let frozen: Vec<Pose> = (0..self.bases.len()).map(|i| self.sample(i, now)).collect();
        self.bases = frozen;
        self.tweens.clear();
    }

    /// Pose of `item` at `now`: its base with tweens applied in schedule order.
    pub fn sample(&self, item: usize, now: f64) -> Pose {
        let mut pose = self.bases.get(item).copied().unwrap_or_default();
        for tween in self.tweens.iter().filter(|t| t.spec.item == item) {
            if let Some(value) = tween.value_at(now) {
                pose.set(tween.spec.property, value);
            }
        }
        pose
    }

    pub fn sample_all(&self, now: f64) -> Vec<Pose> {
        (0..self.bases.len()).map(|i| self.sample(i, now)).collect()
    }

    /// Fold finished one-shot tweens into the bases. Sampling is unchanged.
    pub fn prune(&mut self, now: f64) {
        let mut i = 0;
        while i < self.tweens.len() {
            let tween = &self.tweens[i];
            let shadowed = self.tweens[..i].iter().any(|earlier| {
                earlier.spec.item == tween.spec.item
                    && earlier.spec.property == tween.spec.property
                    && !earlier.finished_at(now)
            });
            if tween.finished_at(now) && !shadowed {
                let spec = tween.spec;
                let end = tween.value_at(now).unwrap_or(spec.to);
                if let Some(base) = self.bases.get_mut(spec.item) {
                    base.set(spec.property, end);
                }
                self.tweens.remove(i);
            } else {
                i += 1;
            }
        }
    }
}
