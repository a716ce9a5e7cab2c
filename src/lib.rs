//! Procedural lightning background rendered with WebGL2, and the radial
//! bubble menu that sits on top of it.
//!
//! Everything outside `wasm` is plain Rust and runs on the host, which is
//! where most tests live. The browser bindings only compile for wasm32.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod menu;
pub mod noise;
pub mod shader;
pub mod surface;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{start, BubbleMenuWidget, LightningEffect};

pub use config::{Capability, EffectConfig, RecoveryPolicy};
pub use error::EffectError;
pub use lifecycle::{EffectRuntime, LifecycleState};
