use std::cell::RefCell;

use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::config::EffectConfig;
pub(crate) use crate::logging::init_logging;

mod host;
mod menu;
mod render;

pub use host::LightningEffect;
pub use menu::BubbleMenuWidget;

thread_local! {
    static PAGE: RefCell<Option<(Option<LightningEffect>, Option<BubbleMenuWidget>)>> =
        const { RefCell::new(None) };
}

/// Hero settings used when the page carries a `#c` canvas.
fn hero_config() -> EffectConfig {
    EffectConfig {
        hue: 142.0,
        speed: 1.1,
        intensity: 1.6,
        ..EffectConfig::default()
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    init_logging();
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;

    let effect = match document.get_element_by_id("c") {
        Some(el) => {
            let canvas = el.dyn_into::<web_sys::HtmlCanvasElement>()?;
            let runtime = host::mount(canvas, hero_config())?;
            Some(LightningEffect::from_runtime(runtime))
        }
        None => None,
    };

    let menu = match document.get_element_by_id("bubble-menu") {
        Some(el) => {
            let container = el.dyn_into::<web_sys::HtmlElement>()?;
            Some(BubbleMenuWidget::new(container, None, None)?)
        }
        None => None,
    };

    if effect.is_none() && menu.is_none() {
        warn!("no #c canvas or #bubble-menu container on the page");
    } else {
        info!(effect = effect.is_some(), menu = menu.is_some(), "page mounted");
    }
    PAGE.with(|page| *page.borrow_mut() = Some((effect, menu)));
    Ok(())
}
