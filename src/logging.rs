//! `tracing` output routed to the browser console.
//!
//! Events are formatted as `LEVEL target: message key=value ...` and handed
//! to a [`ConsoleSink`]. In the browser the sink is `console.*`; tests use
//! [`CaptureSink`].

use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Destination for formatted log lines.
pub trait ConsoleSink {
    fn write(&self, level: Level, line: &str);
}

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        } else {
            self.fields.push((field.name(), value.to_owned()));
        }
    }
}

/// A layer that formats each event onto a single line.
pub struct ConsoleLayer<S> {
    sink: S,
    max_level: Level,
}

impl<S: ConsoleSink> ConsoleLayer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            max_level: Level::DEBUG,
        }
    }

    pub fn with_max_level(mut self, level: Level) -> Self {
        self.max_level = level;
        self
    }

    fn format(event: &Event<'_>) -> String {
        let metadata = event.metadata();
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let mut line = format!("{} {}: ", metadata.level(), metadata.target());
        line.push_str(visitor.message.as_deref().unwrap_or_default());
        for (key, value) in &visitor.fields {
            let _ = write!(line, " {key}={value}");
        }
        line
    }
}

impl<S, Sub> Layer<Sub> for ConsoleLayer<S>
where
    S: ConsoleSink + 'static,
    Sub: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, Sub>) {
        let level = *event.metadata().level();
        // Level ordering: TRACE > DEBUG > ... > ERROR.
        if level > self.max_level {
            return;
        }
        self.sink.write(level, &Self::format(event));
    }
}

/// Collects lines in memory.
#[derive(Clone, Default)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CaptureSink {
    pub fn lines(&self) -> Vec<(Level, String)> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ConsoleSink for CaptureSink {
    fn write(&self, level: Level, line: &str) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push((level, line.to_owned()));
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::{init_logging, WebConsole};

#[cfg(target_arch = "wasm32")]
mod web {
    use std::sync::Once;

    use tracing::Level;
    use tracing_subscriber::prelude::*;
    use wasm_bindgen::JsValue;

    use super::{ConsoleLayer, ConsoleSink};

    /// `console.error` / `warn` / `log` / `debug` by level.
    pub struct WebConsole;

    impl ConsoleSink for WebConsole {
        fn write(&self, level: Level, line: &str) {
            let msg = JsValue::from_str(line);
            match level {
                Level::ERROR => web_sys::console::error_1(&msg),
                Level::WARN => web_sys::console::warn_1(&msg),
                Level::INFO => web_sys::console::log_1(&msg),
                _ => web_sys::console::debug_1(&msg),
            }
        }
    }

    /// Install the console subscriber and panic hook. Later calls do nothing.
    pub fn init_logging() {
        static ONCE: Once = Once::new();
        ONCE.call_once(|| {
            let max_level = if cfg!(debug_assertions) {
                Level::DEBUG
            } else {
                Level::INFO
            };
            let subscriber = tracing_subscriber::registry()
                .with(ConsoleLayer::new(WebConsole).with_max_level(max_level));
            if tracing::subscriber::set_global_default(subscriber).is_err() {
                web_sys::console::warn_1(&"tracing subscriber already installed".into());
            }

            std::panic::set_hook(Box::new(|info| {
                let msg = match info.location() {
                    Some(loc) => format!(
                        "panic at {}:{}:{}: {info}",
                        loc.file(),
                        loc.line(),
                        loc.column()
                    ),
                    None => format!("panic: {info}"),
                };
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
