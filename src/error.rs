use std::fmt;

/// Shader stage a compile failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failures of the effect subsystem.
///
/// All of these are terminal for the effect instance that hit them; none are
/// surfaced to the hosting page beyond a log line.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectError {
    /// The surface could not hand out a graphics context.
    UnsupportedBackend,
    /// A shader stage failed to compile; `log` is the backend's info log.
    ShaderCompile { stage: ShaderStage, log: String },
    /// Program linking failed.
    ProgramLink(String),
    /// A GPU object (buffer, program, vertex array) could not be created.
    Resource(&'static str),
    /// Host-supplied configuration could not be parsed.
    Config(String),
}

impl fmt::Display for EffectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedBackend => write!(f, "WebGL2 not supported"),
            Self::ShaderCompile { stage, log } => {
                write!(f, "failed to compile {stage} shader: {log}")
            }
            Self::ProgramLink(log) => write!(f, "failed to link program: {log}"),
            Self::Resource(what) => write!(f, "failed to create {what}"),
            Self::Config(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for EffectError {}

impl From<serde_json::Error> for EffectError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(target_arch = "wasm32")]
impl From<EffectError> for wasm_bindgen::JsValue {
    fn from(err: EffectError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
