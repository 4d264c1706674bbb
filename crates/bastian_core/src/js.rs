use thiserror::Error;

pub use export::*;
pub use function::*;
pub use handle::*;
pub use run_context::*;
pub use runtime::*;
pub use value::*;

mod export;
mod function;
mod handle;
mod run_context;
mod runtime;
mod value;

#[derive(Error, Debug)]
pub enum JSError {
    #[error("compile error: {0}")]
    Compile(String),

    #[error("exception: {0}")]
    Exception(String),

    #[error("conversion error: {0}")]
    Conversion(String),

    #[error("initialize error: {0}")]
    Initialize(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("engine is busy: no live scope available for reentrant call")]
    ContextBusy,

    #[error("native function {slot} of realm {realm} is not reachable from the active contexts")]
    UnknownNativeFunction { realm: u32, slot: u32 },
}

/// Tag of a [`Value`]. Immutable once the value is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Function,
    Null,
    Number,
    Object,
    String,
    Undefined,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Null => "null",
            Self::Number => "number",
            Self::Object => "object",
            Self::String => "string",
            Self::Undefined => "undefined",
        }
    }
}
