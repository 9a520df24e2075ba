use core::error::Error;
use core::fmt;

/// Misuse of a component instance detected by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    UnknownMethod { component: String, method: String },
    /// `mount` was called on an instance that is already mounted.
    AlreadyMounted { component: String },
    /// The instance was destroyed and can no longer render.
    Destroyed { component: String },
    /// The render tree was needed before the first render.
    NotRendered { component: String },
}

impl fmt::Display for ComponentError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMethod { component, method } => {
                write!(formatter, "Method \"{method}\" is not defined on {component}")
            }
            Self::AlreadyMounted { component } => write!(formatter, "{component} is already mounted"),
            Self::Destroyed { component } => write!(formatter, "{component} was destroyed"),
            Self::NotRendered { component } => write!(formatter, "{component} has not rendered yet"),
        }
    }
}

impl Error for ComponentError {}
