mod context;
mod interactive;

pub use context::{ChangeTarget, session_options};
pub use interactive::{OutputMode, TerminalPresenter};
