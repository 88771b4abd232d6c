pub mod display;
pub mod input;
pub mod session;

pub use display::TerminalDisplay;
pub use input::parse_action;
pub use session::{Flow, Session};
