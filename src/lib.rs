// Public modules
pub mod capabilities;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod dom;
pub mod error;
pub mod markup;
pub mod render;
pub mod speech;
pub mod store;
pub mod types;
pub mod widget;

mod observability;

// Re-exports
pub use capabilities::{Capabilities, HostServices};
pub use client::{ChatApi, ChatBackend, SpeechClipSource};
pub use client_logger::{ClientLogger, TracingLogger};
pub use error::{Error, Result};
pub use markup::MarkupView;
pub use observability::register_biometrics;
pub use render::{TerminalView, View};
pub use store::SessionStore;
pub use types::*;
pub use widget::{AppState, ChatWidget, PendingTurn, Recognition, SendOutcome};
