//! Browser-side adapters: HTTP history, console logging, clock, timers and
//! the DOM notifier.

pub mod http;
pub mod services;
pub mod ui;

pub use http::*;
pub use services::*;
pub use ui::*;
