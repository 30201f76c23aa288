pub mod chart_service;
pub mod config;
pub mod scheduler;
pub mod use_cases;

pub use chart_service::*;
pub use config::*;
pub use scheduler::*;
pub use use_cases::*;
