pub mod build_series;
pub mod live_sync;

pub use build_series::*;
pub use live_sync::*;
