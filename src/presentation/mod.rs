pub mod options;
pub mod wasm_api;

pub use options::*;
pub use wasm_api::*;
