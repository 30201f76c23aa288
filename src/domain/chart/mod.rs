//! Chart aggregate: parameters, redraw modes and the rendering ports.

pub mod services;
pub mod value_objects;

pub use services::*;
pub use value_objects::*;
