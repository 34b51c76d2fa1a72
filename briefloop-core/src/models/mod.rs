//! Data models for briefloop

pub mod configuration;
pub mod outputs;
pub mod quick_brief;
pub mod workflow;

pub use configuration::*;
pub use outputs::*;
pub use quick_brief::*;
pub use workflow::*;
