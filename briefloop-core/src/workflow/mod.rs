//! Workflow orchestration module

pub mod engine;
pub mod generation;
pub mod invoker;
pub mod ledger;
pub mod locks;
pub mod persistence;
pub mod quick;
pub mod registry;

pub use engine::*;
pub use generation::*;
pub use invoker::*;
pub use locks::*;
pub use persistence::*;
pub use quick::QuickBriefEngine;
pub use registry::StagePlan;
