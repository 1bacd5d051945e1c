pub mod adapter;
pub mod api;
pub mod cli;
pub mod config;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod selector;
pub mod substitution;

pub use api::{ResolutionEngine, ResolutionEngineBuilder};
