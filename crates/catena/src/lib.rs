//! catena — a loader-chain runner for source-to-source build tools.
//!
//! Given an ordered list of transform modules ("loaders") and a resource
//! path, catena runs each module's optional pitch hook front-to-back,
//! reads the resource exactly once unless a pitch short-circuits, then
//! runs each module's normal transform back-to-front, threading the
//! argument list between phases. Phases complete synchronously by
//! returning, or asynchronously by taking a single-use completion token.

pub mod adapter;
pub mod config;
pub mod content;
pub mod context;
mod loader;
pub mod module;
pub mod request;
pub mod rules;
pub mod runner;

pub use adapter::CompletionToken;
pub use config::Config;
pub use content::{Content, Environment, FxIndexMap, Scratch};
pub use context::LoaderContext;
pub use module::{ModuleRegistry, ModuleResolver, PhaseFn, PhaseResult, TransformModule};
pub use rules::{Enforce, ResolvedRequest, Rule, assemble_loaders};
pub use runner::{
    ResourceCallback, ResourceReader, RunOptions, RunOutput, read_file_resource, run_pipeline,
};
