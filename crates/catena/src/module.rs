//! Transform-module representation and resolution.
//!
//! A transform module is the unit a loader chain executes: a mandatory
//! normal-phase function, an optional pitch hook, and a flag describing
//! whether the module wants byte or text input. Modules are resolved from
//! identity strings through the [`ModuleResolver`] seam; the in-memory
//! [`ModuleRegistry`] is the stock implementation embedders populate up
//! front.

use std::{fmt, rc::Rc};

use anyhow::{Result, anyhow};

use crate::{
    content::{Content, FxIndexMap},
    context::LoaderContext,
};

/// Outcome of one phase invocation: the positional argument list handed to
/// the next step of the pipeline, or the error that aborts the run.
pub type PhaseResult = Result<Vec<Content>>;

/// A phase function. The context handle is an explicit argument; it cannot
/// be retained past the call. A phase that wants to complete later takes
/// the completion token via [`LoaderContext::switch_to_async`] and its
/// return value is ignored.
pub type PhaseFn = Box<dyn Fn(&mut LoaderContext, Vec<Content>) -> PhaseResult>;

/// A loaded transform module.
pub struct TransformModule {
    /// Main transform, run back-to-front. Absent only for pitch-only
    /// modules whose pitch always short-circuits before this is reached.
    pub normal: Option<PhaseFn>,
    /// Optional pre-transform hook, run front-to-back
    pub pitch: Option<PhaseFn>,
    /// Whether the first argument is coerced to bytes before the normal
    /// phase runs (text otherwise)
    pub wants_binary: bool,
}

impl TransformModule {
    /// Create a module from its normal-phase function
    pub fn new(
        normal: impl Fn(&mut LoaderContext, Vec<Content>) -> PhaseResult + 'static,
    ) -> Self {
        Self {
            normal: Some(Box::new(normal)),
            pitch: None,
            wants_binary: false,
        }
    }

    /// Create a module that only has a pitch hook. Legal so long as the
    /// pitch always short-circuits; reaching the missing normal phase
    /// aborts the run.
    pub fn pitch_only(
        pitch: impl Fn(&mut LoaderContext, Vec<Content>) -> PhaseResult + 'static,
    ) -> Self {
        Self {
            normal: None,
            pitch: Some(Box::new(pitch)),
            wants_binary: false,
        }
    }

    /// Attach a pitch hook
    pub fn with_pitch(
        mut self,
        pitch: impl Fn(&mut LoaderContext, Vec<Content>) -> PhaseResult + 'static,
    ) -> Self {
        self.pitch = Some(Box::new(pitch));
        self
    }

    /// Request byte input for the normal phase
    pub fn binary(mut self) -> Self {
        self.wants_binary = true;
        self
    }
}

impl fmt::Debug for TransformModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformModule")
            .field("normal", &self.normal.is_some())
            .field("pitch", &self.pitch.is_some())
            .field("wants_binary", &self.wants_binary)
            .finish()
    }
}

/// Resolution seam between identity strings and loaded modules. A failure
/// here aborts a run before any phase executes.
pub trait ModuleResolver {
    /// Resolve an identity string to a loaded transform module
    fn resolve(&self, identity: &str) -> Result<Rc<TransformModule>>;
}

/// In-memory module registry, the single source of truth for which
/// transform modules a run may reference.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: FxIndexMap<String, Rc<TransformModule>>,
}

impl ModuleRegistry {
    /// Create a new empty module registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under an identity. Re-registering an identity
    /// replaces the previous module.
    pub fn register(&mut self, identity: impl Into<String>, module: TransformModule) {
        let identity = identity.into();
        if self
            .modules
            .insert(identity.clone(), Rc::new(module))
            .is_some()
        {
            log::debug!("transform module `{identity}` re-registered, previous entry replaced");
        }
    }

    /// Check if an identity is registered
    pub fn contains(&self, identity: &str) -> bool {
        self.modules.contains_key(identity)
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// All registered identities, in registration order
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

impl ModuleResolver for ModuleRegistry {
    fn resolve(&self, identity: &str) -> Result<Rc<TransformModule>> {
        self.modules
            .get(identity)
            .cloned()
            .ok_or_else(|| anyhow!("unknown transform module `{identity}`"))
    }
}
