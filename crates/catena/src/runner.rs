//! Pipeline execution: the typed phase state machine, the pitching and
//! normal traversals, resource acquisition, and the public entry point.
//!
//! A run is a truly mechanical walk: pitch hooks front-to-back, one
//! resource read, normal phases back-to-front, every decision made by the
//! phase functions themselves. The state machine carries one typed cursor
//! per traversal, so the pitching and normal walks never share an index.

use std::{cell::RefCell, rc::Rc};

use anyhow::{Context as _, Result, anyhow};
use log::debug;

use crate::{
    adapter::{PhaseKind, run_sync_or_async},
    content::{Content, Environment, coerce_first_arg},
    loader::Loader,
    module::{ModuleResolver, TransformModule},
    request,
};

/// Callback handed to a resource reader; invoke it with the raw bytes or
/// the read error.
pub type ResourceCallback = Box<dyn FnOnce(Result<Vec<u8>>)>;

/// Injected resource reader: `(path, callback)`. Called exactly once per
/// run; it may complete synchronously or hold the callback and complete
/// later.
pub type ResourceReader = Box<dyn FnOnce(&str, ResourceCallback)>;

type FinalCallback = Box<dyn FnOnce(Result<RunOutput>)>;

/// Stock resource reader over `std::fs`. Completes synchronously; the
/// core does not require a reader to be asynchronous.
pub fn read_file_resource(path: &str, callback: ResourceCallback) {
    callback(std::fs::read(path).map_err(Into::into));
}

/// Where a run currently stands. Each traversal owns its own cursor; the
/// normal cursor is signed so -1 is the natural terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PipelinePhase {
    /// Walking pitch hooks, front to back
    Pitching { cursor: usize },
    /// Waiting on the injected resource reader
    ReadingResource,
    /// Walking normal phases, back to front
    Normal { cursor: isize },
    /// Result delivered
    Done,
}

/// Shared per-run state. One instance per run, shared (never copied)
/// across every phase invocation through `Rc<RefCell<_>>`.
pub(crate) struct RunState {
    pub(crate) resource: String,
    pub(crate) loaders: Vec<Loader>,
    pub(crate) phase: PipelinePhase,
    pub(crate) environment: Environment,
    resource_buffer: Option<Vec<u8>>,
    read_resource: Option<ResourceReader>,
    final_callback: Option<FinalCallback>,
}

impl RunState {
    /// Identities of the chain, in list order
    pub(crate) fn identities(&self) -> Vec<&str> {
        self.loaders.iter().map(|l| l.identity.as_str()).collect()
    }

    /// Index of the loader a phase is currently executing for
    pub(crate) fn active_cursor(&self) -> usize {
        match self.phase {
            PipelinePhase::Pitching { cursor } => cursor,
            PipelinePhase::Normal { cursor } => {
                usize::try_from(cursor).expect("a loader is executing, so the cursor is in range")
            }
            PipelinePhase::ReadingResource | PipelinePhase::Done => {
                panic!("no loader is currently executing")
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(resource: &str, loaders: Vec<Loader>) -> Self {
        Self {
            resource: resource.to_owned(),
            loaders,
            phase: PipelinePhase::Pitching { cursor: 0 },
            environment: Environment::default(),
            resource_buffer: None,
            read_resource: None,
            final_callback: None,
        }
    }
}

/// Options for one pipeline run.
pub struct RunOptions {
    /// Path of the resource to transform
    pub resource: String,
    /// Ordered loader identities, first entry outermost
    pub loaders: Vec<String>,
    /// Shared environment visible to every loader in the run
    pub environment: Environment,
    /// Resource reader, called exactly once unless a pitch short-circuits
    pub read_resource: ResourceReader,
}

impl RunOptions {
    /// Options with the stock filesystem reader and an empty environment
    pub fn new(resource: impl Into<String>, loaders: Vec<String>) -> Self {
        Self {
            resource: resource.into(),
            loaders,
            environment: Environment::default(),
            read_resource: Box::new(read_file_resource),
        }
    }

    /// Replace the resource reader
    pub fn with_reader(mut self, reader: ResourceReader) -> Self {
        self.read_resource = reader;
        self
    }

    /// Seed the shared environment
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("resource", &self.resource)
            .field("loaders", &self.loaders)
            .finish_non_exhaustive()
    }
}

/// What a completed run delivers.
#[derive(Debug)]
pub struct RunOutput {
    /// Final argument list produced by the chain; position 0 is the
    /// primary result by convention
    pub values: Vec<Content>,
    /// Raw bytes of the resource; `None` when a pitch short-circuited the
    /// read
    pub resource_buffer: Option<Vec<u8>>,
}

impl RunOutput {
    /// The primary result (argument position 0)
    pub fn result(&self) -> Option<&Content> {
        self.values.first()
    }
}

/// Run a loader chain against a resource. Modules are resolved eagerly;
/// a resolution failure aborts before any phase executes. The callback
/// fires exactly once per run, either within this call stack or later if
/// a phase suspends.
pub fn run_pipeline(
    options: RunOptions,
    resolver: &dyn ModuleResolver,
    callback: impl FnOnce(Result<RunOutput>) + 'static,
) {
    let RunOptions {
        resource,
        loaders: identities,
        environment,
        read_resource,
    } = options;
    debug!(
        "starting run for `{}` through {} loader(s): {}",
        resource,
        identities.len(),
        request::full_request(&identities, &resource)
    );

    // Eager resolution: a load failure aborts before any phase runs
    let resolved: Result<Vec<Loader>> = identities
        .into_iter()
        .map(|identity| {
            let module = resolver
                .resolve(&identity)
                .with_context(|| format!("failed to load transform module `{identity}`"))?;
            Ok(Loader::new(identity, module))
        })
        .collect();
    let loaders = match resolved {
        Ok(loaders) => loaders,
        Err(err) => {
            callback(Err(err));
            return;
        }
    };

    let state = Rc::new(RefCell::new(RunState {
        resource,
        loaders,
        phase: PipelinePhase::Pitching { cursor: 0 },
        environment,
        resource_buffer: None,
        read_resource: Some(read_resource),
        final_callback: Some(Box::new(callback)),
    }));
    iterate_pitching(&state);
}

enum PitchAction {
    AcquireResource,
    Invoke {
        identity: String,
        module: Rc<TransformModule>,
        args: Vec<Content>,
    },
}

fn next_pitch_action(state: &mut RunState) -> PitchAction {
    loop {
        let PipelinePhase::Pitching { cursor } = state.phase else {
            panic!("pitching traversal stepped outside the pitching phase")
        };
        if cursor >= state.loaders.len() {
            return PitchAction::AcquireResource;
        }
        // Re-entry guard: a pitch that already ran advances the walk, so
        // each hook executes at most once even if the index is revisited.
        if state.loaders[cursor].pitch_executed {
            state.phase = PipelinePhase::Pitching { cursor: cursor + 1 };
            continue;
        }
        state.loaders[cursor].pitch_executed = true;
        if state.loaders[cursor].module.pitch.is_none() {
            continue;
        }

        let identity = state.loaders[cursor].identity.clone();
        let module = Rc::clone(&state.loaders[cursor].module);
        let identities = state.identities();
        let args = vec![
            Content::Text(request::remaining_request(&identities, cursor, &state.resource)),
            Content::Text(request::previous_request(&identities, cursor)),
        ];
        return PitchAction::Invoke {
            identity,
            module,
            args,
        };
    }
}

fn iterate_pitching(state: &Rc<RefCell<RunState>>) {
    let action = next_pitch_action(&mut state.borrow_mut());
    match action {
        PitchAction::AcquireResource => acquire_resource(state),
        PitchAction::Invoke {
            identity,
            module,
            args,
        } => {
            let next = Rc::clone(state);
            run_sync_or_async(state, &module, PhaseKind::Pitch, &identity, args, move |result| {
                on_pitch_complete(&next, result);
            });
        }
    }
}

fn on_pitch_complete(state: &Rc<RefCell<RunState>>, result: Result<Vec<Content>>) {
    let values = match result {
        Ok(values) => values,
        Err(err) => return finish(state, Err(err)),
    };
    if values.iter().any(Content::is_truthy) {
        // Short-circuit: jump into the normal traversal one step back.
        // Later loaders are never pitched and never visited; the resource
        // is never read.
        let cursor = {
            let mut st = state.borrow_mut();
            let PipelinePhase::Pitching { cursor } = st.phase else {
                panic!("pitch completion outside the pitching phase")
            };
            st.phase = PipelinePhase::Normal {
                cursor: cursor as isize - 1,
            };
            cursor
        };
        debug!("pitch short-circuit at loader index {cursor}");
        iterate_normal(state, values);
    } else {
        iterate_pitching(state);
    }
}

fn acquire_resource(state: &Rc<RefCell<RunState>>) {
    let (reader, resource) = {
        let mut st = state.borrow_mut();
        st.phase = PipelinePhase::ReadingResource;
        let reader = st
            .read_resource
            .take()
            .expect("the resource is read at most once per run");
        (reader, st.resource.clone())
    };
    debug!("reading resource `{resource}`");

    let next = Rc::clone(state);
    let path = resource.clone();
    reader(
        &resource,
        Box::new(move |result| match result {
            Err(err) => finish(
                &next,
                Err(err.context(format!("failed to read resource `{path}`"))),
            ),
            Ok(bytes) => {
                {
                    let mut st = next.borrow_mut();
                    st.resource_buffer = Some(bytes.clone());
                    st.phase = PipelinePhase::Normal {
                        cursor: st.loaders.len() as isize - 1,
                    };
                }
                iterate_normal(&next, vec![Content::Bytes(bytes)]);
            }
        }),
    );
}

enum NormalAction {
    Finished,
    MissingNormal { identity: String },
    Invoke {
        identity: String,
        module: Rc<TransformModule>,
    },
}

fn next_normal_action(state: &mut RunState) -> NormalAction {
    loop {
        let PipelinePhase::Normal { cursor } = state.phase else {
            panic!("normal traversal stepped outside the normal phase")
        };
        let Ok(index) = usize::try_from(cursor) else {
            return NormalAction::Finished;
        };
        // Same re-entry guard as the pitching walk, pointed downward
        if state.loaders[index].normal_executed {
            state.phase = PipelinePhase::Normal { cursor: cursor - 1 };
            continue;
        }
        state.loaders[index].normal_executed = true;

        let loader = &state.loaders[index];
        if loader.module.normal.is_none() {
            return NormalAction::MissingNormal {
                identity: loader.identity.clone(),
            };
        }
        return NormalAction::Invoke {
            identity: loader.identity.clone(),
            module: Rc::clone(&loader.module),
        };
    }
}

fn iterate_normal(state: &Rc<RefCell<RunState>>, args: Vec<Content>) {
    let action = next_normal_action(&mut state.borrow_mut());
    match action {
        NormalAction::Finished => finish(state, Ok(args)),
        NormalAction::MissingNormal { identity } => finish(
            state,
            Err(anyhow!(
                "loader `{identity}` has no normal phase but was reached by the normal traversal"
            )),
        ),
        NormalAction::Invoke { identity, module } => {
            let mut args = args;
            coerce_first_arg(&mut args, module.wants_binary);
            let next = Rc::clone(state);
            run_sync_or_async(state, &module, PhaseKind::Normal, &identity, args, move |result| {
                match result {
                    Ok(values) => iterate_normal(&next, values),
                    Err(err) => finish(&next, Err(err)),
                }
            });
        }
    }
}

/// Deliver the run's single result and retire the state machine.
fn finish(state: &Rc<RefCell<RunState>>, outcome: Result<Vec<Content>>) {
    let (callback, resource_buffer) = {
        let mut st = state.borrow_mut();
        st.phase = PipelinePhase::Done;
        let callback = st
            .final_callback
            .take()
            .expect("a run delivers its result exactly once");
        (callback, st.resource_buffer.take())
    };
    match outcome {
        Ok(values) => {
            debug!("run complete with {} value(s)", values.len());
            callback(Ok(RunOutput {
                values,
                resource_buffer,
            }));
        }
        Err(err) => {
            debug!("run aborted: {err:#}");
            callback(Err(err));
        }
    }
}
