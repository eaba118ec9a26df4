//! Sync/async phase invocation adapter.
//!
//! Every phase invocation gets a fresh single-use completion cell. A phase
//! that returns `Ok` without switching to async completes synchronously
//! with its return value; a phase that takes the completion token via
//! [`LoaderContext::switch_to_async`] suspends the pipeline until the
//! token is completed, possibly after the originating call stack has
//! unwound. Completion is claimed exactly once per invocation; a second
//! claim is a contract violation in the transform module and panics.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use crate::{
    content::Content,
    context::LoaderContext,
    module::{PhaseResult, TransformModule},
    runner::RunState,
};

/// Which phase of a loader is being invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PhaseKind {
    Pitch,
    Normal,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pitch => f.write_str("pitch"),
            Self::Normal => f.write_str("normal"),
        }
    }
}

type Continuation = Box<dyn FnOnce(PhaseResult)>;

/// Per-invocation completion state. Consumed on first claim, poisoned
/// after; never reused across invocations.
pub(crate) struct CompletionCell {
    /// Identifies the invocation in diagnostics, e.g. "loader `x` pitch phase"
    label: String,
    async_requested: Cell<bool>,
    claimed: Cell<bool>,
    continuation: RefCell<Option<Continuation>>,
}

impl CompletionCell {
    fn new(label: String, continuation: Continuation) -> Self {
        Self {
            label,
            async_requested: Cell::new(false),
            claimed: Cell::new(false),
            continuation: RefCell::new(Some(continuation)),
        }
    }

    /// Mark this invocation as asynchronously completed
    pub(crate) fn request_async(&self) {
        self.async_requested.set(true);
    }

    fn async_requested(&self) -> bool {
        self.async_requested.get()
    }

    fn is_claimed(&self) -> bool {
        self.claimed.get()
    }

    /// Claim completion. The first claim runs the continuation; any later
    /// claim means the pipeline position is undefined and panics.
    fn claim(&self, result: PhaseResult) {
        if self.claimed.replace(true) {
            panic!(
                "{} completed twice; the completion callback may be invoked at most once per \
                 invocation",
                self.label
            );
        }
        let continuation = self
            .continuation
            .borrow_mut()
            .take()
            .expect("continuation is present until the first claim");
        continuation(result.map_err(|err| err.context(format!("{} failed", self.label))));
    }
}

/// Single-use handle completing a suspended phase invocation. Obtained
/// through [`LoaderContext::switch_to_async`]; it may be cloned and stored
/// across callbacks, but completing it more than once panics. Tokens are
/// transient, reassigned per invocation; phase code must not hold a token
/// across a later invocation and complete it then.
#[derive(Clone)]
pub struct CompletionToken {
    cell: Rc<CompletionCell>,
}

impl CompletionToken {
    pub(crate) fn new(cell: Rc<CompletionCell>) -> Self {
        Self { cell }
    }

    /// Complete the invocation with a phase result
    pub fn complete(&self, result: PhaseResult) {
        self.cell.claim(result);
    }

    /// Complete successfully with the next argument list
    pub fn resolve(&self, values: Vec<Content>) {
        self.complete(Ok(values));
    }

    /// Abort the run with an error
    pub fn reject(&self, error: anyhow::Error) {
        self.complete(Err(error));
    }
}

impl fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionToken")
            .field("invocation", &self.cell.label)
            .field("claimed", &self.cell.is_claimed())
            .finish()
    }
}

/// Invoke one phase function and normalize its completion. `done` fires
/// exactly once, either before this returns (synchronous phase) or
/// whenever the completion token is completed.
pub(crate) fn run_sync_or_async(
    state: &Rc<RefCell<RunState>>,
    module: &Rc<TransformModule>,
    kind: PhaseKind,
    identity: &str,
    args: Vec<Content>,
    done: impl FnOnce(PhaseResult) + 'static,
) {
    let label = format!("loader `{identity}` {kind} phase");
    let cell = Rc::new(CompletionCell::new(label, Box::new(done)));
    let phase_fn = match kind {
        PhaseKind::Pitch => module.pitch.as_ref(),
        PhaseKind::Normal => module.normal.as_ref(),
    }
    .expect("traversal checks phase presence before invoking");

    log::trace!("invoking loader `{identity}` {kind} phase");
    let mut ctx = LoaderContext::new(Rc::clone(state), Rc::clone(&cell));
    match phase_fn(&mut ctx, args) {
        // An error return claims completion even after a switch to async:
        // a phase that failed out of its own stack cannot be trusted to
        // complete its token later.
        Err(err) => cell.claim(Err(err)),
        // A phase may also have completed synchronously through its own
        // token; only an unclaimed, never-switched invocation completes
        // from the return value.
        Ok(values) if !cell.is_claimed() && !cell.async_requested() => cell.claim(Ok(values)),
        Ok(_) if !cell.is_claimed() => {
            log::trace!("loader `{identity}` {kind} phase suspended, awaiting its token");
        }
        Ok(_) => {}
    }
}
