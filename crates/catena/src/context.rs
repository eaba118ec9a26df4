//! The call-time environment handed to every phase invocation.
//!
//! Phase functions receive a [`LoaderContext`] as an explicit argument
//! rather than an implicit receiver. The handle borrows for the duration
//! of the call, so phase code cannot retain it; the completion token from
//! [`LoaderContext::switch_to_async`] is the only thing a loader may keep.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    adapter::{CompletionCell, CompletionToken},
    content::{Environment, Scratch},
    request,
    runner::RunState,
};

/// Per-invocation view of the shared run state. All request views are
/// recomputed from the live cursor on every call, never snapshotted.
pub struct LoaderContext {
    state: Rc<RefCell<RunState>>,
    completion: Rc<CompletionCell>,
}

impl LoaderContext {
    pub(crate) fn new(state: Rc<RefCell<RunState>>, completion: Rc<CompletionCell>) -> Self {
        Self { state, completion }
    }

    /// Path of the resource being transformed
    pub fn resource_path(&self) -> String {
        self.state.borrow().resource.clone()
    }

    /// Number of loaders in the chain
    pub fn loader_count(&self) -> usize {
        self.state.borrow().loaders.len()
    }

    /// Index of the currently executing loader
    pub fn cursor(&self) -> usize {
        self.state.borrow().active_cursor()
    }

    /// Identity of the currently executing loader
    pub fn identity(&self) -> String {
        let state = self.state.borrow();
        state.loaders[state.active_cursor()].identity.clone()
    }

    /// The full request: every loader identity plus the resource
    pub fn request(&self) -> String {
        let state = self.state.borrow();
        request::full_request(&state.identities(), &state.resource)
    }

    /// Identities after the current loader, plus the resource
    pub fn remaining_request(&self) -> String {
        let state = self.state.borrow();
        request::remaining_request(&state.identities(), state.active_cursor(), &state.resource)
    }

    /// The current loader, those after it, and the resource
    pub fn current_request(&self) -> String {
        let state = self.state.borrow();
        request::current_request(&state.identities(), state.active_cursor(), &state.resource)
    }

    /// Identities before the current loader, without the resource
    pub fn previous_request(&self) -> String {
        let state = self.state.borrow();
        request::previous_request(&state.identities(), state.active_cursor())
    }

    /// Read or write the executing loader's scratch map. Resolved from the
    /// cursor at call time, so a loader sees the same map from its pitch
    /// and its normal invocation.
    pub fn with_scratch<R>(&mut self, f: impl FnOnce(&mut Scratch) -> R) -> R {
        let mut state = self.state.borrow_mut();
        let cursor = state.active_cursor();
        f(&mut state.loaders[cursor].scratch)
    }

    /// Read or write the run-wide environment shared by every loader
    pub fn with_environment<R>(&mut self, f: impl FnOnce(&mut Environment) -> R) -> R {
        f(&mut self.state.borrow_mut().environment)
    }

    /// Switch this invocation to asynchronous completion. The pipeline
    /// advances only when the returned token is completed; the `Ok` return
    /// value of the phase function is ignored from here on.
    pub fn switch_to_async(&mut self) -> CompletionToken {
        self.completion.request_async();
        CompletionToken::new(Rc::clone(&self.completion))
    }
}

impl fmt::Debug for LoaderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("LoaderContext")
            .field("resource", &state.resource)
            .field("phase", &state.phase)
            .finish_non_exhaustive()
    }
}
