//! Per-run loader descriptors.

use std::rc::Rc;

use crate::{content::Scratch, module::TransformModule};

/// One entry in a run's loader chain. Created at run start in list order;
/// the same module listed twice yields two distinct entries. Mutated only
/// by the traversal that currently owns the pipeline position, discarded
/// when the run delivers its result.
#[derive(Debug)]
pub(crate) struct Loader {
    /// Identity the module was resolved from
    pub(crate) identity: String,
    /// The loaded module
    pub(crate) module: Rc<TransformModule>,
    /// Scratch map shared between this loader's pitch and normal
    /// invocations, created once per run
    pub(crate) scratch: Scratch,
    /// The pitch hook already ran this run
    pub(crate) pitch_executed: bool,
    /// The normal phase already ran this run
    pub(crate) normal_executed: bool,
}

impl Loader {
    pub(crate) fn new(identity: String, module: Rc<TransformModule>) -> Self {
        Self {
            identity,
            module,
            scratch: Scratch::default(),
            pitch_executed: false,
            normal_executed: false,
        }
    }
}
