// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Shared vocabulary between the execution engine and bytecode interpreters.
//!
//! The engine dispatches nested calls and creations; interpreters drive
//! opcode semantics. Neither links against the other directly: interpreters
//! implement [`Exec`] and talk back to the engine through the [`Context`]
//! trait, and everything they exchange (parameters, environment, rule set,
//! results, errors) is defined here.

mod action_params;
mod call_type;
mod context;
mod env;
mod error;
mod log_entry;
mod return_data;
mod spec;

pub use self::{
    action_params::{
        ActionParams, ActionValue, CallParameters, OnStep, OnStepFn, StepInfo,
    },
    call_type::CallType,
    context::Context,
    env::Env,
    error::{EngineResult, Error, FatalError, Result},
    log_entry::LogEntry,
    return_data::{FinalizationResult, GasLeft, ReturnData},
    spec::Spec,
};

/// Simple byte vector alias, matching the rest of the stack.
pub type Bytes = Vec<u8>;

/// Virtual machine bytecode interpreter. The engine obtains one instance per
/// frame from a [`VmFactory`] and drives it to completion exactly once.
pub trait Exec: Send {
    /// Run the action's code to a terminal state. Re-entrant work (nested
    /// calls and creations) goes through `context`; protocol faults are
    /// reported in the inner [`Result`], while the outer [`EngineResult`]
    /// carries host failures that abort the whole transaction.
    fn exec(
        self: Box<Self>, context: &mut dyn Context,
    ) -> EngineResult<Result<GasLeft>>;
}

/// Supplies interpreter instances to the engine.
pub trait VmFactory: Send + Sync {
    /// Create an interpreter for one frame's action.
    fn create(
        &self, params: ActionParams, spec: &Spec, depth: usize,
    ) -> Box<dyn Exec>;
}
