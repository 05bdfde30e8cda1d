// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Kestrel Executor: the nested message-call dispatch layer of the Kestrel
//! execution engine. It owns everything between an interpreter's CALL/CREATE
//! instruction and the ledger: frame construction and bookkeeping, the
//! recursion depth bound, native stack relocation for deep chains, and the
//! merge of gas and substate back into the caller. Opcode semantics live in
//! interpreters supplied through `kestrel_vm_types::VmFactory`.

#[macro_use]
extern crate log;

/// Built-in Contracts: precompiled logic dispatched without an interpreter,
/// priced per input and completed immediately by the frame that hits one.
pub mod builtin;

/// Execution Context: implements the interpreter-facing context during
/// execution, like caller information and block information, and dispatches
/// the nested calls and creations an interpreter issues through it.
pub mod context;

/// Execution Entry: drives depth-0 frames for an embedding client and
/// finalizes the accumulated substate into an execution summary.
pub mod executive;

/// Ledger Seam: the account/balance/nonce surface the engine needs from a
/// state backend, with checkpoints, plus an in-memory reference backend.
pub mod ledger;

/// Execution Engine Object: serves as a factory for rule sets, built-in
/// contracts, stack sizing, and interpreter instances.
pub mod machine;

/// Stack Management: the call/create frame state machine and the governor
/// that decides where each frame's run loop may safely execute.
pub mod stack;

/// Substate Tracker: accumulates consensus-relevant side effects during
/// execution and merges them upward on success.
pub mod substate;

pub use self::{
    context::{Context, OriginInfo},
    executive::{contract_address, Executed, Executive},
    ledger::{Ledger, MemoryLedger},
    machine::Machine,
    stack::{BeginOutcome, CallCreateFrame, FrameResult, StackBudget},
    substate::Substate,
};
