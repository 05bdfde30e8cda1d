// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Error types split into two channels: protocol faults, which the engine
//! absorbs into exceptional frame halts, and host faults, which abort the
//! enclosing transaction.

use ethereum_types::U256;
use std::{fmt, io};

/// Protocol-level execution error. Absorbed by the dispatching engine into
/// the failing frame's terminal state; never unwinds past a frame boundary.
#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    /// `OutOfGas` is returned when transaction execution runs out of gas.
    /// The state should be reverted to the state from before the
    /// transaction execution. But it does not mean that transaction
    /// was invalid. Balance still should be transferred and nonce
    /// should be increased.
    OutOfGas,

    /// `BadJumpDestination` is returned when execution tried to move
    /// to position that wasn't marked with JUMPDEST instruction
    BadJumpDestination {
        /// Position the code tried to jump to.
        destination: usize,
    },

    /// `BadInstruction` is returned when given instruction is not supported
    BadInstruction {
        /// Unrecognized opcode
        instruction: u8,
    },

    /// `StackUnderflow` when there is not enough stack elements to execute
    /// instruction
    StackUnderflow {
        /// Invoked instruction
        instruction: &'static str,
        /// How many stack elements was requested by instruction
        wanted: usize,
        /// How many elements were on stack
        on_stack: usize,
    },

    /// When execution would exceed defined operand stack limit
    OutOfStack {
        /// Invoked instruction
        instruction: &'static str,
        /// How many stack elements instruction wanted to push
        wanted: usize,
        /// What was the stack limit
        limit: usize,
    },

    /// A frame was constructed past the maximum permitted nesting depth.
    /// The refused frame executes no side effect and consumes no gas.
    ExceedsCallDepth,

    /// The sender does not hold the value the action wants to transfer.
    NotEnoughCash {
        /// Value the action required.
        required: U256,
        /// Balance the sender actually holds.
        got: U256,
    },

    /// Built-in contract failed on given input
    BuiltIn(&'static str),

    /// Out of bounds access in RETURNDATACOPY.
    OutOfBounds,

    /// Execution has been reverted with REVERT.
    Reverted,
}

/// VM result alias.
pub type Result<T> = ::std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Error::*;
        match *self {
            OutOfGas => write!(f, "Out of gas"),
            BadJumpDestination { destination } => {
                write!(f, "Bad jump destination {:x}", destination)
            }
            BadInstruction { instruction } => {
                write!(f, "Bad instruction {:x}", instruction)
            }
            StackUnderflow {
                instruction,
                wanted,
                on_stack,
            } => write!(
                f,
                "Stack underflow {} {}/{}",
                instruction, wanted, on_stack
            ),
            OutOfStack {
                instruction,
                wanted,
                limit,
            } => write!(f, "Out of stack {} {}/{}", instruction, wanted, limit),
            ExceedsCallDepth => write!(f, "Exceeds maximum call depth"),
            NotEnoughCash { required, got } => write!(
                f,
                "Not enough cash, required: {}, got: {}",
                required, got
            ),
            BuiltIn(name) => write!(f, "Built-in failed: {}", name),
            OutOfBounds => write!(f, "Out of bounds"),
            Reverted => write!(f, "Reverted by bytecode"),
        }
    }
}

/// Host-environment failure. Unlike [`Error`], it is never absorbed into a
/// frame outcome: it propagates through every engine entry point and aborts
/// the enclosing transaction.
#[derive(Debug)]
pub enum FatalError {
    /// Allocating the relocated interpreter stack failed.
    StackRelocation(io::Error),
}

/// Result alias for engine entry points that can hit a host failure.
pub type EngineResult<T> = ::std::result::Result<T, FatalError>;

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FatalError::StackRelocation(ref err) => {
                write!(f, "Cannot allocate a relocated stack: {}", err)
            }
        }
    }
}

impl std::error::Error for FatalError {}
