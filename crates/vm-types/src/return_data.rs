// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Interpreter output vocabulary.

use ethereum_types::U256;

/// Return data buffer. Holds memory from a previous call and a slice into
/// that memory.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnData {
    mem: Vec<u8>,
    offset: usize,
    size: usize,
}

impl ::std::ops::Deref for ReturnData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.mem[self.offset..self.offset + self.size]
    }
}

impl ReturnData {
    /// Create empty `ReturnData`.
    pub fn empty() -> Self {
        ReturnData {
            mem: Vec::new(),
            offset: 0,
            size: 0,
        }
    }

    /// Create `ReturnData` from given buffer and slice.
    pub fn new(mem: Vec<u8>, offset: usize, size: usize) -> Self {
        ReturnData { mem, offset, size }
    }
}

/// Gas Left: either it is a known value, or it needs to be computed by
/// processing a return instruction.
#[derive(Debug, Clone)]
pub enum GasLeft {
    /// Known gas left
    Known(U256),
    /// Return or Revert instruction must be processed.
    NeedsReturn {
        /// Amount of gas left.
        gas_left: U256,
        /// Return data buffer.
        data: ReturnData,
        /// Apply or revert state changes on revert.
        apply_state: bool,
    },
}

/// Outcome of an interpreter run after the terminal instruction has been
/// processed by the frame that drove it.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizationResult {
    /// Final amount of gas left.
    pub gas_left: U256,
    /// Apply execution state changes or revert them.
    pub apply_state: bool,
    /// Return data buffer.
    pub return_data: ReturnData,
}
