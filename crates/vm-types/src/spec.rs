// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Cost rule set and consensus limits.

/// Definition of the cost rule set and consensus limits consulted by the
/// engine and its interpreters. Every field is a runtime value so embedders
/// and tests can exercise small thresholds deterministically.
#[derive(Debug, Clone)]
pub struct Spec {
    /// Maximum depth of nested call/create frames. A frame constructed at
    /// this depth halts exceptionally before any side effect.
    pub max_depth: usize,
    /// Gas price for a CALL-like instruction, charged by the interpreter.
    pub call_gas: usize,
    /// Stipend forwarded with a value-bearing call.
    pub call_stipend: usize,
    /// Gas price for a CREATE-like instruction, charged by the interpreter.
    pub create_gas: usize,
    /// Gas charged per byte of code deposited by a successful creation.
    pub create_data_gas: usize,
    /// Maximum size of code a creation may deposit.
    pub create_data_limit: usize,
    /// Gas price for a LOG instruction.
    pub log_gas: usize,
    /// Additional gas per log topic.
    pub log_topic_gas: usize,
    /// Additional gas per byte of log data.
    pub log_data_gas: usize,
    /// Refund for clearing a storage slot.
    pub sstore_refund_gas: usize,
    /// Refund for a self-destruct.
    pub suicide_refund_gas: usize,
}

impl Default for Spec {
    fn default() -> Spec {
        Spec {
            max_depth: 1024,
            call_gas: 700,
            call_stipend: 2300,
            create_gas: 32000,
            create_data_gas: 200,
            create_data_limit: 24576,
            log_gas: 375,
            log_topic_gas: 375,
            log_data_gas: 8,
            sstore_refund_gas: 15000,
            suicide_refund_gas: 24000,
        }
    }
}
