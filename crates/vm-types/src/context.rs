// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Interface for interpreter externalities.

use crate::{
    action_params::{CallParameters, OnStep},
    env::Env,
    error::EngineResult,
    spec::Spec,
    Bytes,
};
use ethereum_types::{Address, H256, U256};
use std::sync::Arc;

/// The engine-side services an interpreter may use while running one frame.
/// Nested calls and creations re-enter the dispatch layer through this trait;
/// everything else is read-only context or substate accounting.
pub trait Context {
    /// Returns the balance of the given account.
    fn balance(&self, address: &Address) -> U256;

    /// Returns the code of the given account, if any.
    fn extcode(&self, address: &Address) -> Option<Arc<Bytes>>;

    /// Returns the code size of the given account.
    fn extcodesize(&self, address: &Address) -> usize;

    /// Message call.
    ///
    /// Dispatches a nested call described by `params`, blocking until the
    /// child frame halts. The child's final remaining gas is written back
    /// into `params.gas` on success and failure alike. Returns whether the
    /// child halted without exception; interpreter-level faults inside the
    /// child never unwind out of this method.
    fn call(&mut self, params: &mut CallParameters) -> EngineResult<bool>;

    /// Creates a new contract.
    ///
    /// Increments the sender's nonce before anything else, then dispatches a
    /// creation frame running `init_code` with the given endowment. `gas` is
    /// a budget in and the child's remaining gas out. Returns the address
    /// assigned to the new contract, or `None` if the creation halted
    /// exceptionally (the nonce increment survives regardless).
    fn create(
        &mut self, endowment: &U256, gas: &mut U256, init_code: Arc<Bytes>,
        on_step: OnStep,
    ) -> EngineResult<Option<Address>>;

    /// Creates a log entry with the given topics and data.
    fn log(&mut self, topics: Vec<H256>, data: &[u8]);

    /// Marks the executing account for destruction and moves its balance to
    /// `refund_address`. The destruction is applied when the transaction
    /// finalizes.
    fn suicide(&mut self, refund_address: &Address);

    /// Increments the sstore refunds counter.
    fn add_sstore_refund(&mut self, value: usize);

    /// Decrements the sstore refunds counter.
    fn sub_sstore_refund(&mut self, value: usize);

    /// Returns the cost rule set.
    fn spec(&self) -> &Spec;

    /// Returns the execution environment.
    fn env(&self) -> &Env;

    /// Returns current depth of execution.
    ///
    /// If contract A calls contract B, and contract B calls C,
    /// then A depth is 0, B is 1, C is 2 and so on.
    fn depth(&self) -> usize;
}
