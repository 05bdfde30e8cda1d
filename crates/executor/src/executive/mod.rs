// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! The transaction-entry executive. Drives the outermost frame of a call
//! or creation and folds the committed substate back into the ledger.

pub mod executed;
#[cfg(test)]
mod tests;

pub use executed::Executed;

use crate::{
    ledger::Ledger,
    machine::Machine,
    stack::{self, BeginOutcome, CallCreateFrame, FrameResult},
    substate::Substate,
};
use ethereum_types::{Address, U256};
use keccak_hash::keccak;
use kestrel_vm_types::{self as vm, ActionParams, EngineResult, Env, Spec};
use rlp::RlpStream;

/// The address of a contract created by `sender` with the given nonce.
pub fn contract_address(sender: &Address, nonce: &U256) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(sender);
    stream.append(nonce);
    From::from(keccak(stream.as_raw()))
}

/// Transaction executor: one instance per outermost action.
pub struct Executive<'a, L: Ledger> {
    ledger: &'a mut L,
    env: &'a Env,
    machine: &'a Machine,
    spec: &'a Spec,
}

impl<'a, L: Ledger> Executive<'a, L> {
    /// Basic constructor.
    pub fn new(
        ledger: &'a mut L, env: &'a Env, machine: &'a Machine,
        spec: &'a Spec,
    ) -> Self {
        Executive {
            ledger,
            env,
            machine,
            spec,
        }
    }

    /// Execute a message call as the outermost frame.
    pub fn call(&mut self, params: ActionParams) -> EngineResult<Executed> {
        debug!(
            "Executive::call sender={:?} receiver={:?} gas={}",
            params.sender, params.address, params.gas
        );
        let frame = CallCreateFrame::new_call(
            params,
            self.env,
            self.machine,
            self.spec,
            0,
        );
        self.exec_frame(frame, false)
    }

    /// Execute a contract creation as the outermost frame. The sender's
    /// nonce advances first and determines the new contract's address;
    /// both stand whatever becomes of the creation.
    pub fn create(
        &mut self, mut params: ActionParams,
    ) -> EngineResult<Executed> {
        self.ledger.inc_nonce(&params.sender);
        let nonce = self.ledger.nonce(&params.sender) - U256::one();
        let address = contract_address(&params.sender, &nonce);
        params.address = address;
        params.code_address = address;
        debug!(
            "Executive::create sender={:?} address={:?} gas={}",
            params.sender, address, params.gas
        );

        let frame = CallCreateFrame::new_create(
            params,
            self.env,
            self.machine,
            self.spec,
            0,
        );
        self.exec_frame(frame, true)
    }

    fn exec_frame(
        &mut self, mut frame: CallCreateFrame<'_>, create: bool,
    ) -> EngineResult<Executed> {
        let begun = if create {
            frame.begin_create(self.ledger)
        } else {
            frame.begin_call(self.ledger)
        };
        if begun == BeginOutcome::NeedsRun {
            let ledger = &mut *self.ledger;
            stack::place(
                self.machine.stack_budget(),
                self.spec.max_depth,
                0,
                || frame.run(ledger),
            )?;
        }

        let mut substate = Substate::new();
        frame.merge_into(&mut substate);
        let gas_left = frame.gas_left();
        Ok(self.finalize(frame.into_result(), substate, gas_left))
    }

    /// Fold the committed substate into the ledger and shape the receipt.
    fn finalize(
        &mut self, result: FrameResult, substate: Substate, gas_left: U256,
    ) -> Executed {
        // Destructed accounts leave the ledger only here, once the whole
        // chain has committed.
        for address in &substate.suicides {
            self.ledger.kill_account(address);
        }

        let (exception, output) = match result {
            Ok(r) => (
                (!r.apply_state).then_some(vm::Error::Reverted),
                r.return_data.to_vec(),
            ),
            Err(e) => (Some(e), Vec::new()),
        };

        Executed {
            exception,
            gas_left,
            output,
            logs: substate.logs,
            contracts_created: substate.contracts_created,
        }
    }
}
