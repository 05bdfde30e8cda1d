// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! The interpreter's window onto the engine. Owns nested dispatch: every
//! CALL- or CREATE-like instruction lands here and becomes a child frame.

use crate::{
    executive::contract_address,
    ledger::Ledger,
    machine::Machine,
    stack::{self, BeginOutcome, CallCreateFrame},
    substate::Substate,
};
use ethereum_types::{Address, H256, U256};
use kestrel_vm_types::{
    ActionParams, ActionValue, Bytes, CallParameters, CallType,
    Context as ContextTrait, EngineResult, Env, LogEntry, OnStep, Spec,
};
use std::sync::Arc;

/// Identity of the action a frame runs, frozen at activation. Children
/// inherit the transaction origin and gas price from here rather than from
/// anything the interpreter hands over.
#[derive(Debug, Clone)]
pub struct OriginInfo {
    address: Address,
    origin: Address,
    gas_price: U256,
}

impl OriginInfo {
    /// Populate from action params.
    pub fn from(params: &ActionParams) -> Self {
        OriginInfo {
            address: params.address,
            origin: params.origin,
            gas_price: params.gas_price,
        }
    }
}

/// Implementation of the interpreter-facing context for one running frame.
pub struct Context<'a, L: Ledger> {
    ledger: &'a mut L,
    env: &'a Env,
    machine: &'a Machine,
    spec: &'a Spec,
    depth: usize,
    origin: &'a OriginInfo,
    substate: &'a mut Substate,
}

impl<'a, L: Ledger> Context<'a, L> {
    pub fn new(
        ledger: &'a mut L, env: &'a Env, machine: &'a Machine,
        spec: &'a Spec, depth: usize, origin: &'a OriginInfo,
        substate: &'a mut Substate,
    ) -> Self {
        Context {
            ledger,
            env,
            machine,
            spec,
            depth,
            origin,
            substate,
        }
    }

    /// Activate a constructed child frame, run it on a suitably placed
    /// stack if it holds interpreter work, and absorb its side effects.
    fn dispatch(
        &mut self, frame: &mut CallCreateFrame, create: bool,
    ) -> EngineResult<()> {
        let needs_run = if create {
            frame.begin_create(self.ledger)
        } else {
            frame.begin_call(self.ledger)
        };
        if needs_run == BeginOutcome::NeedsRun {
            let ledger = &mut *self.ledger;
            stack::place(
                self.machine.stack_budget(),
                self.spec.max_depth,
                self.depth + 1,
                || frame.run(ledger),
            )?;
        }
        frame.merge_into(self.substate);
        Ok(())
    }
}

impl<'a, L: Ledger> ContextTrait for Context<'a, L> {
    fn balance(&self, address: &Address) -> U256 {
        self.ledger.balance(address)
    }

    fn extcode(&self, address: &Address) -> Option<Arc<Bytes>> {
        self.ledger.code(address)
    }

    fn extcodesize(&self, address: &Address) -> usize {
        self.ledger.code(address).map_or(0, |code| code.len())
    }

    fn call(&mut self, params: &mut CallParameters) -> EngineResult<bool> {
        debug!(
            "Context::call sender={:?} receiver={:?} value={:?} gas={} \
             sender_balance={}",
            params.sender_address,
            params.receive_address,
            params.value,
            params.gas,
            self.ledger.balance(&params.sender_address),
        );

        let action = ActionParams {
            code_address: params.code_address,
            address: params.receive_address,
            sender: params.sender_address,
            origin: self.origin.origin,
            gas: params.gas,
            gas_price: params.gas_price,
            value: params.value.clone(),
            code: params.code.clone(),
            data: params.data.clone(),
            call_type: params.call_type,
            on_step: params.on_step.clone(),
        };

        let mut frame = CallCreateFrame::new_call(
            action,
            self.env,
            self.machine,
            self.spec,
            self.depth + 1,
        );
        self.dispatch(&mut frame, false)?;

        params.gas = frame.gas_left();
        debug!(
            "Context::call done gas_left={} exceptional={} sender_balance={}",
            params.gas,
            frame.exceptional(),
            self.ledger.balance(&params.sender_address),
        );
        Ok(!frame.exceptional())
    }

    fn create(
        &mut self, endowment: &U256, gas: &mut U256, init_code: Arc<Bytes>,
        on_step: OnStep,
    ) -> EngineResult<Option<Address>> {
        // The sender's nonce advances before anything else is attempted
        // and stays advanced whatever becomes of the creation.
        self.ledger.inc_nonce(&self.origin.address);
        let nonce = self.ledger.nonce(&self.origin.address) - U256::one();
        let address = contract_address(&self.origin.address, &nonce);
        debug!(
            "Context::create sender={:?} nonce={} address={:?} endowment={} \
             gas={}",
            self.origin.address, nonce, address, endowment, gas,
        );

        let action = ActionParams {
            code_address: address,
            address,
            sender: self.origin.address,
            origin: self.origin.origin,
            gas: *gas,
            gas_price: self.origin.gas_price,
            value: ActionValue::Transfer(*endowment),
            code: Some(init_code),
            data: None,
            call_type: CallType::None,
            on_step,
        };

        let mut frame = CallCreateFrame::new_create(
            action,
            self.env,
            self.machine,
            self.spec,
            self.depth + 1,
        );
        self.dispatch(&mut frame, true)?;

        *gas = frame.gas_left();
        Ok(frame.created_address())
    }

    fn log(&mut self, topics: Vec<H256>, data: &[u8]) {
        self.substate.logs.push(LogEntry {
            address: self.origin.address,
            topics,
            data: data.to_vec(),
        });
    }

    fn suicide(&mut self, refund_address: &Address) {
        let address = self.origin.address;
        let balance = self.ledger.balance(&address);
        if refund_address == &address {
            // Refund to self burns the balance with the account.
            self.ledger.sub_balance(&address, &balance);
        } else {
            trace!(
                "Context::suicide {:?} -> {:?} (xfer: {})",
                address,
                refund_address,
                balance
            );
            self.ledger
                .transfer_balance(&address, refund_address, &balance);
        }
        self.substate.suicides.insert(address);
    }

    fn add_sstore_refund(&mut self, value: usize) {
        self.substate.sstore_clears_refund += value as i128;
    }

    fn sub_sstore_refund(&mut self, value: usize) {
        self.substate.sstore_clears_refund -= value as i128;
    }

    fn spec(&self) -> &Spec { self.spec }

    fn env(&self) -> &Env { self.env }

    fn depth(&self) -> usize { self.depth }
}
