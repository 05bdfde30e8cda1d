//! A single call or creation frame and its halting state machine.

use crate::{
    context::{Context, OriginInfo},
    ledger::Ledger,
    machine::Machine,
    substate::Substate,
};
use ethereum_types::{Address, U256};
use kestrel_vm_types::{
    self as vm, ActionParams, ActionValue, EngineResult, Env,
    FinalizationResult, GasLeft, ReturnData, Spec,
};
use std::mem;

/// The terminal outcome of one frame.
pub type FrameResult = vm::Result<FinalizationResult>;

/// What [`CallCreateFrame::begin_call`] and [`begin_create`] left behind.
///
/// [`begin_create`]: CallCreateFrame::begin_create
#[derive(Debug, PartialEq)]
pub enum BeginOutcome {
    /// The frame halted during activation; no interpreter is needed.
    Completed,
    /// The frame holds interpreter work. Drive it with
    /// [`CallCreateFrame::run`], placed via [`super::place`].
    NeedsRun,
}

enum FrameStatus {
    Created(ActionParams),
    Initiated(ActionParams),
    Running,
    Halted,
}

/// One level of the message-call chain.
///
/// A frame is constructed around its action parameters, activated exactly
/// once with `begin_call` or `begin_create`, possibly driven with `run`,
/// and then halts. Activation performs everything that must happen before
/// code runs: the depth check, the checkpoint, the value transfer and the
/// builtin fast path. Whatever the path, a halted frame reports its
/// remaining gas, whether it was exceptional, and its accumulated substate.
pub struct CallCreateFrame<'a> {
    status: FrameStatus,
    env: &'a Env,
    machine: &'a Machine,
    spec: &'a Spec,
    depth: usize,
    origin: OriginInfo,
    create_address: Option<Address>,
    substate: Substate,
    gas_left: U256,
    outcome: Option<FrameResult>,
}

impl<'a> CallCreateFrame<'a> {
    pub fn new_call(
        params: ActionParams, env: &'a Env, machine: &'a Machine,
        spec: &'a Spec, depth: usize,
    ) -> Self {
        trace!("Frame::call(params={:?}) depth={}", params, depth);
        CallCreateFrame {
            origin: OriginInfo::from(&params),
            status: FrameStatus::Created(params),
            env,
            machine,
            spec,
            depth,
            create_address: None,
            substate: Substate::new(),
            gas_left: U256::zero(),
            outcome: None,
        }
    }

    pub fn new_create(
        params: ActionParams, env: &'a Env, machine: &'a Machine,
        spec: &'a Spec, depth: usize,
    ) -> Self {
        trace!("Frame::create(params={:?}) depth={}", params, depth);
        CallCreateFrame {
            origin: OriginInfo::from(&params),
            create_address: Some(params.address),
            status: FrameStatus::Created(params),
            env,
            machine,
            spec,
            depth,
            substate: Substate::new(),
            gas_left: U256::zero(),
            outcome: None,
        }
    }

    /// Activate a call frame. Returns whether interpreter work remains.
    pub fn begin_call<L: Ledger>(&mut self, ledger: &mut L) -> BeginOutcome {
        let params = match mem::replace(&mut self.status, FrameStatus::Running)
        {
            FrameStatus::Created(params) => params,
            _ => panic!("Status should be Created"),
        };

        // A frame past the depth limit halts before any side effect, so
        // the check precedes the checkpoint. The caller keeps its budget.
        if self.depth >= self.spec.max_depth {
            self.halt(Err(vm::Error::ExceedsCallDepth), params.gas);
            return BeginOutcome::Completed;
        }

        ledger.checkpoint();

        let balance = ledger.balance(&params.sender);
        if let ActionValue::Transfer(val) = params.value {
            if balance < val {
                ledger.revert_to_checkpoint();
                self.halt(
                    Err(vm::Error::NotEnoughCash {
                        required: val,
                        got: balance,
                    }),
                    params.gas,
                );
                return BeginOutcome::Completed;
            }
            ledger.transfer_balance(&params.sender, &params.address, &val);
        }

        if let Some(builtin) = self.machine.builtin(&params.code_address) {
            let result = Self::run_builtin(builtin, &params, ledger);
            let gas_left = match &result {
                Ok(r) => r.gas_left,
                Err(_) => U256::zero(),
            };
            self.halt(result, gas_left);
            return BeginOutcome::Completed;
        }

        match params.code {
            Some(_) => {
                self.status = FrameStatus::Initiated(params);
                BeginOutcome::NeedsRun
            }
            None => {
                // Plain transfer. The full budget survives.
                ledger.discard_checkpoint();
                let gas_left = params.gas;
                self.halt(
                    Ok(FinalizationResult {
                        gas_left,
                        apply_state: true,
                        return_data: ReturnData::empty(),
                    }),
                    gas_left,
                );
                BeginOutcome::Completed
            }
        }
    }

    /// Activate a creation frame. Returns whether interpreter work remains.
    pub fn begin_create<L: Ledger>(&mut self, ledger: &mut L) -> BeginOutcome {
        let params = match mem::replace(&mut self.status, FrameStatus::Running)
        {
            FrameStatus::Created(params) => params,
            _ => panic!("Status should be Created"),
        };

        if self.depth >= self.spec.max_depth {
            self.halt(Err(vm::Error::ExceedsCallDepth), params.gas);
            return BeginOutcome::Completed;
        }

        ledger.checkpoint();

        let val = params.value.value();
        let balance = ledger.balance(&params.sender);
        if balance < val {
            ledger.revert_to_checkpoint();
            self.halt(
                Err(vm::Error::NotEnoughCash {
                    required: val,
                    got: balance,
                }),
                params.gas,
            );
            return BeginOutcome::Completed;
        }

        // The nascent contract absorbs any balance already at the address.
        let prev_balance = ledger.balance(&params.address);
        ledger.sub_balance(&params.sender, &val);
        ledger.new_contract(
            &params.address,
            val.saturating_add(prev_balance),
            U256::zero(),
        );

        self.status = FrameStatus::Initiated(params);
        BeginOutcome::NeedsRun
    }

    /// Drive the frame's interpreter to a terminal state. Must be placed
    /// on a suitable stack by the caller; see [`super::place`].
    pub fn run<L: Ledger>(&mut self, ledger: &mut L) -> EngineResult<()> {
        let params = match mem::replace(&mut self.status, FrameStatus::Running)
        {
            FrameStatus::Initiated(params) => params,
            _ => panic!("Status should be Initiated"),
        };
        debug!(
            "Frame::run depth={} create={} gas={}",
            self.depth,
            self.create_address.is_some(),
            params.gas
        );

        let exec =
            self.machine
                .vm_factory()
                .create(params, self.spec, self.depth);
        let result = {
            let mut context = Context::new(
                ledger,
                self.env,
                self.machine,
                self.spec,
                self.depth,
                &self.origin,
                &mut self.substate,
            );
            exec.exec(&mut context)?
        };

        let result = self.finalize(ledger, result);
        self.process_return(ledger, result);
        Ok(())
    }

    /// The builtin fast path: price, execute natively, halt in place.
    fn run_builtin<L: Ledger>(
        builtin: &crate::builtin::Builtin, params: &ActionParams,
        ledger: &mut L,
    ) -> FrameResult {
        let data = params.data.as_deref().unwrap_or_default();
        let cost = builtin.cost(data);
        if cost > params.gas {
            ledger.revert_to_checkpoint();
            return Err(vm::Error::OutOfGas);
        }

        let mut output = Vec::new();
        match builtin.execute(data, &mut output) {
            Ok(()) => {
                ledger.discard_checkpoint();
                let out_len = output.len();
                Ok(FinalizationResult {
                    gas_left: params.gas - cost,
                    apply_state: true,
                    return_data: ReturnData::new(output, 0, out_len),
                })
            }
            Err(e) => {
                ledger.revert_to_checkpoint();
                Err(e.into())
            }
        }
    }

    /// Turn the interpreter's result into the frame result, charging and
    /// storing the deposited code for successful creations.
    fn finalize<L: Ledger>(
        &self, ledger: &mut L, result: vm::Result<GasLeft>,
    ) -> FrameResult {
        match result {
            Ok(GasLeft::Known(gas_left)) => Ok(FinalizationResult {
                gas_left,
                apply_state: true,
                return_data: ReturnData::empty(),
            }),
            Ok(GasLeft::NeedsReturn {
                gas_left,
                data,
                apply_state,
            }) => match self.create_address {
                Some(ref address) if apply_state => {
                    let return_cost = U256::from(data.len())
                        * U256::from(self.spec.create_data_gas);
                    if return_cost > gas_left
                        || data.len() > self.spec.create_data_limit
                    {
                        Err(vm::Error::OutOfGas)
                    } else {
                        ledger.init_code(address, data.to_vec());
                        Ok(FinalizationResult {
                            gas_left: gas_left - return_cost,
                            apply_state: true,
                            return_data: data,
                        })
                    }
                }
                _ => Ok(FinalizationResult {
                    gas_left,
                    apply_state,
                    return_data: data,
                }),
            },
            Err(e) => Err(e),
        }
    }

    /// Close the frame's checkpoint according to the result and halt.
    /// Only a completed, applying frame keeps its ledger writes; reverted
    /// and faulted frames lose theirs, keeping gas as the result says.
    fn process_return<L: Ledger>(&mut self, ledger: &mut L, result: FrameResult) {
        let apply_state = matches!(&result, Ok(r) if r.apply_state);
        if apply_state {
            if let Some(address) = self.create_address {
                self.substate.contracts_created.push(address);
            }
            ledger.discard_checkpoint();
        } else {
            ledger.revert_to_checkpoint();
        }

        let gas_left = match &result {
            Ok(r) => r.gas_left,
            Err(_) => U256::zero(),
        };
        self.halt(result, gas_left);
    }

    fn halt(&mut self, result: FrameResult, gas_left: U256) {
        self.gas_left = gas_left;
        self.status = FrameStatus::Halted;
        self.outcome = Some(result);
    }

    /// Remaining gas to hand back to the caller. Meaningful once halted.
    pub fn gas_left(&self) -> U256 { self.gas_left }

    /// Whether the frame halted without its changes surviving. Reverted
    /// and faulted frames are both exceptional; only a frame that completed
    /// with `apply_state` is not.
    pub fn exceptional(&self) -> bool {
        !matches!(&self.outcome, Some(Ok(r)) if r.apply_state)
    }

    /// The deployed contract address, for a creation frame that succeeded.
    pub fn created_address(&self) -> Option<Address> {
        if self.exceptional() {
            None
        } else {
            self.create_address
        }
    }

    /// Merge accumulated side effects into the parent substate. Exceptional
    /// frames merge nothing; their side effects die with the frame.
    pub fn merge_into(&mut self, parent: &mut Substate) {
        if !self.exceptional() {
            parent.accrue(mem::take(&mut self.substate));
        }
    }

    /// Consume the halted frame, yielding its result.
    pub fn into_result(self) -> FrameResult {
        match self.outcome {
            Some(result) => result,
            None => panic!("Status should be Halted"),
        }
    }
}
