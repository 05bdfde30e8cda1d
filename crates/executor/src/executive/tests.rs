// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

use super::*;
use crate::{
    ledger::{Ledger, MemoryLedger},
    machine::Machine,
    stack::StackBudget,
};
use ethereum_types::{Address, U256};
use kestrel_vm_types::{
    ActionParams, ActionValue, CallParameters, CallType,
    Context as ContextTrait, EngineResult, Env, Error as VmError, Exec,
    GasLeft, OnStep, OnStepFn, ReturnData, Result as VmResult, Spec,
    StepInfo, VmFactory,
};
use std::{
    panic::{self, AssertUnwindSafe},
    str::FromStr,
    sync::{Arc, Mutex},
    thread,
};

/// Halt, applying state.
const OP_STOP: u8 = 0x00;
/// Emit a log whose data is the frame depth, big endian.
const OP_LOG: u8 = 0x01;
/// Call self with the data counter decremented, forwarding all gas.
/// Does nothing once the counter reaches zero.
const OP_CALLSELF: u8 = 0x02;
/// Fault with out-of-gas.
const OP_FAIL: u8 = 0x03;
/// Revert, returning the rest of the script.
const OP_REVERT: u8 = 0x04;
/// Panic the interpreter.
const OP_PANIC: u8 = 0x05;
/// Create a contract: one endowment byte, the rest of the script is the
/// init code. Logs the new address when the creation succeeds.
const OP_CREATE: u8 = 0x06;
/// Return the rest of the script, applying state.
const OP_RETURN: u8 = 0x07;
/// Burn gas: one operand byte.
const OP_BURN: u8 = 0x08;
/// Call another account: 20 address bytes then 8 value bytes, forwarding
/// all gas and continuing whatever the child did.
const OP_CALLADDR: u8 = 0x09;
/// Fault with out-of-gas if the data counter is zero.
const OP_FAILLEAF: u8 = 0x0a;
/// Self-destruct, refunding to the frame's sender.
const OP_SUICIDE: u8 = 0x0b;

/// A tiny scripted interpreter. One byte per instruction, operands inline;
/// instructions are free so gas moves only where a script says so, which
/// keeps every balance and gas assertion exact.
struct ScriptExec {
    params: ActionParams,
    depth: usize,
    gas: U256,
    steps: u64,
}

impl ScriptExec {
    fn counter(&self) -> u16 {
        match &self.params.data {
            Some(data) if data.len() >= 2 => {
                u16::from_be_bytes([data[0], data[1]])
            }
            _ => 0,
        }
    }

    fn note_step(&mut self) {
        if let Some(hook) = &self.params.on_step {
            hook(&StepInfo {
                depth: self.depth,
                steps: self.steps,
                gas_left: self.gas,
            });
        }
        self.steps += 1;
    }
}

impl Exec for ScriptExec {
    fn exec(
        mut self: Box<Self>, context: &mut dyn ContextTrait,
    ) -> EngineResult<VmResult<GasLeft>> {
        let code = match self.params.code.clone() {
            Some(code) => code,
            None => return Ok(Ok(GasLeft::Known(self.gas))),
        };

        let mut pc = 0;
        while pc < code.len() {
            self.note_step();
            let op = code[pc];
            pc += 1;
            match op {
                OP_STOP => return Ok(Ok(GasLeft::Known(self.gas))),
                OP_LOG => {
                    let depth = (context.depth() as u16).to_be_bytes();
                    context.log(vec![], &depth);
                }
                OP_CALLSELF => {
                    let counter = self.counter();
                    if counter > 0 {
                        let mut call = CallParameters {
                            sender_address: self.params.address,
                            receive_address: self.params.address,
                            code_address: self.params.address,
                            value: ActionValue::Transfer(U256::zero()),
                            gas: self.gas,
                            gas_price: self.params.gas_price,
                            data: Some((counter - 1).to_be_bytes().to_vec()),
                            code: self.params.code.clone(),
                            call_type: CallType::Call,
                            on_step: self.params.on_step.clone(),
                        };
                        context.call(&mut call)?;
                        self.gas = call.gas;
                    }
                }
                OP_FAIL => return Ok(Err(VmError::OutOfGas)),
                OP_REVERT => {
                    let rest = code[pc..].to_vec();
                    let len = rest.len();
                    return Ok(Ok(GasLeft::NeedsReturn {
                        gas_left: self.gas,
                        data: ReturnData::new(rest, 0, len),
                        apply_state: false,
                    }));
                }
                OP_PANIC => panic!("interpreter defect"),
                OP_CREATE => {
                    let endowment = U256::from(code[pc]);
                    let init = code[pc + 1..].to_vec();
                    let mut gas = self.gas;
                    let created = context.create(
                        &endowment,
                        &mut gas,
                        Arc::new(init),
                        self.params.on_step.clone(),
                    )?;
                    self.gas = gas;
                    if let Some(address) = created {
                        context.log(vec![], address.as_bytes());
                    }
                    return Ok(Ok(GasLeft::Known(self.gas)));
                }
                OP_RETURN => {
                    let rest = code[pc..].to_vec();
                    let len = rest.len();
                    return Ok(Ok(GasLeft::NeedsReturn {
                        gas_left: self.gas,
                        data: ReturnData::new(rest, 0, len),
                        apply_state: true,
                    }));
                }
                OP_BURN => {
                    let amount = U256::from(code[pc]);
                    pc += 1;
                    if amount > self.gas {
                        return Ok(Err(VmError::OutOfGas));
                    }
                    self.gas = self.gas - amount;
                }
                OP_CALLADDR => {
                    let address = Address::from_slice(&code[pc..pc + 20]);
                    let value = u64::from_be_bytes(
                        code[pc + 20..pc + 28].try_into().unwrap(),
                    );
                    pc += 28;
                    let mut call = CallParameters {
                        sender_address: self.params.address,
                        receive_address: address,
                        code_address: address,
                        value: ActionValue::Transfer(value.into()),
                        gas: self.gas,
                        gas_price: self.params.gas_price,
                        data: None,
                        code: context.extcode(&address),
                        call_type: CallType::Call,
                        on_step: self.params.on_step.clone(),
                    };
                    context.call(&mut call)?;
                    self.gas = call.gas;
                }
                OP_FAILLEAF => {
                    if self.counter() == 0 {
                        return Ok(Err(VmError::OutOfGas));
                    }
                }
                OP_SUICIDE => {
                    let sender = self.params.sender;
                    context.suicide(&sender);
                }
                _ => {
                    return Ok(Err(VmError::BadInstruction { instruction: op }))
                }
            }
        }
        Ok(Ok(GasLeft::Known(self.gas)))
    }
}

struct ScriptFactory;

impl VmFactory for ScriptFactory {
    fn create(
        &self, params: ActionParams, _spec: &Spec, depth: usize,
    ) -> Box<dyn Exec> {
        Box::new(ScriptExec {
            gas: params.gas,
            params,
            depth,
            steps: 0,
        })
    }
}

fn make_machine(budget: StackBudget) -> Machine {
    Machine::new(Spec::default(), budget, Box::new(ScriptFactory))
}

fn deploy(ledger: &mut MemoryLedger, address: Address, script: Vec<u8>) {
    ledger.new_contract(&address, U256::zero(), U256::zero());
    ledger.init_code(&address, script);
}

fn sender() -> Address { Address::from_low_u64_be(1) }

fn call_params(contract: Address, script: Vec<u8>, gas: u64) -> ActionParams {
    ActionParams {
        code_address: contract,
        address: contract,
        sender: sender(),
        origin: sender(),
        gas: gas.into(),
        code: Some(Arc::new(script)),
        call_type: CallType::Call,
        ..Default::default()
    }
}

/// Run a self-calling script chain seeded with `counter` as the recursion
/// countdown, against a fresh ledger.
fn run_chain(
    budget: StackBudget, script: Vec<u8>, counter: u16, gas: u64,
    on_step: OnStep,
) -> (Executed, MemoryLedger) {
    let machine = make_machine(budget);
    let spec = machine.spec();
    let env = Env::default();
    let mut ledger = MemoryLedger::new();
    let contract = Address::from_low_u64_be(0xc0);
    deploy(&mut ledger, contract, script.clone());

    let mut params = call_params(contract, script, gas);
    params.data = Some(counter.to_be_bytes().to_vec());
    params.on_step = on_step;

    let executed = Executive::new(&mut ledger, &env, &machine, &spec)
        .call(params)
        .unwrap();
    (executed, ledger)
}

fn logged_depths(executed: &Executed) -> Vec<u16> {
    let mut depths: Vec<u16> = executed
        .logs
        .iter()
        .map(|log| u16::from_be_bytes([log.data[0], log.data[1]]))
        .collect();
    depths.sort_unstable();
    depths
}

#[test]
fn test_contract_address() {
    let sender =
        Address::from_str("0f572e5295c57f15886f9b263e2f6d2d6c7b5ec6").unwrap();
    assert_eq!(
        contract_address(&sender, &U256::from(88)),
        Address::from_str("3f09c73a5ed19289fb9bdc72f1742566df146f56").unwrap(),
    );

    let sender =
        Address::from_str("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
    assert_eq!(
        contract_address(&sender, &U256::zero()),
        Address::from_str("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d").unwrap(),
    );
    assert_eq!(
        contract_address(&sender, &U256::one()),
        Address::from_str("343c43a37d37dff08ae8c4a11544c718abb4fcf8").unwrap(),
    );
}

#[test]
fn recursion_relocates_exactly_once() {
    // Offloads at depth 4.
    let budget = StackBudget::new(64 * 1024, 256 * 1024, 0);
    let seen: Arc<Mutex<Vec<(usize, thread::ThreadId)>>> =
        Arc::new(Mutex::new(Vec::new()));
    let hook: Arc<OnStepFn> = {
        let seen = seen.clone();
        Arc::new(move |info: &StepInfo| {
            seen.lock()
                .unwrap()
                .push((info.depth, thread::current().id()));
        })
    };

    let (executed, _) = run_chain(
        budget,
        vec![OP_CALLSELF, OP_STOP],
        8,
        1_000_000,
        Some(hook),
    );
    assert_eq!(executed.exception, None);
    assert_eq!(executed.gas_left, U256::from(1_000_000));

    let seen = seen.lock().unwrap();
    let entry = thread::current().id();
    let mut offloaded = None;
    assert!(seen.iter().any(|(depth, _)| *depth == 8));
    for (depth, ran_on) in seen.iter() {
        if *depth < 4 {
            assert_eq!(*ran_on, entry, "depth {} belongs inline", depth);
        } else {
            assert_ne!(*ran_on, entry, "depth {} belongs offloaded", depth);
            // Every offloaded frame shares the one dedicated thread.
            assert_eq!(*offloaded.get_or_insert(*ran_on), *ran_on);
        }
    }
}

#[test]
fn chain_that_never_reaches_the_offload_depth_stays_inline() {
    let budget = StackBudget::new(64 * 1024, 256 * 1024, 0);
    let seen: Arc<Mutex<Vec<(usize, thread::ThreadId)>>> =
        Arc::new(Mutex::new(Vec::new()));
    let hook: Arc<OnStepFn> = {
        let seen = seen.clone();
        Arc::new(move |info: &StepInfo| {
            seen.lock()
                .unwrap()
                .push((info.depth, thread::current().id()));
        })
    };

    let (executed, _) = run_chain(
        budget,
        vec![OP_CALLSELF, OP_STOP],
        3,
        1_000_000,
        Some(hook),
    );
    assert_eq!(executed.exception, None);

    let entry = thread::current().id();
    let seen = seen.lock().unwrap();
    assert!(seen.iter().any(|(depth, _)| *depth == 3));
    assert!(seen.iter().all(|(_, ran_on)| *ran_on == entry));
}

#[test]
fn depth_limit_bounds_a_runaway_recursion() {
    // Offloads at depth 16; the dedicated stack must carry the rest of
    // the chain to the depth limit.
    let budget = StackBudget::new(64 * 1024, 1024 * 1024, 0);
    let (executed, ledger) = run_chain(
        budget,
        vec![OP_CALLSELF, OP_LOG, OP_STOP],
        2000,
        5_000_000,
        None,
    );

    // The refused frame at the limit cost its caller nothing.
    assert_eq!(executed.exception, None);
    assert_eq!(executed.gas_left, U256::from(5_000_000));

    // Exactly the frames at depths 0..=1023 ran and committed.
    let depths = logged_depths(&executed);
    assert_eq!(depths.len(), 1024);
    assert_eq!(depths.first(), Some(&0));
    assert_eq!(depths.last(), Some(&1023));
    assert!(depths.windows(2).all(|w| w[0] + 1 == w[1]));
    assert_eq!(ledger.checkpoint_depth(), 0);
}

#[test]
fn faults_are_identical_with_and_without_relocation() {
    let script = vec![OP_FAILLEAF, OP_CALLSELF, OP_LOG, OP_STOP];

    // Offload depth 128: the whole chain stays inline.
    let inline_budget = StackBudget::new(64 * 1024, 8 * 1024 * 1024, 0);
    // Offload depth 2: the chain crosses onto a dedicated stack.
    let offload_budget = StackBudget::new(64 * 1024, 128 * 1024, 0);

    let (inline, _) =
        run_chain(inline_budget, script.clone(), 6, 90_000, None);
    let (offloaded, _) = run_chain(offload_budget, script, 6, 90_000, None);

    assert_eq!(inline, offloaded);

    // The leaf faulted and burned the forwarded gas; every surviving
    // frame still committed its log.
    assert_eq!(inline.exception, None);
    assert_eq!(inline.gas_left, U256::zero());
    assert_eq!(logged_depths(&inline), vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn panic_payload_crosses_relocation_intact() {
    // Offload depth 2, panic at depth 3 on the dedicated stack.
    let offload_budget = StackBudget::new(64 * 1024, 128 * 1024, 0);
    let inline_budget = StackBudget::new(64 * 1024, 8 * 1024 * 1024, 0);

    for budget in [offload_budget, inline_budget] {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            run_chain(budget, vec![OP_CALLSELF, OP_PANIC], 3, 10_000, None)
        }));
        let payload = result.unwrap_err();
        assert_eq!(
            payload.downcast_ref::<&str>(),
            Some(&"interpreter defect")
        );
    }
}

#[test]
fn remaining_gas_flows_back_through_every_frame() {
    let machine = make_machine(StackBudget::default());
    let spec = machine.spec();
    let env = Env::default();
    let mut ledger = MemoryLedger::new();

    let callee = Address::from_low_u64_be(0xca);
    deploy(&mut ledger, callee, vec![OP_BURN, 42, OP_STOP]);

    let caller = Address::from_low_u64_be(0xc0);
    let mut script = vec![OP_CALLADDR];
    script.extend_from_slice(callee.as_bytes());
    script.extend_from_slice(&0u64.to_be_bytes());
    script.extend_from_slice(&[OP_BURN, 7, OP_STOP]);
    deploy(&mut ledger, caller, script.clone());

    let executed = Executive::new(&mut ledger, &env, &machine, &spec)
        .call(call_params(caller, script, 1_000))
        .unwrap();

    assert_eq!(executed.exception, None);
    assert_eq!(executed.gas_left, U256::from(1_000 - 42 - 7));
}

#[test]
fn value_transfer_moves_the_exact_amount() {
    let machine = make_machine(StackBudget::default());
    let spec = machine.spec();
    let env = Env::default();
    let mut ledger = MemoryLedger::new();

    let endowment = U256::from(0x6f05b59d3b20000u64);
    ledger.add_balance(&sender(), &endowment);
    let receiver = Address::from_low_u64_be(0xbb);

    let params = ActionParams {
        address: receiver,
        code_address: receiver,
        sender: sender(),
        origin: sender(),
        gas: 100_000.into(),
        value: ActionValue::Transfer(endowment),
        ..Default::default()
    };
    let executed = Executive::new(&mut ledger, &env, &machine, &spec)
        .call(params)
        .unwrap();

    assert_eq!(executed.exception, None);
    // A plain transfer completes with its budget untouched.
    assert_eq!(executed.gas_left, U256::from(100_000));
    assert_eq!(ledger.balance(&sender()), U256::zero());
    assert_eq!(ledger.balance(&receiver), endowment);
}

#[test]
fn create_advances_the_nonce_exactly_once_per_attempt() {
    let machine = make_machine(StackBudget::default());
    let spec = machine.spec();
    let env = Env::default();

    let create_params = |init: Vec<u8>| ActionParams {
        sender: sender(),
        origin: sender(),
        gas: 100_000.into(),
        code: Some(Arc::new(init)),
        ..Default::default()
    };

    // Successful creation deposits the returned code.
    let mut ledger = MemoryLedger::new();
    let executed = Executive::new(&mut ledger, &env, &machine, &spec)
        .create(create_params(vec![OP_RETURN, 0xaa, 0xbb]))
        .unwrap();
    let expected = contract_address(&sender(), &U256::zero());
    assert_eq!(executed.exception, None);
    assert_eq!(executed.contracts_created, vec![expected]);
    assert_eq!(ledger.nonce(&sender()), U256::one());
    assert_eq!(
        ledger.code(&expected).as_deref(),
        Some(&vec![0xaa_u8, 0xbb])
    );

    // A second attempt bumps the nonce again and lands elsewhere.
    let executed = Executive::new(&mut ledger, &env, &machine, &spec)
        .create(create_params(vec![OP_RETURN]))
        .unwrap();
    assert_eq!(ledger.nonce(&sender()), U256::from(2));
    assert_eq!(
        executed.contracts_created,
        vec![contract_address(&sender(), &U256::one())]
    );

    // A faulted creation leaves no contract, but the nonce stands.
    let mut ledger = MemoryLedger::new();
    let executed = Executive::new(&mut ledger, &env, &machine, &spec)
        .create(create_params(vec![OP_FAIL]))
        .unwrap();
    assert_eq!(executed.exception, Some(VmError::OutOfGas));
    assert_eq!(executed.contracts_created, vec![]);
    assert_eq!(ledger.nonce(&sender()), U256::one());
    assert!(!ledger.exists(&expected));

    // So does a reverted one, which additionally keeps its gas.
    let mut ledger = MemoryLedger::new();
    let executed = Executive::new(&mut ledger, &env, &machine, &spec)
        .create(create_params(vec![OP_REVERT]))
        .unwrap();
    assert_eq!(executed.exception, Some(VmError::Reverted));
    assert_eq!(executed.gas_left, U256::from(100_000));
    assert_eq!(executed.contracts_created, vec![]);
    assert_eq!(ledger.nonce(&sender()), U256::one());
    assert!(!ledger.exists(&expected));
}

#[test]
fn nested_create_bumps_the_creators_nonce_on_every_outcome() {
    let machine = make_machine(StackBudget::default());
    let spec = machine.spec();
    let env = Env::default();
    let creator = Address::from_low_u64_be(0xc0);

    // Init code faults: nonce advanced, nothing deployed.
    let mut ledger = MemoryLedger::new();
    let script = vec![OP_CREATE, 0x00, OP_FAIL];
    deploy(&mut ledger, creator, script.clone());
    let executed = Executive::new(&mut ledger, &env, &machine, &spec)
        .call(call_params(creator, script, 100_000))
        .unwrap();
    assert_eq!(executed.exception, None);
    assert_eq!(executed.contracts_created, vec![]);
    assert_eq!(executed.logs, vec![]);
    assert_eq!(ledger.nonce(&creator), U256::one());

    // Init code returns: nonce advanced, child deployed with endowment.
    let mut ledger = MemoryLedger::new();
    let script = vec![OP_CREATE, 0x05, OP_RETURN];
    deploy(&mut ledger, creator, script.clone());
    ledger.add_balance(&creator, &U256::from(100));
    let executed = Executive::new(&mut ledger, &env, &machine, &spec)
        .call(call_params(creator, script, 100_000))
        .unwrap();

    let child = contract_address(&creator, &U256::zero());
    assert_eq!(executed.exception, None);
    assert_eq!(executed.contracts_created, vec![child]);
    assert_eq!(executed.logs.len(), 1);
    assert_eq!(executed.logs[0].data, child.as_bytes().to_vec());
    assert_eq!(ledger.nonce(&creator), U256::one());
    assert_eq!(ledger.balance(&child), 5.into());
    assert_eq!(ledger.balance(&creator), 95.into());
}

#[test]
fn child_substate_merges_only_when_it_commits() {
    let machine = make_machine(StackBudget::default());
    let spec = machine.spec();
    let env = Env::default();
    let caller = Address::from_low_u64_be(0xc0);

    let parent_script = |callee: Address| {
        let mut script = vec![OP_CALLADDR];
        script.extend_from_slice(callee.as_bytes());
        script.extend_from_slice(&0u64.to_be_bytes());
        script.extend_from_slice(&[OP_LOG, OP_STOP]);
        script
    };

    // Faulting child: its log and suicide vanish with the frame.
    let mut ledger = MemoryLedger::new();
    let callee = Address::from_low_u64_be(0xca);
    deploy(&mut ledger, callee, vec![OP_LOG, OP_SUICIDE, OP_FAIL]);
    let script = parent_script(callee);
    deploy(&mut ledger, caller, script.clone());
    let executed = Executive::new(&mut ledger, &env, &machine, &spec)
        .call(call_params(caller, script, 100_000))
        .unwrap();

    assert_eq!(executed.exception, None);
    assert_eq!(logged_depths(&executed), vec![0]);
    assert!(ledger.exists(&callee));
    assert!(ledger.code(&callee).is_some());

    // Committing child: both logs survive and the suicide is enacted.
    let mut ledger = MemoryLedger::new();
    deploy(&mut ledger, callee, vec![OP_LOG, OP_SUICIDE, OP_STOP]);
    let script = parent_script(callee);
    deploy(&mut ledger, caller, script.clone());
    let executed = Executive::new(&mut ledger, &env, &machine, &spec)
        .call(call_params(caller, script, 100_000))
        .unwrap();

    assert_eq!(executed.exception, None);
    assert_eq!(logged_depths(&executed), vec![0, 1]);
    assert!(!ledger.exists(&callee));
}

#[test]
fn reverted_root_reports_its_output_and_keeps_gas() {
    let machine = make_machine(StackBudget::default());
    let spec = machine.spec();
    let env = Env::default();
    let mut ledger = MemoryLedger::new();

    let contract = Address::from_low_u64_be(0xc0);
    let script = vec![OP_LOG, OP_REVERT, 0xde, 0xad];
    deploy(&mut ledger, contract, script.clone());

    let executed = Executive::new(&mut ledger, &env, &machine, &spec)
        .call(call_params(contract, script, 70_000))
        .unwrap();

    assert_eq!(executed.exception, Some(VmError::Reverted));
    assert_eq!(executed.gas_left, U256::from(70_000));
    assert_eq!(executed.output, vec![0xde, 0xad]);
    // The reverted frame's log was discarded with its substate.
    assert_eq!(executed.logs, vec![]);
    assert_eq!(ledger.checkpoint_depth(), 0);
}
