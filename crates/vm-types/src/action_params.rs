// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Engine input params.

use crate::{call_type::CallType, Bytes};
use ethereum_types::{Address, U256};
use std::{fmt, sync::Arc};

/// Per-step observability hook. Interpreters invoke it once per executed
/// step; the engine threads it through frames and across stack relocation
/// unmodified. It never alters control flow.
pub type OnStepFn = dyn Fn(&StepInfo) + Send + Sync;

/// Optional shared handle to a step hook.
pub type OnStep = Option<Arc<OnStepFn>>;

/// Frame context handed to the step hook.
#[derive(Clone, Debug)]
pub struct StepInfo {
    /// Nesting depth of the frame executing the step.
    pub depth: usize,
    /// Steps executed so far in this frame, starting at 0.
    pub steps: u64,
    /// Gas remaining before the step is charged.
    pub gas_left: U256,
}

/// Transaction value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionValue {
    /// Value that should be transferred
    Transfer(U256),
    /// Apparent value for transaction (not transferred)
    Apparent(U256),
}

impl ActionValue {
    /// Returns action value as U256.
    pub fn value(&self) -> U256 {
        match *self {
            ActionValue::Transfer(x) | ActionValue::Apparent(x) => x,
        }
    }

    /// Returns the transfer action value of the U256-convertible raw value
    pub fn transfer<T: Into<U256>>(transfer_value: T) -> ActionValue {
        ActionValue::Transfer(transfer_value.into())
    }

    /// Returns the apparent action value of the U256-convertible raw value
    pub fn apparent<T: Into<U256>>(apparent_value: T) -> ActionValue {
        ActionValue::Apparent(apparent_value.into())
    }
}

impl Default for ActionValue {
    fn default() -> ActionValue { ActionValue::Transfer(U256::zero()) }
}

/// Action (call/create) input params. Everything else the interpreter needs
/// comes through its [`Context`](crate::Context).
#[derive(Clone)]
pub struct ActionParams {
    /// Address of currently executed code.
    pub code_address: Address,
    /// Receive address. Usually equal to code_address,
    /// except when called using CALLCODE.
    pub address: Address,
    /// Sender of current part of the transaction.
    pub sender: Address,
    /// Transaction initiator.
    pub origin: Address,
    /// Gas paid up front for the whole action.
    pub gas: U256,
    /// Gas price.
    pub gas_price: U256,
    /// Transaction value.
    pub value: ActionValue,
    /// Code being executed.
    pub code: Option<Arc<Bytes>>,
    /// Input data.
    pub data: Option<Bytes>,
    /// Type of call
    pub call_type: CallType,
    /// Step hook, observational only.
    pub on_step: OnStep,
}

impl fmt::Debug for ActionParams {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ActionParams")
            .field("code_address", &self.code_address)
            .field("address", &self.address)
            .field("sender", &self.sender)
            .field("origin", &self.origin)
            .field("gas", &self.gas)
            .field("gas_price", &self.gas_price)
            .field("value", &self.value)
            .field("code", &self.code.as_ref().map(|c| c.len()))
            .field("data", &self.data.as_ref().map(|d| d.len()))
            .field("call_type", &self.call_type)
            .finish()
    }
}

impl Default for ActionParams {
    /// Returns default ActionParams initialized with zeros
    fn default() -> ActionParams {
        ActionParams {
            code_address: Address::zero(),
            address: Address::zero(),
            sender: Address::zero(),
            origin: Address::zero(),
            gas: U256::zero(),
            gas_price: U256::zero(),
            value: ActionValue::Transfer(U256::zero()),
            code: None,
            data: None,
            call_type: CallType::None,
            on_step: None,
        }
    }
}

/// Parameters of a nested message call, as assembled by the interpreter for
/// [`Context::call`](crate::Context::call). Passed by mutable reference: the
/// engine writes the child frame's final remaining gas back into `gas` on
/// every path, success or failure.
#[derive(Clone, Default)]
pub struct CallParameters {
    /// Address that sends the value.
    pub sender_address: Address,
    /// Address that receives the value and whose state is operated on.
    pub receive_address: Address,
    /// Address whose code is executed.
    pub code_address: Address,
    /// Transferred or apparent value.
    pub value: ActionValue,
    /// Gas budget in, remaining gas out.
    pub gas: U256,
    /// Gas price of the enclosing transaction.
    pub gas_price: U256,
    /// Input data.
    pub data: Option<Bytes>,
    /// Code to execute; looked up from the ledger by the interpreter.
    pub code: Option<Arc<Bytes>>,
    /// Type of call
    pub call_type: CallType,
    /// Step hook forwarded to the child frame.
    pub on_step: OnStep,
}
