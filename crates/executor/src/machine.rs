// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Engine-wide configuration shared by every frame of an execution.

use crate::{builtin::Builtin, stack::StackBudget};
use ethereum_types::Address;
use kestrel_vm_types::{Spec, VmFactory};
use std::collections::BTreeMap;

/// Everything an execution consults that outlives a single frame: the cost
/// rule set, the stack budget, the builtin registry and the interpreter
/// factory. A `Machine` is constructed once per embedder and shared by
/// reference across frames, including frames run on a relocated stack.
pub struct Machine {
    spec: Spec,
    stack_budget: StackBudget,
    builtins: BTreeMap<Address, Builtin>,
    vm_factory: Box<dyn VmFactory>,
}

impl Machine {
    pub fn new(
        spec: Spec, stack_budget: StackBudget, vm_factory: Box<dyn VmFactory>,
    ) -> Machine {
        Machine {
            spec,
            stack_budget,
            builtins: BTreeMap::new(),
            vm_factory,
        }
    }

    /// Get a reference to the builtin at the given address, if any.
    pub fn builtin(&self, address: &Address) -> Option<&Builtin> {
        self.builtins.get(address)
    }

    /// Register `builtin` as the native contract at `address`.
    pub fn register_builtin(&mut self, address: Address, builtin: Builtin) {
        self.builtins.insert(address, builtin);
    }

    /// The cost rule set in force.
    pub fn spec(&self) -> Spec { self.spec.clone() }

    /// The stack budget governing frame placement.
    pub fn stack_budget(&self) -> &StackBudget { &self.stack_budget }

    /// The factory producing interpreter instances for frames with code.
    pub fn vm_factory(&self) -> &dyn VmFactory { &*self.vm_factory }
}
