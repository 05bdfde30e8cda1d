// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Execution side effects that cross frame boundaries by merge.

use ethereum_types::Address;
use kestrel_vm_types::LogEntry;
use std::collections::HashSet;

/// State changes which a frame accumulates besides its ledger writes.
/// A child frame's substate is accrued into its parent exactly once, and
/// only when the child halts without exception; an exceptional child's
/// substate is dropped with the frame.
#[derive(Debug, Default)]
pub struct Substate {
    /// Any accounts that have suicided.
    pub suicides: HashSet<Address>,
    /// Any logs.
    pub logs: Vec<LogEntry>,
    /// Refund counter of SSTORE.
    pub sstore_clears_refund: i128,
    /// Created contracts.
    pub contracts_created: Vec<Address>,
}

impl Substate {
    /// Creates new substate.
    pub fn new() -> Substate { Substate::default() }

    /// Merge secondary substate `s` into self, accruing each element
    /// correspondingly.
    pub fn accrue(&mut self, s: Substate) {
        self.suicides.extend(s.suicides);
        self.logs.extend(s.logs);
        self.sstore_clears_refund += s.sstore_clears_refund;
        self.contracts_created.extend(s.contracts_created);
    }
}

#[cfg(test)]
mod tests {
    use super::Substate;
    use ethereum_types::Address;
    use kestrel_vm_types::LogEntry;

    #[test]
    fn created() {
        let sub_state = Substate::new();
        assert_eq!(sub_state.suicides.len(), 0);
        assert_eq!(sub_state.sstore_clears_refund, 0);
    }

    #[test]
    fn accrue() {
        let mut sub_state = Substate::new();
        sub_state
            .contracts_created
            .push(Address::from_low_u64_be(1));
        sub_state.logs.push(LogEntry {
            address: Address::from_low_u64_be(1),
            topics: vec![],
            data: vec![],
        });
        sub_state.sstore_clears_refund = 15000 * 5;
        sub_state.suicides.insert(Address::from_low_u64_be(10));

        let mut sub_state_2 = Substate::new();
        sub_state_2
            .contracts_created
            .push(Address::from_low_u64_be(2));
        sub_state_2.logs.push(LogEntry {
            address: Address::from_low_u64_be(1),
            topics: vec![],
            data: vec![],
        });
        sub_state_2.sstore_clears_refund = 15000 * 7;

        sub_state.accrue(sub_state_2);
        assert_eq!(sub_state.contracts_created.len(), 2);
        assert_eq!(sub_state.logs.len(), 2);
        assert_eq!(sub_state.sstore_clears_refund, 15000 * 12);
        assert_eq!(sub_state.suicides.len(), 1);
    }
}
