// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! World-state interface for the execution engine, with checkpoint
//! semantics matching frame boundaries.

use ethereum_types::{Address, U256};
use kestrel_vm_types::Bytes;
use std::{collections::HashMap, sync::Arc};

/// Account ledger backing execution. Each frame opens a checkpoint before
/// touching the ledger and either discards it (changes kept) or reverts to
/// it (changes undone) when the frame halts. Checkpoints nest with frames,
/// so implementations must maintain them as a stack.
///
/// The trait is `Send` because a frame may run on a relocated stack.
pub trait Ledger: Send {
    /// Balance of account `a`, zero for non-existent accounts.
    fn balance(&self, a: &Address) -> U256;

    /// Nonce of account `a`, zero for non-existent accounts.
    fn nonce(&self, a: &Address) -> U256;

    /// Increment the nonce of account `a` by one, creating the account
    /// if it does not exist.
    fn inc_nonce(&mut self, a: &Address);

    /// Code of account `a`, if any.
    fn code(&self, a: &Address) -> Option<Arc<Bytes>>;

    /// Whether account `a` exists.
    fn exists(&self, a: &Address) -> bool;

    /// Add `by` to the balance of account `a`, creating it if necessary.
    fn add_balance(&mut self, a: &Address, by: &U256);

    /// Subtract `by` from the balance of account `a`. The caller checks
    /// solvency first; implementations may panic on underflow.
    fn sub_balance(&mut self, a: &Address, by: &U256);

    /// Move `by` from account `from` to account `to`, creating `to` if
    /// necessary.
    fn transfer_balance(&mut self, from: &Address, to: &Address, by: &U256) {
        self.sub_balance(from, by);
        self.add_balance(to, by);
    }

    /// Create a contract account at `a` with the given balance and nonce,
    /// replacing whatever basic account was there.
    fn new_contract(&mut self, a: &Address, balance: U256, nonce: U256);

    /// Store `code` as the code of account `a`.
    fn init_code(&mut self, a: &Address, code: Bytes);

    /// Remove account `a` entirely.
    fn kill_account(&mut self, a: &Address);

    /// Open a new checkpoint on top of the stack.
    fn checkpoint(&mut self);

    /// Merge the latest checkpoint into the one below, keeping changes.
    fn discard_checkpoint(&mut self);

    /// Undo all changes since the latest checkpoint and pop it.
    fn revert_to_checkpoint(&mut self);
}

#[derive(Debug, Clone, Default)]
struct Account {
    balance: U256,
    nonce: U256,
    code: Option<Arc<Bytes>>,
}

/// In-memory [`Ledger`] keeping full account snapshots per checkpoint.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: HashMap<Address, Account>,
    checkpoints: Vec<HashMap<Address, Account>>,
}

impl MemoryLedger {
    pub fn new() -> Self { Default::default() }

    /// Number of open checkpoints. Balanced execution leaves zero.
    pub fn checkpoint_depth(&self) -> usize { self.checkpoints.len() }

    fn account_mut(&mut self, a: &Address) -> &mut Account {
        self.accounts.entry(*a).or_default()
    }
}

impl Ledger for MemoryLedger {
    fn balance(&self, a: &Address) -> U256 {
        self.accounts
            .get(a)
            .map_or_else(U256::zero, |acc| acc.balance)
    }

    fn nonce(&self, a: &Address) -> U256 {
        self.accounts
            .get(a)
            .map_or_else(U256::zero, |acc| acc.nonce)
    }

    fn inc_nonce(&mut self, a: &Address) {
        let account = self.account_mut(a);
        account.nonce = account.nonce + U256::one();
    }

    fn code(&self, a: &Address) -> Option<Arc<Bytes>> {
        self.accounts.get(a).and_then(|acc| acc.code.clone())
    }

    fn exists(&self, a: &Address) -> bool { self.accounts.contains_key(a) }

    fn add_balance(&mut self, a: &Address, by: &U256) {
        let account = self.account_mut(a);
        account.balance = account.balance + *by;
    }

    fn sub_balance(&mut self, a: &Address, by: &U256) {
        let account = self.account_mut(a);
        account.balance = account.balance - *by;
    }

    fn new_contract(&mut self, a: &Address, balance: U256, nonce: U256) {
        self.accounts.insert(
            *a,
            Account {
                balance,
                nonce,
                code: None,
            },
        );
    }

    fn init_code(&mut self, a: &Address, code: Bytes) {
        self.account_mut(a).code = Some(Arc::new(code));
    }

    fn kill_account(&mut self, a: &Address) { self.accounts.remove(a); }

    fn checkpoint(&mut self) { self.checkpoints.push(self.accounts.clone()); }

    fn discard_checkpoint(&mut self) {
        self.checkpoints.pop();
    }

    fn revert_to_checkpoint(&mut self) {
        if let Some(snapshot) = self.checkpoints.pop() {
            self.accounts = snapshot;
        }
    }
}
