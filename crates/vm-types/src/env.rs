// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! Environment information for transaction execution.

use ethereum_types::{Address, U256};

/// Information concerning the execution environment for a message-call or
/// contract-creation. Threaded through every frame unchanged.
#[derive(Debug, Clone, Default)]
pub struct Env {
    /// The block number.
    pub number: u64,
    /// The block author.
    pub author: Address,
    /// The block timestamp.
    pub timestamp: u64,
    /// The block difficulty.
    pub difficulty: U256,
    /// The block gas limit.
    pub gas_limit: U256,
    /// The gas used in the block prior to the transaction.
    pub gas_used: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_can_be_created_as_default() {
        let default_env = Env::default();

        assert_eq!(default_env.difficulty, 0.into());
    }
}
