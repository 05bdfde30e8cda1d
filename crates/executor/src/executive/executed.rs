// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

use ethereum_types::{Address, U256};
use kestrel_vm_types::{Bytes, Error as VmError, LogEntry};

/// Committed outcome of the outermost frame, as seen by the embedder.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    /// The fault that halted the chain, if any. `Reverted` when the
    /// outermost frame reverted; `None` when it completed and applied.
    pub exception: Option<VmError>,
    /// Gas remaining when the chain halted.
    pub gas_left: U256,
    /// Return data of the outermost frame.
    pub output: Bytes,
    /// Logs emitted by the committed parts of the chain.
    pub logs: Vec<LogEntry>,
    /// Addresses of contracts created by the committed parts of the chain.
    pub contracts_created: Vec<Address>,
}
