// Copyright 2024 Kestrel Foundation. All rights reserved.
// Kestrel is free software and distributed under GNU General Public License.
// See http://www.gnu.org/licenses/

//! EVM call types.

/// The type of the call-like instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallType {
    /// Not a CALL.
    None,
    /// CALL.
    Call,
    /// CALLCODE.
    CallCode,
    /// DELEGATECALL.
    DelegateCall,
}

impl Default for CallType {
    fn default() -> CallType { CallType::None }
}
