//! Native contracts executed by the dispatcher itself. A call that
//! resolves to a builtin completes within the caller's frame, without
//! instantiating an interpreter.

use ethereum_types::U256;

/// Execution error from a native implementation. Errors surface to the
/// calling frame as [`kestrel_vm_types::Error::BuiltIn`].
#[derive(Debug)]
pub struct Error(pub &'static str);

impl From<&'static str> for Error {
    fn from(val: &'static str) -> Self { Error(val) }
}

impl From<Error> for kestrel_vm_types::Error {
    fn from(val: Error) -> Self { kestrel_vm_types::Error::BuiltIn(val.0) }
}

/// Native implementation of a builtin contract.
pub trait Impl: Send + Sync {
    /// Execute with the given input, writing output into `output`.
    fn execute(&self, input: &[u8], output: &mut Vec<u8>) -> Result<(), Error>;
}

/// Gas pricing scheme of a builtin contract.
pub trait Pricer: Send + Sync {
    /// Gas cost of executing on `input`.
    fn cost(&self, input: &[u8]) -> U256;
}

/// A linear pricing model: `base + word * ceil(len / 32)`.
pub struct Linear {
    base: usize,
    word: usize,
}

impl Linear {
    pub fn new(base: usize, word: usize) -> Self { Linear { base, word } }
}

impl Pricer for Linear {
    fn cost(&self, input: &[u8]) -> U256 {
        U256::from(self.base)
            + U256::from(self.word) * U256::from((input.len() + 31) / 32)
    }
}

/// A builtin contract: a pricer plus a native implementation.
pub struct Builtin {
    pricer: Box<dyn Pricer>,
    native: Box<dyn Impl>,
}

impl Builtin {
    pub fn new(pricer: Box<dyn Pricer>, native: Box<dyn Impl>) -> Self {
        Builtin { pricer, native }
    }

    /// Simple forwarder for cost.
    pub fn cost(&self, input: &[u8]) -> U256 { self.pricer.cost(input) }

    /// Simple forwarder for execution.
    pub fn execute(
        &self, input: &[u8], output: &mut Vec<u8>,
    ) -> Result<(), Error> {
        self.native.execute(input, output)
    }
}

/// The identity builtin, which copies its input to its output.
pub struct Identity;

impl Impl for Identity {
    fn execute(
        &self, input: &[u8], output: &mut Vec<u8>,
    ) -> Result<(), Error> {
        output.extend_from_slice(input);
        Ok(())
    }
}
