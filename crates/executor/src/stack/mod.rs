//! Frame stack management.
//!
//! Nested calls recurse natively, so the native stack is a consensus
//! resource: a chain of frames must behave identically whether it runs on
//! the entry thread or not. This module decides where each frame's stack
//! lives ([`place`]), how the relocation threshold and dedicated stack are
//! sized ([`StackBudget`]), and owns the frame state machine itself
//! ([`CallCreateFrame`]).

mod budget;
mod frame;
mod governor;

pub use self::{
    budget::StackBudget,
    frame::{BeginOutcome, CallCreateFrame, FrameResult},
    governor::place,
};
