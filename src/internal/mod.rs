//! Internal implementation details.

pub(crate) mod stack;

pub(crate) use stack::StackGuard;
