//! Test suites for the node startup sequence.

pub(crate) mod support;
