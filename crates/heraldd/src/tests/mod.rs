//! Cross-module test suites for the interaction daemon.

mod permissions_behaviour;
pub(crate) mod support;
