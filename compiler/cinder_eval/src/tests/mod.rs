//! Evaluator tests that run whole programs against crate internals.
//!
//! Unit tests for a single module stay inline; tests here exercise builtin
//! members and the transfer protocol through the interpreter, where they
//! need access to container headers and the shared reference table.
