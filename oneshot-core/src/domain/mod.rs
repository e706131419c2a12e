//! Core domain types
//!
//! Everything here is pure: building, validating and converting the values
//! that the runner hands to a backend. Nothing in this module performs I/O.

pub mod credentials;
pub mod mount;
pub mod pod;
pub mod query;
pub mod run;
