//! CLI command implementations.

pub mod check;
pub mod common;
pub mod demo;
pub mod nodes;
pub mod pack;
pub mod run;
