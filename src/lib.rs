//! A shared, garbage-collected decision-diagram core: canonical BDDs and
//! ZDDs over a single node table, plus a top-down `Spec`/builder framework
//! for constructing them frontier-by-frontier.

pub mod arc;
pub mod builder;
pub mod cache;
pub mod common;
pub mod error;
pub mod index;
pub mod manager;
pub mod node;
pub mod reduce;
pub mod spec;
pub mod utable;
pub mod varorder;

pub mod bdd;
pub mod zdd;
