//! PMU Firmware Power Management Core
//!
//! Negotiates the operating state of shared hardware blocks ("slaves") on
//! behalf of the processing units ("masters") that use them.
//!
//! # Architecture Overview
//!
//! - **pm::caps** - capability bits offered by slave states
//! - **pm::fsm** - per-slave state tables and transition graphs
//! - **pm::requirement** - per-master requirement ledger of a slave
//! - **pm::slave** - aggregation, state selection and transition execution
//! - **pm::registry** - the slave registry and the `pm_*` entry points
//! - **pm::request** - master-facing request/release operations
//!
//! The drivers that actually gate clocks and switch power islands live
//! outside this crate and are reached through [`pm::PlatformOps`].
//!
//! # Execution Model
//!
//! Requests are processed run-to-completion. Each slave is guarded by its
//! own spinlock so the registry can be shared with IPI handlers.

#![cfg_attr(not(test), no_std)]
// - new_without_default: ledger and table types have a specific const initialization
#![allow(clippy::new_without_default)]

extern crate alloc;

pub mod pm;
