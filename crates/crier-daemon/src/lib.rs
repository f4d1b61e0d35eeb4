//! `crier-daemon` — the scheduling control loop.
//!
//! # Overview
//!
//! The [`engine::SchedulerEngine`] polls the queue store at a fixed
//! interval and executes every item whose publish time has arrived. Within
//! one tick all due posts are fully processed (published or failed) before
//! any due comment is evaluated, so a post and its comment becoming due
//! together always resolve in the right order.
//!
//! # Comment dependencies
//!
//! | Parent state                  | Outcome                              |
//! |-------------------------------|--------------------------------------|
//! | missing (pruned or dangling)  | failed, `parent_missing`             |
//! | failed                        | failed, `parent_failed`              |
//! | pending                       | wait, re-evaluated next tick         |
//! | published without external id | failed, `parent_missing_identifier`  |
//! | published                     | publish with the parent's external id |

pub mod clock;
pub mod engine;
pub mod error;
pub mod resolver;

pub use clock::{Clock, SystemClock};
pub use engine::SchedulerEngine;
pub use error::{DaemonError, Result};
pub use resolver::Readiness;
