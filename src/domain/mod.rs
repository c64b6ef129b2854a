//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, state machine)
//! - `workflow` - Stages, project context, prompt strategies, response contract,
//!   context merging and stage/progress control

pub mod foundation;
pub mod workflow;
