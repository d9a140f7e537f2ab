//! The evaluation side of the engine: rule evaluation and its cluster-gated
//! scheduling.

pub mod evaluator;
pub mod scheduler;
