//! The reasoning core of a natural-language-controlled blocks-world robot:
//! resolves linguistic references to object ids and emits a goal as a DNF
//! formula over spatial literals (the [`interpreter`] module), then performs
//! heuristic best-first search over robot-arm configurations to realize any
//! disjunct of that goal as a sequence of primitive arm actions (the
//! [`planner`] module).
//!
//! Out of scope (consumed or supplied by collaborators, not implemented
//! here): the natural-language parser that produces [`parse_tree::Command`]
//! trees, the world renderer/animator that consumes the returned plan
//! strings, and persistence/CLI wiring. [`shrdlite_search`] stands in for
//! the generic best-first search driver.

pub mod interpreter;
pub mod logic;
pub mod parse_tree;
pub mod physics;
pub mod planner;
pub mod state_graph;
pub mod world;

pub use interpreter::{interpret, InterpretError};
pub use planner::{plan, PlanError, PlannerConfig};
