//! Eager-load query planner
//!
//! Turns the dotted field paths of a search entity into one compiled,
//! reusable plan: which relationships to join, which to load with a
//! batched secondary query, and which columns to skip at every hop.
//!
//! # Design Principles
//!
//! - Deterministic: same fields → same plan, regardless of order
//! - Minimal: only columns named by some path are loaded, plus the keys
//!   needed to stitch rows together
//! - Fatal at startup: unplannable paths abort boot, never per message

mod errors;
mod explain;
mod path_tree;
mod plan;
mod planner;

pub use errors::{PlannerError, PlannerErrorCode, PlannerResult, Severity};
pub use explain::{ExplainHop, ExplainPlan};
pub use path_tree::{merge_paths, PathTree};
pub use plan::{CompiledPlan, LoadDirective, LoadStrategy};
pub use planner::{
    defer_everything_but, validate_path, QueryPlanner, FOREIGN_KEY_SUFFIX, POSITION_COLUMN,
};
