pub mod solver;
pub mod version;

// Re-export commonly used items
pub use solver::{build_target_contexts, compute_resolution, EnvironmentSolver, TargetContext};
pub use version::{compare_versions, parse_constraint_list, satisfies_all, Constraint, RVersion};
