//! Infrastructure layer for Points-to Analysis
//!
//! - **NodeSet**: entity arena with union-find and per-root points-to sets
//! - **SteensgaardSolver**: unification-based, one class pointee per class
//! - **AndersenSolver**: inclusion-based worklist solver
//! - **LazyCycleDetector**: on-the-fly subset cycle collapsing (Hardekopf & Lin)
//! - **graph_builder** / **dot_export**: solved node set → graph → dot

pub mod andersen_solver;
pub mod dot_export;
pub mod graph_builder;
pub mod lazy_cycle_detector;
pub mod node_set;
pub mod steensgaard_solver;

pub use andersen_solver::{AndersenConfig, AndersenSolver, AndersenStats};
pub use graph_builder::build_points_to_graph;
pub use lazy_cycle_detector::{LazyCycleDetector, LcdStats};
pub use node_set::NodeSet;
pub use steensgaard_solver::{SteensgaardSolver, SteensgaardStats};
