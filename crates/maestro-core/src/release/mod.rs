//! Release planning, state and execution.

pub mod executor;
pub mod plan;
pub mod state;

pub use executor::{Action, Driver, proceed};
pub use plan::PlanOptions;
pub use state::{PhaseState, ProjectState, ReleaseStage, ReleaseState};
