//! Analysis job pipeline and bulk remediation

pub mod routine;
pub mod executor;
pub mod simulated;
pub mod poller;
pub mod bulk;

pub use routine::{AnalysisReport, AnalysisRoutine, RoutineEvent, RoutineEvents, RoutineRequest};
pub use executor::Executor;
pub use simulated::SimulatedRoutine;
pub use poller::{JobSource, PollError, PollPolicy, StatusPoller};
pub use bulk::BulkCoordinator;
