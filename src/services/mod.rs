pub mod orchestrator;
pub mod scheduler;

pub use orchestrator::{OrchestratorSettings, RunError, ScraperOrchestrator};
pub use scheduler::{ScheduleConfig, Scheduler};
