pub mod context;
pub mod launcher;
pub mod loader;
pub mod repair;
pub mod task;

pub use context::{LaunchContext, LaunchOptions, LaunchServices};
pub use launcher::Launcher;
pub use loader::{GameSession, LaunchOutcome, LaunchPipeline, LAUNCH_STAGES};
pub use repair::{FileRepair, LibraryRepair};
pub use task::{ComboTask, PipelineTask, StageSpec, TaskState};
