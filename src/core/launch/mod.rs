pub mod arguments;
pub mod custom;
pub mod natives;
pub mod post_launch;
pub mod prerun;
pub mod process;
pub mod script;
pub mod secrets;
pub mod watcher;
pub mod wrapper;

pub use arguments::{ArgumentBuilder, LaunchArguments};
pub use custom::{argument_replace, run_custom_commands, ReplaceValues};
pub use natives::{extract_natives, natives_dir, NativesReport};
pub use post_launch::{exit_handler, run_post_launch, VisibilityPolicy};
pub use prerun::run_prerun;
pub use process::{spawn_game, ProcessHandle, SpawnRequest};
pub use script::{write_launch_script, LaunchScript};
pub use secrets::{launch_log, mask_tokens, secret_filter};
pub use watcher::{GameState, ProcessWatcher, STARTUP_TIMEOUT};
