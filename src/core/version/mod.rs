pub mod descriptor;
pub mod library;
pub mod version_file;

pub use descriptor::{GameCode, Modloaders, VersionDescriptor, UNKNOWN_MAIN_CODE};
pub use library::{resolve_library_tokens, LibraryToken, MavenCoordinate};
pub use version_file::{LibraryEntry, Rule, RuleAction, VersionJson};
