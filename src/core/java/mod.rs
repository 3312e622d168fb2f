pub mod entry;
pub mod install;
pub mod interval;
pub mod search;
pub mod selector;

pub use entry::{java_exe, locate_java_binary, JavaEntry, JavaVersion};
pub use install::{MojangRuntimeInstaller, RuntimeInstaller};
pub use interval::{RuntimeRequirements, RuntimeTarget, VersionInterval};
pub use search::{HostJavaLocator, JavaLocator};
pub use selector::{JavaSelector, NO_JAVA_HINT};
