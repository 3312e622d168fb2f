// ─── Java Entry ───
// A Java runtime found on this machine, identified by probing the binary.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, instrument};

/// Four-part runtime version. Java 17.0.8 is `1.17.0.8`, Java 8u392 is
/// `1.8.0.392`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JavaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub revision: u32,
}

impl JavaVersion {
    pub const fn new(major: u32, minor: u32, patch: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            revision,
        }
    }

    /// Short form: Java 17 → `1.17`.
    pub const fn java(feature: u32) -> Self {
        Self::new(1, feature, 0, 0)
    }

    /// Parse the quoted string printed by `java -version`.
    ///
    /// Accepts `1.8.0_392`, `17.0.8`, `21`, `17.0.8.1` and `22-ea`.
    pub fn parse(raw: &str) -> Option<Self> {
        let core = raw.split(['-', '+', ' ']).next().unwrap_or(raw);
        let (numbers, update) = match core.split_once('_') {
            Some((head, update)) => (head, update.parse::<u32>().ok()),
            None => (core, None),
        };
        let nums: Vec<u32> = numbers
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<_, _>>()
            .ok()?;
        let first = *nums.first()?;

        if first == 1 {
            // Legacy scheme: 1.<feature>.<patch>_<update>
            Some(Self::new(
                1,
                nums.get(1).copied().unwrap_or(0),
                nums.get(2).copied().unwrap_or(0),
                update.unwrap_or(0),
            ))
        } else {
            Some(Self::new(
                1,
                first,
                nums.get(1).copied().unwrap_or(0),
                nums.get(2).copied().or(update).unwrap_or(0),
            ))
        }
    }
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.patch, self.revision
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaEntry {
    pub executable_path: PathBuf,
    /// `javaw.exe` on Windows when present, otherwise the same as `executable_path`.
    pub windowed_executable_path: PathBuf,
    pub bin_folder: PathBuf,
    pub version: JavaVersion,
    pub is_64bit: bool,
    /// Found through `JAVA_HOME` or `PATH` rather than a directory scan.
    pub has_environment_registration: bool,
}

impl JavaEntry {
    /// Feature release number (8, 17, 21...).
    pub fn version_code(&self) -> u32 {
        self.version.minor
    }

    /// Ordering used to choose between runtimes that all fit: 64-bit first,
    /// then the lowest feature release, then the newest build of it.
    pub fn preference(&self, other: &Self) -> Ordering {
        other
            .is_64bit
            .cmp(&self.is_64bit)
            .then(self.version.minor.cmp(&other.version.minor))
            .then(other.version.cmp(&self.version))
    }

    /// Run the binary and read its version and bitness.
    #[instrument]
    pub fn probe(path: &Path) -> Option<Self> {
        let output = Command::new(path)
            .args(["-XshowSettings:properties", "-version"])
            .output()
            .ok()?;
        let text = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stderr),
            String::from_utf8_lossy(&output.stdout)
        );
        debug!("Probing {:?}: {}", path, text.lines().next().unwrap_or(""));
        Self::from_probe_output(path, &text)
    }

    pub fn from_probe_output(path: &Path, text: &str) -> Option<Self> {
        let version = JavaVersion::parse(&quoted_version(text)?)?;
        let lower = text.to_ascii_lowercase();
        let is_64bit = lower.contains("sun.arch.data.model = 64")
            || lower.contains("os.arch = amd64")
            || lower.contains("os.arch = x86_64")
            || lower.contains("os.arch = aarch64")
            || lower.contains("64-bit");

        let executable_path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let bin_folder = executable_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let javaw = bin_folder.join("javaw.exe");
        let windowed_executable_path = if cfg!(windows) && javaw.exists() {
            javaw
        } else {
            executable_path.clone()
        };

        Some(Self {
            executable_path,
            windowed_executable_path,
            bin_folder,
            version,
            is_64bit,
            has_environment_registration: false,
        })
    }
}

fn quoted_version(output: &str) -> Option<String> {
    for line in output.lines() {
        if !line.contains("version") {
            continue;
        }
        if let Some(start) = line.find('"') {
            if let Some(end) = line[start + 1..].find('"') {
                return Some(line[start + 1..start + 1 + end].to_string());
            }
        }
    }
    None
}

pub fn java_exe() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

/// Find the `java` binary inside an unpacked runtime.
pub fn locate_java_binary(runtime_root: &Path) -> PathBuf {
    let primary = runtime_root.join("bin").join(java_exe());
    if primary.exists() {
        return primary;
    }

    let mac_layout = runtime_root
        .join("Contents")
        .join("Home")
        .join("bin")
        .join(java_exe());
    if mac_layout.exists() {
        return mac_layout;
    }

    find_java_binary_recursive(runtime_root, 4).unwrap_or(primary)
}

fn find_java_binary_recursive(root: &Path, depth: usize) -> Option<PathBuf> {
    if depth == 0 {
        return None;
    }
    let entries = std::fs::read_dir(root).ok()?;
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let file_type = entry.file_type().ok()?;

        if file_type.is_file() {
            let in_bin = path
                .parent()
                .and_then(|p| p.file_name())
                .is_some_and(|n| n == "bin");
            if in_bin && path.file_name().and_then(|n| n.to_str()) == Some(java_exe()) {
                return Some(path);
            }
        } else if file_type.is_dir() {
            if let Some(found) = find_java_binary_recursive(&path, depth - 1) {
                return Some(found);
            }
        }
    }
    None
}
