// ─── Java Requirements ───
// Narrows the acceptable Java version range for a game version and its
// modloaders, and picks what to download when nothing installed fits.

use std::fmt;

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::{GameCode, VersionDescriptor};

use super::entry::JavaVersion;

/// Inclusive range of acceptable runtime versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInterval {
    pub min: JavaVersion,
    pub max: JavaVersion,
}

impl Default for VersionInterval {
    fn default() -> Self {
        Self {
            min: JavaVersion::new(1, 0, 0, 0),
            max: JavaVersion::new(1, 999, 999, 999),
        }
    }
}

impl VersionInterval {
    pub fn contains(&self, version: &JavaVersion) -> bool {
        *version >= self.min && *version <= self.max
    }

    fn raise_min(&mut self, floor: JavaVersion) {
        self.min = self.min.max(floor);
    }

    fn lower_max(&mut self, cap: JavaVersion) {
        self.max = self.max.min(cap);
    }

    pub fn validate(self) -> LauncherResult<Self> {
        if self.min > self.max {
            return Err(LauncherError::RuntimeConflict {
                min: self.min.to_string(),
                max: self.max.to_string(),
            });
        }
        Ok(self)
    }

    /// Runtime to fetch when no installed one fits.
    pub fn download_target(&self) -> RuntimeTarget {
        if self.min.minor >= 22 {
            RuntimeTarget::Major(self.min.minor)
        } else if self.min.minor >= 21 {
            RuntimeTarget::Major(21)
        } else if self.min.minor >= 9 {
            RuntimeTarget::Major(17)
        } else if self.max.minor < 8 {
            RuntimeTarget::Major(7)
        } else if self.max <= JavaVersion::new(1, 8, 0, 320) || self.min.revision > 140 {
            RuntimeTarget::Java8u141
        } else {
            RuntimeTarget::Major(8)
        }
    }
}

impl fmt::Display for VersionInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeTarget {
    Major(u32),
    /// Java 8 at update 141 or later.
    Java8u141,
}

impl RuntimeTarget {
    pub fn major(&self) -> u32 {
        match self {
            RuntimeTarget::Major(major) => *major,
            RuntimeTarget::Java8u141 => 8,
        }
    }

    /// Whether a published runtime at `major` update `update` satisfies this target.
    pub fn accepts(&self, major: u32, update: u32) -> bool {
        match self {
            RuntimeTarget::Major(wanted) => major == *wanted,
            RuntimeTarget::Java8u141 => major == 8 && update >= 141,
        }
    }
}

impl fmt::Display for RuntimeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeTarget::Major(major) => write!(f, "{major}"),
            RuntimeTarget::Java8u141 => write!(f, "8u141"),
        }
    }
}

/// Everything the interval depends on, detached from disk.
#[derive(Debug, Clone)]
pub struct RuntimeRequirements {
    pub game_name: String,
    pub code: GameCode,
    pub release_time: DateTime<Utc>,
    pub recommended: Option<u32>,
    pub forge: Option<String>,
    pub fabric: bool,
    pub optifine: bool,
    /// Unified Pass login needs its agent, which requires 8u141+.
    pub unified_pass: bool,
}

impl RuntimeRequirements {
    pub fn from_version(version: &VersionDescriptor, unified_pass: bool) -> Self {
        Self {
            game_name: version.game_name.clone(),
            code: version.code,
            release_time: version.release_time,
            recommended: version.recommended_java(),
            forge: version.modloaders.forge.clone(),
            fabric: version.has_fabric(),
            optifine: version.has_optifine(),
            unified_pass,
        }
    }

    pub fn interval(&self) -> LauncherResult<VersionInterval> {
        let mut interval = VersionInterval::default();
        let main = self.code.main;
        let sub = self.code.sub;
        let unknown = self.code.is_unknown();
        let released = self.release_time;

        // ── Game era ──
        if (unknown && released >= date(2024, 4, 2))
            || (!unknown && main > 20)
            || (main == 20 && sub >= 5)
        {
            interval.raise_min(JavaVersion::java(21));
        } else if (unknown && released >= date(2021, 11, 16)) || (!unknown && main >= 18) {
            interval.raise_min(JavaVersion::java(17));
        } else if (unknown && released >= date(2021, 5, 11)) || (!unknown && main >= 17) {
            interval.raise_min(JavaVersion::java(16));
        } else if released.year() >= 2017 {
            interval.raise_min(JavaVersion::java(8));
        } else if released <= date(2013, 5, 1) && released.year() >= 2001 {
            interval.lower_max(JavaVersion::new(1, 12, 999, 999));
        }

        // ── Manifest recommendation ──
        if let Some(recommended) = self.recommended {
            if recommended >= 22 {
                interval.raise_min(JavaVersion::java(recommended));
            }
        }

        // ── OptiFine ──
        if self.optifine && !unknown {
            match main {
                1..=7 | 12 => interval.lower_max(JavaVersion::new(1, 8, 999, 999)),
                8..=11 => {
                    interval.min = JavaVersion::java(8);
                    interval.max = JavaVersion::new(1, 8, 999, 999);
                }
                _ => {}
            }
        }

        // ── Forge ──
        if let Some(forge) = &self.forge {
            if self.game_name == "1.7.2" {
                interval.min = JavaVersion::java(7);
                interval.max = JavaVersion::new(1, 7, 999, 999);
            } else if (1..=12).contains(&main) {
                interval.lower_max(JavaVersion::new(1, 8, 999, 999));
            } else if (13..=14).contains(&main) {
                interval.raise_min(JavaVersion::java(8));
                interval.lower_max(JavaVersion::new(1, 10, 999, 999));
            } else if main == 15 {
                interval.raise_min(JavaVersion::java(8));
                interval.lower_max(JavaVersion::new(1, 15, 999, 999));
            } else if forge_build_is_banned(forge) {
                interval.lower_max(JavaVersion::new(1, 8, 0, 320));
            } else if main == 18 && self.optifine {
                interval.lower_max(JavaVersion::new(1, 18, 999, 999));
            }
        }

        // ── Fabric ──
        if self.fabric {
            if (15..=16).contains(&main) {
                interval.raise_min(JavaVersion::java(8));
            } else if (18..crate::core::version::UNKNOWN_MAIN_CODE).contains(&main) {
                interval.raise_min(JavaVersion::java(17));
            }
        }

        // ── Login agent ──
        if self.unified_pass {
            interval.raise_min(JavaVersion::new(1, 8, 0, 141));
        }

        interval.validate()
    }
}

/// Forge 34.0.0 through 36.2.25 break on Java 8u321 and later.
fn forge_build_is_banned(forge: &str) -> bool {
    let Some(build) = numeric_parts(forge) else {
        return false;
    };
    build >= vec![34, 0, 0] && build <= vec![36, 2, 25]
}

fn numeric_parts(raw: &str) -> Option<Vec<u32>> {
    raw.split('.').map(|part| part.parse::<u32>().ok()).collect()
}

fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}
