use once_cell::sync::Lazy;
use regex::Regex;

use crate::overrides::{OverrideTable, StageOverride};

/// `do-<digit>_<letter>...`: a major step launched by its short name.
static MAJOR_STEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^do-[0-9]_[a-zA-Z]").unwrap());

/// `do-<digit>_<digit>...`: a minor step launched by its full name.
static MINOR_STEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^do-[0-9]_[0-9]").unwrap());

/// How a raw `do-*` target name is turned into actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<'a> {
    Override(&'a StageOverride),
    MajorStep { display_name: String, launch: String },
    MinorStep { display_name: String },
    Unrecognized,
}

impl Classification<'_> {
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::Override(o) => Some(o.display_name),
            Self::MajorStep { display_name, .. } | Self::MinorStep { display_name } => {
                Some(display_name)
            }
            Self::Unrecognized => None,
        }
    }
}

/// Classify a raw target. The override table is consulted first.
pub fn classify<'a>(raw: &str, overrides: &'a OverrideTable) -> Classification<'a> {
    if let Some(entry) = overrides.lookup(raw) {
        return Classification::Override(entry);
    }
    if MAJOR_STEP.is_match(raw) {
        return Classification::MajorStep {
            display_name: step_name(raw).to_string(),
            launch: major_launch_target(raw),
        };
    }
    if MINOR_STEP.is_match(raw) {
        return Classification::MinorStep {
            display_name: step_name(raw).to_string(),
        };
    }
    Classification::Unrecognized
}

/// Name after the `do-` prefix, e.g. `do-2_1_floorplan` -> `2_1_floorplan`.
pub fn step_name(raw: &str) -> &str {
    raw.strip_prefix("do-").unwrap_or(raw)
}

/// `do-2_floorplan` -> `floorplan`: purely numeric (and empty) segments are
/// dropped and the rest rejoined with `_`.
pub fn major_launch_target(raw: &str) -> String {
    step_name(raw)
        .split('_')
        .filter(|seg| !seg.chars().all(|c| c.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join("_")
}
