//! Name conventions that tie actions together.
//!
//! Actions carry no identity beyond their name, so a stage finds its log,
//! clean and gui siblings purely through these rules.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static STAGE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]_[a-zA-Z]").unwrap());

/// Clean action attached to the root node.
pub const CLEAN_ALL: &str = "clean_all";

/// Stages that never have substages of their own.
pub const LEAF_STAGES: &[&str] = &["2_floorplan_debug_macros", "6_report", "6_final"];

/// `2_floorplan` -> `2`. Names without `_` are their own prefix.
pub fn stage_prefix(name: &str) -> &str {
    name.split_once('_').map_or(name, |(prefix, _)| prefix)
}

/// Major-step shape, `<digit>_<letter>...`.
pub fn is_stage_name(name: &str) -> bool {
    STAGE_NAME.is_match(name)
}

pub fn is_leaf_stage(name: &str) -> bool {
    LEAF_STAGES.contains(&name)
}

pub fn log_name(name: &str) -> String {
    format!("log {name}")
}

pub fn clean_name(prefix: &str) -> String {
    format!("clean_{prefix}")
}

pub fn gui_name(prefix: &str) -> String {
    format!("gui_{prefix}")
}

/// Stage prefix of a log file: the stem up to its first `_`, e.g.
/// `.../base/2_1_floorplan.log` -> `2`. Non-stage logs such as
/// `synth_stat.log` yield a prefix no stage carries. `None` only for paths
/// without a usable file stem.
pub fn log_file_prefix(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(stage_prefix(stem).to_string())
}
