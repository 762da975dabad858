//! Exceptions to the name-pattern classification.
//!
//! Entries are matched literally against raw target names and always win
//! over the `do-<n>_...` patterns. `clean_*`/`gui_*` entries rename the
//! per-stage targets to `clean_<n>`/`gui_<n>` so the tree can find them by
//! stage number.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOverride {
    pub raw: &'static str,
    pub launch_args: &'static str,
    pub display_name: &'static str,
    /// File name under the log directory, extension included.
    pub log_file_name: Option<&'static str>,
}

const fn entry(
    raw: &'static str,
    launch_args: &'static str,
    display_name: &'static str,
    log_file_name: Option<&'static str>,
) -> StageOverride {
    StageOverride {
        raw,
        launch_args,
        display_name,
        log_file_name,
    }
}

static BUILTIN: &[StageOverride] = &[
    entry(
        "do-2_floorplan_debug_macros",
        "2_floorplan_debug_macros",
        "2_floorplan_debug_macros",
        Some("2_floorplan_debug_macros.log"),
    ),
    entry("do-6_report", "do-6_report", "6_report", Some("6_report.log")),
    entry("do-6_final", "finish", "6_final", None),
    entry("clean_synth", "clean_synth", "clean_1", None),
    entry("clean_floorplan", "clean_floorplan", "clean_2", None),
    entry("clean_place", "clean_place", "clean_3", None),
    entry("clean_cts", "clean_cts", "clean_4", None),
    entry("clean_route", "clean_route", "clean_5", None),
    entry("clean_finish", "clean_finish", "clean_6", None),
    entry("gui_synth", "gui_synth", "gui_1", None),
    entry("gui_floorplan", "gui_floorplan", "gui_2", None),
    entry("gui_place", "gui_place", "gui_3", None),
    entry("gui_cts", "gui_cts", "gui_4", None),
    entry("gui_route", "gui_route", "gui_5", None),
    entry("gui_final", "gui_final", "gui_6", None),
];

/// Ordered override table. The first entry whose `raw` matches wins.
#[derive(Debug, Clone)]
pub struct OverrideTable {
    entries: Vec<StageOverride>,
}

impl Default for OverrideTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl OverrideTable {
    pub fn new(entries: Vec<StageOverride>) -> Self {
        Self { entries }
    }

    /// The table shipped with the extension.
    pub fn builtin() -> Self {
        Self::new(BUILTIN.to_vec())
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn lookup(&self, raw: &str) -> Option<&StageOverride> {
        self.entries.iter().find(|e| e.raw == raw)
    }

    pub fn entries(&self) -> &[StageOverride] {
        &self.entries
    }
}
