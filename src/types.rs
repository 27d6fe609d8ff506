use std::fmt;
use std::str::FromStr;

/// Which subset of linters `qa` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QaTarget {
    All,
    Html,
    Css,
    Js,
    Jscs,
    Jshint,
}

impl QaTarget {
    pub const ALL: [QaTarget; 6] = [
        QaTarget::All,
        QaTarget::Html,
        QaTarget::Css,
        QaTarget::Js,
        QaTarget::Jscs,
        QaTarget::Jshint,
    ];
}

/// Closed set of macro-tasks exposed as CLI verbs.
///
/// Each variant maps to exactly one key of the `[macro]` table. The plans
/// themselves live in the configuration and are validated at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MacroTask {
    Build,
    Optimize,
    Qa(QaTarget),
}

impl MacroTask {
    /// Macro-tasks that every configuration must define.
    pub const REQUIRED: [MacroTask; 3] = [
        MacroTask::Build,
        MacroTask::Optimize,
        MacroTask::Qa(QaTarget::All),
    ];

    pub fn all() -> impl Iterator<Item = MacroTask> {
        [MacroTask::Build, MacroTask::Optimize]
            .into_iter()
            .chain(QaTarget::ALL.into_iter().map(MacroTask::Qa))
    }

    /// Key of this macro-task in the `[macro]` table.
    pub fn key(&self) -> &'static str {
        match self {
            MacroTask::Build => "build",
            MacroTask::Optimize => "optimize",
            MacroTask::Qa(QaTarget::All) => "qa",
            MacroTask::Qa(QaTarget::Html) => "qa:html",
            MacroTask::Qa(QaTarget::Css) => "qa:css",
            MacroTask::Qa(QaTarget::Js) => "qa:js",
            MacroTask::Qa(QaTarget::Jscs) => "qa:jscs",
            MacroTask::Qa(QaTarget::Jshint) => "qa:jshint",
        }
    }
}

impl fmt::Display for MacroTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MacroTask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MacroTask::all()
            .find(|m| m.key() == s.trim())
            .ok_or_else(|| {
                format!(
                    "unknown macro-task: {s} (expected one of: {})",
                    MacroTask::all()
                        .map(|m| m.key())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Which tree the dev server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeMode {
    /// Build output plus the raw source tree, with live reload.
    Edit,
    /// Optimized output only, gzip-compressed.
    Optimized,
}
