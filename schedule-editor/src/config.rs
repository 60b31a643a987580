//! Editor configuration.

/// What a full route refresh does when the router finds no path between two
/// consecutive stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPathPolicy {
    /// Fail the refresh with `RouteUnreachable`; the route is left unchanged.
    #[default]
    Fail,
    /// Append only the next stop's link, leaving a gap in the link sequence.
    /// Every gap is logged.
    LinkOnly,
}

/// Configuration parameters for the schedule editor.
#[derive(Debug, Clone)]
pub struct EditorConfig {
    /// Field delimiter of command records.
    pub delimiter: char,

    /// Refresh behaviour when two stops are not connected.
    pub missing_path: MissingPathPolicy,
}

impl EditorConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(delimiter: char, missing_path: MissingPathPolicy) -> Self {
        Self {
            delimiter,
            missing_path,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            delimiter: ';',
            missing_path: MissingPathPolicy::Fail,
        }
    }
}
