//! The points in a run where the operator must confirm.

use std::fmt;

/// A confirmation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    /// Before anything moves.
    StartDemo,
    /// The robot is in manual mode and must be driven to free space before
    /// the arm unfolds for baseboard scanning.
    ClearArea,
    /// The operator has driven the robot along every baseboard.
    BaseboardsScanned,
    /// Autonomous driving is about to start.
    NothingClose,
}

impl Checkpoint {
    /// Stable identifier used in logs and abort errors.
    pub fn name(self) -> &'static str {
        match self {
            Checkpoint::StartDemo => "start_demo",
            Checkpoint::ClearArea => "clear_area",
            Checkpoint::BaseboardsScanned => "baseboards_scanned",
            Checkpoint::NothingClose => "nothing_close",
        }
    }

    /// Lines shown to the operator before the prompt.
    pub fn instructions(self) -> &'static [&'static str] {
        match self {
            Checkpoint::StartDemo => &[],
            Checkpoint::ClearArea => &[
                "shelf baseboard detection requires manual mode",
                "move to free space please",
            ],
            Checkpoint::BaseboardsScanned => &["scan all shelf baseboards please"],
            Checkpoint::NothingClose => &["MAKE SURE NOTHING IS CLOSE"],
        }
    }

    /// The prompt line itself.
    pub fn prompt(self) -> &'static str {
        match self {
            Checkpoint::StartDemo => "start demo? [y]",
            Checkpoint::ClearArea | Checkpoint::BaseboardsScanned => "done? [y]",
            Checkpoint::NothingClose => "rdy? [y]",
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_distinct() {
        let all = [
            Checkpoint::StartDemo,
            Checkpoint::ClearArea,
            Checkpoint::BaseboardsScanned,
            Checkpoint::NothingClose,
        ];
        let names: std::collections::HashSet<_> = all.iter().map(|c| c.name()).collect();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn every_prompt_offers_y() {
        for cp in [
            Checkpoint::StartDemo,
            Checkpoint::ClearArea,
            Checkpoint::BaseboardsScanned,
            Checkpoint::NothingClose,
        ] {
            assert!(cp.prompt().ends_with("[y]"));
        }
    }

    #[test]
    fn display_uses_name() {
        assert_eq!(Checkpoint::ClearArea.to_string(), "clear_area");
    }
}
