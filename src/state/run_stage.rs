/// Run stage definitions for tracking coordinator progress
///
/// A run moves strictly forward through its stages; `Failed` is reachable from
/// any non-terminal stage.
use std::fmt;

/// Represents the current stage of a change-detection run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStage {
    /// Coordinator built, run not started
    Idle,

    /// Enumerating every detail URL on the site
    Discovering,

    /// Splitting site URLs into new and existing
    Classifying,

    /// Fetching and persisting records not yet in the store
    ProcessingNew,

    /// Fetching and diffing records already in the store
    ProcessingExisting,

    /// Aggregating counts into the run summary
    Summarizing,

    /// Handing the summary to report sinks
    Reporting,

    // ===== Terminal States =====
    /// Run completed with a summary
    Done,

    /// Run aborted by an unrecoverable error
    Failed,
}

impl RunStage {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns the stage that follows this one on the happy path
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Discovering),
            Self::Discovering => Some(Self::Classifying),
            Self::Classifying => Some(Self::ProcessingNew),
            Self::ProcessingNew => Some(Self::ProcessingExisting),
            Self::ProcessingExisting => Some(Self::Summarizing),
            Self::Summarizing => Some(Self::Reporting),
            Self::Reporting => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Returns true if moving from `self` to `to` is allowed
    pub fn can_transition_to(&self, to: RunStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Classifying => "classifying",
            Self::ProcessingNew => "processing_new",
            Self::ProcessingExisting => "processing_existing",
            Self::Summarizing => "summarizing",
            Self::Reporting => "reporting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
