//! Build phase classification.

/// Phases after which a build makes no further transitions.
pub const TERMINAL_PHASES: [&str; 3] = ["Complete", "Failed", "Cancelled"];

/// Whether a build still needs cancelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseClass {
    /// Still running or not yet started; cancel it.
    Active,
    /// Finished; leave it alone.
    Terminal,
}

/// Classify a build phase.
///
/// Only `Complete`, `Failed` and `Cancelled` (any case) are terminal.
/// Anything else, including empty or unknown phases, is active: cancelling
/// a build that was about to finish costs less than leaving a rogue one running.
pub fn classify(phase: &str) -> PhaseClass {
    if TERMINAL_PHASES
        .iter()
        .any(|terminal| phase.eq_ignore_ascii_case(terminal))
    {
        PhaseClass::Terminal
    } else {
        PhaseClass::Active
    }
}

impl PhaseClass {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}
