/// How a single step played out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    /// The step's condition did not match the last confirmation
    Skipped,
    /// Something it referenced was missing; the step did nothing or only part of its work
    Degraded,
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepEvent {
    Started {
        index: usize,
        action: &'static str,
    },
    Finished {
        index: usize,
        action: &'static str,
        outcome: StepOutcome,
    },
    Retreated {
        index: usize,
    },
    Completed,
    Reset,
}

pub type StepListener = Box<dyn Fn(&StepEvent) + Send + Sync>;
