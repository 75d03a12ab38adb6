pub mod collect;
pub mod dashboard;
pub mod normalize;

use clap::ValueEnum;

use chipfin_core::DuplicatePolicy;

/// Command-line spelling of [`DuplicatePolicy`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DuplicatesArg {
    /// Later fact replaces the earlier one
    Last,
    /// Earlier fact is kept
    First,
    /// Duplicates are an error
    Reject,
}

impl From<DuplicatesArg> for DuplicatePolicy {
    fn from(arg: DuplicatesArg) -> Self {
        match arg {
            DuplicatesArg::Last => DuplicatePolicy::LastWriteWins,
            DuplicatesArg::First => DuplicatePolicy::FirstWriteWins,
            DuplicatesArg::Reject => DuplicatePolicy::Reject,
        }
    }
}
