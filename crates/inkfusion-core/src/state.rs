//! Shared state types.

use std::fmt;

/// Autosave state of a draft collection.
///
/// `PendingSave` wins over `Saving`: when a new edit re-arms the debounce
/// timer while earlier saves are still in flight, the collection is waiting
/// for the next pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaveState {
    #[default]
    Idle,
    PendingSave,
    Saving,
}

impl SaveState {
    pub(crate) const fn from_flags(timer_armed: bool, saves_in_flight: bool) -> Self {
        if timer_armed {
            Self::PendingSave
        } else if saves_in_flight {
            Self::Saving
        } else {
            Self::Idle
        }
    }
}

impl fmt::Display for SaveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::PendingSave => "pending save",
            Self::Saving => "saving",
        };
        f.write_str(label)
    }
}
