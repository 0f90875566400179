//! Options controlling semantic equality between nodes and time stamps.

/// Which differences an equality check should disregard.
///
/// The default compares everything at full precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompareOptions {
    /// Truncate timestamps to whole seconds before comparing.
    pub ignore_milliseconds: bool,
    /// Skip access time and usage count.
    pub ignore_statistics: bool,
    /// Skip revision history.
    pub ignore_history: bool,
    /// Skip the owning group.
    pub ignore_location: bool,
}

impl CompareOptions {
    /// Compares every field at full precision.
    pub const DEFAULT: Self = Self {
        ignore_milliseconds: false,
        ignore_statistics: false,
        ignore_history: false,
        ignore_location: false,
    };

    /// Compares at the precision of the persisted format.
    pub const IGNORE_MILLISECONDS: Self = Self {
        ignore_milliseconds: true,
        ..Self::DEFAULT
    };

    #[must_use]
    pub const fn ignoring_milliseconds(mut self) -> Self {
        self.ignore_milliseconds = true;
        self
    }

    #[must_use]
    pub const fn ignoring_statistics(mut self) -> Self {
        self.ignore_statistics = true;
        self
    }

    #[must_use]
    pub const fn ignoring_history(mut self) -> Self {
        self.ignore_history = true;
        self
    }

    #[must_use]
    pub const fn ignoring_location(mut self) -> Self {
        self.ignore_location = true;
        self
    }
}
