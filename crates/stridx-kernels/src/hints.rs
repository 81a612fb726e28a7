//! Kernel hints and configuration

/// Default innermost extent below which same-shape operands skip the
/// recursive path and use the generic odometer.
pub const DEFAULT_MIN_INNER_EXTENT: usize = 2;

/// Hints controlling how kernels traverse their operands
#[derive(Clone, Debug)]
pub struct KernelHints {
    /// Always use the generic odometer path
    pub force_generic: bool,
    /// Smallest innermost extent for the recursive path
    pub min_inner_extent: usize,
}

impl Default for KernelHints {
    fn default() -> Self {
        Self {
            force_generic: false,
            min_inner_extent: DEFAULT_MIN_INNER_EXTENT,
        }
    }
}

impl KernelHints {
    /// Create new kernel hints with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Hints that always select the generic path
    pub fn generic() -> Self {
        Self::default().with_force_generic(true)
    }

    /// Set whether the generic path is forced
    pub fn with_force_generic(mut self, force: bool) -> Self {
        self.force_generic = force;
        self
    }

    /// Set the recursion cutoff
    pub fn with_min_inner_extent(mut self, extent: usize) -> Self {
        self.min_inner_extent = extent;
        self
    }
}
