//! Capacity growth configuration.

use crate::error::{RecordArrayError, Result};

const MAX_CAPACITY: usize = isize::MAX as usize;

/// How an owned record array picks its new capacity when it runs out of room.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// Grow to exactly `len + additional` elements.
    ///
    /// Nothing is over-allocated, but appending one element at a time without
    /// reserving first reallocates on every append.
    #[default]
    ExactFit,
    /// Grow to at least twice the current capacity (and at least 8 elements).
    Amortized,
}

impl GrowthPolicy {
    /// Returns the capacity to reallocate to so that `additional` more elements
    /// fit after the `len` live ones.
    pub fn grow(self, len: usize, cap: usize, additional: usize) -> Result<usize> {
        let required = len
            .checked_add(additional)
            .ok_or(RecordArrayError::CapacityOverflow)?;

        if required > MAX_CAPACITY {
            return Err(RecordArrayError::CapacityOverflow);
        }

        match self {
            GrowthPolicy::ExactFit => Ok(required),
            GrowthPolicy::Amortized => {
                let cap = cap.saturating_add(cap).max(required).max(8);
                Ok(cap.min(MAX_CAPACITY))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_fit_adds_only_the_shortfall() {
        // 1 live element, room for 2, 3 more requested: shortfall is 2.
        assert_eq!(GrowthPolicy::ExactFit.grow(1, 2, 3), Ok(4));
        assert_eq!(GrowthPolicy::ExactFit.grow(0, 0, 1), Ok(1));
    }

    #[test]
    fn amortized_doubles() {
        assert_eq!(GrowthPolicy::Amortized.grow(0, 0, 1), Ok(8));
        assert_eq!(GrowthPolicy::Amortized.grow(16, 16, 1), Ok(32));
        assert_eq!(GrowthPolicy::Amortized.grow(16, 16, 100), Ok(116));
    }

    #[test]
    fn overflow() {
        assert_eq!(
            GrowthPolicy::ExactFit.grow(usize::MAX, usize::MAX, 1),
            Err(RecordArrayError::CapacityOverflow)
        );
        assert_eq!(
            GrowthPolicy::Amortized.grow(MAX_CAPACITY, MAX_CAPACITY, 1),
            Err(RecordArrayError::CapacityOverflow)
        );
    }

    #[test]
    fn default_is_exact_fit() {
        assert_eq!(GrowthPolicy::default(), GrowthPolicy::ExactFit);
    }
}
