use std::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo};

use crate::core::types::Number;

/// Represents an interval of values, where the `start` and/or `end` may be unbounded
///
/// # Requirements
/// It is a logic error for `start > end`. This is not checked.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub struct Interval<T> {
    pub start: Option<T>,
    pub end: Option<T>,
}

// region Constructors

impl<T> From<RangeFull> for Interval<T> {
    fn from(_value: RangeFull) -> Self { Self::FULL }
}
impl<T> From<RangeInclusive<T>> for Interval<T> {
    fn from(value: RangeInclusive<T>) -> Self {
        let (start, end) = value.into_inner();
        Self {
            start: Some(start),
            end: Some(end),
        }
    }
}
impl<T> From<Range<T>> for Interval<T> {
    fn from(value: Range<T>) -> Self {
        Self {
            start: Some(value.start),
            end: Some(value.end),
        }
    }
}
impl<T> From<RangeFrom<T>> for Interval<T> {
    fn from(value: RangeFrom<T>) -> Self {
        Self {
            start: Some(value.start),
            end: None,
        }
    }
}
impl<T> From<RangeTo<T>> for Interval<T> {
    fn from(value: RangeTo<T>) -> Self {
        Self {
            start: None,
            end: Some(value.end),
        }
    }
}

impl<T> Interval<T> {
    pub const FULL: Self = Self { start: None, end: None };
}

// endregion Constructors

// region Queries

impl<T: PartialOrd> Interval<T> {
    /// Checks if the given range `min..=max` overlaps with `self`
    pub fn range_overlaps(&self, min: &T, max: &T) -> bool {
        let low = match &self.start {
            Some(start) if start > min => start,
            _ => min,
        };
        let high = match &self.end {
            Some(end) if end < max => end,
            _ => max,
        };
        low <= high
    }

    pub fn contains(&self, item: &T) -> bool {
        self.start.as_ref().map_or(true, |start| start <= item) && self.end.as_ref().map_or(true, |end| item <= end)
    }
}

impl Interval<Number> {
    /// Clips the range `min..=max` to `self`, returning [None] if nothing is left
    pub fn clip(&self, min: Number, max: Number) -> Option<(Number, Number)> {
        let low = self.start.map_or(min, |s| s.max(min));
        let high = self.end.map_or(max, |e| e.min(max));
        (low <= high).then_some((low, high))
    }
}

// endregion Queries

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_rejects_disjoint_ranges() {
        let a: Interval<Number> = (1.0..=2.0).into();
        assert_eq!(a.clip(3.0, 4.0), None);
        assert_eq!(a.clip(1.5, 4.0), Some((1.5, 2.0)));
        assert!(a.range_overlaps(&0.0, &1.0));
        assert!(!a.contains(&2.5));
    }
}
