use std::ops::RangeInclusive;

pub(crate) fn usize_range_inclusive(rng: &mut fastrand::Rng, range: RangeInclusive<usize>) -> usize {
    let (start, end) = range.into_inner();
    if start >= end {
        return start;
    }
    start + rng.usize(0..=(end - start))
}

pub(crate) fn choose<'a, T>(rng: &mut fastrand::Rng, values: &[&'a T]) -> Option<&'a T> {
    if values.is_empty() {
        None
    } else {
        Some(values[rng.usize(0..values.len())])
    }
}
