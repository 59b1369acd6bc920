use crate::error::{DatasetError, Result};
use std::collections::BTreeMap;

/// Counts temperatures into consecutive buckets of width `bucket_size`.
///
/// Buckets run from the floor of the smallest value to the floor of the
/// largest value, so every bucket in that span is present even when its count
/// is zero. A bucket keyed by `floor` holds values `v` with
/// `floor <= v <= floor + bucket_size - 1`.
///
/// Floors are `i64` because the floor of a value near `i32::MIN` can fall
/// below the `i32` range.
///
/// # Arguments
///
/// * `values` - Temperatures to count
/// * `bucket_size` - Width of each bucket
///
/// # Returns
///
/// An ordered mapping from bucket floor to count, ascending by floor. Empty
/// input yields an empty mapping.
///
/// # Errors
///
/// Returns `DatasetError::InvalidBucketSize` if `bucket_size` is zero or negative.
pub fn histogram(values: &[i32], bucket_size: i32) -> Result<BTreeMap<i64, usize>> {
    if bucket_size <= 0 {
        return Err(DatasetError::InvalidBucketSize(bucket_size));
    }

    let mut buckets = BTreeMap::new();
    let (Some(&low), Some(&high)) = (values.iter().min(), values.iter().max()) else {
        return Ok(buckets);
    };

    let width = i64::from(bucket_size);
    let top = floor_of(high, width);
    let mut floor = floor_of(low, width);
    while floor <= top {
        buckets.insert(floor, 0);
        floor += width;
    }

    for &value in values {
        *buckets.entry(floor_of(value, width)).or_insert(0) += 1;
    }

    Ok(buckets)
}

/// Rounds `value` down to a multiple of `bucket_size`, toward negative infinity.
///
/// # Errors
///
/// Returns `DatasetError::InvalidBucketSize` if `bucket_size` is zero or negative.
pub fn bucket_floor(value: i32, bucket_size: i32) -> Result<i64> {
    if bucket_size <= 0 {
        return Err(DatasetError::InvalidBucketSize(bucket_size));
    }
    Ok(floor_of(value, i64::from(bucket_size)))
}

// `width` is positive and both operands fit in i64 with room to spare.
fn floor_of(value: i32, width: i64) -> i64 {
    i64::from(value).div_euclid(width) * width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_bucket_coverage() {
        let values = [15, 25, 30, 15];
        let buckets = histogram(&values, 10).unwrap();

        let expected: BTreeMap<i64, usize> = [(10, 2), (20, 1), (30, 1)].into_iter().collect();
        assert_eq!(buckets, expected);
        assert_eq!(buckets.values().sum::<usize>(), values.len());
    }

    #[test]
    fn test_histogram_keeps_empty_buckets_in_span() {
        let buckets = histogram(&[1, 42], 10).unwrap();
        let floors: Vec<i64> = buckets.keys().copied().collect();
        assert_eq!(floors, vec![0, 10, 20, 30, 40]);
        assert_eq!(buckets[&0], 1);
        assert_eq!(buckets[&20], 0);
        assert_eq!(buckets[&40], 1);
    }

    #[test]
    fn test_histogram_negative_values() {
        let buckets = histogram(&[-1, -10, -11, 0], 10).unwrap();
        let expected: BTreeMap<i64, usize> = [(-20, 1), (-10, 2), (0, 1)].into_iter().collect();
        assert_eq!(buckets, expected);
    }

    #[test]
    fn test_histogram_boundaries_inclusive() {
        let buckets = histogram(&[20, 24, 25, 29], 5).unwrap();
        assert_eq!(buckets[&20], 2);
        assert_eq!(buckets[&25], 2);
    }

    #[test]
    fn test_histogram_empty_input() {
        assert!(histogram(&[], 10).unwrap().is_empty());
    }

    #[test]
    fn test_histogram_rejects_bad_bucket_size() {
        assert_eq!(histogram(&[1, 2], 0), Err(DatasetError::InvalidBucketSize(0)));
        assert_eq!(histogram(&[1, 2], -3), Err(DatasetError::InvalidBucketSize(-3)));
    }

    #[test]
    fn test_histogram_at_integer_limits() {
        let top = histogram(&[i32::MAX - 3], 10).unwrap();
        let expected: BTreeMap<i64, usize> = [(2_147_483_640, 1)].into_iter().collect();
        assert_eq!(top, expected);

        let bottom = histogram(&[i32::MIN], 10).unwrap();
        let expected: BTreeMap<i64, usize> = [(-2_147_483_650, 1)].into_iter().collect();
        assert_eq!(bottom, expected);

        let wide = histogram(&[i32::MAX, i32::MAX - 1], i32::MAX).unwrap();
        assert_eq!(wide.values().sum::<usize>(), 2);
        assert_eq!(wide.keys().copied().collect::<Vec<_>>(), vec![0, 2_147_483_647]);
    }

    #[test]
    fn test_bucket_floor() {
        assert_eq!(bucket_floor(15, 10), Ok(10));
        assert_eq!(bucket_floor(10, 10), Ok(10));
        assert_eq!(bucket_floor(-1, 10), Ok(-10));
        assert_eq!(bucket_floor(-10, 10), Ok(-10));
        assert_eq!(bucket_floor(7, 1), Ok(7));
        assert_eq!(bucket_floor(i32::MIN, 10), Ok(-2_147_483_650));
    }

    #[test]
    fn test_bucket_floor_rejects_bad_bucket_size() {
        assert_eq!(bucket_floor(5, 0), Err(DatasetError::InvalidBucketSize(0)));
        assert_eq!(bucket_floor(5, -10), Err(DatasetError::InvalidBucketSize(-10)));
    }
}
