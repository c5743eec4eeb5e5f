//! Least significant digit radix sort over 8 bit digits.
//!
//! Only as many digits as the largest key needs are processed, so keys drawn from a
//! small range (body indices, for example) sort in one or two passes.

const BUCKET_COUNT: usize = 256;
const DIGIT_BITS: u32 = 8;

/// Number of bits required to represent every key up to and including `max_key`.
#[inline(always)]
pub fn significant_bits(max_key: u32) -> u32 {
    u32::BITS - max_key.leading_zeros()
}

/// Number of 8 bit digit passes needed for keys up to `max_key`.
#[inline(always)]
pub fn digit_count(max_key: u32) -> u32 {
    significant_bits(max_key).div_ceil(DIGIT_BITS)
}

fn calculate_partial_sums(bucket_counts: &mut [usize; BUCKET_COUNT]) {
    let mut sum = 0;
    for bucket in bucket_counts.iter_mut() {
        let count = *bucket;
        *bucket = sum;
        sum += count;
    }
}

fn reorder_for_digit<T: Copy>(
    source: &[T],
    target: &mut [T],
    bucket_starts: &mut [usize; BUCKET_COUNT],
    shift: u32,
    key: &impl Fn(&T) -> u32,
) {
    for value in source {
        let bucket = ((key(value) >> shift) & 0xFF) as usize;
        target[bucket_starts[bucket]] = *value;
        bucket_starts[bucket] += 1;
    }
}

/// Stable sort of `values` by `key`, considering only the digits needed for `max_key`.
///
/// `scratch` is resized to match `values` and left holding unspecified contents; passing
/// the same scratch vector every step avoids reallocation.
pub fn sort_by_key<T: Copy>(values: &mut Vec<T>, scratch: &mut Vec<T>, max_key: u32, key: impl Fn(&T) -> u32) {
    let passes = digit_count(max_key);
    if values.len() < 2 || passes == 0 {
        return;
    }
    scratch.clear();
    scratch.extend_from_slice(values);

    let mut bucket_counts = [0usize; BUCKET_COUNT];
    for pass in 0..passes {
        let shift = pass * DIGIT_BITS;
        bucket_counts.fill(0);
        for value in values.iter() {
            bucket_counts[((key(value) >> shift) & 0xFF) as usize] += 1;
        }
        calculate_partial_sums(&mut bucket_counts);
        reorder_for_digit(values, scratch, &mut bucket_counts, shift, &key);
        std::mem::swap(values, scratch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn digit_counts() {
        assert_eq!(digit_count(0), 0);
        assert_eq!(digit_count(1), 1);
        assert_eq!(digit_count(255), 1);
        assert_eq!(digit_count(256), 2);
        assert_eq!(digit_count(0xFF_FFFF), 3);
        assert_eq!(significant_bits(14), 4);
    }

    #[test]
    fn sorts_stably_by_key() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut values: Vec<(u32, u32)> = (0..2000).map(|i| (rng.gen_range(0..700), i)).collect();
        let mut expected = values.clone();
        expected.sort_by_key(|v| v.0);
        let mut scratch = Vec::new();
        sort_by_key(&mut values, &mut scratch, 699, |v| v.0);
        assert_eq!(values, expected);
    }
}
