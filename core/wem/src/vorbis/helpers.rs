//! Helper functions from the Vorbis specification.

/// Integer log base 2 - returns the number of bits needed to represent a value.
///
/// Named to match the Vorbis specification.
/// Returns 0 for input 0, otherwise returns floor(log2(v)) + 1.
#[inline]
pub fn ilog(v: u32) -> u32 {
    32 - v.leading_zeros()
}

/// Number of multiplicands in a type 1 lookup table: the largest `v` with
/// `v^dimensions <= entries`.
pub fn lookup1_values(entries: u32, dimensions: u32) -> u32 {
    if dimensions == 0 || entries == 0 {
        return 0;
    }

    let fits = |v: u32| {
        u64::from(v)
            .checked_pow(dimensions)
            .is_some_and(|power| power <= u64::from(entries))
    };

    // Binary search for the last `v` that fits; 1 always does.
    let (mut low, mut high) = (1u32, entries);
    while low < high {
        let mid = low + (high - low).div_ceil(2);
        if fits(mid) {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    low
}
