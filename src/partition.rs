/// Partitions the parallel slices `test` and `other` according to a predicate on the elements of
/// `test`. Swaps elements such that all those satisfying `P` appear before any element not
/// satisfying `P`, applying every swap to both slices so that pairs stay together.
///
/// The index `i` returned by the function always points at the first element for which `P` is false.
/// Note that if `P` is trivial, then `i = |test|` points outside the slice.
///
/// # Panics
/// If the slices differ in length.
pub(crate) fn partition_in_place<T, U, P>(test: &mut [T], other: &mut [U], mut predicate: P) -> usize
where
    P: FnMut(&T) -> bool,
{
    assert_eq!(test.len(), other.len(), "partitioned slices must be parallel");

    if test.is_empty() {
        return 0;
    }

    let (mut lo, mut hi) = (0, test.len() - 1);

    while lo < hi {
        if predicate(&test[lo]) {
            lo += 1;
            continue;
        }

        if !predicate(&test[hi]) {
            hi -= 1;
            continue;
        }

        test.swap(lo, hi);
        other.swap(lo, hi);
        lo += 1;
        hi -= 1;
    }

    if predicate(&test[lo]) {
        lo + 1
    } else {
        lo
    }
}
