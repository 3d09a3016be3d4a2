//! Order-independent pair keys for per-tick deduplication

/// Combine two numeric entity ids into a single order-independent key.
///
/// The smaller id occupies the high 32 bits, so the mapping is symmetric
/// (`pair_key(x, y) == pair_key(y, x)`) and injective over the full `u32`
/// id range; no population-size cap is needed.
#[must_use]
pub fn pair_key(x: u32, y: u32) -> u64 {
    let (lo, hi) = if x <= y { (x, y) } else { (y, x) };
    (u64::from(lo) << 32) | u64::from(hi)
}
