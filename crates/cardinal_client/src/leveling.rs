//! Leveling curve.
//!
//! The total xp needed to reach level `L` is
//! `L * (2.5 * L^2 + 8.5 * L + 89)`.

/// Total xp required to reach `level`.
///
/// ```
/// use cardinal_client::xp_for_level;
///
/// assert_eq!(xp_for_level(0), 0.0);
/// assert_eq!(xp_for_level(1), 100.0);
/// assert_eq!(xp_for_level(2), 232.0);
/// ```
pub fn xp_for_level(level: u32) -> f64 {
    let l = f64::from(level);
    l * (2.5 * l * l + 8.5 * l + 89.0)
}

/// Highest level whose threshold `xp` has reached.
///
/// Unlike [`Member::add_xp`](crate::Member::add_xp), which only ever
/// advances one level per call, this cascades through every threshold.
pub fn level_for_xp(xp: u64) -> u32 {
    let xp = xp as f64;
    let mut level = 0;
    while xp >= xp_for_level(level + 1) {
        level += 1;
    }
    level
}

/// Level after adding xp to a member at `level` whose total is now
/// `new_xp`: at most one step up.
pub(crate) fn next_level(level: u32, new_xp: u64) -> u32 {
    match level.checked_add(1) {
        Some(next) if new_xp as f64 >= xp_for_level(next) => next,
        _ => level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_values() {
        assert_eq!(xp_for_level(1), 100.0);
        assert_eq!(xp_for_level(3), 3.0 * (22.5 + 25.5 + 89.0));
        assert_eq!(xp_for_level(10), 10.0 * (250.0 + 85.0 + 89.0));
    }

    #[test]
    fn test_level_for_xp_cascades() {
        assert_eq!(level_for_xp(0), 0);
        assert_eq!(level_for_xp(99), 0);
        assert_eq!(level_for_xp(100), 1);
        assert_eq!(level_for_xp(231), 1);
        assert_eq!(level_for_xp(232), 2);
        assert_eq!(level_for_xp(10_000), 14);
    }

    #[test]
    fn test_next_level_is_single_step() {
        assert_eq!(next_level(0, 100), 1);
        assert_eq!(next_level(0, 50), 0);
        assert_eq!(next_level(0, 10_000), 1);
    }

    #[test]
    fn test_next_level_at_bounds() {
        assert_eq!(next_level(u32::MAX, u64::MAX), u32::MAX);
        assert_eq!(next_level(3, u64::MAX), 4);
    }
}
