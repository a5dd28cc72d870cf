//! Jump reachability between platforms.
//!
//! The predicate is directional: `can_jump(a, b)` and `can_jump(b, a)` can
//! disagree, so any graph built from it has directed edges.

use crate::model::Platform;

/// Overlapping spans: `from` must sit strictly between these many pixels
/// below `to`.
const MIN_RISE: i32 = 10;
const MAX_RISE: i32 = 55;
/// Disjoint spans: horizontal gap and vertical offset limits.
const MAX_GAP: i32 = 70;
const MAX_SIDE_DY: i32 = 30;

pub fn can_jump(from: &Platform, to: &Platform) -> bool {
    let overlap = from.overlaps(to);
    let dy = from.y - to.y;
    let dx = (from.x_end - to.x_start)
        .abs()
        .min((from.x_start - to.x_end).abs());
    if overlap {
        MIN_RISE < dy && dy < MAX_RISE
    } else {
        dx < MAX_GAP && dy.abs() < MAX_SIDE_DY
    }
}

/// Every ordered pair `(i, j)`, `i != j`, with `can_jump(platforms[i],
/// platforms[j])`, in row-major order.
pub fn jump_edges(platforms: &[Platform]) -> Vec<(usize, usize)> {
    let mut edges = Vec::new();
    for (i, from) in platforms.iter().enumerate() {
        for (j, to) in platforms.iter().enumerate() {
            if i != j && can_jump(from, to) {
                edges.push((i, j));
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn p(y: i32, x_start: i32, x_end: i32) -> Platform {
        Platform::new(y, x_start, x_end)
    }

    #[rstest]
    // from 30 up to 0 over the same span
    #[case(p(30, 0, 10), p(0, 0, 10), true)]
    // same pair the other way round is a 30px drop
    #[case(p(0, 0, 10), p(30, 0, 10), false)]
    #[case(p(0, 0, 10), p(0, 0, 10), false)]
    #[case(p(0, 0, 10), p(10, 200, 210), false)]
    #[case(p(20, 0, 10), p(10, 0, 10), false)]
    #[case(p(64, 0, 10), p(10, 0, 10), true)]
    #[case(p(65, 0, 10), p(10, 0, 10), false)]
    // touching ends still count as overlap
    #[case(p(40, 0, 10), p(20, 10, 30), true)]
    #[case(p(0, 0, 10), p(20, 79, 90), true)]
    #[case(p(0, 0, 10), p(20, 80, 90), false)]
    #[case(p(0, 0, 10), p(-29, 50, 90), true)]
    #[case(p(0, 0, 10), p(30, 50, 90), false)]
    fn can_jump_cases(#[case] from: Platform, #[case] to: Platform, #[case] expected: bool) {
        assert_eq!(can_jump(&from, &to), expected);
    }

    #[test]
    fn edges_are_directed() {
        let platforms = vec![p(30, 0, 10), p(0, 0, 10), p(25, 40, 60)];
        let edges = jump_edges(&platforms);
        assert!(edges.contains(&(0, 1)));
        assert!(!edges.contains(&(1, 0)));
        // side hops within 30px rows are symmetric here
        assert!(edges.contains(&(0, 2)));
        assert!(edges.contains(&(2, 0)));
        assert!(edges.iter().all(|&(i, j)| i != j));
    }

    #[test]
    fn no_edges_for_single_platform() {
        assert!(jump_edges(&[p(5, 0, 100)]).is_empty());
    }
}
