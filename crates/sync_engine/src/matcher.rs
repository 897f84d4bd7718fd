//! Clock/tolerance matcher.
//!
//! Pure decision logic over two monotonic timestamp sequences. The caller
//! owns the buffers and applies the returned step; nothing here mutates.
//!
//! Policy (greedy nearest-timestamp):
//! 1. Take the stream whose oldest frame is earlier (`lead`) and the oldest
//!    frame of the other stream (`anchor`).
//! 2. If the lead front is more than `tolerance` older than the anchor it can
//!    never pair: every frame on the other stream is at least as new as the
//!    anchor. Discard it as stale.
//! 3. Otherwise scan the lead stream forward for the frame nearest to the
//!    anchor (timestamps are monotonic, so the scan stops as soon as the
//!    distance grows) and pair it with the anchor. Lead frames before the
//!    match are stale.

/// Which of the two streams a step refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchStep {
    /// At least one stream is empty
    Wait,
    /// Drop the front frame of `Side`, it cannot pair anymore
    Stale(Side),
    /// Pair `a[a_index]` with `b[b_index]`; frames before either index are stale
    Pair {
        a_index: usize,
        b_index: usize,
        delta: f64,
    },
}

/// Decide the next step for streams `a` and `b` (oldest first).
///
/// Ties on the front timestamp treat `a` as the lead.
pub fn next_step<A, B>(a: A, b: B, tolerance: f64) -> MatchStep
where
    A: IntoIterator<Item = f64>,
    B: IntoIterator<Item = f64>,
{
    let mut a = a.into_iter();
    let mut b = b.into_iter();
    let (Some(a0), Some(b0)) = (a.next(), b.next()) else {
        return MatchStep::Wait;
    };

    if a0 <= b0 {
        match scan(a0, a, b0, tolerance) {
            Some((idx, delta)) => MatchStep::Pair {
                a_index: idx,
                b_index: 0,
                delta,
            },
            None => MatchStep::Stale(Side::A),
        }
    } else {
        match scan(b0, b, a0, tolerance) {
            Some((idx, delta)) => MatchStep::Pair {
                a_index: 0,
                b_index: idx,
                delta,
            },
            None => MatchStep::Stale(Side::B),
        }
    }
}

/// Nearest lead frame to `anchor`, or `None` when the lead front is stale.
fn scan(
    lead_front: f64,
    rest: impl Iterator<Item = f64>,
    anchor: f64,
    tolerance: f64,
) -> Option<(usize, f64)> {
    let mut best = (anchor - lead_front).abs();
    if best > tolerance {
        return None;
    }
    let mut best_idx = 0;
    for (i, t) in rest.enumerate() {
        let d = (t - anchor).abs();
        if d < best {
            best = d;
            best_idx = i + 1;
        } else {
            break;
        }
    }
    Some((best_idx, best))
}
