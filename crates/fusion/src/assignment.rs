//! Minimum-cost bipartite assignment with a hard gate.
//!
//! Kuhn-Munkres with row/column potentials, O(n²·m) for an n×m cost matrix
//! (n ≤ m after an internal transpose). Gated cells carry a sentinel cost so
//! the solver first maximizes the number of admissible matches, then
//! minimizes their total cost; sentinel assignments are dropped from the
//! result.

use nalgebra::DMatrix;

/// Cost given to a pair rejected by the gate
const GATED_COST: f64 = 1.0e6;

/// One admissible assignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    pub row: usize,
    pub col: usize,
    pub cost: f64,
}

/// Solve the gated assignment problem over `cost` (rows × cols).
///
/// Pairs with `cost > gate` or a non-finite cost are never returned.
pub fn min_cost_assignment(cost: &DMatrix<f64>, gate: f64) -> Vec<Assignment> {
    if cost.nrows() == 0 || cost.ncols() == 0 {
        return Vec::new();
    }

    let admissible = |c: f64| c.is_finite() && c <= gate;
    let gated = cost.map(|c| if admissible(c) { c } else { GATED_COST });

    let transposed = gated.nrows() > gated.ncols();
    let work = if transposed { gated.transpose() } else { gated };

    let mut result: Vec<Assignment> = solve(&work)
        .into_iter()
        .map(|(r, c)| if transposed { (c, r) } else { (r, c) })
        .filter_map(|(row, col)| {
            let c = cost[(row, col)];
            admissible(c).then_some(Assignment { row, col, cost: c })
        })
        .collect();
    result.sort_by_key(|a| a.row);
    result
}

/// Hungarian algorithm, rows ≤ cols. Returns (row, col) for every row.
fn solve(a: &DMatrix<f64>) -> Vec<(usize, usize)> {
    let n = a.nrows();
    let m = a.ncols();
    debug_assert!(n <= m);

    // 1-based potentials; index 0 is the virtual column/row.
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; m + 1];
    let mut p = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let cur = a[(i0 - 1, j - 1)] - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    (1..=m)
        .filter(|&j| p[j] != 0)
        .map(|j| (p[j] - 1, j - 1))
        .collect()
}
