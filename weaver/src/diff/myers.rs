//! Myers O(ND) shortest edit script
//!
//! The forward pass records the furthest-reaching x for every diagonal k
//! after each round d. Round d's values for k in -d..=d are appended to a
//! single arena, so round d starts at index d² and ends before (d+1)².
//! The back-trace walks those snapshots from (n, m) to (0, 0) without
//! recursion.
//!
//! Common leading and trailing elements are matched before the forward pass,
//! so the trace only covers the changed middle. The trace grows with the
//! square of the edit distance; past `MAX_EDIT_ROUNDS` the middle is emitted
//! as a plain delete-then-insert block instead of a minimal script.

/// One step of an edit script, indexes into the original (a) or modified (b)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// a[i] == b[j]
    Equal(usize, usize),
    /// a[i] is removed
    Delete(usize),
    /// b[j] is inserted
    Insert(usize),
}

/// Per-round V snapshots in one flat buffer
struct Trace {
    arena: Vec<usize>,
}

impl Trace {
    fn with_capacity(hint: usize) -> Self {
        Self {
            arena: Vec::with_capacity(hint),
        }
    }

    /// Furthest x on diagonal k after round d; requires |k| <= d
    fn at(&self, d: isize, k: isize) -> usize {
        self.arena[(d * d + k + d) as usize]
    }
}

/// Rounds of the forward pass before giving up on a minimal script
pub const MAX_EDIT_ROUNDS: usize = 2048;

/// Compute an edit script turning `a` into `b`
///
/// Minimal whenever the changed middle needs at most `MAX_EDIT_ROUNDS` edits.
pub fn shortest_edit<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Edit> {
    edit_script(a, b, MAX_EDIT_ROUNDS)
}

fn edit_script<T: PartialEq>(a: &[T], b: &[T], max_rounds: usize) -> Vec<Edit> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];

    let mut edits = Vec::with_capacity(a.len().max(b.len()) + a_mid.len().min(b_mid.len()));
    edits.extend((0..prefix).map(|i| Edit::Equal(i, i)));

    let middle = forward(a_mid, b_mid, max_rounds).unwrap_or_else(|| {
        (0..a_mid.len())
            .map(Edit::Delete)
            .chain((0..b_mid.len()).map(Edit::Insert))
            .collect()
    });
    edits.extend(middle.into_iter().map(|edit| match edit {
        Edit::Equal(i, j) => Edit::Equal(i + prefix, j + prefix),
        Edit::Delete(i) => Edit::Delete(i + prefix),
        Edit::Insert(j) => Edit::Insert(j + prefix),
    }));

    let a_tail = a.len() - suffix;
    let b_tail = b.len() - suffix;
    edits.extend((0..suffix).map(|i| Edit::Equal(a_tail + i, b_tail + i)));
    edits
}

/// Forward pass plus back-trace; None once `max_rounds` is exceeded
fn forward<T: PartialEq>(a: &[T], b: &[T], max_rounds: usize) -> Option<Vec<Edit>> {
    let n = a.len();
    let m = b.len();
    let max = (n + m) as isize;
    let offset = max + 1;

    // v[k + offset] is the furthest x reached on diagonal k
    let mut v = vec![0usize; 2 * max as usize + 3];
    let mut trace = Trace::with_capacity((n + m).min(1024));
    let mut final_d = 0isize;

    'rounds: for d in 0..=max {
        if d as usize > max_rounds {
            return None;
        }
        for k in (-d..=d).step_by(2) {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = (x as isize - k) as usize;
            while x < n && y < m && a[x] == b[y] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                final_d = d;
                break 'rounds;
            }
        }
        for k in -d..=d {
            trace.arena.push(v[(k + offset) as usize]);
        }
    }

    Some(backtrack(&trace, n, m, final_d))
}

fn backtrack(trace: &Trace, n: usize, m: usize, final_d: isize) -> Vec<Edit> {
    let mut edits = Vec::with_capacity(n.max(m) + final_d as usize);
    let mut x = n;
    let mut y = m;

    for d in (1..=final_d).rev() {
        let k = x as isize - y as isize;
        let down = k == -d || (k != d && trace.at(d - 1, k - 1) < trace.at(d - 1, k + 1));
        let prev_k = if down { k + 1 } else { k - 1 };
        let prev_x = trace.at(d - 1, prev_k);
        let prev_y = (prev_x as isize - prev_k) as usize;

        // The snake ends where the single edit of this round landed
        let (mid_x, mid_y) = if down { (prev_x, prev_y + 1) } else { (prev_x + 1, prev_y) };
        while x > mid_x && y > mid_y {
            x -= 1;
            y -= 1;
            edits.push(Edit::Equal(x, y));
        }
        if down {
            edits.push(Edit::Insert(prev_y));
        } else {
            edits.push(Edit::Delete(prev_x));
        }
        x = prev_x;
        y = prev_y;
    }

    while x > 0 && y > 0 {
        x -= 1;
        y -= 1;
        edits.push(Edit::Equal(x, y));
    }

    edits.reverse();
    edits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost(edits: &[Edit]) -> usize {
        edits.iter().filter(|e| !matches!(e, Edit::Equal(..))).count()
    }

    #[test]
    fn test_both_empty() {
        let empty: [&str; 0] = [];
        assert!(shortest_edit(&empty, &empty).is_empty());
    }

    #[test]
    fn test_identical() {
        let a = ["a", "b", "c"];
        let edits = shortest_edit(&a, &a);
        assert_eq!(edits, vec![Edit::Equal(0, 0), Edit::Equal(1, 1), Edit::Equal(2, 2)]);
    }

    #[test]
    fn test_single_substitution_deletes_first() {
        let edits = shortest_edit(&["A"], &["B"]);
        assert_eq!(edits, vec![Edit::Delete(0), Edit::Insert(0)]);
    }

    #[test]
    fn test_insert_only() {
        let empty: [&str; 0] = [];
        let edits = shortest_edit(&empty, &["x", "y"]);
        assert_eq!(edits, vec![Edit::Insert(0), Edit::Insert(1)]);
    }

    #[test]
    fn test_delete_only() {
        let empty: [&str; 0] = [];
        let edits = shortest_edit(&["x", "y"], &empty);
        assert_eq!(edits, vec![Edit::Delete(0), Edit::Delete(1)]);
    }

    #[test]
    fn test_classic_example_is_minimal() {
        // ABCABBA -> CBABAC has edit distance 5
        let a: Vec<char> = "ABCABBA".chars().collect();
        let b: Vec<char> = "CBABAC".chars().collect();
        let edits = shortest_edit(&a, &b);
        assert_eq!(cost(&edits), 5);
    }

    #[test]
    fn test_common_prefix_and_suffix_kept() {
        let a = ["use a;", "fn main() {", "    old();", "}"];
        let b = ["use a;", "fn main() {", "    new();", "    more();", "}"];
        let edits = shortest_edit(&a, &b);
        assert_eq!(
            edits,
            vec![
                Edit::Equal(0, 0),
                Edit::Equal(1, 1),
                Edit::Delete(2),
                Edit::Insert(2),
                Edit::Insert(3),
                Edit::Equal(3, 4),
            ]
        );
    }

    #[test]
    fn test_changed_middle_in_long_file() {
        let a: Vec<String> = (0..5000).map(|i| format!("line {}", i)).collect();
        let mut b = a.clone();
        b[2500] = "changed".to_string();
        let edits = shortest_edit(&a, &b);

        assert_eq!(cost(&edits), 2);
        assert_eq!(edits[2500], Edit::Delete(2500));
        assert_eq!(edits[2501], Edit::Insert(2500));
        assert_eq!(edits.last(), Some(&Edit::Equal(4999, 4999)));
    }

    #[test]
    fn test_round_cap_falls_back_to_replace_block() {
        let a = ["k", "a1", "a2", "a3", "z"];
        let b = ["k", "b1", "b2", "z"];
        let edits = edit_script(&a, &b, 1);
        assert_eq!(
            edits,
            vec![
                Edit::Equal(0, 0),
                Edit::Delete(1),
                Edit::Delete(2),
                Edit::Delete(3),
                Edit::Insert(1),
                Edit::Insert(2),
                Edit::Equal(4, 3),
            ]
        );
    }

    #[test]
    fn test_disjoint_inputs_stay_bounded() {
        let a: Vec<usize> = (0..5000).collect();
        let b: Vec<usize> = (5000..10000).collect();
        let edits = shortest_edit(&a, &b);
        assert_eq!(cost(&edits), 10000);
        assert!(edits[..5000].iter().all(|e| matches!(e, Edit::Delete(_))));
    }
}
