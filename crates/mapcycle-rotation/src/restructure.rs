//! Cyclic reordering of the remote rotation.
//!
//! Servers play their list top to bottom. Once the current map has
//! drifted deep into the list, the rotation is rotated so that the maps
//! after the current one come first, followed by the ones before it.
//! Membership never changes; only the starting point does.

/// Result of a restructure attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restructure {
    /// Nothing to do; no remote call was made.
    Unchanged,
    /// The reordered list was sent. Carries the count the server accepted.
    Submitted(usize),
}

/// Rotates `order` so it continues after `position`.
///
/// Returns `order[position + 1..]` followed by `order[..position]`: the
/// upcoming maps in play order, without the current one. An out-of-range
/// `position` yields the list unchanged.
///
/// ```rust
/// use mapcycle_rotation::rotate_after;
///
/// let order = ["M0", "M1", "M2", "M3", "M4"];
/// assert_eq!(rotate_after(&order, 3), ["M4", "M0", "M1", "M2"]);
/// ```
pub fn rotate_after<T: Clone>(order: &[T], position: usize) -> Vec<T> {
    if position >= order.len() {
        return order.to_vec();
    }
    let (before, from_current) = order.split_at(position);
    from_current[1..]
        .iter()
        .chain(before.iter())
        .cloned()
        .collect()
}
