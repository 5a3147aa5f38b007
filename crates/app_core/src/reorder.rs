//! Drag-and-drop reordering inside one reference

use crate::FileId;
use std::collections::HashMap;

/// Compute the order after dropping `dragged` onto `target`
///
/// `current` is the saved custom order, if any; `visible` is the displayed
/// sequence of the reference's files and seeds the order when nothing is saved.
/// The result still needs pruning against the reference's members.
pub fn move_before(
    current: Option<&[FileId]>,
    visible: &[FileId],
    dragged: FileId,
    target: FileId,
) -> Vec<FileId> {
    let mut order: Vec<FileId> = current.unwrap_or(visible).to_vec();
    order.retain(|id| *id != dragged);

    if let Some(at) = order.iter().position(|id| *id == target) {
        order.insert(at, dragged);
        return order;
    }

    // Target missing from the saved order: fall back to display ranks
    let rank: HashMap<FileId, usize> = visible.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let slot = rank.get(&target).and_then(|target_rank| {
        order
            .iter()
            .position(|id| rank.get(id).is_some_and(|r| r >= target_rank))
    });

    match slot {
        Some(at) => order.insert(at, dragged),
        None => order.push(dragged),
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<FileId> {
        (0..n).map(|_| FileId::new()).collect()
    }

    #[test]
    fn test_seeded_from_visible() {
        let v = ids(3);
        let (x, y, z) = (v[0], v[1], v[2]);
        assert_eq!(move_before(None, &v, z, x), vec![z, x, y]);
    }

    #[test]
    fn test_moves_down() {
        let v = ids(4);
        assert_eq!(move_before(Some(&v), &v, v[0], v[3]), vec![v[1], v[2], v[0], v[3]]);
    }

    #[test]
    fn test_target_outside_saved_order_uses_visible_rank() {
        let v = ids(4);
        // Saved order knows a, b, d; c was associated later and only shows up on screen
        let saved = vec![v[0], v[1], v[3]];
        let result = move_before(Some(&saved), &v, v[0], v[2]);
        assert_eq!(result, vec![v[1], v[0], v[3]]);
    }

    #[test]
    fn test_invisible_target_appends() {
        let v = ids(3);
        let stranger = FileId::new();
        assert_eq!(move_before(Some(&v), &v, v[0], stranger), vec![v[1], v[2], v[0]]);
    }
}
