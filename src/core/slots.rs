//! Pinned-slot placement for skill and project cards.
//!
//! An item whose position is an integer in `1..=n` claims that slot, first
//! claim wins. Every other item floats: the floating items are shuffled
//! uniformly and poured into the free slots from left to right, so each load
//! shows a fresh order around the curated placements.

use crate::domain::model::{CategoryColumn, Positionable, Skill};
use rand::seq::SliceRandom;
use rand::Rng;

/// Category used for skills that carry none.
pub const UNCATEGORIZED: &str = "Otros";

/// 0-based slot an advisory position maps to, if it is usable at all.
pub fn slot_for(position: Option<f64>, len: usize) -> Option<usize> {
    let p = position?;
    if p.fract() != 0.0 || p < 1.0 || p > len as f64 {
        return None;
    }
    Some(p as usize - 1)
}

/// Places items using the thread-local RNG.
pub fn assign<T: Positionable>(items: Vec<T>) -> Vec<T> {
    assign_with(items, &mut rand::thread_rng())
}

/// Places items drawing the shuffle from `rng`.
pub fn assign_with<T, R>(items: Vec<T>, rng: &mut R) -> Vec<T>
where
    T: Positionable,
    R: Rng + ?Sized,
{
    let n = items.len();
    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(n).collect();
    let mut floating = Vec::new();

    for item in items {
        match slot_for(item.position(), n) {
            Some(slot) if slots[slot].is_none() => slots[slot] = Some(item),
            _ => floating.push(item),
        }
    }

    // Fisher-Yates
    floating.shuffle(rng);

    let mut floating = floating.into_iter();
    for slot in slots.iter_mut().filter(|s| s.is_none()) {
        *slot = floating.next();
    }

    // pinned + floating == n, so every slot is filled by now
    slots.into_iter().flatten().collect()
}

/// Groups skills into columns by category, in order of first appearance.
pub fn group_by_category(skills: &[Skill]) -> Vec<CategoryColumn> {
    let mut columns: Vec<CategoryColumn> = Vec::new();

    for skill in skills {
        let category = skill
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED);

        match columns.iter_mut().find(|c| c.category == category) {
            Some(column) => column.skills.push(skill.clone()),
            None => columns.push(CategoryColumn {
                category: category.to_string(),
                skills: vec![skill.clone()],
            }),
        }
    }

    columns
}
