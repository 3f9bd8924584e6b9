//! The flat, fixed-capacity ordered scene list.

use cgmath::Vector3;
use thiserror::Error;

/// Returned by [`Scene::push`] when every slot is occupied.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("scene is full ({capacity} slots)")]
pub struct SceneFull {
    pub capacity: usize,
}

/// An ordered collection of scene entries with a capacity fixed at
/// construction.
///
/// Entries fill a contiguous prefix of the slots; insertion order is render
/// order and there is no sorting or depth-based reordering (the renderer
/// relies on the depth test instead). Traversal visits the occupied prefix
/// and stops at the first empty slot, so it is finite and restartable without
/// a stored count being consulted. No removal is exposed: the scene is never
/// resized after setup.
#[derive(Debug)]
pub struct Scene<T> {
    slots: Vec<Option<T>>,
    live: usize,
}

impl<T> Scene<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots, live: 0 }
    }

    /// Place `value` in the next free slot, preserving the no-gap invariant.
    /// Returns the slot index.
    pub fn push(&mut self, value: T) -> Result<usize, SceneFull> {
        if self.live == self.slots.len() {
            return Err(SceneFull {
                capacity: self.slots.len(),
            });
        }
        let index = self.live;
        self.slots[index] = Some(value);
        self.live += 1;
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(|slot| slot.as_mut())
    }

    /// Visit every live entry in insertion order, stopping at the first
    /// empty slot.
    pub fn for_each(&self, mut visit: impl FnMut(usize, &T)) {
        for (index, slot) in self.slots.iter().enumerate() {
            match slot {
                Some(value) => visit(index, value),
                None => break,
            }
        }
    }

    /// Like [`for_each`](Self::for_each) with mutable access, used by the
    /// per-frame transform update.
    pub fn for_each_mut(&mut self, mut visit: impl FnMut(usize, &mut T)) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            match slot {
                Some(value) => visit(index, value),
                None => break,
            }
        }
    }
}

/// Row-major grid translations centered around the origin:
/// `((x - cols/2) * spacing, 0, (y - rows/2) * spacing)`.
pub fn grid_translations(
    cols: usize,
    rows: usize,
    spacing: f32,
) -> impl Iterator<Item = Vector3<f32>> {
    let half_cols = cols as f32 / 2.0;
    let half_rows = rows as f32 / 2.0;
    (0..rows).flat_map(move |y| {
        (0..cols).map(move |x| {
            Vector3::new(
                (x as f32 - half_cols) * spacing,
                0.0,
                (y as f32 - half_rows) * spacing,
            )
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_visits_live_prefix_in_insertion_order() {
        let mut scene = Scene::with_capacity(5);
        scene.push("a").unwrap();
        scene.push("b").unwrap();
        scene.push("c").unwrap();

        let mut visited = Vec::new();
        scene.for_each(|index, value| visited.push((index, *value)));
        assert_eq!(visited, vec![(0, "a"), (1, "b"), (2, "c")]);

        // Restartable: a second traversal sees the same prefix.
        let mut count = 0;
        scene.for_each(|_, _| count += 1);
        assert_eq!(count, 3);
    }

    #[test]
    fn traversal_of_empty_scene_visits_nothing() {
        let scene: Scene<u32> = Scene::with_capacity(4);
        let mut count = 0;
        scene.for_each(|_, _| count += 1);
        assert_eq!(count, 0);
        assert!(scene.is_empty());
    }

    #[test]
    fn push_past_capacity_fails() {
        let mut scene = Scene::with_capacity(2);
        assert_eq!(scene.push(1), Ok(0));
        assert_eq!(scene.push(2), Ok(1));
        assert_eq!(scene.push(3), Err(SceneFull { capacity: 2 }));
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn full_scene_traversal_terminates() {
        let mut scene = Scene::with_capacity(3);
        for i in 0..3 {
            scene.push(i).unwrap();
        }
        let mut count = 0;
        scene.for_each(|_, _| count += 1);
        assert_eq!(count, 3);
    }

    #[test]
    fn for_each_mut_updates_entries() {
        let mut scene = Scene::with_capacity(3);
        scene.push(1).unwrap();
        scene.push(2).unwrap();
        scene.for_each_mut(|_, value| *value *= 10);
        assert_eq!(scene.get(0), Some(&10));
        assert_eq!(scene.get(1), Some(&20));
        assert_eq!(scene.get(2), None);
    }

    #[test]
    fn ten_by_ten_grid_fills_one_hundred_slots_row_major() {
        let mut scene = Scene::with_capacity(100);
        for translation in grid_translations(10, 10, 10.0) {
            scene.push(translation).unwrap();
        }
        assert_eq!(scene.len(), 100);

        let mut visited = 0;
        scene.for_each(|index, translation| {
            let x = index % 10;
            let y = index / 10;
            assert_eq!(
                *translation,
                Vector3::new((x as f32 - 5.0) * 10.0, 0.0, (y as f32 - 5.0) * 10.0)
            );
            visited += 1;
        });
        assert_eq!(visited, 100);
        assert!(scene.push(Vector3::new(0.0, 0.0, 0.0)).is_err());
    }
}
