//! Indexed binary min-heap of runnable tasks, ordered by vruntime.
//!
//! The heap stores slab keys; each task's `heap_slot` back-pointer tracks its
//! current position so update and remove stay O(log n) without a search.
//! Callers pass the task arena into every mutating call, keeping a single
//! owner for task state.

use slab::Slab;

use crate::task::Task;

#[derive(Debug, Default)]
pub struct VruntimeHeap {
    slots: Vec<usize>,
}

#[inline]
fn parent(i: usize) -> usize {
    (i - 1) / 2
}

impl VruntimeHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop all entries. Back-pointers of the dropped tasks are NOT touched;
    /// the tick engine resets every task's slot before re-inserting.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Key of the minimum-vruntime task, if any.
    pub fn peek(&self) -> Option<usize> {
        self.slots.first().copied()
    }

    pub fn insert(&mut self, tasks: &mut Slab<Task>, key: usize) {
        let idx = self.slots.len();
        self.slots.push(key);
        tasks[key].heap_slot = Some(idx);
        self.sift_up(tasks, idx);
    }

    pub fn extract_min(&mut self, tasks: &mut Slab<Task>) -> Option<usize> {
        if self.slots.is_empty() {
            return None;
        }
        let min = self.slots[0];
        tasks[min].heap_slot = None;

        let last = self.slots.pop().expect("non-empty");
        if !self.slots.is_empty() {
            self.slots[0] = last;
            tasks[last].heap_slot = Some(0);
            self.sift_down(tasks, 0);
        }
        Some(min)
    }

    /// Restore ordering after `key`'s vruntime changed in place.
    /// No-op when the task is not currently enqueued.
    pub fn update(&mut self, tasks: &mut Slab<Task>, key: usize) {
        let Some(idx) = self.slot_of(tasks, key) else {
            return;
        };
        if idx > 0 && tasks[self.slots[parent(idx)]].vruntime > tasks[key].vruntime {
            self.sift_up(tasks, idx);
        } else {
            self.sift_down(tasks, idx);
        }
    }

    /// Remove `key` from an arbitrary position. No-op when not enqueued.
    pub fn remove(&mut self, tasks: &mut Slab<Task>, key: usize) {
        let Some(idx) = self.slot_of(tasks, key) else {
            return;
        };
        tasks[key].heap_slot = None;

        let last = self.slots.pop().expect("non-empty");
        if idx < self.slots.len() {
            self.slots[idx] = last;
            tasks[last].heap_slot = Some(idx);
            if idx > 0 && tasks[self.slots[parent(idx)]].vruntime > tasks[last].vruntime {
                self.sift_up(tasks, idx);
            } else {
                self.sift_down(tasks, idx);
            }
        }
    }

    /// Validated position of `key`, guarding against stale back-pointers.
    fn slot_of(&self, tasks: &Slab<Task>, key: usize) -> Option<usize> {
        let idx = tasks[key].heap_slot?;
        if idx < self.slots.len() && self.slots[idx] == key {
            Some(idx)
        } else {
            None
        }
    }

    fn sift_up(&mut self, tasks: &mut Slab<Task>, mut idx: usize) {
        while idx > 0 {
            let p = parent(idx);
            if tasks[self.slots[p]].vruntime > tasks[self.slots[idx]].vruntime {
                self.swap(tasks, idx, p);
                idx = p;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, tasks: &mut Slab<Task>, mut idx: usize) {
        loop {
            let left = 2 * idx + 1;
            let right = 2 * idx + 2;
            let mut min = idx;
            if left < self.slots.len()
                && tasks[self.slots[left]].vruntime < tasks[self.slots[min]].vruntime
            {
                min = left;
            }
            if right < self.slots.len()
                && tasks[self.slots[right]].vruntime < tasks[self.slots[min]].vruntime
            {
                min = right;
            }
            if min == idx {
                break;
            }
            self.swap(tasks, idx, min);
            idx = min;
        }
    }

    fn swap(&mut self, tasks: &mut Slab<Task>, i: usize, j: usize) {
        self.slots.swap(i, j);
        tasks[self.slots[i]].heap_slot = Some(i);
        tasks[self.slots[j]].heap_slot = Some(j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(vruntimes: &[f64]) -> (Slab<Task>, Vec<usize>) {
        let mut tasks = Slab::new();
        let keys = vruntimes
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let mut t = Task::new(format!("T{i}"), 0, None);
                t.vruntime = v;
                tasks.insert(t)
            })
            .collect();
        (tasks, keys)
    }

    fn check_backpointers(heap: &VruntimeHeap, tasks: &Slab<Task>) {
        for (idx, &key) in heap.slots.iter().enumerate() {
            assert_eq!(tasks[key].heap_slot, Some(idx));
        }
    }

    #[test]
    fn extracts_in_vruntime_order() {
        let (mut tasks, keys) = arena(&[5.0, 1.0, 3.0, 4.0, 2.0]);
        let mut heap = VruntimeHeap::new();
        for &k in &keys {
            heap.insert(&mut tasks, k);
            check_backpointers(&heap, &tasks);
        }
        assert_eq!(heap.len(), 5);
        assert_eq!(heap.peek(), Some(keys[1]));

        let mut order = Vec::new();
        while let Some(k) = heap.extract_min(&mut tasks) {
            assert_eq!(tasks[k].heap_slot, None);
            order.push(tasks[k].vruntime);
            check_backpointers(&heap, &tasks);
        }
        assert_eq!(order, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(heap.is_empty());
        assert_eq!(heap.extract_min(&mut tasks), None);
    }

    #[test]
    fn update_reorders_in_place() {
        let (mut tasks, keys) = arena(&[1.0, 2.0, 3.0, 4.0]);
        let mut heap = VruntimeHeap::new();
        for &k in &keys {
            heap.insert(&mut tasks, k);
        }

        // push the current minimum to the back
        tasks[keys[0]].vruntime = 10.0;
        heap.update(&mut tasks, keys[0]);
        check_backpointers(&heap, &tasks);
        assert_eq!(heap.peek(), Some(keys[1]));

        // pull a late task to the front
        tasks[keys[3]].vruntime = 0.5;
        heap.update(&mut tasks, keys[3]);
        check_backpointers(&heap, &tasks);
        assert_eq!(heap.peek(), Some(keys[3]));
    }

    #[test]
    fn remove_from_middle_keeps_order() {
        let (mut tasks, keys) = arena(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut heap = VruntimeHeap::new();
        for &k in &keys {
            heap.insert(&mut tasks, k);
        }

        heap.remove(&mut tasks, keys[2]);
        assert_eq!(tasks[keys[2]].heap_slot, None);
        check_backpointers(&heap, &tasks);

        let mut order = Vec::new();
        while let Some(k) = heap.extract_min(&mut tasks) {
            order.push(tasks[k].vruntime);
        }
        assert_eq!(order, vec![1.0, 2.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn remove_last_and_not_enqueued_are_safe() {
        let (mut tasks, keys) = arena(&[1.0, 2.0]);
        let mut heap = VruntimeHeap::new();
        heap.insert(&mut tasks, keys[0]);
        heap.insert(&mut tasks, keys[1]);

        heap.remove(&mut tasks, keys[1]);
        assert_eq!(heap.len(), 1);

        // removing a task that is not enqueued is a no-op
        heap.remove(&mut tasks, keys[1]);
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.peek(), Some(keys[0]));
    }
}
