//! The scheduling engine: registries, event dispatch, and the tick
//! algorithm. One instance owns all core state; a tick is an atomic unit
//! with no suspension points.

mod events;
mod tick;


use ahash::AHashMap;
use slab::Slab;

use crate::cgroup::{Cgroup, DEFAULT_CPU_SHARES};
use crate::heap::VruntimeHeap;
use crate::task::{Task, TaskState};

pub struct Engine {
    /// Per-CPU slot: key of the task currently assigned, if any.
    cpus: Vec<Option<usize>>,
    /// Milliseconds of runtime accounted per tick.
    quantum: u64,
    /// Task arena; the runnable queue and CPU slots refer into it by key.
    tasks: Slab<Task>,
    by_id: AHashMap<String, usize>,
    cgroups: AHashMap<String, Cgroup>,
    queue: VruntimeHeap,
    vtime: u64,
    preemptions: u64,
    migrations: u64,
}

impl Engine {
    pub fn new(cpu_count: usize, quantum: u64) -> Self {
        Self {
            cpus: vec![None; cpu_count],
            quantum: quantum.max(1),
            tasks: Slab::new(),
            by_id: AHashMap::new(),
            cgroups: AHashMap::new(),
            queue: VruntimeHeap::new(),
            vtime: 0,
            preemptions: 0,
            migrations: 0,
        }
    }

    pub fn cpu_count(&self) -> usize {
        self.cpus.len()
    }

    pub fn quantum(&self) -> u64 {
        self.quantum
    }

    pub fn vtime(&self) -> u64 {
        self.vtime
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.by_id.get(id).map(|&key| &self.tasks[key])
    }

    pub fn cgroup(&self, id: &str) -> Option<&Cgroup> {
        self.cgroups.get(id)
    }

    /// Number of tasks currently enqueued as runnable.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Smallest vruntime over Runnable and Running tasks; 0 when none.
    pub fn min_vruntime(&self) -> f64 {
        let min = self
            .tasks
            .iter()
            .filter(|(_, t)| matches!(t.state, TaskState::Runnable | TaskState::Running))
            .map(|(_, t)| t.vruntime)
            .fold(f64::INFINITY, f64::min);
        if min.is_finite() {
            min
        } else {
            0.0
        }
    }

    /// Largest vruntime over Runnable and Running tasks; 0 when none.
    pub fn max_vruntime(&self) -> f64 {
        self.tasks
            .iter()
            .filter(|(_, t)| matches!(t.state, TaskState::Runnable | TaskState::Running))
            .map(|(_, t)| t.vruntime)
            .fold(0.0, f64::max)
    }

    /// Task weight scaled by its cgroup's shares, floored at 1.
    fn effective_weight(&self, key: usize) -> u32 {
        let task = &self.tasks[key];
        let mut weight = task.weight() as u64;
        if let Some(cg) = self.cgroups.get(task.cgroup()) {
            weight = weight * cg.shares as u64 / DEFAULT_CPU_SHARES as u64;
        }
        weight.max(1) as u32
    }

    /// Placement filter: task affinity intersected with its cgroup's mask.
    fn can_run_on(&self, key: usize, cpu: usize) -> bool {
        let task = &self.tasks[key];
        if !task.can_run_on(cpu) {
            return false;
        }
        match self.cgroups.get(task.cgroup()) {
            Some(cg) => cg.allows_cpu(cpu),
            None => true,
        }
    }
}
