//! The per-tick algorithm: advance accounting for whatever ran last tick,
//! rebuild the runnable queue, then fill each CPU from the queue minimum
//! subject to affinity, mask, and quota admission.

use ahash::AHashMap;

use super::Engine;
use crate::proto::{Decision, DecisionMeta, IDLE};
use crate::task::TaskState;
use crate::weight::vruntime_delta;

impl Engine {
    /// Run one scheduling step at virtual time `vtime` and produce the
    /// decision record. Events for this tick must already be applied.
    pub fn tick(&mut self, vtime: u64) -> Decision {
        self.vtime = vtime;
        self.preemptions = 0;
        self.migrations = 0;
        self.refresh_periods(vtime);

        let quantum_us = (self.quantum * 1000) as f64;
        let previous: Vec<Option<usize>> = self.cpus.clone();

        // Charge the tasks that held a CPU since the last tick and return
        // them to the runnable pool.
        for cpu in 0..self.cpus.len() {
            if let Some(key) = self.cpus[cpu] {
                if self.tasks[key].state == TaskState::Running {
                    let weight = self.effective_weight(key);
                    let task = &mut self.tasks[key];
                    if !task.in_burst {
                        task.vruntime += vruntime_delta(self.quantum as f64, weight);
                    }
                    let cgroup_id = task.cgroup.clone();
                    if task.in_burst && task.burst_remaining > 0 {
                        task.burst_remaining -= 1;
                        if task.burst_remaining == 0 {
                            task.in_burst = false;
                        }
                    }
                    task.state = TaskState::Runnable;
                    // quota is charged even while a burst freezes vruntime
                    if let Some(cg) = self.cgroups.get_mut(&cgroup_id) {
                        cg.account(quantum_us);
                    }
                }
            }
            self.cpus[cpu] = None;
        }

        self.rebuild_queue();

        // Microseconds already promised to each quota-bearing cgroup by
        // earlier CPUs in this tick. Keeps multi-CPU admission atomic.
        let mut planned: AHashMap<String, f64> = AHashMap::new();
        let mut schedule = Vec::with_capacity(self.cpus.len());

        for cpu in 0..self.cpus.len() {
            match self.pick_for_cpu(cpu, &mut planned, quantum_us) {
                Some(key) => {
                    if matches!(previous[cpu], Some(prev) if prev != key) {
                        self.preemptions += 1;
                    }
                    let task = &mut self.tasks[key];
                    if matches!(task.current_cpu, Some(prev) if prev != cpu) {
                        self.migrations += 1;
                    }
                    task.current_cpu = Some(cpu);
                    task.state = TaskState::Running;
                    schedule.push(task.id().to_string());
                    self.cpus[cpu] = Some(key);
                }
                None => schedule.push(IDLE.to_string()),
            }
        }

        // Runnable tasks that were passed over keep no CPU binding.
        for (_, task) in self.tasks.iter_mut() {
            if task.state == TaskState::Runnable {
                task.current_cpu = None;
            }
        }

        let mut runnable_tasks = Vec::new();
        let mut blocked_tasks = Vec::new();
        for (_, task) in self.tasks.iter() {
            match task.state {
                TaskState::Runnable | TaskState::Running => {
                    runnable_tasks.push(task.id().to_string())
                }
                TaskState::Blocked => blocked_tasks.push(task.id().to_string()),
                TaskState::Exited => {}
            }
        }

        Decision {
            vtime,
            schedule,
            meta: Some(DecisionMeta {
                preemptions: self.preemptions,
                migrations: self.migrations,
                runnable_tasks,
                blocked_tasks,
            }),
        }
    }

    /// Reset every cgroup whose accounting window elapsed, and any whose
    /// window lies in the future (virtual time moved backwards).
    fn refresh_periods(&mut self, vtime: u64) {
        let tick_us = self.quantum * 1000;
        for cg in self.cgroups.values_mut() {
            if vtime < cg.period_start {
                cg.reset_period(vtime);
                continue;
            }
            let elapsed_us = (vtime - cg.period_start) * tick_us;
            if elapsed_us >= cg.period_us {
                cg.reset_period(vtime);
            }
        }
    }

    /// Rebuild the queue from task states. O(n), and it makes queue order a
    /// pure function of the registry rather than of past sift paths.
    fn rebuild_queue(&mut self) {
        self.queue.clear();
        let keys: Vec<usize> = self.tasks.iter().map(|(key, _)| key).collect();
        for &key in &keys {
            self.tasks[key].heap_slot = None;
        }
        for &key in &keys {
            if self.tasks[key].state == TaskState::Runnable {
                self.queue.insert(&mut self.tasks, key);
            }
        }
    }

    /// Pull queue minima until one passes the placement and quota filters.
    /// Rejected candidates go back into the queue afterwards.
    fn pick_for_cpu(
        &mut self,
        cpu: usize,
        planned: &mut AHashMap<String, f64>,
        quantum_us: f64,
    ) -> Option<usize> {
        let mut set_aside = Vec::new();
        let mut selected = None;

        while let Some(key) = self.queue.extract_min(&mut self.tasks) {
            if !self.can_run_on(key, cpu) {
                set_aside.push(key);
                continue;
            }
            if let Some(cg) = self.cgroups.get(self.tasks[key].cgroup()) {
                if !cg.has_quota() {
                    set_aside.push(key);
                    continue;
                }
                if let Some(quota) = cg.quota_us {
                    let committed = planned.get(cg.id()).copied().unwrap_or(0.0);
                    if cg.used_us + committed + quantum_us > quota as f64 {
                        set_aside.push(key);
                        continue;
                    }
                }
            }
            selected = Some(key);
            break;
        }

        for key in set_aside {
            self.queue.insert(&mut self.tasks, key);
        }

        if let Some(key) = selected {
            let cgroup_id = self.tasks[key].cgroup().to_string();
            if matches!(self.cgroups.get(&cgroup_id), Some(cg) if cg.quota_us.is_some()) {
                *planned.entry(cgroup_id).or_insert(0.0) += quantum_us;
            }
        }
        selected
    }
}
