//! Event dispatch: every event mutates registry state; none of them runs
//! the selection pass. Failures are per-event and leave the engine
//! consistent for the tick that follows.

use super::Engine;
use crate::cgroup::{quota_from_wire, Cgroup, CgroupUpdate, DEFAULT_CPU_PERIOD_US, DEFAULT_CPU_SHARES};
use crate::cpuset::CpuSet;
use crate::error::EventError;
use crate::proto::Event;
use crate::task::{Task, TaskState, DEFAULT_CGROUP};

impl Engine {
    pub fn apply(&mut self, event: Event) -> Result<(), EventError> {
        match event {
            Event::TaskCreate {
                task_id,
                nice,
                cgroup_id,
                cpu_mask,
            } => {
                if self.by_id.contains_key(&task_id) {
                    return Err(EventError::TaskExists(task_id));
                }
                let mut task = Task::new(task_id.clone(), nice.unwrap_or(0), cgroup_id);
                // start at the current maximum so existing tasks are not starved
                task.vruntime = self.max_vruntime();
                if let Some(mask) = cpu_mask {
                    task.set_affinity(CpuSet::from(mask));
                }
                let key = self.tasks.insert(task);
                self.by_id.insert(task_id, key);
                self.queue.insert(&mut self.tasks, key);
                Ok(())
            }

            Event::TaskExit { task_id } => {
                let key = self.lookup(&task_id)?;
                self.queue.remove(&mut self.tasks, key);
                for slot in &mut self.cpus {
                    if *slot == Some(key) {
                        *slot = None;
                    }
                }
                self.tasks[key].state = TaskState::Exited;
                self.tasks.remove(key);
                self.by_id.remove(&task_id);
                Ok(())
            }

            Event::TaskBlock { task_id } => {
                let key = self.lookup(&task_id)?;
                self.queue.remove(&mut self.tasks, key);
                let task = &mut self.tasks[key];
                task.state = TaskState::Blocked;
                if let Some(cpu) = task.current_cpu.take() {
                    self.cpus[cpu] = None;
                }
                Ok(())
            }

            Event::TaskUnblock { task_id } => {
                let key = self.lookup(&task_id)?;
                if self.tasks[key].state != TaskState::Blocked {
                    return Ok(());
                }
                // latency bonus: lift to just below the runnable minimum,
                // never downward
                let floor = self.min_vruntime() - 1.0;
                let task = &mut self.tasks[key];
                task.state = TaskState::Runnable;
                if task.vruntime < floor {
                    task.vruntime = floor;
                }
                self.queue.insert(&mut self.tasks, key);
                Ok(())
            }

            Event::TaskYield { task_id } => {
                let key = self.lookup(&task_id)?;
                let max = self.max_vruntime();
                self.tasks[key].vruntime = max;
                self.queue.update(&mut self.tasks, key);
                Ok(())
            }

            Event::TaskSetNice {
                task_id,
                nice,
                new_nice,
            } => {
                let key = self.lookup(&task_id)?;
                let nice = new_nice.or(nice).ok_or(EventError::MissingField {
                    action: "TASK_SETNICE",
                    field: "newNice",
                })?;
                self.tasks[key].set_nice(nice);
                Ok(())
            }

            Event::TaskSetAffinity { task_id, cpu_mask } => {
                let key = self.lookup(&task_id)?;
                self.tasks[key].set_affinity(CpuSet::from(cpu_mask));
                Ok(())
            }

            Event::CgroupCreate {
                cgroup_id,
                cpu_shares,
                cpu_quota_us,
                cpu_period_us,
                cpu_mask,
            } => {
                if self.cgroups.contains_key(&cgroup_id) {
                    return Err(EventError::CgroupExists(cgroup_id));
                }
                let mut cg = Cgroup::new(
                    cgroup_id.clone(),
                    cpu_shares.unwrap_or(DEFAULT_CPU_SHARES as i64),
                    quota_from_wire(cpu_quota_us.flatten()),
                    cpu_period_us.unwrap_or(DEFAULT_CPU_PERIOD_US as i64),
                    cpu_mask.map(CpuSet::from).unwrap_or_default(),
                );
                cg.reset_period(self.vtime);
                self.cgroups.insert(cgroup_id, cg);
                Ok(())
            }

            Event::CgroupModify {
                cgroup_id,
                cpu_shares,
                cpu_quota_us,
                cpu_period_us,
                cpu_mask,
            } => {
                let update = CgroupUpdate {
                    shares: cpu_shares,
                    quota_us: cpu_quota_us.map(quota_from_wire),
                    period_us: cpu_period_us,
                    mask: cpu_mask,
                };
                let vtime = self.vtime;
                let Some(cg) = self.cgroups.get_mut(&cgroup_id) else {
                    return Err(EventError::UnknownCgroup(cgroup_id));
                };
                if cg.apply(&update) {
                    // a new period length starts a fresh accounting window
                    cg.reset_period(vtime);
                }
                Ok(())
            }

            Event::CgroupDelete { cgroup_id } => {
                if self.cgroups.remove(&cgroup_id).is_none() {
                    return Err(EventError::UnknownCgroup(cgroup_id));
                }
                for (_, task) in self.tasks.iter_mut() {
                    if task.cgroup == cgroup_id {
                        task.cgroup = DEFAULT_CGROUP.to_string();
                    }
                }
                Ok(())
            }

            Event::TaskMoveCgroup {
                task_id,
                new_cgroup_id,
            } => {
                let key = self.lookup(&task_id)?;
                self.tasks[key].cgroup = new_cgroup_id;
                Ok(())
            }

            Event::CpuBurst { task_id, duration } => {
                let key = self.lookup(&task_id)?;
                if duration == 0 {
                    return Err(EventError::ZeroBurstDuration);
                }
                self.tasks[key].start_burst(duration);
                Ok(())
            }
        }
    }

    fn lookup(&self, id: &str) -> Result<usize, EventError> {
        self.by_id
            .get(id)
            .copied()
            .ok_or_else(|| EventError::UnknownTask(id.to_string()))
    }
}
