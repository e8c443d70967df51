//! Wire protocol: event batches in, decision records out.
//!
//! Each input line carries one [`EventFrame`]; its events stay raw JSON so a
//! malformed or unknown event is reported and skipped on its own, without
//! discarding the rest of the batch.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Literal emitted for a CPU with no task assigned.
pub const IDLE: &str = "idle";

/// One batch of events tagged with the virtual time of the tick they precede.
#[derive(Debug, Clone, Deserialize)]
pub struct EventFrame {
    #[serde(default)]
    pub vtime: u64,
    #[serde(default)]
    pub events: Vec<Value>,
}

/// Distinguishes "field absent" (outer `None`) from "field null" (inner
/// `None`, meaning unlimited) for `cpuQuotaUs`.
fn quota_field<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action")]
pub enum Event {
    #[serde(rename = "TASK_CREATE", rename_all = "camelCase")]
    TaskCreate {
        task_id: String,
        nice: Option<i32>,
        cgroup_id: Option<String>,
        cpu_mask: Option<Vec<usize>>,
    },
    #[serde(rename = "TASK_EXIT", rename_all = "camelCase")]
    TaskExit { task_id: String },
    #[serde(rename = "TASK_BLOCK", rename_all = "camelCase")]
    TaskBlock { task_id: String },
    #[serde(rename = "TASK_UNBLOCK", rename_all = "camelCase")]
    TaskUnblock { task_id: String },
    #[serde(rename = "TASK_YIELD", rename_all = "camelCase")]
    TaskYield { task_id: String },
    /// `newNice` wins over `nice` when both are present.
    #[serde(rename = "TASK_SETNICE", rename_all = "camelCase")]
    TaskSetNice {
        task_id: String,
        nice: Option<i32>,
        new_nice: Option<i32>,
    },
    #[serde(rename = "TASK_SET_AFFINITY", rename_all = "camelCase")]
    TaskSetAffinity {
        task_id: String,
        cpu_mask: Vec<usize>,
    },
    #[serde(rename = "CGROUP_CREATE", rename_all = "camelCase")]
    CgroupCreate {
        cgroup_id: String,
        cpu_shares: Option<i64>,
        #[serde(default, deserialize_with = "quota_field")]
        cpu_quota_us: Option<Option<i64>>,
        cpu_period_us: Option<i64>,
        cpu_mask: Option<Vec<usize>>,
    },
    #[serde(rename = "CGROUP_MODIFY", rename_all = "camelCase")]
    CgroupModify {
        cgroup_id: String,
        cpu_shares: Option<i64>,
        #[serde(default, deserialize_with = "quota_field")]
        cpu_quota_us: Option<Option<i64>>,
        cpu_period_us: Option<i64>,
        cpu_mask: Option<Vec<usize>>,
    },
    #[serde(rename = "CGROUP_DELETE", rename_all = "camelCase")]
    CgroupDelete { cgroup_id: String },
    #[serde(rename = "TASK_MOVE_CGROUP", rename_all = "camelCase")]
    TaskMoveCgroup {
        task_id: String,
        new_cgroup_id: String,
    },
    #[serde(rename = "CPU_BURST", rename_all = "camelCase")]
    CpuBurst { task_id: String, duration: u32 },
}

impl Event {
    /// Decode a single raw event. Unknown actions and ill-typed fields
    /// surface here as per-event errors.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Scheduling decision for one tick: a task id or [`IDLE`] per CPU.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Decision {
    pub vtime: u64,
    pub schedule: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<DecisionMeta>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DecisionMeta {
    pub preemptions: u64,
    pub migrations: u64,
    /// Runnable plus Running task ids, in registry order.
    pub runnable_tasks: Vec<String>,
    pub blocked_tasks: Vec<String>,
}
