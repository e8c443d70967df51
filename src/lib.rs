#![doc = include_str!("../README.md")]

mod cgroup;
mod config;
mod cpuset;
mod engine;
mod error;
mod heap;
mod proto;
mod server;
mod task;
mod transport;
mod weight;

pub use cgroup::{Cgroup, CgroupUpdate};
pub use config::{Config, DEFAULT_SOCKET, MAX_CPUS};
pub use cpuset::CpuSet;
pub use engine::Engine;
pub use error::{ConfigError, EventError, WireError};
pub use heap::VruntimeHeap;
pub use proto::{Decision, DecisionMeta, Event, EventFrame, IDLE};
pub use server::{process_frame, run};
pub use task::{Task, TaskState};
pub use transport::Transport;
