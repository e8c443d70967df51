//! Control groups: relative shares, bandwidth quota over a refreshing
//! period, and a CPU mask applied on top of task affinity.

use crate::cpuset::CpuSet;

pub const DEFAULT_CPU_SHARES: u32 = 1024;
pub const DEFAULT_CPU_PERIOD_US: u64 = 100_000;

/// Map a wire-level quota to the internal representation. Negative values
/// and null both mean unlimited; zero is a valid quota that admits nothing.
pub fn quota_from_wire(quota_us: Option<i64>) -> Option<u64> {
    match quota_us {
        None => None,
        Some(q) if q < 0 => None,
        Some(q) => Some(q as u64),
    }
}

/// Field-wise update for `CGROUP_MODIFY`. `None` keeps the current value;
/// for `quota_us` the inner `None` means "set unlimited".
#[derive(Debug, Clone, Default)]
pub struct CgroupUpdate {
    pub shares: Option<i64>,
    pub quota_us: Option<Option<u64>>,
    pub period_us: Option<i64>,
    pub mask: Option<Vec<usize>>,
}

#[derive(Debug, Clone)]
pub struct Cgroup {
    id: String,
    pub(crate) shares: u32,
    /// `None` = unlimited.
    pub(crate) quota_us: Option<u64>,
    pub(crate) period_us: u64,
    pub(crate) mask: CpuSet,
    /// Microseconds accounted within the current period.
    pub(crate) used_us: f64,
    /// Virtual time at which the current period began.
    pub(crate) period_start: u64,
}

impl Cgroup {
    /// Build a cgroup, clamping invalid shares/period to their defaults.
    pub fn new(
        id: impl Into<String>,
        shares: i64,
        quota_us: Option<u64>,
        period_us: i64,
        mask: CpuSet,
    ) -> Self {
        Self {
            id: id.into(),
            shares: if shares > 0 {
                shares as u32
            } else {
                DEFAULT_CPU_SHARES
            },
            quota_us,
            period_us: if period_us > 0 {
                period_us as u64
            } else {
                DEFAULT_CPU_PERIOD_US
            },
            mask,
            used_us: 0.0,
            period_start: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn shares(&self) -> u32 {
        self.shares
    }

    pub fn quota_us(&self) -> Option<u64> {
        self.quota_us
    }

    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    pub fn used_us(&self) -> f64 {
        self.used_us
    }

    #[inline]
    pub fn allows_cpu(&self, cpu: usize) -> bool {
        self.mask.allows(cpu)
    }

    /// Whether any quota remains in the current period.
    #[inline]
    pub fn has_quota(&self) -> bool {
        match self.quota_us {
            None => true,
            Some(quota) => self.used_us < quota as f64,
        }
    }

    /// Charge `delta_us` of runtime against the quota. Unlimited and
    /// zero-quota groups accumulate nothing.
    pub fn account(&mut self, delta_us: f64) {
        if matches!(self.quota_us, Some(q) if q > 0) && delta_us > 0.0 {
            self.used_us += delta_us;
        }
    }

    /// Start a fresh accounting period at virtual time `vtime`.
    pub fn reset_period(&mut self, vtime: u64) {
        self.used_us = 0.0;
        self.period_start = vtime;
    }

    /// Apply a modify event. Shares and period are taken only when positive;
    /// a mask is taken only when non-empty. Returns whether the period was
    /// changed, in which case the caller restarts accounting.
    pub fn apply(&mut self, update: &CgroupUpdate) -> bool {
        if let Some(shares) = update.shares {
            if shares > 0 {
                self.shares = shares as u32;
            }
        }
        if let Some(quota) = update.quota_us {
            self.quota_us = quota;
        }
        let mut period_changed = false;
        if let Some(period) = update.period_us {
            if period > 0 {
                self.period_us = period as u64;
                period_changed = true;
            }
        }
        if let Some(mask) = &update.mask {
            if !mask.is_empty() {
                self.mask = CpuSet::from(mask.clone());
            }
        }
        period_changed
    }
}
