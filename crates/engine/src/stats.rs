//! Bank statistics collection and reporting.
//!
//! This module tracks the observability side of the access engine. It provides:
//! 1. **Running aggregates:** weighted incremental min/max/mean/stddev
//!    ([`RunningStats`]), fed with per-request occupancy and eviction samples.
//! 2. **Outcome counters:** per-bank totals for each resolution path of the
//!    access state machine ([`BankCounters`]).
//!
//! Nothing here affects timing correctness; the engine works identically with
//! the sinks ignored.

/// Weighted running statistics: min, max, mean, and standard deviation.
///
/// Uses the incremental update form so samples are absorbed in O(1) without
/// retention. NaN samples or weights are counted but otherwise ignored.
#[derive(Debug, Clone)]
pub struct RunningStats {
    name: String,
    minimum: f64,
    maximum: f64,
    mean: f64,
    var_numer: f64,
    weight_sum: f64,
    num_samples: u64,
}

impl RunningStats {
    /// Creates an empty aggregate with a display name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            minimum: f64::INFINITY,
            maximum: f64::NEG_INFINITY,
            mean: 0.0,
            var_numer: 0.0,
            weight_sum: 0.0,
            num_samples: 0,
        }
    }

    /// Clears all aggregates; the sample count is kept.
    pub fn reset(&mut self) {
        self.minimum = f64::INFINITY;
        self.maximum = f64::NEG_INFINITY;
        self.mean = 0.0;
        self.var_numer = 0.0;
        self.weight_sum = 0.0;
    }

    /// Absorbs one weighted sample. NaN samples or weights are invalid and
    /// contribute nothing beyond the sample count.
    pub fn add(&mut self, sample: f64, weight: f64) {
        self.num_samples += 1;
        if sample.is_nan() || weight.is_nan() {
            return;
        }
        if sample < self.minimum {
            self.minimum = sample;
        }
        if sample > self.maximum {
            self.maximum = sample;
        }
        if weight > 0.0 {
            let s = self.weight_sum + weight;
            let q = sample - self.mean;
            let r = q * weight / s;
            self.mean += r;
            self.var_numer += r * self.weight_sum * q;
            self.weight_sum = s;
        }
    }

    /// Merges another aggregate into this one.
    pub fn combine_with(&mut self, rhs: &Self) {
        self.minimum = self.minimum.min(rhs.minimum);
        self.maximum = self.maximum.max(rhs.maximum);
        if self.weight_sum == 0.0 {
            self.mean = rhs.mean;
            self.var_numer = rhs.var_numer;
            self.weight_sum = rhs.weight_sum;
        } else if rhs.weight_sum != 0.0 {
            self.mean = (self.mean * self.weight_sum + rhs.mean * rhs.weight_sum)
                / (self.weight_sum + rhs.weight_sum);
            self.var_numer += rhs.var_numer;
            self.weight_sum += rhs.weight_sum;
        }
        self.num_samples += rhs.num_samples;
    }

    /// Smallest valid sample seen, or +inf if none.
    pub fn min(&self) -> f64 {
        self.minimum
    }

    /// Largest valid sample seen, or -inf if none.
    pub fn max(&self) -> f64 {
        self.maximum
    }

    /// Weighted mean of valid samples.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Weighted standard deviation of valid samples.
    pub fn std_dev(&self) -> f64 {
        if self.weight_sum == 0.0 {
            0.0
        } else {
            (self.var_numer / self.weight_sum).sqrt()
        }
    }

    /// Number of `add` calls, including invalid samples.
    pub fn num_samples(&self) -> u64 {
        self.num_samples
    }

    /// Display name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Per-bank counters, one per resolution path of the access state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct BankCounters {
    /// Requests that found their tag in the directory.
    pub tag_hits: u64,
    /// Requests that missed the tag directory.
    pub tag_misses: u64,
    /// Misses resolved by sharing an existing slot (no new storage).
    pub miss_shared: u64,
    /// Misses resolved by re-taking an evicted-but-intact slot.
    pub miss_recovered: u64,
    /// Misses that allocated fresh storage (possibly after evictions).
    pub miss_allocated: u64,
    /// Content-changing write hits that attached to an existing match.
    pub write_hit_shared: u64,
    /// Content-changing write hits resolved by overwriting in place.
    pub write_hit_overwrite: u64,
    /// Content-changing write hits that detached and reallocated storage.
    pub write_hit_realloc: u64,
    /// Read hits and writes whose content did not change.
    pub clean_hits: u64,
    /// Total tag and data evictions performed on behalf of requests.
    pub evictions: u64,
}

/// Running aggregates every bank feeds at the end of each access.
#[derive(Debug, Clone)]
pub struct BankStats {
    /// Outcome counters.
    pub counters: BankCounters,
    /// Deduplication ratio: valid data lines (or segments/line) per valid tag.
    pub compression: RunningStats,
    /// Evictions per request (demand and writeback, excluding clean PUTS).
    pub evictions: RunningStats,
    /// Tag-directory utilization fraction.
    pub tag_utilization: RunningStats,
    /// Data-store utilization fraction.
    pub data_utilization: RunningStats,
}

impl BankStats {
    /// Creates the stat set for a named bank.
    pub fn new(name: &str) -> Self {
        Self {
            counters: BankCounters::default(),
            compression: RunningStats::new(format!("{name} compression ratio")),
            evictions: RunningStats::new(format!("{name} evictions")),
            tag_utilization: RunningStats::new(format!("{name} tag utilization")),
            data_utilization: RunningStats::new(format!("{name} data utilization")),
        }
    }
}
