use std::fmt;
use std::str::FromStr;

use crate::constants::*;
use crate::error::ConfigError;

/// Local page replacement policy of a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplacementPolicy {
    /// Evict the page that entered the resident set first
    Fifo,
    /// Evict the page with the oldest access time
    #[default]
    Lru,
}

impl FromStr for ReplacementPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "fifo" => Ok(ReplacementPolicy::Fifo),
            "1" | "lru" => Ok(ReplacementPolicy::Lru),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for ReplacementPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplacementPolicy::Fifo => write!(f, "FIFO"),
            ReplacementPolicy::Lru => write!(f, "LRU"),
        }
    }
}

/// Fixed parameters of a simulated machine, chosen once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    pub memory_size: usize,
    /// Must be a power of two
    pub page_size: usize,
    pub max_segment_num: usize,
    pub max_segment_size: usize,
    pub max_resident_set_num: usize,
    /// Policy given to every process created by the kernel
    pub policy: ReplacementPolicy,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            memory_size: MEMORY_SIZE,
            page_size: PAGE_SIZE,
            max_segment_num: MAX_SEGMENT_NUM,
            max_segment_size: MAX_SEGMENT_SIZE,
            max_resident_set_num: MAX_RESIDENT_SET_NUM,
            policy: ReplacementPolicy::default(),
        }
    }
}

impl MemoryConfig {
    pub fn with_policy(mut self, policy: ReplacementPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.page_size.is_power_of_two() {
            return Err(ConfigError::PageSize(self.page_size));
        }
        if self.memory_size == 0 || self.memory_size % self.page_size != 0 {
            return Err(ConfigError::MemorySize {
                memory_size: self.memory_size,
                page_size: self.page_size,
            });
        }
        if self.max_segment_num == 0 {
            return Err(ConfigError::ZeroLimit("max segment count"));
        }
        if self.max_segment_size == 0 {
            return Err(ConfigError::ZeroLimit("max segment size"));
        }
        if self.max_resident_set_num == 0 {
            return Err(ConfigError::ZeroLimit("max resident set size"));
        }
        Ok(())
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.memory_size / self.page_size
    }

    /// Number of pages needed to hold `size` bytes
    #[inline]
    pub fn pages_for(&self, size: usize) -> usize {
        size.div_ceil(self.page_size)
    }
}
