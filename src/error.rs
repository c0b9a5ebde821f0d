use thiserror::Error;

/// Recoverable failures of kernel operations. Kernel state is unchanged
/// whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("process id {0:?} already exists")]
    DuplicateId(String),
    #[error("a process must have 1 to {max} segments, got {count}")]
    InvalidSegmentCount { count: usize, max: usize },
    #[error("segment {segment} has size {size}; sizes must be in 1..={max}")]
    InvalidSegmentSize { segment: usize, size: usize, max: usize },
    #[error("insufficient memory: {requested} frames requested, {available} free")]
    InsufficientMemory { requested: usize, available: usize },
    #[error("process {0:?} does not exist")]
    ProcessNotFound(String),
    #[error("process {id:?} has no segment {segment}")]
    SegmentNotFound { id: String, segment: usize },
    #[error("offset {offset} is out of range for segment {segment} of size {size}")]
    OffsetOutOfRange { segment: usize, offset: usize, size: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("page size {0} is not a non-zero power of two")]
    PageSize(usize),
    #[error("memory size {memory_size} is not a non-zero multiple of page size {page_size}")]
    MemorySize { memory_size: usize, page_size: usize },
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
    #[error("unknown replacement policy {0:?} (expected fifo/0 or lru/1)")]
    UnknownPolicy(String),
}
