use std::collections::HashMap;

use log::{debug, info, warn};

use crate::address_space::{AccessClock, ProcessAddressSpace};
use crate::config::{MemoryConfig, ReplacementPolicy};
use crate::error::{ConfigError, KernelError};
use crate::io::{BackingStore, LoggingBackingStore};
use crate::memory::{Frame, FrameAllocator};
use crate::translation::{LogicalAddress, Translation};

/// Owns the process table and the physical frame pool.
///
/// Every operation either completes or leaves the kernel untouched.
pub struct Kernel {
    config: MemoryConfig,
    memory: FrameAllocator,
    processes: HashMap<String, ProcessAddressSpace>,
    clock: AccessClock,
    store: Box<dyn BackingStore>,
}

impl Kernel {
    /// Create a kernel whose page transfers are logged
    pub fn new(config: MemoryConfig) -> Result<Self, ConfigError> {
        Self::with_backing_store(config, LoggingBackingStore)
    }

    pub fn with_backing_store<S>(config: MemoryConfig, store: S) -> Result<Self, ConfigError>
    where
        S: BackingStore + 'static,
    {
        config.validate()?;
        Ok(Kernel {
            config,
            memory: FrameAllocator::new(config.frame_count(), config.page_size),
            processes: HashMap::new(),
            clock: AccessClock::new(),
            store: Box::new(store),
        })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn policy(&self) -> ReplacementPolicy {
        self.config.policy
    }

    pub fn memory(&self) -> &FrameAllocator {
        &self.memory
    }

    pub fn free_frames(&self) -> usize {
        self.memory.free_count()
    }

    pub fn total_frames(&self) -> usize {
        self.memory.total_frames()
    }

    pub fn process(&self, id: &str) -> Option<&ProcessAddressSpace> {
        self.processes.get(id)
    }

    /// All processes, ordered by id
    pub fn processes(&self) -> Vec<&ProcessAddressSpace> {
        let mut all: Vec<&ProcessAddressSpace> = self.processes.values().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    /// The process whose resident set holds `frame`, if any
    pub fn frame_owner(&self, frame: usize) -> Option<&str> {
        self.processes
            .values()
            .find(|p| p.resident_frames().contains(&frame))
            .map(ProcessAddressSpace::id)
    }

    /// Frames paired with their owners, in index order
    pub fn frame_map(&self) -> impl Iterator<Item = (&Frame, Option<&str>)> {
        let owners: HashMap<usize, &str> = self
            .processes
            .values()
            .flat_map(|p| p.resident_frames().iter().map(move |&f| (f, p.id())))
            .collect();
        self.memory.frames().iter().map(move |f| (f, owners.get(&f.index).copied()))
    }

    /// Register a process, reserve its resident set and load its first pages
    pub fn create_process(&mut self, id: &str, segment_sizes: &[usize]) -> Result<(), KernelError> {
        if let Err(e) = self.validate(id, segment_sizes) {
            warn!("rejected process {}: {}", id, e);
            return Err(e);
        }

        let mut space = ProcessAddressSpace::new(id, segment_sizes, self.config.policy, &self.config);
        let needed = space.resident_set_capacity();
        let available = self.memory.free_count();
        if needed > available {
            warn!("rejected process {}: needs {} frames, {} free", id, needed, available);
            return Err(KernelError::InsufficientMemory { requested: needed, available });
        }

        let frames = self.memory.allocate(id, needed)?;
        space.initial_load(frames, &mut self.clock, self.store.as_mut());
        info!(
            "created process {} ({} segments, {} pages, resident set {:?}, {})",
            id,
            segment_sizes.len(),
            space.total_pages(),
            space.resident_frames(),
            space.policy()
        );
        self.processes.insert(id.to_string(), space);
        Ok(())
    }

    fn validate(&self, id: &str, segment_sizes: &[usize]) -> Result<(), KernelError> {
        if self.processes.contains_key(id) {
            return Err(KernelError::DuplicateId(id.to_string()));
        }

        let max = self.config.max_segment_num;
        if segment_sizes.is_empty() || segment_sizes.len() > max {
            return Err(KernelError::InvalidSegmentCount { count: segment_sizes.len(), max });
        }

        let max = self.config.max_segment_size;
        if let Some((segment, &size)) =
            segment_sizes.iter().enumerate().find(|&(_, &size)| size == 0 || size > max)
        {
            return Err(KernelError::InvalidSegmentSize { segment, size, max });
        }
        Ok(())
    }

    /// Remove a process and release its frames
    pub fn destroy_process(&mut self, id: &str) -> Result<(), KernelError> {
        let space = self
            .processes
            .remove(id)
            .ok_or_else(|| KernelError::ProcessNotFound(id.to_string()))
            .inspect_err(|e| warn!("rejected destroy of {}: {}", id, e))?;
        self.memory.free(space.resident_frames());
        info!("destroyed process {}, released frames {:?}", id, space.resident_frames());
        Ok(())
    }

    /// Translate (segment, offset) of process `id` to a physical address
    pub fn translate(&mut self, id: &str, segment: usize, offset: usize) -> Result<usize, KernelError> {
        self.access(id, segment, offset).map(|t| t.physical_address)
    }

    /// Translate and report how the access was served.
    ///
    /// `offset == segment size` is accepted and addresses one byte past the
    /// segment's end, as long as that byte lies in an existing page.
    pub fn access(&mut self, id: &str, segment: usize, offset: usize) -> Result<Translation, KernelError> {
        self.serve_access(id, segment, offset)
            .inspect_err(|e| warn!("rejected translation for {}: {}", id, e))
    }

    fn serve_access(&mut self, id: &str, segment: usize, offset: usize) -> Result<Translation, KernelError> {
        let page_size = self.config.page_size;
        let space = self
            .processes
            .get_mut(id)
            .ok_or_else(|| KernelError::ProcessNotFound(id.to_string()))?;

        let seg = space
            .segment(segment)
            .ok_or_else(|| KernelError::SegmentNotFound { id: id.to_string(), segment })?;
        let size = seg.size;
        let address = LogicalAddress::new(segment, offset, page_size);
        if offset > size || address.page >= seg.pages.len() {
            return Err(KernelError::OffsetOutOfRange { segment, offset, size });
        }

        let (frame, page_fault) = space
            .access(address.page_ref(), &mut self.clock, self.store.as_mut())
            .ok_or(KernelError::OffsetOutOfRange { segment, offset, size })?;

        let base = self.memory.frame(frame).map_or(frame * page_size, |f| f.base_address);
        let physical_address = base + address.page_offset;
        debug!("process {} {} -> frame {} PA {}", id, address, frame, physical_address);

        Ok(Translation { address, frame, physical_address, page_fault })
    }
}
