use log::debug;

use crate::error::KernelError;

/// A fixed-size unit of physical memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub index: usize,
    pub base_address: usize,
    pub occupied: bool,
}

/// The physical frame pool.
///
/// Frames only record whether they are occupied. Which process owns a frame
/// is answered by the kernel from its process table.
#[derive(Debug, Clone)]
pub struct FrameAllocator {
    frames: Vec<Frame>,
    free_count: usize,
}

impl FrameAllocator {
    /// Create a pool of `frame_count` free frames of `page_size` bytes
    pub fn new(frame_count: usize, page_size: usize) -> Self {
        let frames = (0..frame_count)
            .map(|index| Frame { index, base_address: index * page_size, occupied: false })
            .collect();
        FrameAllocator { frames, free_count: frame_count }
    }

    /// Claim the `n` lowest-indexed free frames for `owner`, in ascending order.
    ///
    /// Nothing is claimed if fewer than `n` frames are free.
    pub fn allocate(&mut self, owner: &str, n: usize) -> Result<Vec<usize>, KernelError> {
        if n > self.free_count {
            return Err(KernelError::InsufficientMemory { requested: n, available: self.free_count });
        }

        let mut allocated = Vec::with_capacity(n);
        for frame in self.frames.iter_mut().filter(|f| !f.occupied).take(n) {
            frame.occupied = true;
            allocated.push(frame.index);
        }
        self.free_count -= allocated.len();

        debug!("allocated frames {:?} to {}", allocated, owner);
        Ok(allocated)
    }

    /// Release frames. Already-free and out-of-range indices are ignored.
    pub fn free(&mut self, indices: &[usize]) {
        for &index in indices {
            if let Some(frame) = self.frames.get_mut(index) {
                if frame.occupied {
                    frame.occupied = false;
                    self.free_count += 1;
                }
            }
        }
        debug!("freed frames {:?}", indices);
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free_count
    }

    #[inline]
    pub fn total_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}
