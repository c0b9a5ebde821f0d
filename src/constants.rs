pub const MEMORY_SIZE: usize = 64 * 1024;
pub const PAGE_SIZE: usize = 1024;
pub const NUM_FRAMES: usize = MEMORY_SIZE / PAGE_SIZE;

pub const MAX_SEGMENT_NUM: usize = 4;
pub const MAX_SEGMENT_SIZE: usize = 16 * 1024;
pub const MAX_RESIDENT_SET_NUM: usize = 8;

/// Frames per row in the memory occupancy grid
pub const FRAMES_PER_ROW: usize = 8;
/// Owner ids longer than this are truncated in the occupancy grid
pub const OWNER_DISPLAY_WIDTH: usize = 4;
