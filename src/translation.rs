use std::fmt;

use crate::address_space::PageRef;

/// A logical address (segment number + segment offset) decomposed into its
/// page number and page offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalAddress {
    pub segment: usize,
    pub offset: usize,
    pub page: usize,
    pub page_offset: usize,
}

impl LogicalAddress {
    /// Decompose `offset` using a power-of-two `page_size`
    pub fn new(segment: usize, offset: usize, page_size: usize) -> Self {
        debug_assert!(page_size.is_power_of_two());
        let shift = page_size.trailing_zeros();
        LogicalAddress {
            segment,
            offset,
            page: offset >> shift,
            page_offset: offset & (page_size - 1),
        }
    }

    #[inline]
    pub fn page_ref(&self) -> PageRef {
        PageRef::new(self.segment, self.page)
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LA(s={}, offset={}) = (p={}, w={})",
            self.segment, self.offset, self.page, self.page_offset
        )
    }
}

/// Outcome of a successful translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub address: LogicalAddress,
    pub frame: usize,
    pub physical_address: usize,
    /// The page was not resident and had to be faulted in
    pub page_fault: bool,
}
