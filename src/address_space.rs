use std::collections::VecDeque;
use std::fmt;

use log::{debug, warn};

use crate::config::{MemoryConfig, ReplacementPolicy};
use crate::io::BackingStore;

/// Identifies one page of a process: segment number + page number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageRef {
    pub segment: usize,
    pub page: usize,
}

impl PageRef {
    pub fn new(segment: usize, page: usize) -> Self {
        PageRef { segment, page }
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.segment, self.page)
    }
}

/// Logical time source for access stamps. Every stamp is one greater than
/// the previous, so stamps never repeat.
#[derive(Debug, Default, Clone)]
pub struct AccessClock {
    now: u64,
}

impl AccessClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) -> u64 {
        self.now += 1;
        self.now
    }

    /// The most recently issued stamp (0 before the first tick)
    pub fn now(&self) -> u64 {
        self.now
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTableEntry {
    pub page_number: usize,
    /// Backing frame; `Some` exactly when the page is resident
    frame: Option<usize>,
    last_access: Option<u64>,
}

impl PageTableEntry {
    fn new(page_number: usize) -> Self {
        PageTableEntry { page_number, frame: None, last_access: None }
    }

    #[inline]
    pub fn is_resident(&self) -> bool {
        self.frame.is_some()
    }

    pub fn frame(&self) -> Option<usize> {
        self.frame
    }

    pub fn last_access(&self) -> Option<u64> {
        self.last_access
    }

    fn load(&mut self, frame: usize, now: u64) {
        self.frame = Some(frame);
        self.last_access = Some(now);
    }

    fn unload(&mut self) -> Option<usize> {
        self.last_access = None;
        self.frame.take()
    }
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub number: usize,
    /// Size in bytes
    pub size: usize,
    pub pages: Vec<PageTableEntry>,
}

impl Segment {
    fn new(number: usize, size: usize, page_count: usize) -> Self {
        let pages = (0..page_count).map(PageTableEntry::new).collect();
        Segment { number, size, pages }
    }
}

/// Hit/fault counters of one process
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AccessStats {
    pub hits: u64,
    pub faults: u64,
}

/// Segment and page tables of one process plus its resident set
#[derive(Debug, Clone)]
pub struct ProcessAddressSpace {
    id: String,
    segments: Vec<Segment>,
    resident_set_capacity: usize,
    resident_frames: Vec<usize>,
    policy: ReplacementPolicy,
    /// Pages in the order they became resident; only maintained under FIFO
    load_order: VecDeque<PageRef>,
    stats: AccessStats,
}

impl ProcessAddressSpace {
    /// Build the tables for `segment_sizes`. All pages start non-resident.
    pub fn new(
        id: &str,
        segment_sizes: &[usize],
        policy: ReplacementPolicy,
        config: &MemoryConfig,
    ) -> Self {
        let segments: Vec<Segment> = segment_sizes
            .iter()
            .enumerate()
            .map(|(number, &size)| Segment::new(number, size, config.pages_for(size)))
            .collect();

        let total_pages: usize = segments.iter().map(|s| s.pages.len()).sum();
        let resident_set_capacity = total_pages.min(config.max_resident_set_num);

        ProcessAddressSpace {
            id: id.to_string(),
            segments,
            resident_set_capacity,
            resident_frames: Vec::new(),
            policy,
            load_order: VecDeque::new(),
            stats: AccessStats::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn policy(&self) -> ReplacementPolicy {
        self.policy
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, number: usize) -> Option<&Segment> {
        self.segments.get(number)
    }

    pub fn resident_set_capacity(&self) -> usize {
        self.resident_set_capacity
    }

    /// Frames reserved for this process at creation
    pub fn resident_frames(&self) -> &[usize] {
        &self.resident_frames
    }

    /// FIFO admission order, oldest first. Empty under LRU.
    pub fn load_order(&self) -> impl Iterator<Item = &PageRef> {
        self.load_order.iter()
    }

    pub fn stats(&self) -> AccessStats {
        self.stats
    }

    pub fn total_pages(&self) -> usize {
        self.segments.iter().map(|s| s.pages.len()).sum()
    }

    pub fn page(&self, page: PageRef) -> Option<&PageTableEntry> {
        self.segments.get(page.segment)?.pages.get(page.page)
    }

    fn page_mut(&mut self, page: PageRef) -> Option<&mut PageTableEntry> {
        self.segments.get_mut(page.segment)?.pages.get_mut(page.page)
    }

    /// Resident pages in segment order, then page order
    pub fn resident_pages(&self) -> impl Iterator<Item = (PageRef, &PageTableEntry)> {
        self.segments.iter().flat_map(|segment| {
            segment
                .pages
                .iter()
                .filter(|entry| entry.is_resident())
                .map(move |entry| (PageRef::new(segment.number, entry.page_number), entry))
        })
    }

    pub fn resident_page_count(&self) -> usize {
        self.resident_pages().count()
    }

    /// Load pages into `frames` in segment order, then page order, until the
    /// resident set is full. Later pages stay non-resident.
    pub fn initial_load(
        &mut self,
        frames: Vec<usize>,
        clock: &mut AccessClock,
        store: &mut dyn BackingStore,
    ) {
        debug_assert_eq!(frames.len(), self.resident_set_capacity);

        let mut next = frames.iter().copied();
        let order: Vec<PageRef> = self
            .segments
            .iter()
            .flat_map(|s| (0..s.pages.len()).map(move |p| PageRef::new(s.number, p)))
            .take(self.resident_set_capacity)
            .collect();

        for page in order {
            let Some(frame) = next.next() else { break };
            self.admit(page, frame, clock.tick(), store);
        }
        self.resident_frames = frames;
    }

    /// Bring the non-resident `target` in by evicting one of this process's
    /// own resident pages. Returns the frame now backing `target`.
    ///
    /// Panics if the process has no resident page.
    pub fn resolve_fault(
        &mut self,
        target: PageRef,
        clock: &mut AccessClock,
        store: &mut dyn BackingStore,
    ) -> usize {
        debug_assert!(self.page(target).is_some_and(|e| !e.is_resident()));

        let Some(victim) = self.select_victim() else {
            panic!("page fault in process {} with an empty resident set", self.id);
        };

        let frame = match self.page_mut(victim).and_then(PageTableEntry::unload) {
            Some(frame) => frame,
            None => panic!("victim {} of process {} is not resident", victim, self.id),
        };
        store.write_page(&self.id, victim.segment, victim.page, frame);
        debug!("process {} evicted {} from frame {}", self.id, victim, frame);

        self.admit(target, frame, clock.tick(), store);
        frame
    }

    /// Stamp an access to a resident page with the next clock value
    pub fn touch(&mut self, page: PageRef, clock: &mut AccessClock) {
        if let Some(entry) = self.page_mut(page) {
            if entry.is_resident() {
                entry.last_access = Some(clock.tick());
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn set_last_access(&mut self, page: PageRef, stamp: u64) {
        if let Some(entry) = self.page_mut(page) {
            entry.last_access = Some(stamp);
        }
    }

    /// Access `page`, faulting it in if needed. Returns the backing frame and
    /// whether a fault occurred.
    pub fn access(
        &mut self,
        page: PageRef,
        clock: &mut AccessClock,
        store: &mut dyn BackingStore,
    ) -> Option<(usize, bool)> {
        let resident = self.page(page)?.is_resident();
        if resident {
            self.stats.hits += 1;
        } else {
            warn!("page fault: process {} page {} is not resident", self.id, page);
            self.stats.faults += 1;
            self.resolve_fault(page, clock, store);
        }

        self.touch(page, clock);
        let frame = self.page(page)?.frame()?;
        Some((frame, !resident))
    }

    fn admit(&mut self, page: PageRef, frame: usize, now: u64, store: &mut dyn BackingStore) {
        store.read_page(&self.id, page.segment, page.page, frame);
        if let Some(entry) = self.page_mut(page) {
            entry.load(frame, now);
        }
        if self.policy == ReplacementPolicy::Fifo {
            self.load_order.push_back(page);
        }
    }

    fn select_victim(&mut self) -> Option<PageRef> {
        match self.policy {
            ReplacementPolicy::Fifo => self.load_order.pop_front(),
            ReplacementPolicy::Lru => self
                .resident_pages()
                .min_by_key(|(page, entry)| (entry.last_access, *page))
                .map(|(page, _)| page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{PageIo, RecordingBackingStore};

    fn config(max_resident: usize) -> MemoryConfig {
        MemoryConfig {
            memory_size: 8 * 1024,
            page_size: 1024,
            max_segment_num: 4,
            max_segment_size: 16 * 1024,
            max_resident_set_num: max_resident,
            policy: ReplacementPolicy::Lru,
        }
    }

    fn loaded(
        sizes: &[usize],
        policy: ReplacementPolicy,
        max_resident: usize,
    ) -> (ProcessAddressSpace, AccessClock, RecordingBackingStore) {
        let mut space = ProcessAddressSpace::new("P", sizes, policy, &config(max_resident));
        let mut clock = AccessClock::new();
        let recorder = RecordingBackingStore::new();
        let frames: Vec<usize> = (0..space.resident_set_capacity()).collect();
        space.initial_load(frames, &mut clock, &mut recorder.clone());
        (space, clock, recorder)
    }

    // =========================================================================
    // Construction and initial load
    // =========================================================================

    #[test]
    fn test_page_table_lengths() {
        let space =
            ProcessAddressSpace::new("P", &[3072, 1024], ReplacementPolicy::Lru, &config(8));
        let lengths: Vec<usize> = space.segments().iter().map(|s| s.pages.len()).collect();
        assert_eq!(lengths, vec![3, 1]);
        assert_eq!(space.resident_set_capacity(), 4);
        assert_eq!(space.resident_page_count(), 0);
    }

    #[test]
    fn test_resident_set_capacity_is_capped() {
        let space =
            ProcessAddressSpace::new("P", &[3072, 1024], ReplacementPolicy::Lru, &config(2));
        assert_eq!(space.total_pages(), 4);
        assert_eq!(space.resident_set_capacity(), 2);
    }

    #[test]
    fn test_partial_segment_gets_whole_page() {
        let space = ProcessAddressSpace::new("P", &[1, 1025], ReplacementPolicy::Lru, &config(8));
        assert_eq!(space.segment(0).unwrap().pages.len(), 1);
        assert_eq!(space.segment(1).unwrap().pages.len(), 2);
    }

    #[test]
    fn test_initial_load_walks_segments_in_order() {
        let mut space =
            ProcessAddressSpace::new("P", &[2048, 2048], ReplacementPolicy::Fifo, &config(3));
        let mut clock = AccessClock::new();
        let recorder = RecordingBackingStore::new();
        space.initial_load(vec![4, 6, 7], &mut clock, &mut recorder.clone());

        assert_eq!(space.page(PageRef::new(0, 0)).unwrap().frame(), Some(4));
        assert_eq!(space.page(PageRef::new(0, 1)).unwrap().frame(), Some(6));
        assert_eq!(space.page(PageRef::new(1, 0)).unwrap().frame(), Some(7));
        assert!(!space.page(PageRef::new(1, 1)).unwrap().is_resident());

        assert_eq!(
            recorder.events(),
            vec![PageIo::read("P", 0, 0, 4), PageIo::read("P", 0, 1, 6), PageIo::read("P", 1, 0, 7)]
        );
        let order: Vec<PageRef> = space.load_order().copied().collect();
        assert_eq!(order, vec![PageRef::new(0, 0), PageRef::new(0, 1), PageRef::new(1, 0)]);
        assert_eq!(space.resident_frames(), &[4, 6, 7]);
    }

    #[test]
    fn test_lru_does_not_track_load_order() {
        let (space, _, _) = loaded(&[3072], ReplacementPolicy::Lru, 8);
        assert_eq!(space.load_order().count(), 0);
        assert_eq!(space.resident_page_count(), 3);
    }

    #[test]
    fn test_initial_load_stamps_access_times() {
        let (space, clock, _) = loaded(&[3072], ReplacementPolicy::Lru, 8);
        let stamps: Vec<Option<u64>> =
            space.segment(0).unwrap().pages.iter().map(|p| p.last_access()).collect();
        assert_eq!(stamps, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(clock.now(), 3);
    }

    // =========================================================================
    // Replacement
    // =========================================================================

    #[test]
    fn test_fifo_ignores_access_recency() {
        // A, B, C resident; D faults in
        let (mut space, mut clock, recorder) = loaded(&[4096], ReplacementPolicy::Fifo, 3);
        recorder.take();

        let mut store = recorder.clone();
        space.access(PageRef::new(0, 1), &mut clock, &mut store);
        space.access(PageRef::new(0, 2), &mut clock, &mut store);
        space.access(PageRef::new(0, 0), &mut clock, &mut store);

        let frame = space.resolve_fault(PageRef::new(0, 3), &mut clock, &mut store);

        assert_eq!(frame, 0);
        assert!(!space.page(PageRef::new(0, 0)).unwrap().is_resident());
        assert_eq!(space.page(PageRef::new(0, 3)).unwrap().frame(), Some(0));
        assert_eq!(recorder.events(), vec![PageIo::write("P", 0, 0, 0), PageIo::read("P", 0, 3, 0)]);

        let order: Vec<PageRef> = space.load_order().copied().collect();
        assert_eq!(order, vec![PageRef::new(0, 1), PageRef::new(0, 2), PageRef::new(0, 3)]);
    }

    #[test]
    fn test_lru_evicts_least_recent() {
        // A(t=1), B(t=2), C(t=3); touching A moves it to t=4
        let (mut space, mut clock, recorder) = loaded(&[4096], ReplacementPolicy::Lru, 3);
        let mut store = recorder.clone();

        space.touch(PageRef::new(0, 0), &mut clock);
        assert_eq!(space.page(PageRef::new(0, 0)).unwrap().last_access(), Some(4));

        recorder.take();
        let frame = space.resolve_fault(PageRef::new(0, 3), &mut clock, &mut store);

        assert_eq!(frame, 1);
        assert!(space.page(PageRef::new(0, 0)).unwrap().is_resident());
        assert!(!space.page(PageRef::new(0, 1)).unwrap().is_resident());
        assert_eq!(recorder.events(), vec![PageIo::write("P", 0, 1, 1), PageIo::read("P", 0, 3, 1)]);
    }

    #[test]
    fn test_lru_tie_breaks_on_lowest_page() {
        let (mut space, mut clock, recorder) = loaded(&[2048, 2048], ReplacementPolicy::Lru, 3);
        // Equal stamps on (0,1) and (1,0)
        space.set_last_access(PageRef::new(0, 0), 10);
        space.set_last_access(PageRef::new(0, 1), 5);
        space.set_last_access(PageRef::new(1, 0), 5);

        space.resolve_fault(PageRef::new(1, 1), &mut clock, &mut recorder.clone());
        assert!(!space.page(PageRef::new(0, 1)).unwrap().is_resident());
        assert!(space.page(PageRef::new(1, 0)).unwrap().is_resident());
    }

    #[test]
    fn test_evicted_page_is_cleared() {
        let (mut space, mut clock, recorder) = loaded(&[2048], ReplacementPolicy::Lru, 1);
        space.resolve_fault(PageRef::new(0, 1), &mut clock, &mut recorder.clone());

        let evicted = space.page(PageRef::new(0, 0)).unwrap();
        assert_eq!(evicted.frame(), None);
        assert_eq!(evicted.last_access(), None);
        assert_eq!(space.resident_page_count(), 1);
        assert_eq!(space.resident_frames(), &[0]);
    }

    #[test]
    fn test_touch_never_moves_time_backwards() {
        let (mut space, mut clock, _) = loaded(&[1024], ReplacementPolicy::Lru, 1);
        let page = PageRef::new(0, 0);
        let loaded_at = space.page(page).unwrap().last_access();

        space.touch(page, &mut clock);
        let first = space.page(page).unwrap().last_access();
        space.touch(page, &mut clock);
        let second = space.page(page).unwrap().last_access();

        assert!(first > loaded_at);
        assert!(second > first);
        assert_eq!(second, Some(clock.now()));
    }

    #[test]
    fn test_touch_ignores_non_resident() {
        let (mut space, mut clock, _) = loaded(&[2048], ReplacementPolicy::Lru, 1);
        space.touch(PageRef::new(0, 1), &mut clock);
        space.touch(PageRef::new(5, 0), &mut clock);
        assert_eq!(space.page(PageRef::new(0, 1)).unwrap().last_access(), None);
    }

    #[test]
    fn test_access_counts_hits_and_faults() {
        let (mut space, mut clock, recorder) = loaded(&[3072], ReplacementPolicy::Fifo, 2);
        let mut store = recorder.clone();

        assert_eq!(space.access(PageRef::new(0, 0), &mut clock, &mut store), Some((0, false)));
        assert_eq!(space.access(PageRef::new(0, 2), &mut clock, &mut store), Some((0, true)));
        assert_eq!(space.access(PageRef::new(0, 9), &mut clock, &mut store), None);
        assert_eq!(space.stats(), AccessStats { hits: 1, faults: 1 });
    }

    #[test]
    #[should_panic(expected = "empty resident set")]
    fn test_fault_without_resident_pages_panics() {
        let mut space = ProcessAddressSpace::new("P", &[1024], ReplacementPolicy::Lru, &config(8));
        let mut clock = AccessClock::new();
        space.resolve_fault(PageRef::new(0, 0), &mut clock, &mut RecordingBackingStore::new());
    }
}
