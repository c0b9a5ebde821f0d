//! Simulated backing store.
//!
//! No bytes move between memory and disk. Each page transfer is reported to a
//! [`BackingStore`] so it can be logged or recorded.

use std::cell::RefCell;
use std::rc::Rc;

use log::info;

/// Receives the page transfers the kernel performs while loading and
/// evicting pages.
pub trait BackingStore {
    /// Page `page` of segment `segment` of `owner` is read into `frame`
    fn read_page(&mut self, owner: &str, segment: usize, page: usize, frame: usize);

    /// The contents of `frame`, holding `owner`'s segment/page, are written back
    fn write_page(&mut self, owner: &str, segment: usize, page: usize, frame: usize);
}

/// Reports every transfer through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingBackingStore;

impl BackingStore for LoggingBackingStore {
    fn read_page(&mut self, owner: &str, segment: usize, page: usize, frame: usize) {
        info!("IO: read process {} segment({}) page({}) into frame {}", owner, segment, page, frame);
    }

    fn write_page(&mut self, owner: &str, segment: usize, page: usize, frame: usize) {
        info!("IO: write frame {} to disk (process {} segment({}) page({}))", frame, owner, segment, page);
    }
}

/// A single simulated transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageIo {
    Read { owner: String, segment: usize, page: usize, frame: usize },
    Write { owner: String, segment: usize, page: usize, frame: usize },
}

impl PageIo {
    pub fn read(owner: &str, segment: usize, page: usize, frame: usize) -> Self {
        PageIo::Read { owner: owner.to_string(), segment, page, frame }
    }

    pub fn write(owner: &str, segment: usize, page: usize, frame: usize) -> Self {
        PageIo::Write { owner: owner.to_string(), segment, page, frame }
    }
}

/// Records transfers in order. Clones share the same log, so a clone kept by
/// the caller observes everything the kernel's copy receives.
#[derive(Debug, Default, Clone)]
pub struct RecordingBackingStore {
    events: Rc<RefCell<Vec<PageIo>>>,
}

impl RecordingBackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PageIo> {
        self.events.borrow().clone()
    }

    /// Return and forget everything recorded so far
    pub fn take(&self) -> Vec<PageIo> {
        self.events.borrow_mut().drain(..).collect()
    }
}

impl BackingStore for RecordingBackingStore {
    fn read_page(&mut self, owner: &str, segment: usize, page: usize, frame: usize) {
        self.events.borrow_mut().push(PageIo::read(owner, segment, page, frame));
    }

    fn write_page(&mut self, owner: &str, segment: usize, page: usize, frame: usize) {
        self.events.borrow_mut().push(PageIo::write(owner, segment, page, frame));
    }
}
