//! Interactive front end: parses command lines, drives the [`Kernel`] and
//! renders its state as text tables.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::config::{MemoryConfig, ReplacementPolicy};
use crate::constants::{FRAMES_PER_ROW, OWNER_DISPLAY_WIDTH};
use crate::vm_manager::Kernel;

pub const PROMPT: &str = ">>> ";

pub const HELP: &str = "\
create process <id> <size1> <size2> ...   create a process with the given segment sizes
destroy process <id>                      destroy a process
show memory                               show frame occupancy
show process <id>                         show resident set, policy, segment and page tables
address <id> <segment> <offset>           translate a logical address to a physical address
help or h                                 show this help
quit or q                                 exit
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { id: String, segments: Vec<usize> },
    Destroy { id: String },
    ShowMemory,
    ShowProcess { id: String },
    Address { id: String, segment: usize, offset: usize },
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unrecognized command (type help for usage)")]
    Unknown,
    #[error("segment sizes must be positive integers, got {0:?} (type help for usage)")]
    InvalidSegmentSize(String),
    #[error("segment number and offset must be non-negative integers, got {0:?} (type help for usage)")]
    InvalidAddress(String),
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            [] => return Ok(None),
            ["create", "process", id, sizes @ ..] if !sizes.is_empty() => {
                let segments = sizes
                    .iter()
                    .map(|s| match s.parse::<usize>() {
                        Ok(size) if size > 0 => Ok(size),
                        _ => Err(CommandError::InvalidSegmentSize(s.to_string())),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Command::Create { id: id.to_string(), segments }
            }
            ["destroy", "process", id] => Command::Destroy { id: id.to_string() },
            ["show", "memory"] => Command::ShowMemory,
            ["show", "process", id] => Command::ShowProcess { id: id.to_string() },
            ["address", id, segment, offset] => {
                let parse = |s: &str| {
                    s.parse::<usize>().map_err(|_| CommandError::InvalidAddress(s.to_string()))
                };
                Command::Address { id: id.to_string(), segment: parse(*segment)?, offset: parse(*offset)? }
            }
            ["help"] | ["h"] => Command::Help,
            ["quit"] | ["q"] => Command::Quit,
            _ => return Err(CommandError::Unknown),
        };
        Ok(Some(command))
    }
}

/// Byte count as `NK` when it is a whole number of KiB, else `N bytes`
fn format_size(bytes: usize) -> String {
    if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{}K", bytes / 1024)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Startup description of the simulated machine
pub fn banner(config: &MemoryConfig) -> String {
    format!(
        "Memory Management [version {}]\n\n\
         Memory {}, page size {}, at most {} segments per process of at most {} each, \
         resident set of at most {} pages.\n\
         Replacement scope: local (victims come from the faulting process's resident set)\n\
         Replacement policies: FIFO, LRU\n\
         Initial load: pages of segment 0, 1, ... in order until the resident set is full\n\
         Placement: lowest free frames first\n",
        env!("CARGO_PKG_VERSION"),
        format_size(config.memory_size),
        format_size(config.page_size),
        config.max_segment_num,
        format_size(config.max_segment_size),
        config.max_resident_set_num,
    )
}

/// Frame occupancy grid, `FRAMES_PER_ROW` frames per row
pub fn render_memory(kernel: &Kernel) -> String {
    let mut out = String::from("Memory usage:");
    for (frame, owner) in kernel.frame_map() {
        if frame.index % FRAMES_PER_ROW == 0 {
            out.push_str(&format!("\n{}-{}:\t| ", frame.index, frame.index + FRAMES_PER_ROW - 1));
        }
        let label: String = owner.unwrap_or("").chars().take(OWNER_DISPLAY_WIDTH).collect();
        out.push_str(&format!("{:<width$}\t| ", label, width = OWNER_DISPLAY_WIDTH + 1));
    }
    out
}

/// Resident set, policy and page tables of one process
pub fn render_process(kernel: &Kernel, id: &str) -> Option<String> {
    let process = kernel.process(id)?;
    let page_size = kernel.config().page_size;
    let rule = "-".repeat(65);
    let mut out = String::new();

    let frames: Vec<String> = process.resident_frames().iter().map(ToString::to_string).collect();
    out.push_str(&format!("Resident set: [ {} ]\n", frames.join(" ")));
    match process.policy() {
        ReplacementPolicy::Fifo => {
            let queue: Vec<String> = process.load_order().map(ToString::to_string).collect();
            out.push_str(&format!("Replacement policy: FIFO [ {} ]\n", queue.join(" ")));
        }
        ReplacementPolicy::Lru => out.push_str("Replacement policy: LRU\n"),
    }
    let stats = process.stats();
    out.push_str(&format!("Accesses: {} hits, {} page faults\n\n", stats.hits, stats.faults));

    for segment in process.segments() {
        out.push_str(&format!("Process {} segment:{} size:{}\n", id, segment.number, segment.size));
        out.push_str(&format!("{rule}\n| page\t| loaded\t| frame\t| frame base\t| last access\t|\n{rule}\n"));
        for entry in &segment.pages {
            let row = match (entry.frame(), entry.last_access()) {
                (Some(frame), Some(stamp)) => format!(
                    "| {}\t| load\t\t| {}\t| {}\t\t| {}\t\t|\n",
                    entry.page_number,
                    frame,
                    frame * page_size,
                    stamp
                ),
                _ => format!("| {}\t| unload\t| \t| \t\t| \t\t|\n", entry.page_number),
            };
            out.push_str(&row);
        }
        out.push_str(&format!("{}\n\n", rule));
    }
    Some(out)
}

/// What the loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Shell {
    kernel: Kernel,
}

impl Shell {
    pub fn new(kernel: Kernel) -> Self {
        Shell { kernel }
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Run one command, writing its report to `out`
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> io::Result<Flow> {
        match command {
            Command::Create { id, segments } => match self.kernel.create_process(&id, &segments) {
                Ok(()) => writeln!(out, "created process {}", id)?,
                Err(e) => writeln!(out, "failed to create process {}: {}", id, e)?,
            },
            Command::Destroy { id } => match self.kernel.destroy_process(&id) {
                Ok(()) => writeln!(out, "destroyed process {}", id)?,
                Err(e) => writeln!(out, "failed to destroy process: {}", e)?,
            },
            Command::ShowMemory => writeln!(out, "{}\n", render_memory(&self.kernel))?,
            Command::ShowProcess { id } => match render_process(&self.kernel, &id) {
                Some(report) => write!(out, "{}", report)?,
                None => writeln!(out, "process {} does not exist", id)?,
            },
            Command::Address { id, segment, offset } => {
                match self.kernel.access(&id, segment, offset) {
                    Ok(t) => {
                        if t.page_fault {
                            writeln!(out, "page fault: requested page was not in memory")?;
                        }
                        writeln!(
                            out,
                            "process {} segment({}) offset({}) -> physical address {}",
                            id, segment, offset, t.physical_address
                        )?;
                    }
                    Err(e) => writeln!(out, "translation failed: {}", e)?,
                }
            }
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit => {
                writeln!(out, "quit")?;
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Read commands until `quit` or end of input
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        write!(out, "{}", PROMPT)?;
        out.flush()?;
        for line in input.lines() {
            let line = line?;
            match Command::parse(&line) {
                Ok(Some(command)) => {
                    if self.execute(command, out)? == Flow::Quit {
                        return Ok(());
                    }
                }
                Ok(None) => {}
                Err(e) => writeln!(out, "{}", e)?,
            }
            write!(out, "{}", PROMPT)?;
            out.flush()?;
        }
        Ok(())
    }
}
