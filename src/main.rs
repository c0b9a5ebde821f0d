//! Segmented paging simulator - interactive shell
//!
//! Usage: segmented-paging [OPTIONS]
//!
//! Commands are read from stdin (type `help` once started). Simulated page
//! transfers are logged to stderr; set RUST_LOG=debug for translation detail.

use std::io::{self, BufRead, IsTerminal, Write};
use std::process;

use clap::Parser;

use segmented_paging::shell::{banner, Shell, PROMPT};
use segmented_paging::*;

/// Command-line configuration, fixed for the lifetime of the simulation
#[derive(Debug, Parser)]
#[command(version, about = "Segmented paging virtual memory simulator")]
struct Args {
    /// Physical memory size in bytes
    #[arg(long, default_value_t = MEMORY_SIZE)]
    memory_size: usize,

    /// Page and frame size in bytes (power of two)
    #[arg(long, default_value_t = PAGE_SIZE)]
    page_size: usize,

    /// Maximum number of segments per process
    #[arg(long, default_value_t = MAX_SEGMENT_NUM)]
    max_segments: usize,

    /// Maximum segment size in bytes
    #[arg(long, default_value_t = MAX_SEGMENT_SIZE)]
    max_segment_size: usize,

    /// Maximum resident set size in pages
    #[arg(long, default_value_t = MAX_RESIDENT_SET_NUM)]
    max_resident_set: usize,

    /// Replacement policy (fifo or lru). Prompted for when omitted on a terminal.
    #[arg(long)]
    policy: Option<ReplacementPolicy>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Ask for the policy until a valid answer arrives; `None` at end of input
fn prompt_policy<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<Option<ReplacementPolicy>> {
    write!(out, "{}Choose a replacement policy (0 for FIFO, 1 for LRU): ", PROMPT)?;
    out.flush()?;
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        match line.trim() {
            "0" => return Ok(Some(ReplacementPolicy::Fifo)),
            "1" => return Ok(Some(ReplacementPolicy::Lru)),
            _ => {
                write!(out, "{}Invalid input, choose a replacement policy (0 for FIFO, 1 for LRU): ", PROMPT)?;
                out.flush()?;
            }
        }
    }
}

fn run(args: &Args) -> Result<(), String> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout().lock();

    let mut config = MemoryConfig {
        memory_size: args.memory_size,
        page_size: args.page_size,
        max_segment_num: args.max_segments,
        max_segment_size: args.max_segment_size,
        max_resident_set_num: args.max_resident_set,
        policy: ReplacementPolicy::default(),
    };
    config.validate().map_err(|e| format!("invalid configuration: {}", e))?;

    let write_err = |e: io::Error| format!("I/O error: {}", e);
    writeln!(out, "{}", banner(&config)).map_err(write_err)?;

    config.policy = match args.policy {
        Some(policy) => policy,
        None if io::stdin().is_terminal() => match prompt_policy(&mut input, &mut out).map_err(write_err)? {
            Some(policy) => policy,
            None => return Ok(()),
        },
        None => ReplacementPolicy::default(),
    };
    writeln!(out, "Replacement policy set to {}", config.policy).map_err(write_err)?;
    writeln!(out, "Type help for more information").map_err(write_err)?;

    let kernel = Kernel::new(config).map_err(|e| format!("invalid configuration: {}", e))?;
    let mut shell = Shell::new(kernel);
    shell.run(input, &mut out).map_err(write_err)
}
