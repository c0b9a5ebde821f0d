pub mod address_space;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod memory;
pub mod shell;
pub mod translation;
pub mod vm_manager;

// Re-export commonly used items for convenience
pub use constants::*;
pub use address_space::{AccessStats, PageRef, ProcessAddressSpace};
pub use config::{MemoryConfig, ReplacementPolicy};
pub use error::{ConfigError, KernelError};
pub use translation::{LogicalAddress, Translation};
pub use vm_manager::Kernel;
