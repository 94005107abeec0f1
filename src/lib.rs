// hostcaps - shared library capability probe for Linux hosts
// MIT, 2025

//! Find out which shared-library backed capabilities a Linux host can use.
//!
//! This library provides:
//! - An inventory of the dynamic linker cache (`ldconfig -p`, or the binary
//!   ld.so.cache when the tool is missing), filtered to the architectures the
//!   host can run
//! - Library search folders ranked by use, with multi-arch folder pairs
//! - Requirement checks (`VULKAN`, `WINE`, ...) reporting missing libraries
//!   per architecture
//! - A frozen [`SystemCapabilities`] snapshot answering capability queries
//!
//! # Example: Check Vulkan support
//!
//! ```no_run
//! use hostcaps::{Requirement, SystemCapabilities};
//!
//! let caps = SystemCapabilities::builder().build();
//! if !caps.is_feature_supported(Requirement::Vulkan) {
//!     for (arch, missing) in caps
//!         .runtime_architectures()
//!         .iter()
//!         .zip(caps.missing_libraries(Requirement::Vulkan))
//!     {
//!         println!("{}: missing {:?}", arch, missing);
//!     }
//! }
//! ```
//!
//! # Example: Probe a captured listing
//!
//! ```no_run
//! use hostcaps::SystemCapabilities;
//!
//! let listing = std::fs::read_to_string("ldconfig-p.txt")?;
//! let caps = SystemCapabilities::builder()
//!     .machine("x86_64")
//!     .listing(listing)
//!     .build();
//! for folder in caps.lib_folders() {
//!     println!("{}", folder);
//! }
//! # Ok::<(), hostcaps::Error>(())
//! ```

mod internal;

pub mod arch;
pub mod capabilities;
pub mod commands;
pub mod config;
pub mod error;
pub mod folders;
pub mod graphics;
pub mod inventory;
pub mod library;
pub mod report;
pub mod requirements;
pub mod system;

pub use arch::Arch;
pub use capabilities::SystemCapabilities;
pub use commands::{CommandTable, SystemCommand};
pub use config::ProbeConfig;
pub use error::Error;
pub use graphics::{GlxInfo, GpuVendor, GraphicsInfo};
pub use inventory::{CacheSource, LibraryInventory};
pub use library::SharedLibrary;
pub use report::SystemInfo;
pub use requirements::{CapabilityTable, Requirement};
pub use system::FileLimits;
