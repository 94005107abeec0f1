//! Point-in-time inventory of the shared libraries the dynamic linker knows.
//!
//! Built once from `ldconfig -p` (or, when the tool is missing, from the
//! binary cache file) and filtered to the host's runtime architectures.

use crate::arch::Arch;
use crate::internal::cache_format;
use crate::library::SharedLibrary;
use crate::Error;
use camino::{Utf8Path, Utf8PathBuf};
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::File;
use std::process::Command;
use tracing::{debug, error};

/// Where the linker cache contents come from.
#[derive(Debug, Clone)]
pub enum CacheSource {
    /// Captured `ldconfig -p` output.
    Listing(String),
    /// Path to an `ldconfig` executable, run with `-p`.
    Command(Utf8PathBuf),
    /// Binary ld.so.cache file.
    File(Utf8PathBuf),
}

/// Libraries grouped by soname, in cache listing order.
#[derive(Debug, Clone, Default)]
pub struct LibraryInventory {
    records: Vec<SharedLibrary>,
    by_name: HashMap<String, Vec<usize>>,
}

impl LibraryInventory {
    /// Load from `source`, keeping only libraries for `runtime` architectures.
    ///
    /// Never fails: an unreadable source yields an empty inventory and an
    /// error-level log event.
    pub fn load(source: &CacheSource, runtime: &[Arch]) -> Self {
        let result = match source {
            CacheSource::Listing(listing) => Ok(Self::from_listing(listing, runtime)),
            CacheSource::Command(ldconfig) => {
                run_ldconfig(ldconfig).map(|listing| Self::from_listing(&listing, runtime))
            }
            CacheSource::File(path) => {
                read_cache_file(path).map(|libs| Self::from_libraries(libs, runtime))
            }
        };

        result.unwrap_or_else(|e| {
            error!("Unable to read the dynamic linker cache: {}", e);
            Self::default()
        })
    }

    /// Parse `ldconfig -p` output. Only tab-indented lines are entries; the
    /// header and footer are ignored, malformed entries are logged and skipped.
    pub fn from_listing(listing: &str, runtime: &[Arch]) -> Self {
        let libraries = listing
            .lines()
            .filter_map(|line| line.strip_prefix('\t'))
            .filter_map(|line| match SharedLibrary::from_ldconfig_line(line) {
                Ok(lib) => Some(lib),
                Err(e) => {
                    error!("{}", e);
                    None
                }
            });
        Self::from_libraries(libraries, runtime)
    }

    pub fn from_libraries(
        libraries: impl IntoIterator<Item = SharedLibrary>,
        runtime: &[Arch],
    ) -> Self {
        let mut inventory = Self::default();
        for lib in libraries {
            if !runtime.contains(&lib.arch()) {
                debug!("Skipping {} for foreign architecture", lib);
                continue;
            }
            inventory
                .by_name
                .entry(lib.name().to_string())
                .or_default()
                .push(inventory.records.len());
            inventory.records.push(lib);
        }
        debug!(
            "Inventory holds {} libraries ({} records)",
            inventory.len(),
            inventory.records.len()
        );
        inventory
    }

    /// Records registered under `name`, in listing order.
    pub fn get<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a SharedLibrary> + 'a {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.records[idx])
    }

    /// Whether a record named `name` exists for `arch`.
    pub fn contains(&self, name: &str, arch: Arch) -> bool {
        self.get(name).any(|lib| lib.arch() == arch)
    }

    /// Every retained record, in listing order.
    pub fn iter(&self) -> impl Iterator<Item = &SharedLibrary> {
        self.records.iter()
    }

    /// Number of distinct library names.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

fn run_ldconfig(ldconfig: &Utf8Path) -> Result<String, Error> {
    debug!("Running {} -p", ldconfig);
    let output = Command::new(ldconfig).arg("-p").output()?;
    if !output.status.success() {
        return Err(Error::ToolUnavailable(format!(
            "{} exited with {}",
            ldconfig, output.status
        )));
    }
    Ok(String::from_utf8(output.stdout)?)
}

fn read_cache_file(path: &Utf8Path) -> Result<Vec<SharedLibrary>, Error> {
    debug!("Reading {}", path);
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    let entries = cache_format::parse_cache(&mmap)?;
    Ok(entries
        .into_iter()
        .map(cache_format::CacheEntry::into_library)
        .collect())
}
