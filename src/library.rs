//! Shared library records as reported by the dynamic linker cache.

use crate::arch::Arch;
use crate::Error;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt;

/// One `ldconfig -p` entry: `libGL.so.1 (libc6,x86-64) => /usr/lib/libGL.so.1`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedLibrary {
    name: String,
    flags: Vec<String>,
    path: Utf8PathBuf,
}

impl SharedLibrary {
    pub fn new(name: impl Into<String>, flags: Vec<String>, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            flags,
            path: path.into(),
        }
    }

    /// Parse a single listing line, without the leading tab.
    ///
    /// The whole line must match `NAME (FLAGS) => PATH`. Both separators are
    /// searched from the right, so names containing ` (` still parse. Lines
    /// with an empty name or an empty path are rejected.
    pub fn from_ldconfig_line(line: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidCacheLine(line.to_string());

        let (head, path) = line.rsplit_once(") => ").ok_or_else(invalid)?;
        let (name, flags) = head.rsplit_once(" (").ok_or_else(invalid)?;

        if name.is_empty() || path.is_empty() || path.contains('\n') {
            return Err(invalid());
        }

        let flags = flags.split(',').map(|flag| flag.trim().to_string()).collect();

        Ok(Self::new(name, flags, path))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Architecture from the cache tags: `x86-64` and `x32` are recognized,
    /// anything else is a 32-bit x86 library.
    pub fn arch(&self) -> Arch {
        if self.has_flag("x86-64") {
            Arch::X86_64
        } else if self.has_flag("x32") {
            Arch::X32
        } else {
            Arch::I386
        }
    }

    /// Name truncated before the first `.so`.
    pub fn basename(&self) -> &str {
        self.name
            .find(".so")
            .map_or(self.name.as_str(), |idx| &self.name[..idx])
    }

    /// Directory holding the library file.
    pub fn directory(&self) -> &Utf8Path {
        self.path.parent().unwrap_or_else(|| Utf8Path::new(""))
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

impl fmt::Display for SharedLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.arch())
    }
}
