//! Host and library architecture handling.
//!
//! The host's primary architecture comes from the kernel machine string
//! (`uname -m`). The runtime architectures derived from it are the filter
//! applied to every library the linker cache reports.

use crate::Error;
use serde::Serialize;
use std::ffi::CStr;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    I386,
    X86_64,
    X32,
    Armv7,
    Unknown,
}

impl Arch {
    pub fn as_str(self) -> &'static str {
        match self {
            Arch::I386 => "i386",
            Arch::X86_64 => "x86_64",
            Arch::X32 => "x32",
            Arch::Armv7 => "armv7",
            Arch::Unknown => "unknown",
        }
    }

    /// Normalize a raw machine string.
    ///
    /// `x86_64` stays as is, `i386`/`i686` collapse to `i386` and anything
    /// mentioning `armv7` becomes `armv7`. Other machines are rejected.
    pub fn from_machine(machine: &str) -> Result<Arch, Error> {
        match machine {
            "x86_64" => Ok(Arch::X86_64),
            "i386" | "i686" => Ok(Arch::I386),
            m if m.contains("armv7") => Ok(Arch::Armv7),
            m => Err(Error::UnsupportedArchitecture(m.to_string())),
        }
    }

    /// Same as [`Arch::from_machine`] but degrades to `Unknown` with a warning.
    pub fn resolve(machine: &str) -> Arch {
        Arch::from_machine(machine).unwrap_or_else(|e| {
            warn!("{}", e);
            Arch::Unknown
        })
    }

    /// Architectures this host can execute binaries for.
    ///
    /// 64-bit x86 hosts are assumed to carry 32-bit compatibility, every
    /// other host is limited to `i386`. The order is fixed: `i386` first.
    pub fn runtime_architectures(self) -> Vec<Arch> {
        match self {
            Arch::X86_64 => vec![Arch::I386, Arch::X86_64],
            _ => vec![Arch::I386],
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read the machine string from `uname(2)`.
pub fn host_machine() -> Option<String> {
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        warn!("uname failed: {}", std::io::Error::last_os_error());
        return None;
    }
    let machine = unsafe { CStr::from_ptr(uts.machine.as_ptr()) };
    Some(machine.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_machine_strings() {
        assert_eq!(Arch::resolve("x86_64"), Arch::X86_64);
        assert_eq!(Arch::resolve("i686"), Arch::I386);
        assert_eq!(Arch::resolve("i386"), Arch::I386);
        assert_eq!(Arch::resolve("armv7l"), Arch::Armv7);
        assert_eq!(Arch::resolve("aarch64"), Arch::Unknown);
        assert!(matches!(
            Arch::from_machine("riscv64"),
            Err(Error::UnsupportedArchitecture(m)) if m == "riscv64"
        ));
    }

    #[test]
    fn runtime_architectures_by_primary() {
        assert_eq!(
            Arch::X86_64.runtime_architectures(),
            vec![Arch::I386, Arch::X86_64]
        );
        for arch in [Arch::I386, Arch::Armv7, Arch::Unknown] {
            assert_eq!(arch.runtime_architectures(), vec![Arch::I386]);
        }
    }

    #[test]
    fn host_machine_is_readable() {
        let machine = host_machine().unwrap();
        assert!(!machine.is_empty());
    }
}
