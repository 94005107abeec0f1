//! Host facts read from procfs, `/etc` and resource limits.

use crate::config::ProbeConfig;
use crate::Error;
use camino::Utf8Path;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// `RLIMIT_NOFILE` soft and hard limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileLimits {
    pub soft: u64,
    pub hard: u64,
}

impl FileLimits {
    /// Current process limits. Unreadable limits are reported as zero.
    pub fn current() -> Self {
        let mut limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) } != 0 {
            warn!(
                "Unable to read file descriptor limits: {}",
                std::io::Error::last_os_error()
            );
            return Self::default();
        }
        Self {
            soft: limit.rlim_cur as u64,
            hard: limit.rlim_max as u64,
        }
    }
}

/// File names found in the configured soundfont folders.
pub fn scan_soundfonts(config: &ProbeConfig) -> Vec<String> {
    let mut soundfonts = Vec::new();
    for folder in &config.soundfont_folders {
        let folder = config.resolve(folder);
        if !folder.exists() {
            continue;
        }
        let entries = WalkDir::new(&folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in entries {
            match entry {
                Ok(entry) => soundfonts.push(entry.file_name().to_string_lossy().into_owned()),
                Err(e) => debug!("Skipping soundfont entry in {}: {}", folder, e),
            }
        }
    }
    soundfonts
}

/// One map per processor block of `/proc/cpuinfo`.
pub fn parse_cpuinfo(content: &str) -> Vec<BTreeMap<String, String>> {
    let mut cpus = vec![BTreeMap::new()];
    for line in content.lines() {
        if line.trim().is_empty() {
            cpus.push(BTreeMap::new());
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            if let Some(cpu) = cpus.last_mut() {
                cpu.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
    }
    cpus.retain(|cpu| !cpu.is_empty());
    cpus
}

/// `/proc/meminfo` values, in kB.
pub fn parse_meminfo(content: &str) -> BTreeMap<String, u64> {
    content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let value = value.trim().trim_end_matches("kB").trim().parse().ok()?;
            Some((key.trim().to_string(), value))
        })
        .collect()
}

/// Kernel release from `/proc/version` (third word).
pub fn parse_kernel_version(content: &str) -> Option<String> {
    content
        .lines()
        .next()?
        .split(' ')
        .nth(2)
        .map(str::to_string)
}

/// `PRETTY_NAME` (or `NAME`) from an os-release file.
pub fn parse_os_release(content: &str) -> Option<String> {
    let fields: BTreeMap<&str, &str> = content
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim().trim_matches('"')))
        .collect();
    fields
        .get("PRETTY_NAME")
        .or_else(|| fields.get("NAME"))
        .map(|name| name.to_string())
}

pub fn read_cpus(config: &ProbeConfig) -> Result<Vec<BTreeMap<String, String>>, Error> {
    Ok(parse_cpuinfo(&read(config, "/proc/cpuinfo")?))
}

pub fn read_ram_info(config: &ProbeConfig) -> Result<BTreeMap<String, u64>, Error> {
    Ok(parse_meminfo(&read(config, "/proc/meminfo")?))
}

pub fn read_kernel_version(config: &ProbeConfig) -> Result<Option<String>, Error> {
    Ok(parse_kernel_version(&read(config, "/proc/version")?))
}

pub fn read_distribution(config: &ProbeConfig) -> Option<String> {
    ["/etc/os-release", "/usr/lib/os-release"]
        .into_iter()
        .find_map(|path| read(config, path).ok())
        .and_then(|content| parse_os_release(&content))
}

fn read(config: &ProbeConfig, path: &str) -> Result<String, Error> {
    Ok(fs::read_to_string(config.resolve(Utf8Path::new(path)))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    fn parses_cpuinfo_blocks() {
        let cpus = parse_cpuinfo(
            "processor\t: 0\nvendor_id\t: AuthenticAMD\nmodel name\t: AMD Ryzen 7 5800X 8-Core Processor\n\n\
             processor\t: 1\nvendor_id\t: AuthenticAMD\nflags\t\t: fpu vme de: pse\n\n",
        );
        assert_eq!(cpus.len(), 2);
        assert_eq!(cpus[0]["vendor_id"], "AuthenticAMD");
        assert_eq!(cpus[0]["model name"], "AMD Ryzen 7 5800X 8-Core Processor");
        assert_eq!(cpus[1]["flags"], "fpu vme de: pse");
    }

    #[test]
    fn parses_meminfo() {
        let mem = parse_meminfo("MemTotal:       32768000 kB\nSwapTotal:       2097148 kB\nHugePages_Total:       0\n");
        assert_eq!(mem["MemTotal"], 32_768_000);
        assert_eq!(mem["SwapTotal"], 2_097_148);
        assert_eq!(mem["HugePages_Total"], 0);
    }

    #[test]
    fn parses_kernel_and_distribution() {
        assert_eq!(
            parse_kernel_version("Linux version 6.8.0-45-generic (buildd@lcy02) #45-Ubuntu SMP\n")
                .as_deref(),
            Some("6.8.0-45-generic")
        );
        assert_eq!(parse_kernel_version(""), None);
        assert_eq!(
            parse_os_release("NAME=\"Fedora Linux\"\nPRETTY_NAME=\"Fedora Linux 40 (Workstation Edition)\"\n")
                .as_deref(),
            Some("Fedora Linux 40 (Workstation Edition)")
        );
        assert_eq!(parse_os_release("NAME=Arch\n").as_deref(), Some("Arch"));
    }

    #[test]
    fn scans_soundfonts_in_existing_folders() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let folder = root.join("usr/share/soundfonts");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("FluidR3_GM.sf2"), "").unwrap();
        fs::write(folder.join("default.sf2"), "").unwrap();

        let soundfonts = scan_soundfonts(&ProbeConfig::with_root(root));
        assert_eq!(soundfonts, ["FluidR3_GM.sf2", "default.sf2"]);
    }

    #[test]
    fn reads_current_file_limits() {
        let limits = FileLimits::current();
        assert!(limits.hard >= limits.soft);
        assert!(limits.soft > 0);
    }
}
