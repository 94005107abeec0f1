//! Named capability requirements and the libraries backing them.

use crate::arch::Arch;
use crate::inventory::LibraryInventory;
use crate::Error;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Requirement {
    Opengl,
    Vulkan,
    Wine,
    Radeon,
    Gamemode,
    Gnutls,
    /// Mesa's ACO shader compiler; decided by the driver version, not libraries.
    Aco,
}

/// Needed for core functionality.
pub const REQUIRED: [Requirement; 3] = [Requirement::Opengl, Requirement::Vulkan, Requirement::Gnutls];

/// Enable extra features.
pub const OPTIONAL: [Requirement; 2] = [Requirement::Wine, Requirement::Gamemode];

/// First Mesa release shipping ACO.
pub const ACO_MIN_MESA_VERSION: &str = "19.3";

impl Requirement {
    pub const ALL: [Requirement; 7] = [
        Requirement::Opengl,
        Requirement::Vulkan,
        Requirement::Wine,
        Requirement::Radeon,
        Requirement::Gamemode,
        Requirement::Gnutls,
        Requirement::Aco,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Requirement::Opengl => "OPENGL",
            Requirement::Vulkan => "VULKAN",
            Requirement::Wine => "WINE",
            Requirement::Radeon => "RADEON",
            Requirement::Gamemode => "GAMEMODE",
            Requirement::Gnutls => "GNUTLS",
            Requirement::Aco => "ACO",
        }
    }

    /// Sonames that must all be present for the requirement to hold.
    pub fn libraries(self) -> &'static [&'static str] {
        match self {
            Requirement::Opengl => &["libGL.so.1"],
            Requirement::Vulkan => &["libvulkan.so.1"],
            Requirement::Wine => &["libsqlite3.so.0"],
            Requirement::Radeon => &["libvulkan_radeon.so"],
            Requirement::Gamemode => &["libgamemodeauto.so"],
            Requirement::Gnutls => &["libgnutls.so.30"],
            Requirement::Aco => &[],
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Requirement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Requirement::ALL
            .into_iter()
            .find(|req| req.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidRequirement(s.to_string()))
    }
}

/// Requirement set for a host: required ones, then optional ones and the
/// Radeon entry when the GPU is AMD.
pub fn requirement_set(include_optional: bool, amd_gpu: bool) -> Vec<Requirement> {
    let mut requirements = REQUIRED.to_vec();
    if include_optional {
        requirements.extend(OPTIONAL);
        if amd_gpu {
            requirements.push(Requirement::Radeon);
        }
    }
    requirements
}

/// Per-architecture map of requirement to the sonames found for it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CapabilityTable {
    found: BTreeMap<Arch, BTreeMap<Requirement, Vec<&'static str>>>,
}

impl CapabilityTable {
    pub fn populate(
        inventory: &LibraryInventory,
        runtime: &[Arch],
        requirements: &[Requirement],
    ) -> Self {
        let mut found: BTreeMap<Arch, BTreeMap<Requirement, Vec<&'static str>>> =
            runtime.iter().map(|&arch| (arch, BTreeMap::new())).collect();

        for &req in requirements {
            for &soname in req.libraries() {
                for &arch in runtime {
                    if inventory.contains(soname, arch) {
                        let libs = found.entry(arch).or_default().entry(req).or_default();
                        if !libs.contains(&soname) {
                            libs.push(soname);
                        }
                    }
                }
            }
        }

        Self { found }
    }

    /// Sonames confirmed for `req` on `arch`.
    pub fn found(&self, arch: Arch, req: Requirement) -> &[&'static str] {
        self.found
            .get(&arch)
            .and_then(|reqs| reqs.get(&req))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// One list per runtime architecture, in order, of the sonames missing
    /// for `req`. An empty list means the requirement holds there.
    pub fn missing(&self, runtime: &[Arch], req: Requirement) -> Vec<Vec<String>> {
        runtime
            .iter()
            .map(|&arch| {
                let found = self.found(arch, req);
                req.libraries()
                    .iter()
                    .filter(|lib| !found.contains(*lib))
                    .map(|lib| lib.to_string())
                    .collect()
            })
            .collect()
    }

    /// Runtime architectures on which `req` misses at least one library.
    pub fn missing_architectures(&self, runtime: &[Arch], req: Requirement) -> Vec<Arch> {
        runtime
            .iter()
            .zip(self.missing(runtime, req))
            .filter(|(_, missing)| !missing.is_empty())
            .map(|(&arch, _)| arch)
            .collect()
    }
}

/// Whether a Mesa version string is at least `minimum`, compared as dotted
/// numbers (`"23.1.3-1ubuntu1"` reads as `[23, 1, 3]`).
pub fn version_at_least(version: &str, minimum: &str) -> bool {
    let parse = |s: &str| -> Vec<u64> {
        s.split(|c: char| !c.is_ascii_digit() && c != '.')
            .next()
            .unwrap_or("")
            .split('.')
            .map_while(|part| part.parse().ok())
            .collect()
    };

    let version = parse(version.trim());
    if version.is_empty() {
        return false;
    }
    version >= parse(minimum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::SharedLibrary;

    const RUNTIME: [Arch; 2] = [Arch::I386, Arch::X86_64];

    fn inventory(entries: &[(&str, &str)]) -> LibraryInventory {
        let libs = entries.iter().map(|(name, flags)| {
            let flags = flags.split(',').map(str::to_string).collect();
            SharedLibrary::new(*name, flags, format!("/usr/lib/{}", name))
        });
        LibraryInventory::from_libraries(libs, &RUNTIME)
    }

    #[test]
    fn parses_requirement_names() {
        assert_eq!("VULKAN".parse::<Requirement>().unwrap(), Requirement::Vulkan);
        assert_eq!("gamemode".parse::<Requirement>().unwrap(), Requirement::Gamemode);
        assert!(matches!(
            "DIRECTX".parse::<Requirement>(),
            Err(Error::InvalidRequirement(_))
        ));
        for req in Requirement::ALL {
            assert_eq!(req.to_string().parse::<Requirement>().unwrap(), req);
        }
    }

    #[test]
    fn builds_requirement_sets() {
        use Requirement::*;
        assert_eq!(requirement_set(false, true), [Opengl, Vulkan, Gnutls]);
        assert_eq!(
            requirement_set(true, false),
            [Opengl, Vulkan, Gnutls, Wine, Gamemode]
        );
        assert_eq!(
            requirement_set(true, true),
            [Opengl, Vulkan, Gnutls, Wine, Gamemode, Radeon]
        );
    }

    #[test]
    fn reports_missing_libraries_per_architecture() {
        let inventory = inventory(&[
            ("libvulkan.so.1", "libc6,x86-64"),
            ("libGL.so.1", "libc6,x86-64"),
            ("libGL.so.1", "libc6"),
        ]);
        let table = CapabilityTable::populate(&inventory, &RUNTIME, &requirement_set(true, false));

        assert_eq!(
            table.missing(&RUNTIME, Requirement::Vulkan),
            [vec!["libvulkan.so.1".to_string()], vec![]]
        );
        assert_eq!(
            table.missing(&RUNTIME, Requirement::Opengl),
            [Vec::<String>::new(), vec![]]
        );
        assert_eq!(
            table.missing_architectures(&RUNTIME, Requirement::Vulkan),
            [Arch::I386]
        );
        assert_eq!(
            table.missing_architectures(&RUNTIME, Requirement::Gnutls),
            [Arch::I386, Arch::X86_64]
        );
        assert_eq!(table.found(Arch::X86_64, Requirement::Opengl), ["libGL.so.1"]);
    }

    #[test]
    fn requirements_outside_the_set_are_all_missing() {
        let inventory = inventory(&[("libvulkan_radeon.so", "libc6,x86-64")]);
        let table = CapabilityTable::populate(&inventory, &RUNTIME, &requirement_set(true, false));

        assert_eq!(
            table.missing(&RUNTIME, Requirement::Radeon),
            [vec!["libvulkan_radeon.so".to_string()], vec!["libvulkan_radeon.so".to_string()]]
        );
    }

    #[test]
    fn missing_report_is_idempotent() {
        let inventory = inventory(&[("libsqlite3.so.0", "libc6")]);
        let table = CapabilityTable::populate(&inventory, &RUNTIME, &requirement_set(true, false));
        assert_eq!(
            table.missing(&RUNTIME, Requirement::Wine),
            table.missing(&RUNTIME, Requirement::Wine)
        );
        let again = CapabilityTable::populate(&inventory, &RUNTIME, &requirement_set(true, false));
        assert_eq!(
            again.missing(&RUNTIME, Requirement::Wine),
            table.missing(&RUNTIME, Requirement::Wine)
        );
    }

    #[test]
    fn compares_versions_numerically() {
        assert!(version_at_least("19.3", ACO_MIN_MESA_VERSION));
        assert!(version_at_least("19.3.0-devel", ACO_MIN_MESA_VERSION));
        assert!(version_at_least("23.1.3", ACO_MIN_MESA_VERSION));
        assert!(version_at_least("100.0", ACO_MIN_MESA_VERSION));
        assert!(!version_at_least("19.2.8", ACO_MIN_MESA_VERSION));
        assert!(!version_at_least("9.9", ACO_MIN_MESA_VERSION));
        assert!(!version_at_least("", ACO_MIN_MESA_VERSION));
        assert!(!version_at_least("unknown", ACO_MIN_MESA_VERSION));
    }
}
