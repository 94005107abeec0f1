//! Library search folders, most used first.

use crate::arch::Arch;
use crate::config::ProbeConfig;
use crate::inventory::LibraryInventory;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{HashMap, HashSet};

/// Directories holding inventory libraries, sorted by how many records they
/// hold. Ties keep the order in which the directories were first seen.
pub fn used_lib_folders(inventory: &LibraryInventory) -> Vec<Utf8PathBuf> {
    let mut counts: HashMap<&Utf8Path, usize> = HashMap::new();
    let mut order = Vec::new();
    for lib in inventory.iter() {
        let dir = lib.directory();
        let count = counts.entry(dir).or_insert(0);
        if *count == 0 {
            order.push(dir);
        }
        *count += 1;
    }

    // Stable sort keeps discovery order among equal counts.
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().map(Utf8Path::to_path_buf).collect()
}

/// Every folder worth adding to a library search path, without duplicates.
///
/// Starts with [`used_lib_folders`], then walks the conventional multi-arch
/// pairs from `config`. On non-`x86_64` hosts only the 32-bit side of a pair
/// is considered. On `x86_64` hosts a pair whose sides resolve to the same
/// real directory is skipped entirely; otherwise each existing side is added.
pub fn lib_folders(
    inventory: &LibraryInventory,
    arch: Arch,
    config: &ProbeConfig,
) -> Vec<Utf8PathBuf> {
    let mut seen = HashSet::new();
    let mut folders = Vec::new();
    let mut push = |folder: Utf8PathBuf| {
        if seen.insert(folder.clone()) {
            folders.push(folder);
        }
    };

    for folder in used_lib_folders(inventory) {
        push(folder);
    }

    for (lib32, lib64) in &config.multiarch_lib_folders {
        let lib32 = config.resolve(lib32);
        if arch != Arch::X86_64 {
            if lib32.exists() {
                push(lib32);
            }
            continue;
        }

        let lib64 = config.resolve(lib64);
        if real_path(&lib32) == real_path(&lib64) {
            continue;
        }
        for folder in [lib32, lib64] {
            if folder.exists() {
                push(folder);
            }
        }
    }

    folders
}

/// Canonical path, or the path itself when it cannot be resolved.
fn real_path(path: &Utf8Path) -> Utf8PathBuf {
    path.canonicalize_utf8()
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::SharedLibrary;
    use std::fs;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn lib(name: &str, path: &str) -> SharedLibrary {
        SharedLibrary::new(name, vec!["libc6".into(), "x86-64".into()], path)
    }

    fn fixture_root() -> (TempDir, ProbeConfig) {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, ProbeConfig::with_root(root))
    }

    #[test]
    fn orders_by_usage_then_discovery() {
        let inventory = LibraryInventory::from_libraries(
            [
                lib("liba.so.1", "/opt/one/liba.so.1"),
                lib("libb.so.1", "/opt/two/libb.so.1"),
                lib("libc.so.1", "/opt/two/libc.so.1"),
                lib("libd.so.1", "/opt/three/libd.so.1"),
            ],
            &[Arch::I386, Arch::X86_64],
        );

        let folders = used_lib_folders(&inventory);
        assert_eq!(folders, ["/opt/two", "/opt/one", "/opt/three"].map(Utf8PathBuf::from));
    }

    #[test]
    fn skips_pairs_resolving_to_the_same_directory() {
        let (_tmp, mut config) = fixture_root();
        let root = config.root.clone();
        fs::create_dir_all(root.join("usr/lib64")).unwrap();
        symlink(root.join("usr/lib64"), root.join("lib")).unwrap();
        symlink(root.join("usr/lib64"), root.join("lib64")).unwrap();
        fs::create_dir_all(root.join("usr/lib32")).unwrap();
        config.multiarch_lib_folders = vec![
            (Utf8PathBuf::from("/lib"), Utf8PathBuf::from("/lib64")),
            (Utf8PathBuf::from("/usr/lib32"), Utf8PathBuf::from("/usr/lib64")),
        ];

        let folders = lib_folders(&LibraryInventory::default(), Arch::X86_64, &config);

        assert_eq!(folders, [root.join("usr/lib32"), root.join("usr/lib64")]);
    }

    #[test]
    fn never_repeats_a_folder() {
        let (_tmp, config) = fixture_root();
        let root = config.root.clone();
        for dir in ["lib", "lib32", "lib64", "usr/lib", "usr/lib64"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        let inventory = LibraryInventory::from_libraries(
            [lib("libGL.so.1", root.join("usr/lib64/libGL.so.1").as_str())],
            &[Arch::I386, Arch::X86_64],
        );

        let folders = lib_folders(&inventory, Arch::X86_64, &config);

        let expected = ["usr/lib64", "lib", "lib64", "lib32", "usr/lib"].map(|d| root.join(d));
        assert_eq!(folders, expected);
    }

    #[test]
    fn non_x86_64_hosts_only_use_32bit_side() {
        let (_tmp, config) = fixture_root();
        let root = config.root.clone();
        for dir in ["lib", "lib64", "usr/lib", "usr/lib64"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }

        let folders = lib_folders(&LibraryInventory::default(), Arch::I386, &config);

        assert_eq!(folders, [root.join("lib"), root.join("usr/lib")]);
    }

    #[test]
    fn missing_folders_are_skipped() {
        let (_tmp, config) = fixture_root();
        let folders = lib_folders(&LibraryInventory::default(), Arch::X86_64, &config);
        assert!(folders.is_empty());
    }
}
