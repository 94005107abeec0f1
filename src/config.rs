use camino::{Utf8Path, Utf8PathBuf};

/// Static probe tables and the root every filesystem probe is resolved against.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub root: Utf8PathBuf,
    /// Conventional (32-bit, 64-bit) library folder pairs, in search order.
    pub multiarch_lib_folders: Vec<(Utf8PathBuf, Utf8PathBuf)>,
    pub soundfont_folders: Vec<Utf8PathBuf>,
    /// Folders checked for commands some distributions keep out of `PATH`.
    pub sbin_folders: Vec<Utf8PathBuf>,
    pub cache_file: Utf8PathBuf,
    pub recommended_file_limit: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let pair = |a: &str, b: &str| (Utf8PathBuf::from(a), Utf8PathBuf::from(b));
        Self {
            root: Utf8PathBuf::from("/"),
            multiarch_lib_folders: vec![
                pair("/lib", "/lib64"),
                pair("/lib32", "/lib64"),
                pair("/usr/lib", "/usr/lib64"),
                pair("/usr/lib32", "/usr/lib64"),
                pair("/lib/i386-linux-gnu", "/lib/x86_64-linux-gnu"),
                pair("/usr/lib/i386-linux-gnu", "/usr/lib/x86_64-linux-gnu"),
                pair("/usr/lib", "/opt/32/lib"),
            ],
            soundfont_folders: vec![
                Utf8PathBuf::from("/usr/share/sounds/sf2"),
                Utf8PathBuf::from("/usr/share/soundfonts"),
            ],
            sbin_folders: vec![Utf8PathBuf::from("/sbin"), Utf8PathBuf::from("/usr/sbin")],
            cache_file: Utf8PathBuf::from("/etc/ld.so.cache"),
            recommended_file_limit: 524_288,
        }
    }
}

impl ProbeConfig {
    /// Default tables probed under an alternative root (like chroot).
    pub fn with_root(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Map an absolute host path into the probed root.
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.root.join(path.strip_prefix("/").unwrap_or(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_under_root() {
        let config = ProbeConfig::default();
        assert_eq!(config.resolve(Utf8Path::new("/lib64")), Utf8PathBuf::from("/lib64"));

        let config = ProbeConfig::with_root("/srv/chroot");
        assert_eq!(
            config.resolve(Utf8Path::new("/usr/lib32")),
            Utf8PathBuf::from("/srv/chroot/usr/lib32")
        );
        assert_eq!(
            config.resolve(&config.cache_file),
            Utf8PathBuf::from("/srv/chroot/etc/ld.so.cache")
        );
    }
}
