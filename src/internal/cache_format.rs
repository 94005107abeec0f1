//! Reader for the binary ld.so.cache format.
//!
//! Handles the `glibc-ld.so.cache1.1` layout, either standalone or appended
//! after a legacy `ld.so-1.7.0` section. Entries are rendered into the same
//! tags `ldconfig -p` prints so they classify identically.

use crate::library::SharedLibrary;
use crate::Error;
use camino::Utf8PathBuf;

const OLD_MAGIC: &[u8] = b"ld.so-1.7.0";
const NEW_MAGIC: &[u8] = b"glibc-ld.so.cache1.1";

const OLD_HEADER_SIZE: usize = 16;
const OLD_ENTRY_SIZE: usize = 12;
const NEW_HEADER_SIZE: usize = 48;
const NEW_ENTRY_SIZE: usize = 24;

// Flag constants from glibc sysdeps/generic/ldconfig.h
pub(crate) const FLAG_TYPE_MASK: u32 = 0x00ff;
pub(crate) const FLAG_REQUIRED_MASK: u32 = 0xff00;
pub(crate) const FLAG_ELF: u32 = 0x0001;
pub(crate) const FLAG_ELF_LIBC5: u32 = 0x0002;
pub(crate) const FLAG_ELF_LIBC6: u32 = 0x0003;
pub(crate) const FLAG_SPARC_LIB64: u32 = 0x0100;
pub(crate) const FLAG_IA64_LIB64: u32 = 0x0200;
pub(crate) const FLAG_X8664_LIB64: u32 = 0x0300;
pub(crate) const FLAG_S390_LIB64: u32 = 0x0400;
pub(crate) const FLAG_POWERPC_LIB64: u32 = 0x0500;
pub(crate) const FLAG_MIPS64_LIBN32: u32 = 0x0600;
pub(crate) const FLAG_MIPS64_LIBN64: u32 = 0x0700;
pub(crate) const FLAG_X8664_LIBX32: u32 = 0x0800;
pub(crate) const FLAG_ARM_LIBHF: u32 = 0x0900;
pub(crate) const FLAG_AARCH64_LIB64: u32 = 0x0a00;
pub(crate) const FLAG_ARM_LIBSF: u32 = 0x0b00;
pub(crate) const FLAG_MIPS_LIB32_NAN2008: u32 = 0x0c00;
pub(crate) const FLAG_MIPS64_LIBN32_NAN2008: u32 = 0x0d00;
pub(crate) const FLAG_MIPS64_LIBN64_NAN2008: u32 = 0x0e00;
pub(crate) const FLAG_RISCV_FLOAT_ABI_SOFT: u32 = 0x0f00;
pub(crate) const FLAG_RISCV_FLOAT_ABI_DOUBLE: u32 = 0x1000;
pub(crate) const FLAG_LARCH_FLOAT_ABI_SOFT: u32 = 0x1100;
pub(crate) const FLAG_LARCH_FLOAT_ABI_DOUBLE: u32 = 0x1200;

const ABI_OS_NAMES: [&str; 6] = ["Linux", "Hurd", "Solaris", "FreeBSD", "kNetBSD", "Syllable"];

#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub flags: u32,
    pub key: String,
    pub value: String,
    pub osversion: u32,
    pub hwcap: u64,
}

impl CacheEntry {
    /// Tags in the order `ldconfig -p` prints them.
    pub(crate) fn tags(&self) -> Vec<String> {
        let mut tags = vec![type_tag(self.flags).to_string()];
        if let Some(arch) = arch_tag(self.flags) {
            tags.push(arch.to_string());
        }
        if self.hwcap != 0 {
            tags.push(format!("hwcap: 0x{:016x}", self.hwcap));
        }
        if self.osversion != 0 {
            let os = ABI_OS_NAMES
                .get((self.osversion >> 24) as usize)
                .copied()
                .unwrap_or("Unknown OS");
            tags.push(format!(
                "OS ABI: {} {}.{}.{}",
                os,
                (self.osversion >> 16) & 0xff,
                (self.osversion >> 8) & 0xff,
                self.osversion & 0xff
            ));
        }
        tags
    }

    pub(crate) fn into_library(self) -> SharedLibrary {
        let tags = self.tags();
        SharedLibrary::new(self.key, tags, Utf8PathBuf::from(self.value))
    }
}

fn type_tag(flags: u32) -> &'static str {
    match flags & FLAG_TYPE_MASK {
        FLAG_ELF => "ELF",
        FLAG_ELF_LIBC5 => "libc5",
        FLAG_ELF_LIBC6 => "libc6",
        0 => "libc4",
        _ => "unknown",
    }
}

fn arch_tag(flags: u32) -> Option<&'static str> {
    let tag = match flags & FLAG_REQUIRED_MASK {
        0 => return None,
        FLAG_SPARC_LIB64 | FLAG_S390_LIB64 | FLAG_POWERPC_LIB64 | FLAG_MIPS64_LIBN64 => "64bit",
        FLAG_IA64_LIB64 => "IA-64",
        FLAG_X8664_LIB64 => "x86-64",
        FLAG_X8664_LIBX32 => "x32",
        FLAG_MIPS64_LIBN32 => "N32",
        FLAG_ARM_LIBHF => "hard-float",
        FLAG_ARM_LIBSF => "soft-float",
        FLAG_AARCH64_LIB64 => "AArch64",
        FLAG_MIPS_LIB32_NAN2008 => "nan2008",
        FLAG_MIPS64_LIBN32_NAN2008 => "N32,nan2008",
        FLAG_MIPS64_LIBN64_NAN2008 => "64bit,nan2008",
        FLAG_RISCV_FLOAT_ABI_SOFT | FLAG_LARCH_FLOAT_ABI_SOFT => "soft-float",
        FLAG_RISCV_FLOAT_ABI_DOUBLE | FLAG_LARCH_FLOAT_ABI_DOUBLE => "double-float",
        _ => "unknown",
    };
    Some(tag)
}

/// Bounds-checked native-endian access to the cache bytes.
struct Bytes<'a> {
    data: &'a [u8],
}

impl<'a> Bytes<'a> {
    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], Error> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(Error::InvalidCacheOffset(offset as u32))
    }

    fn u32_at(&self, offset: usize) -> Result<u32, Error> {
        let bytes = self.slice(offset, 4)?;
        Ok(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u64_at(&self, offset: usize) -> Result<u64, Error> {
        let bytes = self.slice(offset, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_ne_bytes(buf))
    }

    fn string_at(&self, offset: usize) -> Result<String, Error> {
        let tail = self
            .data
            .get(offset..)
            .ok_or(Error::InvalidCacheOffset(offset as u32))?;
        let end = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::InvalidCacheOffset(offset as u32))?;
        String::from_utf8(tail[..end].to_vec()).map_err(|_| Error::InvalidCacheUtf8)
    }
}

/// Locate the start of the new-format section.
fn new_format_start(data: &[u8]) -> Result<usize, Error> {
    if data.starts_with(NEW_MAGIC) {
        return Ok(0);
    }
    if !data.starts_with(OLD_MAGIC) {
        return Err(Error::InvalidCache("unrecognized cache magic".to_string()));
    }

    let bytes = Bytes { data };
    let nlibs = bytes.u32_at(12)? as usize;
    let end = nlibs
        .checked_mul(OLD_ENTRY_SIZE)
        .and_then(|n| n.checked_add(OLD_HEADER_SIZE))
        .ok_or_else(|| Error::InvalidCache("legacy entry count overflows".to_string()))?;
    // New section is aligned like `struct cache_file_new` (8 bytes).
    let start = (end + 7) & !7;
    match data.get(start..) {
        Some(rest) if rest.starts_with(NEW_MAGIC) => Ok(start),
        _ => Err(Error::InvalidCache(
            "legacy cache without glibc section".to_string(),
        )),
    }
}

/// Parse cache binary data
pub(crate) fn parse_cache(data: &[u8]) -> Result<Vec<CacheEntry>, Error> {
    let start = new_format_start(data)?;
    let bytes = Bytes { data: &data[start..] };

    let nlibs = bytes.u32_at(20)? as usize;
    let mut entries = Vec::with_capacity(nlibs.min(1 << 16));

    for i in 0..nlibs {
        let offset = NEW_HEADER_SIZE + i * NEW_ENTRY_SIZE;
        let flags = bytes.u32_at(offset)?;
        let key_offset = bytes.u32_at(offset + 4)?;
        let value_offset = bytes.u32_at(offset + 8)?;

        entries.push(CacheEntry {
            flags,
            key: bytes.string_at(key_offset as usize)?,
            value: bytes.string_at(value_offset as usize)?,
            osversion: bytes.u32_at(offset + 12)?,
            hwcap: bytes.u64_at(offset + 16)?,
        });
    }

    Ok(entries)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Serialize `(flags, soname, path)` triples as a new-format cache.
    pub(crate) fn build_cache(entries: &[(u32, &str, &str)]) -> Vec<u8> {
        let string_start = NEW_HEADER_SIZE + entries.len() * NEW_ENTRY_SIZE;
        let mut strings = Vec::new();
        let mut records = Vec::new();

        for (flags, key, value) in entries {
            let key_offset = (string_start + strings.len()) as u32;
            strings.extend_from_slice(key.as_bytes());
            strings.push(0);
            let value_offset = (string_start + strings.len()) as u32;
            strings.extend_from_slice(value.as_bytes());
            strings.push(0);
            records.push((*flags, key_offset, value_offset));
        }

        let mut cache = Vec::new();
        cache.extend_from_slice(NEW_MAGIC);
        cache.extend_from_slice(&(entries.len() as u32).to_ne_bytes());
        cache.extend_from_slice(&(strings.len() as u32).to_ne_bytes());
        cache.push(if cfg!(target_endian = "little") { 2 } else { 3 });
        cache.extend_from_slice(&[0u8; 3]);
        cache.extend_from_slice(&0u32.to_ne_bytes());
        cache.extend_from_slice(&[0u8; 12]);

        for (flags, key_offset, value_offset) in records {
            cache.extend_from_slice(&flags.to_ne_bytes());
            cache.extend_from_slice(&key_offset.to_ne_bytes());
            cache.extend_from_slice(&value_offset.to_ne_bytes());
            cache.extend_from_slice(&0u32.to_ne_bytes());
            cache.extend_from_slice(&0u64.to_ne_bytes());
        }
        cache.extend_from_slice(&strings);
        cache
    }

    #[test]
    fn reads_new_format_entries() {
        let data = build_cache(&[
            (
                FLAG_ELF_LIBC6 | FLAG_X8664_LIB64,
                "libvulkan.so.1",
                "/usr/lib64/libvulkan.so.1",
            ),
            (FLAG_ELF_LIBC6, "libGL.so.1", "/usr/lib/libGL.so.1"),
        ]);

        let entries = parse_cache(&data).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "libvulkan.so.1");
        assert_eq!(entries[0].value, "/usr/lib64/libvulkan.so.1");
        assert_eq!(entries[0].tags(), ["libc6", "x86-64"]);
        assert_eq!(entries[1].tags(), ["libc6"]);
    }

    #[test]
    fn reads_cache_behind_legacy_section() {
        let new = build_cache(&[(FLAG_ELF_LIBC6 | FLAG_X8664_LIBX32, "libc.so.6", "/libx32/libc.so.6")]);

        // One legacy entry: 16 + 12 = 28, aligned to 32.
        let mut data = Vec::new();
        data.extend_from_slice(OLD_MAGIC);
        data.push(0);
        data.extend_from_slice(&1u32.to_ne_bytes());
        data.extend_from_slice(&[0u8; OLD_ENTRY_SIZE]);
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(&new);

        let entries = parse_cache(&data).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tags(), ["libc6", "x32"]);
    }

    #[test]
    fn renders_abi_and_hwcap_tags() {
        let entry = CacheEntry {
            flags: FLAG_ELF_LIBC6 | FLAG_X8664_LIB64,
            key: "libc.so.6".to_string(),
            value: "/lib64/libc.so.6".to_string(),
            osversion: (3 << 16) | (2 << 8),
            hwcap: 2,
        };
        assert_eq!(
            entry.tags(),
            ["libc6", "x86-64", "hwcap: 0x0000000000000002", "OS ABI: Linux 3.2.0"]
        );
    }

    #[test]
    fn rejects_garbage_and_truncation() {
        assert!(matches!(parse_cache(b"not a cache"), Err(Error::InvalidCache(_))));

        let data = build_cache(&[(FLAG_ELF_LIBC6, "libGL.so.1", "/usr/lib/libGL.so.1")]);
        let truncated = &data[..NEW_HEADER_SIZE + 8];
        assert!(matches!(
            parse_cache(truncated),
            Err(Error::InvalidCacheOffset(_))
        ));
    }
}
