//! System information report built from a capability snapshot.

use crate::arch::Arch;
use crate::capabilities::SystemCapabilities;
use crate::graphics::GraphicsInfo;
use crate::requirements::Requirement;
use crate::system::{self, FileLimits};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub arch: Arch,
    pub runtime_architectures: Vec<Arch>,
    pub distribution: Option<String>,
    pub kernel: Option<String>,
    pub desktop: Option<String>,
    pub display_server: String,
    pub cpus: Vec<BTreeMap<String, String>>,
    /// `/proc/meminfo` values in kB.
    pub ram: BTreeMap<String, u64>,
    pub graphics: GraphicsInfo,
    pub file_limits: FileLimits,
    pub missing_libs: BTreeMap<Requirement, Vec<Vec<String>>>,
}

impl SystemInfo {
    /// Collect the report. Unreadable host files leave their section empty.
    pub fn gather(caps: &SystemCapabilities) -> Self {
        let config = caps.config();
        let cpus = system::read_cpus(config).unwrap_or_else(|e| {
            warn!("Unable to read CPU information: {}", e);
            Vec::new()
        });
        let ram = system::read_ram_info(config).unwrap_or_else(|e| {
            warn!("Unable to read memory information: {}", e);
            BTreeMap::new()
        });
        let kernel = system::read_kernel_version(config).unwrap_or_else(|e| {
            warn!("Unable to read kernel version: {}", e);
            None
        });

        Self {
            arch: caps.arch(),
            runtime_architectures: caps.runtime_architectures().to_vec(),
            distribution: system::read_distribution(config),
            kernel,
            desktop: std::env::var("XDG_CURRENT_DESKTOP").ok(),
            display_server: caps.display_server().to_string(),
            cpus,
            ram,
            graphics: caps.graphics().clone(),
            file_limits: caps.file_limits(),
            missing_libs: caps.missing_libraries_all(),
        }
    }
}

fn gigabytes(kb: Option<&u64>) -> String {
    match kb {
        Some(kb) => format!("{:.1} GB", *kb as f64 / 1024.0 / 1024.0),
        None => "unavailable".to_string(),
    }
}

impl fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or = |value: &Option<String>, fallback: &'static str| -> String {
            value.clone().unwrap_or_else(|| fallback.to_string())
        };

        writeln!(f, "[System]")?;
        writeln!(f, "OS:             {}", or(&self.distribution, "unknown"))?;
        writeln!(f, "Arch:           {}", self.arch)?;
        writeln!(f, "Kernel:         {}", or(&self.kernel, "unknown"))?;
        writeln!(f, "Desktop:        {}", or(&self.desktop, "Not found"))?;
        writeln!(f, "Display Server: {}", self.display_server)?;
        writeln!(
            f,
            "File limits:    {} (soft) / {} (hard)",
            self.file_limits.soft, self.file_limits.hard
        )?;

        writeln!(f, "\n[CPU]")?;
        let cpu = self.cpus.first();
        let field = |key: &str, fallback: &'static str| {
            cpu.and_then(|c| c.get(key))
                .map_or(fallback, String::as_str)
                .to_string()
        };
        writeln!(f, "Vendor:         {}", field("vendor_id", "Vendor unavailable"))?;
        writeln!(f, "Model:          {}", field("model name", "Model unavailable"))?;
        writeln!(
            f,
            "Physical cores: {}",
            field("cpu cores", "Physical cores unavailable")
        )?;
        writeln!(
            f,
            "Logical cores:  {}",
            field("siblings", "Logical cores unavailable")
        )?;

        writeln!(f, "\n[Memory]")?;
        writeln!(f, "RAM:            {}", gigabytes(self.ram.get("MemTotal")))?;
        writeln!(f, "Swap:           {}", gigabytes(self.ram.get("SwapTotal")))?;

        writeln!(f, "\n[Graphics]")?;
        match &self.graphics.glx {
            Some(glx) => {
                writeln!(f, "Vendor:         {}", or(&glx.opengl_vendor, "Vendor unavailable"))?;
                writeln!(
                    f,
                    "OpenGL Renderer: {}",
                    or(&glx.opengl_renderer, "OpenGL Renderer unavailable")
                )?;
                writeln!(
                    f,
                    "OpenGL Version: {}",
                    or(&glx.opengl_version, "OpenGL Version unavailable")
                )?;
                writeln!(
                    f,
                    "OpenGL Core:    {}",
                    or(&glx.opengl_core_profile_version, "OpenGL core unavailable")
                )?;
                writeln!(
                    f,
                    "OpenGL ES:      {}",
                    or(&glx.opengl_es_profile_version, "OpenGL ES unavailable")
                )?;
            }
            None => writeln!(f, "Vendor:         Unable to obtain glxinfo")?,
        }
        if self.graphics.vulkan_available {
            writeln!(
                f,
                "Vulkan Version: {}",
                or(&self.graphics.vulkan_api_version, "unknown")
            )?;
            writeln!(f, "Vulkan Drivers: {}", self.graphics.vulkan_devices.join(", "))?;
        } else {
            writeln!(f, "Vulkan:         Not Supported")?;
        }

        writeln!(f, "\n[Missing libraries]")?;
        let mut complete = true;
        for (req, per_arch) in &self.missing_libs {
            for (arch, missing) in self.runtime_architectures.iter().zip(per_arch) {
                if !missing.is_empty() {
                    complete = false;
                    writeln!(f, "{} ({}): {}", req, arch, missing.join(", "))?;
                }
            }
        }
        if complete {
            writeln!(f, "None")?;
        }
        Ok(())
    }
}
