//! Graphics driver facts the capability checks consume.
//!
//! Everything here is gathered once from sysfs, procfs, `glxinfo` and
//! `vulkaninfo`. Any failure leaves the corresponding field empty.

use crate::commands::{CommandTable, SystemCommand};
use crate::config::ProbeConfig;
use camino::Utf8Path;
use serde::Serialize;
use std::fs;
use std::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GpuVendor {
    Amd,
    Nvidia,
    Intel,
}

impl GpuVendor {
    /// Map a PCI vendor id such as `0x1002`.
    pub fn from_pci_id(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "0x1002" => Some(GpuVendor::Amd),
            "0x10de" => Some(GpuVendor::Nvidia),
            "0x8086" => Some(GpuVendor::Intel),
            _ => None,
        }
    }
}

/// Fields of interest from `glxinfo -B`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GlxInfo {
    pub opengl_vendor: Option<String>,
    pub opengl_renderer: Option<String>,
    pub opengl_version: Option<String>,
    pub opengl_core_profile_version: Option<String>,
    pub opengl_es_profile_version: Option<String>,
    /// `Version:` of the `GLX_MESA_query_renderer` block, only set on Mesa.
    pub mesa_version: Option<String>,
}

impl GlxInfo {
    pub fn parse(output: &str) -> Self {
        let mut info = GlxInfo::default();
        let mut in_mesa_block = false;

        for line in output.lines() {
            if line.contains("GLX_MESA_query_renderer") {
                in_mesa_block = true;
                continue;
            }
            if in_mesa_block && !line.starts_with(char::is_whitespace) {
                in_mesa_block = false;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = Some(value.trim().to_string());
            match key.trim() {
                "Version" if in_mesa_block => info.mesa_version = value,
                "OpenGL vendor string" => info.opengl_vendor = value,
                "OpenGL renderer string" => info.opengl_renderer = value,
                "OpenGL version string" => info.opengl_version = value,
                "OpenGL core profile version string" => info.opengl_core_profile_version = value,
                "OpenGL ES profile version string" => info.opengl_es_profile_version = value,
                _ => {}
            }
        }
        info
    }

    /// A usable report names at least the renderer.
    pub fn is_valid(&self) -> bool {
        self.opengl_renderer.is_some()
    }
}

/// Snapshot of the host's graphics stack.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphicsInfo {
    pub vendors: Vec<GpuVendor>,
    pub nvidia_driver_version: Option<String>,
    pub glx: Option<GlxInfo>,
    pub vulkan_api_version: Option<String>,
    pub vulkan_devices: Vec<String>,
    /// Whether the Vulkan loader could enumerate at least one device.
    pub vulkan_available: bool,
}

impl GraphicsInfo {
    pub fn probe(config: &ProbeConfig, commands: &CommandTable) -> Self {
        let mut info = GraphicsInfo {
            vendors: detect_vendors(config),
            nvidia_driver_version: read_nvidia_driver_version(config),
            ..Default::default()
        };

        if let Some(glxinfo) = commands.get(SystemCommand::Glxinfo) {
            match run(glxinfo, &["-B"]) {
                Some(output) => {
                    let glx = GlxInfo::parse(&output);
                    if glx.is_valid() {
                        info.glx = Some(glx);
                    } else {
                        warn!("Invalid glxinfo received");
                    }
                }
                None => debug!("glxinfo produced no output"),
            }
        }

        if let Some(vulkaninfo) = commands.get(SystemCommand::Vulkaninfo) {
            if let Some(output) = run(vulkaninfo, &["--summary"]) {
                info.apply_vulkan_summary(&output);
            }
        }

        info
    }

    pub fn is_amd(&self) -> bool {
        self.vendors.contains(&GpuVendor::Amd)
    }

    pub fn is_nvidia(&self) -> bool {
        self.vendors.contains(&GpuVendor::Nvidia)
    }

    pub fn mesa_version(&self) -> Option<&str> {
        self.glx.as_ref()?.mesa_version.as_deref()
    }

    /// Fill the Vulkan fields from `vulkaninfo --summary` output.
    pub fn apply_vulkan_summary(&mut self, output: &str) {
        let mut instance_version = None;
        for line in output.lines() {
            let line = line.trim();
            if let Some(version) = line.strip_prefix("Vulkan Instance Version:") {
                instance_version = Some(version.trim().to_string());
            } else if let Some((key, value)) = line.split_once('=') {
                let value = value.trim();
                match key.trim() {
                    "apiVersion" if self.vulkan_api_version.is_none() => {
                        self.vulkan_api_version = Some(value.to_string());
                    }
                    "deviceName" => self.vulkan_devices.push(value.to_string()),
                    _ => {}
                }
            }
        }
        if self.vulkan_api_version.is_none() {
            self.vulkan_api_version = instance_version;
        }
        self.vulkan_available = !self.vulkan_devices.is_empty();
    }
}

/// PCI vendors of the DRM cards exposed in sysfs.
fn detect_vendors(config: &ProbeConfig) -> Vec<GpuVendor> {
    let pattern = config.resolve(Utf8Path::new("/sys/class/drm/card*/device/vendor"));
    let paths = match glob::glob(pattern.as_str()) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("Invalid DRM glob pattern {}: {}", pattern, e);
            return Vec::new();
        }
    };

    let mut vendors = Vec::new();
    for path in paths.flatten() {
        let vendor = fs::read_to_string(&path)
            .ok()
            .and_then(|id| GpuVendor::from_pci_id(&id));
        if let Some(vendor) = vendor {
            if !vendors.contains(&vendor) {
                vendors.push(vendor);
            }
        }
    }
    debug!("Detected GPU vendors: {:?}", vendors);
    vendors
}

/// Driver version from `/proc/driver/nvidia/version`, e.g. `515.43.04`.
fn read_nvidia_driver_version(config: &ProbeConfig) -> Option<String> {
    let path = config.resolve(Utf8Path::new("/proc/driver/nvidia/version"));
    let content = fs::read_to_string(path).ok()?;
    parse_nvidia_version(&content)
}

pub(crate) fn parse_nvidia_version(content: &str) -> Option<String> {
    let line = content.lines().find(|l| l.contains("Kernel Module"))?;
    line.split_whitespace()
        .find(|token| {
            token.contains('.') && token.split('.').all(|p| p.parse::<u32>().is_ok())
        })
        .map(str::to_string)
}

fn run(program: &Utf8Path, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        debug!("{} exited with {}", program, output.status);
        return None;
    }
    String::from_utf8(output.stdout).ok()
}
