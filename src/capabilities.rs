//! Frozen snapshot of everything the probe learned about the host.
//!
//! Construction runs every probe once, in dependency order: command
//! discovery, architecture, library inventory, graphics facts (the GPU
//! vendor shapes the requirement set), the per-architecture capability
//! table, soundfonts and file limits. All queries afterwards are pure reads.
//! To refresh, build a new snapshot and swap it in.

use crate::arch::{self, Arch};
use crate::commands::{CommandTable, SystemCommand};
use crate::config::ProbeConfig;
use crate::folders;
use crate::graphics::GraphicsInfo;
use crate::inventory::{CacheSource, LibraryInventory};
use crate::requirements::{
    requirement_set, version_at_least, CapabilityTable, Requirement, ACO_MIN_MESA_VERSION,
};
use crate::system::{self, FileLimits};
use crate::Error;
use bon::bon;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

/// First NVIDIA driver series with `VK_EXT_image_drm_format_modifier`,
/// which gamescope needs.
const MIN_NVIDIA_GAMESCOPE_DRIVER: u32 = 515;

const STEAM_FLATPAK_ID: &str = "com.valvesoftware.Steam";

#[derive(Debug, Clone)]
pub struct SystemCapabilities {
    config: ProbeConfig,
    arch: Arch,
    runtime: Vec<Arch>,
    commands: CommandTable,
    inventory: LibraryInventory,
    graphics: GraphicsInfo,
    table: CapabilityTable,
    soundfonts: Vec<String>,
    file_limits: FileLimits,
    display_server: String,
    steam_installed: bool,
    flatpak: bool,
}

#[bon]
impl SystemCapabilities {
    /// Probe the host. Every argument overrides the matching probe.
    ///
    /// - `machine`: raw machine string instead of `uname -m`
    /// - `listing`: captured `ldconfig -p` output instead of running it
    /// - `home`: user home searched for Steam installs
    #[builder]
    pub fn new(
        #[builder(default)] config: ProbeConfig,
        #[builder(into)] machine: Option<String>,
        #[builder(into)] listing: Option<String>,
        commands: Option<CommandTable>,
        graphics: Option<GraphicsInfo>,
        file_limits: Option<FileLimits>,
        #[builder(into)] display_server: Option<String>,
        #[builder(into)] home: Option<Utf8PathBuf>,
    ) -> Self {
        let commands = commands.unwrap_or_else(|| CommandTable::discover(&config));

        let arch = machine
            .or_else(arch::host_machine)
            .map_or(Arch::Unknown, |m| Arch::resolve(&m));
        let runtime = arch.runtime_architectures();
        debug!("Host architecture {}, runtime architectures {:?}", arch, runtime);

        let source = match listing {
            Some(listing) => CacheSource::Listing(listing),
            None => match commands.get(SystemCommand::Ldconfig) {
                Some(ldconfig) => CacheSource::Command(ldconfig.to_path_buf()),
                None => {
                    error!("Could not detect ldconfig on this system");
                    let cache_file = config.resolve(&config.cache_file);
                    warn!("Falling back to reading {}", cache_file);
                    CacheSource::File(cache_file)
                }
            },
        };
        let inventory = LibraryInventory::load(&source, &runtime);
        info!("Found {} shared libraries", inventory.len());

        let graphics = graphics.unwrap_or_else(|| GraphicsInfo::probe(&config, &commands));
        let requirements = requirement_set(true, graphics.is_amd());
        let table = CapabilityTable::populate(&inventory, &runtime, &requirements);

        let soundfonts = system::scan_soundfonts(&config);
        let file_limits = file_limits.unwrap_or_else(FileLimits::current);

        let display_server = display_server
            .or_else(|| std::env::var("XDG_SESSION_TYPE").ok())
            .unwrap_or_else(|| "unknown".to_string());
        let home =
            home.or_else(|| dirs::home_dir().and_then(|h| Utf8PathBuf::from_path_buf(h).ok()));
        let steam_installed = steam_installed(&config, &commands, home.as_deref());
        let flatpak = config.resolve(Utf8Path::new("/.flatpak-info")).exists();

        Self {
            config,
            arch,
            runtime,
            commands,
            inventory,
            graphics,
            table,
            soundfonts,
            file_limits,
            display_server,
            steam_installed,
            flatpak,
        }
    }
}

impl SystemCapabilities {
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Primary architecture of the host.
    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn runtime_architectures(&self) -> &[Arch] {
        &self.runtime
    }

    pub fn inventory(&self) -> &LibraryInventory {
        &self.inventory
    }

    pub fn graphics(&self) -> &GraphicsInfo {
        &self.graphics
    }

    pub fn file_limits(&self) -> FileLimits {
        self.file_limits
    }

    /// Path of a system command, if it was found.
    pub fn get(&self, command: SystemCommand) -> Option<&Utf8Path> {
        self.commands.get(command)
    }

    pub fn terminals(&self) -> &[Utf8PathBuf] {
        self.commands.terminals()
    }

    pub fn default_terminal(&self) -> Option<&Utf8Path> {
        self.commands.default_terminal()
    }

    pub fn required_default_terminal(&self) -> Result<&Utf8Path, Error> {
        self.commands.required_default_terminal()
    }

    pub fn soundfonts(&self) -> &[String] {
        &self.soundfonts
    }

    /// Required, optional and GPU-specific requirements.
    pub fn requirements(&self) -> Vec<Requirement> {
        requirement_set(true, self.graphics.is_amd())
    }

    pub fn critical_requirements(&self) -> Vec<Requirement> {
        requirement_set(false, self.graphics.is_amd())
    }

    /// Missing sonames for `req`, one list per runtime architecture.
    pub fn missing_libraries(&self, req: Requirement) -> Vec<Vec<String>> {
        self.table.missing(&self.runtime, req)
    }

    /// [`SystemCapabilities::missing_libraries`] for every requirement in use.
    pub fn missing_libraries_all(&self) -> BTreeMap<Requirement, Vec<Vec<String>>> {
        self.requirements()
            .into_iter()
            .map(|req| (req, self.missing_libraries(req)))
            .collect()
    }

    /// Runtime architectures lacking a library for `req`.
    pub fn missing_architectures(&self, req: Requirement) -> Vec<Arch> {
        self.table.missing_architectures(&self.runtime, req)
    }

    /// Whether `req` is met on the first runtime architecture.
    pub fn is_feature_supported(&self, req: Requirement) -> bool {
        if req == Requirement::Aco {
            return self
                .graphics
                .mesa_version()
                .is_some_and(|version| version_at_least(version, ACO_MIN_MESA_VERSION));
        }

        self.missing_libraries(req)
            .first()
            .is_some_and(Vec::is_empty)
    }

    /// Vulkan libraries present on every runtime architecture and a device
    /// answering through the loader.
    pub fn is_vulkan_supported(&self) -> bool {
        self.missing_architectures(Requirement::Vulkan).is_empty()
            && self.graphics.vulkan_available
    }

    /// `gamemoderun` is preferred; the library check covers old releases.
    pub fn gamemode_available(&self) -> bool {
        self.get(SystemCommand::Gamemoderun).is_some()
            || self.is_feature_supported(Requirement::Gamemode)
    }

    /// gamescope on NVIDIA needs driver 515 or newer.
    pub fn nvidia_gamescope_support(&self) -> bool {
        if !self.graphics.is_nvidia() {
            return true;
        }
        let major = self
            .graphics
            .nvidia_driver_version
            .as_deref()
            .and_then(|version| version.split('.').next())
            .and_then(|major| major.parse::<u32>().ok());
        match major {
            Some(major) => major >= MIN_NVIDIA_GAMESCOPE_DRIVER,
            None => {
                warn!("Unable to determine NVIDIA driver version");
                false
            }
        }
    }

    pub fn has_enough_file_descriptors(&self) -> bool {
        self.file_limits.hard >= self.config.recommended_file_limit
    }

    pub fn has_steam(&self) -> bool {
        self.steam_installed
    }

    /// Running inside a Flatpak sandbox.
    pub fn is_flatpak(&self) -> bool {
        self.flatpak
    }

    pub fn display_server(&self) -> &str {
        &self.display_server
    }

    /// Library search folders, computed fresh on each call.
    pub fn lib_folders(&self) -> Vec<Utf8PathBuf> {
        folders::lib_folders(&self.inventory, self.arch, &self.config)
    }
}

/// Steam as a command, a `~/.steam` install, or a user or system Flatpak.
fn steam_installed(config: &ProbeConfig, commands: &CommandTable, home: Option<&Utf8Path>) -> bool {
    if commands.get(SystemCommand::Steam).is_some() {
        return true;
    }

    let mut candidates = vec![config
        .resolve(Utf8Path::new("/var/lib/flatpak/app"))
        .join(STEAM_FLATPAK_ID)];
    if let Some(home) = home {
        candidates.push(home.join(".steam/steam/ubuntu12_32/steam"));
        candidates.push(home.join(".local/share/flatpak/app").join(STEAM_FLATPAK_ID));
    }
    candidates.iter().any(|path| {
        let found = path.exists();
        if found {
            debug!("Found Steam at {}", path);
        }
        found
    })
}
