//! Discovery of the system commands and terminal emulators the probe uses.

use crate::config::ProbeConfig;
use crate::Error;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SystemCommand {
    Xrandr,
    Fuser,
    Glxinfo,
    Vulkaninfo,
    SevenZip,
    GtkUpdateIconCache,
    Lspci,
    Ldconfig,
    Fluidsynth,
    NvidiaSmi,
    Gamemoderun,
    Steam,
}

impl SystemCommand {
    pub const ALL: [SystemCommand; 12] = [
        SystemCommand::Xrandr,
        SystemCommand::Fuser,
        SystemCommand::Glxinfo,
        SystemCommand::Vulkaninfo,
        SystemCommand::SevenZip,
        SystemCommand::GtkUpdateIconCache,
        SystemCommand::Lspci,
        SystemCommand::Ldconfig,
        SystemCommand::Fluidsynth,
        SystemCommand::NvidiaSmi,
        SystemCommand::Gamemoderun,
        SystemCommand::Steam,
    ];

    /// Executable name looked up on disk.
    pub fn executable(self) -> &'static str {
        match self {
            SystemCommand::Xrandr => "xrandr",
            SystemCommand::Fuser => "fuser",
            SystemCommand::Glxinfo => "glxinfo",
            SystemCommand::Vulkaninfo => "vulkaninfo",
            SystemCommand::SevenZip => "7z",
            SystemCommand::GtkUpdateIconCache => "gtk-update-icon-cache",
            SystemCommand::Lspci => "lspci",
            SystemCommand::Ldconfig => "ldconfig",
            SystemCommand::Fluidsynth => "fluidsynth",
            SystemCommand::NvidiaSmi => "nvidia-smi",
            SystemCommand::Gamemoderun => "gamemoderun",
            SystemCommand::Steam => "steam",
        }
    }

    /// Optional commands are not reported when absent.
    pub fn is_optional(self) -> bool {
        matches!(
            self,
            SystemCommand::Fluidsynth
                | SystemCommand::NvidiaSmi
                | SystemCommand::Gamemoderun
                | SystemCommand::Steam
        )
    }
}

impl fmt::Display for SystemCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable())
    }
}

/// Terminal emulators, in order of preference.
pub const TERMINALS: &[&str] = &[
    "xterm",
    "gnome-terminal",
    "konsole",
    "xfce4-terminal",
    "pantheon-terminal",
    "terminator",
    "mate-terminal",
    "urxvt",
    "cool-retro-term",
    "Eterm",
    "guake",
    "lilyterm",
    "lxterminal",
    "roxterm",
    "rxvt",
    "aterm",
    "sakura",
    "st",
    "terminology",
    "termite",
    "tilix",
    "wterm",
    "kitty",
    "yuakuake",
    "qterminal",
    "alacritty",
    "kgx",
    "deepin-terminal",
    "wezterm",
    "foot",
    "ptyxis",
];

/// Resolved paths of the commands and terminals found on the host.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: BTreeMap<SystemCommand, Utf8PathBuf>,
    terminals: Vec<Utf8PathBuf>,
}

impl CommandTable {
    /// Look every known command and terminal up in `PATH`, then in the sbin
    /// folders of `config`. Missing mandatory commands are logged.
    pub fn discover(config: &ProbeConfig) -> Self {
        let mut table = Self::default();

        for command in SystemCommand::ALL {
            match find_executable(command.executable(), config) {
                Some(path) => {
                    debug!("Found {} at {}", command, path);
                    table.commands.insert(command, path);
                }
                None if command.is_optional() => {}
                None => warn!("Command '{}' not found on your system", command),
            }
        }

        table.terminals = TERMINALS
            .iter()
            .filter_map(|name| find_executable(name, config))
            .collect();

        table
    }

    pub fn with_command(mut self, command: SystemCommand, path: impl Into<Utf8PathBuf>) -> Self {
        self.commands.insert(command, path.into());
        self
    }

    pub fn with_terminal(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.terminals.push(path.into());
        self
    }

    pub fn get(&self, command: SystemCommand) -> Option<&Utf8Path> {
        self.commands.get(&command).map(Utf8PathBuf::as_path)
    }

    pub fn terminals(&self) -> &[Utf8PathBuf] {
        &self.terminals
    }

    /// First terminal found, logging when there is none.
    pub fn default_terminal(&self) -> Option<&Utf8Path> {
        let terminal = self.terminals.first().map(Utf8PathBuf::as_path);
        if terminal.is_none() {
            error!("Couldn't find a terminal emulator.");
        }
        terminal
    }

    /// Like [`CommandTable::default_terminal`], but a missing terminal is an error.
    pub fn required_default_terminal(&self) -> Result<&Utf8Path, Error> {
        self.default_terminal().ok_or(Error::NoTerminal)
    }
}

/// Find `name` on `PATH`, falling back to the sbin folders some
/// distributions leave out of it.
pub fn find_executable(name: &str, config: &ProbeConfig) -> Option<Utf8PathBuf> {
    if let Ok(path) = which::which(name) {
        match Utf8PathBuf::try_from(path) {
            Ok(path) => return Some(path),
            Err(e) => debug!("Ignoring non UTF-8 path for {}: {}", name, e),
        }
    }

    config
        .sbin_folders
        .iter()
        .map(|folder| config.resolve(folder).join(name))
        .find(|candidate| candidate.exists())
}
