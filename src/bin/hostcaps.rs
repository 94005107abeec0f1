use anyhow::Context;
use bpaf::Bpaf;
use camino::Utf8PathBuf;
use hostcaps::{ProbeConfig, Requirement, SystemCapabilities, SystemInfo};
use std::fs;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options)]
struct Options {
    #[bpaf(short, long)]
    /// Verbose output
    verbose: bool,

    #[bpaf(short('r'), long, argument("PREFIX"), fallback("/".into()))]
    /// Probe an alternative root prefix (like chroot)
    prefix: Utf8PathBuf,

    #[bpaf(short('l'), long, argument("FILE"))]
    /// Read captured `ldconfig -p` output instead of running ldconfig
    listing: Option<Utf8PathBuf>,

    #[bpaf(short('m'), long, argument("MACHINE"))]
    /// Override the machine string reported by uname
    machine: Option<String>,

    #[bpaf(short('c'), long("check"), argument("REQUIREMENT"))]
    /// Check a single requirement (OPENGL, VULKAN, WINE, RADEON, GAMEMODE, GNUTLS, ACO)
    check: Option<String>,

    #[bpaf(long)]
    /// Print library search folders, most used first
    folders: bool,

    #[bpaf(long)]
    /// Print the full report as JSON
    json: bool,
}

/// Initialize the tracing subscriber with appropriate configuration
///
/// # Arguments
///
/// * `verbose` - If true, sets log level to DEBUG, otherwise INFO
pub fn init_logging(verbose: bool) {
    let filter_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Allow overriding via RUST_LOG
    let env_filter = EnvFilter::builder()
        .with_default_directive(filter_level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_level(verbose)
        .with_target(verbose)
        .with_line_number(verbose)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    debug!("Logging initialized with level: {}", filter_level);
}

fn main() -> anyhow::Result<()> {
    let options = options().run();

    init_logging(options.verbose);

    debug!("Using prefix: {}", options.prefix);

    let listing = options
        .listing
        .as_ref()
        .map(|path| {
            fs::read_to_string(path).with_context(|| format!("Failed to read listing {}", path))
        })
        .transpose()?;

    let caps = SystemCapabilities::builder()
        .config(ProbeConfig::with_root(options.prefix.clone()))
        .maybe_machine(options.machine.clone())
        .maybe_listing(listing)
        .build();

    if let Some(name) = &options.check {
        let req: Requirement = name.parse()?;
        return print_check(&caps, req);
    }

    if options.folders {
        for folder in caps.lib_folders() {
            println!("{}", folder);
        }
        return Ok(());
    }

    let info = SystemInfo::gather(&caps);
    if options.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", info);
    }

    Ok(())
}

fn print_check(caps: &SystemCapabilities, req: Requirement) -> anyhow::Result<()> {
    let supported = caps.is_feature_supported(req);
    println!(
        "{}: {}",
        req,
        if supported { "supported" } else { "not supported" }
    );
    for (arch, missing) in caps
        .runtime_architectures()
        .iter()
        .zip(caps.missing_libraries(req))
    {
        if !missing.is_empty() {
            println!("  {}: missing {}", arch, missing.join(", "));
        }
    }
    if req == Requirement::Vulkan {
        println!("  vulkan usable: {}", caps.is_vulkan_supported());
    }
    Ok(())
}
