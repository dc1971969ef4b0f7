use anyhow::Result;
use clap::{Parser, Subcommand};
use hwscope_core::{
    Context, ContextOptions, DeviceLookup, ErrorPolicy, QuerySource, UnknownLookup,
};
use hwscope_inventory::{
    load, Backend, Domain, DriverInfo, GpuInfo, HostInventory, MemoryInfo, ProductInfo,
};
use hwscope_pcidb::PciIds;
use hwscope_report::{render, write_bundle, Format};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hwscope", version, about = "Hardware inventory for this host")]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// human, json or yaml
    #[arg(long, default_value = "human", global = true)]
    format: Format,

    /// Indent JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Inspect a copied filesystem tree instead of `/`
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Keep going when a domain fails and report it alongside the others
    #[arg(long, global = true)]
    collect_errors: bool,

    /// Use this pci.ids file instead of searching the root
    #[arg(long, global = true)]
    pci_ids: Option<PathBuf>,

    /// Also write a JSON report bundle under this directory
    #[arg(long, global = true)]
    bundle: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Memory modules and totals
    Memory,
    /// Graphics cards
    Gpu,
    /// Signed device drivers
    Driver,
    /// System product (DMI / SMBIOS)
    Product,
    /// Every domain
    All,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let backend = platform_backend(&cli)?;
    match cli.command {
        Command::Memory => show::<MemoryInfo>(&cli, &backend),
        Command::Gpu => show::<GpuInfo>(&cli, &backend),
        Command::Driver => show::<DriverInfo>(&cli, &backend),
        Command::Product => show::<ProductInfo>(&cli, &backend),
        Command::All => show::<HostInventory>(&cli, &backend),
    }
}

fn show<D: Domain>(cli: &Cli, backend: &Backend) -> Result<()> {
    let snapshot: D = load(backend)?;
    let out = render(&snapshot, cli.format, cli.pretty);
    if cli.format == Format::Human {
        print!("{out}");
    } else {
        println!("{out}");
    }
    if let Some(base) = &cli.bundle {
        let paths = write_bundle(base, &snapshot)?;
        info!(run_id = %paths.run_id, root = %paths.root.display(), "wrote report bundle");
    }
    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Environment first, flags on top.
fn context_options(cli: &Cli) -> ContextOptions {
    let flags = ContextOptions {
        root: cli.root.clone(),
        privileged: None,
        error_policy: cli.collect_errors.then_some(ErrorPolicy::Collect),
    };
    ContextOptions::from_env().merge(flags)
}

fn lookup_for(cli: &Cli, ctx: &Context) -> Result<Arc<dyn DeviceLookup>> {
    if let Some(path) = &cli.pci_ids {
        return Ok(Arc::new(PciIds::load(path)?));
    }
    let lookup: Arc<dyn DeviceLookup> = match PciIds::discover(ctx) {
        Some(ids) => Arc::new(ids),
        None => {
            warn!("no pci.ids database found; vendor and product names will be unknown");
            Arc::new(UnknownLookup)
        }
    };
    Ok(lookup)
}

#[cfg(target_os = "linux")]
fn platform_backend(cli: &Cli) -> Result<Backend> {
    let ctx = Arc::new(Context::new(
        context_options(cli),
        hwscope_host_linux::is_privileged(),
    ));
    let lookup = lookup_for(cli, &ctx)?;
    let source: Arc<dyn QuerySource> = Arc::new(hwscope_host_linux::SysfsSource::new(ctx.clone()));
    Ok(Backend::new(ctx, source, lookup))
}

#[cfg(windows)]
fn platform_backend(cli: &Cli) -> Result<Backend> {
    let ctx = Arc::new(Context::new(
        context_options(cli),
        hwscope_host_windows::is_privileged(),
    ));
    let lookup = lookup_for(cli, &ctx)?;
    let source: Arc<dyn QuerySource> = Arc::new(hwscope_host_windows::CimSource::new());
    Ok(Backend::new(ctx, source, lookup))
}

#[cfg(not(any(target_os = "linux", windows)))]
fn platform_backend(_cli: &Cli) -> Result<Backend> {
    anyhow::bail!("unsupported OS for hardware inventory")
}
