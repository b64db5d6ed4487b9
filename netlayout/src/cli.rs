use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "netlayout")]
#[command(about = "Compile declarative network interface layouts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Write a snapshot of the physical NICs on this machine.
    Gather(GatherArgs),
    /// Compile declarations and render configuration.
    Compile(CompileArgs),
    /// Compile declarations and show the resulting interface tree.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
pub struct GatherArgs {
    /// Snapshot file to write; `-` for stdout.
    #[arg(long, default_value = "-")]
    pub dest: PathBuf,
    /// MAC address of the interface the machine booted from.
    #[arg(long)]
    pub bootmac: Option<String>,
    #[arg(long)]
    pub include_loopback: bool,
}

/// Where declarations and NICs come from.
#[derive(clap::Args, Debug)]
pub struct InputArgs {
    /// Declaration file; `-` for stdin.
    #[arg(long, default_value = "-")]
    pub src: PathBuf,
    /// NIC snapshot written by `gather`. Discovers live NICs when absent.
    #[arg(long)]
    pub phys: Option<PathBuf>,
    /// MAC address of the interface the machine booted from.
    #[arg(long)]
    pub bootmac: Option<String>,
    /// Compile policy file overriding the built-in one.
    #[arg(long)]
    pub policy: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct CompileArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[arg(long, value_enum, default_value_t = OutputKind::Netplan)]
    pub out: OutputKind,
    /// Output directory; `-` for stdout.
    #[arg(long, default_value = "-")]
    pub dest: PathBuf,
    /// Match devices by MAC address instead of by name.
    #[arg(long)]
    pub bind_macs: bool,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputKind {
    Layout,
    Netplan,
    /// systemd-networkd `.network`, `.netdev` and `.link` units
    Networkd,
    /// RHEL network-scripts `ifcfg-*` files
    Ifcfg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
