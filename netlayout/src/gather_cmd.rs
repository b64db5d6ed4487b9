use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use netlayout::discovery::{discover_physical_nics, write_snapshot, DiscoveryOptions};

use crate::cli::GatherArgs;
use crate::compile_cmd::parse_bootmac;

pub fn run_gather(args: GatherArgs) -> Result<()> {
    let opts = DiscoveryOptions {
        include_loopback: args.include_loopback,
        boot_mac: parse_bootmac(args.bootmac.as_deref())?,
    };
    let nics = discover_physical_nics(&opts).context("failed to discover interfaces")?;
    let snapshot = write_snapshot(&nics)?;

    if args.dest == Path::new("-") {
        print!("{snapshot}");
    } else {
        fs::write(&args.dest, snapshot)
            .with_context(|| format!("failed to write {}", args.dest.display()))?;
    }
    Ok(())
}
