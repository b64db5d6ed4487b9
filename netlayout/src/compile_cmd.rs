use anyhow::{bail, Context, Result};
use netlayout::addr::HardwareAddr;
use netlayout::compile::compile;
use netlayout::discovery::{
    discover_physical_nics, load_snapshot, DiscoveryOptions, PhysicalNic,
};
use netlayout::policy::{default_policy, load_policy, CompilePolicy};
use netlayout::render::{
    self, IfcfgRenderer, LayoutRenderer, NetplanRenderer, NetworkdRenderer, Renderer,
};
use netlayout::source::Declarations;
use tracing::info;

use crate::cli::{CompileArgs, InputArgs, OutputKind};

pub fn run_compile(args: CompileArgs) -> Result<()> {
    let (decls, phys, policy) = load_inputs(&args.input)?;
    let graph = match compile(&decls, &phys, &policy) {
        Ok(graph) => graph,
        Err(err) => bail!("{}", err.errs),
    };

    let mut renderer: Box<dyn Renderer> = match args.out {
        OutputKind::Layout => Box::new(LayoutRenderer),
        OutputKind::Netplan => Box::new(NetplanRenderer::new()),
        OutputKind::Networkd => Box::new(NetworkdRenderer::new()),
        OutputKind::Ifcfg => Box::new(IfcfgRenderer::new()),
    };
    if args.bind_macs {
        renderer.bind_physical_addressing();
    }
    render::write(renderer.as_ref(), &graph, &args.dest)
        .with_context(|| format!("failed to render to {}", args.dest.display()))?;
    Ok(())
}

/// Read the declarations, the NIC list and the compile policy.
pub fn load_inputs(input: &InputArgs) -> Result<(Declarations, Vec<PhysicalNic>, CompilePolicy)> {
    let policy = match &input.policy {
        Some(path) => load_policy(path)?,
        None => default_policy(),
    };
    let opts = DiscoveryOptions {
        include_loopback: false,
        boot_mac: parse_bootmac(input.bootmac.as_deref())?,
    };
    let phys = match &input.phys {
        Some(path) => load_snapshot(path, &opts)?,
        None => discover_physical_nics(&opts).context("failed to discover interfaces")?,
    };
    info!(nics = phys.len(), "loaded physical interfaces");
    let decls = Declarations::read(&input.src)
        .with_context(|| format!("failed to load declarations from {}", input.src.display()))?;
    Ok((decls, phys, policy))
}

pub fn parse_bootmac(raw: Option<&str>) -> Result<Option<HardwareAddr>> {
    raw.map(|mac| {
        mac.parse::<HardwareAddr>()
            .with_context(|| format!("invalid --bootmac {mac}"))
    })
    .transpose()
}
