use anyhow::{bail, Result};
use netlayout::compile::compile;
use netlayout::report::{build_check_report, render_check_text};

use crate::cli::{CheckArgs, OutputFormat};
use crate::compile_cmd::load_inputs;

pub fn run_check(args: CheckArgs) -> Result<()> {
    let (decls, phys, policy) = load_inputs(&args.input)?;
    let report = match compile(&decls, &phys, &policy) {
        Ok(graph) => build_check_report(&graph, None),
        Err(err) => build_check_report(&err.graph, Some(&err.errs)),
    };

    match args.format {
        OutputFormat::Text => println!("{}", render_check_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if !report.errors.is_empty() {
        bail!("check failed: {} errors", report.errors.len());
    }
    Ok(())
}
