/* Generate command - write declaration files for every unit of a dump */

use anyhow::{bail, Context};
use dwarf1_gen::{pipeline, GenConfig, UnitFailure};
use std::path::PathBuf;

pub struct GenerateArgs {
    pub dump: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub strip_prefix: Option<String>,
    pub config: Option<PathBuf>,
    pub annotate_params: bool,
    pub dry_run: bool,
}

/* Configuration file first, then flags on top */
fn resolve_config(args: &GenerateArgs) -> anyhow::Result<GenConfig> {
    let mut config = match &args.config {
        Some(path) => GenConfig::load(path)?,
        None => GenConfig::default(),
    };
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(strip_prefix) = &args.strip_prefix {
        config.strip_prefix = strip_prefix.clone();
    }
    config.annotate_params |= args.annotate_params;
    Ok(config)
}

fn report_failures(failures: &[&UnitFailure]) {
    for failure in failures {
        eprintln!("[✗] {} (0x{:X}): {}", failure.name, failure.unit_id, failure.error);
    }
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;

    println!("[~] Loading {}", args.dump.display());
    let analysis = pipeline::load(&args.dump)
        .with_context(|| format!("failed to analyze {}", args.dump.display()))?;
    println!(
        "[~] {} unit(s), {} chain(s) relinked, {} warning(s)",
        analysis.units.len(),
        analysis.repair.relinked.len(),
        analysis.warnings.len()
    );

    let generation = pipeline::generate(&analysis, &config);

    if args.dry_run {
        println!("[~] Would write {} file(s):", generation.plan.len());
        for path in generation.plan.paths() {
            println!("    - {}", path.display());
        }
    } else {
        let written = generation.plan.write_all()?;
        println!("[✓] Wrote {} file(s) to {}", written, config.output_dir.display());
    }

    let failures: Vec<&UnitFailure> = analysis.failures.iter().chain(&generation.failures).collect();
    if !failures.is_empty() {
        report_failures(&failures);
        bail!("{} compilation unit(s) could not be generated", failures.len());
    }

    Ok(())
}
