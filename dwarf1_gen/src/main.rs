use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cmds;

#[derive(Parser)]
#[command(name = "dwarf1-gen")]
#[command(about = "Rebuild C/C++ declarations from DWARF v1 dumps", long_about = None)]
struct Cli {
    /* Raise the log level (-v info, -vv debug, -vvv trace); RUST_LOG wins */
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /* List the compilation units of a dump */
    List {
        /* DWARF v1 dump file */
        #[arg(value_name = "DUMP")]
        dump: PathBuf,
    },

    /* Generate declaration files from a dump */
    Generate {
        /* DWARF v1 dump file */
        #[arg(value_name = "DUMP")]
        dump: PathBuf,

        /* Output directory for generated files */
        #[arg(short = 'o', long = "output", value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /* Leading part of unit names to drop from output paths */
        #[arg(short = 's', long = "strip-prefix", value_name = "PREFIX")]
        strip_prefix: Option<String>,

        /* YAML configuration file */
        #[arg(short = 'c', long = "config", value_name = "FILE")]
        config: Option<PathBuf>,

        /* Label function pointer parameters with their position */
        #[arg(long = "annotate-params")]
        annotate_params: bool,

        /* Print the files that would be written without writing them */
        #[arg(long = "dry-run")]
        dry_run: bool,
    },

    /* Repair and fix up a dump, then print the resolved unit trees */
    Analyze {
        /* DWARF v1 dump file */
        #[arg(value_name = "DUMP")]
        dump: PathBuf,

        /* Only show the unit with this name */
        #[arg(long = "unit", value_name = "NAME")]
        unit: Option<String>,

        /* Print the trees as JSON */
        #[arg(long = "json")]
        json: bool,
    },
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::List { dump } => {
            cmds::list::run(dump)?;
        }

        Commands::Generate {
            dump,
            output_dir,
            strip_prefix,
            config,
            annotate_params,
            dry_run,
        } => {
            cmds::generate::run(cmds::generate::GenerateArgs {
                dump,
                output_dir,
                strip_prefix,
                config,
                annotate_params,
                dry_run,
            })?;
        }

        Commands::Analyze { dump, unit, json } => {
            cmds::analyze::run(dump, unit, json)?;
        }
    }

    Ok(())
}
