use anyhow::Result;
use clap::{Parser, Subcommand};
use modbuild_build::{BuildTarget, Encoding};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// Assemble script modules from source fragments.
///
/// modbuild concatenates a module's source fragments into a single script,
/// copies the manifest and pass-through files into an output directory and
/// patches the copied manifest's exported functions and version.
///
/// EXAMPLES:
///     modbuild build                         Build the module in the current directory
///     modbuild build Widgets --version 1.2.0 Build and stamp a version
///     modbuild build A B C --json            Build several modules in parallel
///     modbuild build Widgets --target clean  Remove the output directory
///
/// ENVIRONMENT VARIABLES:
///     MODBUILD_TARGET    Default build target (clean, build, clean-build)
///     MODBUILD_ENCODING  Default script encoding
///     RUST_LOG           Log filter, overrides --verbose and --quiet
#[derive(Parser)]
#[command(name = "modbuild")]
#[command(version)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    /// Quiet output (errors only)
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one or more modules
    ///
    /// Each path is a module directory, a `source`/`src` container inside
    /// one, or the module manifest itself. Settings come from built-in
    /// defaults, then `build.toml` beside the manifest, then these flags.
    ///
    /// EXAMPLES:
    ///     modbuild build Widgets/source
    ///     modbuild build Widgets --encoding utf16 --prefix header.ps1
    ///     modbuild build Widgets --target build --passthru
    #[command(visible_alias = "b")]
    Build {
        /// Module paths (defaults to the current directory)
        paths: Vec<PathBuf>,
        /// Output directory, relative to the module base's parent
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Version written into the output manifest
        #[arg(long)]
        version: Option<String>,
        /// Directories copied verbatim into the output (comma separated)
        #[arg(long, value_delimiter = ',')]
        copy_directories: Vec<PathBuf>,
        /// Fragment directories in concatenation order (comma separated)
        #[arg(long, value_delimiter = ',')]
        source_directories: Vec<String>,
        /// Glob selecting public fragments; empty leaves exports untouched
        #[arg(long)]
        public_filter: Option<String>,
        /// Script encoding (utf8, utf7, ascii, unicode, utf16, utf32)
        #[arg(long, env = "MODBUILD_ENCODING")]
        encoding: Option<Encoding>,
        /// Text or file placed before the first fragment
        #[arg(long)]
        prefix: Option<String>,
        /// Text or file placed after the last fragment
        #[arg(long)]
        postfix: Option<String>,
        /// Build target (clean, build, clean-build)
        #[arg(long, short = 't', env = "MODBUILD_TARGET")]
        target: Option<BuildTarget>,
        /// Print the resolved module information as JSON
        #[arg(long)]
        passthru: bool,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Build {
            paths,
            output,
            version,
            copy_directories,
            source_directories,
            public_filter,
            encoding,
            prefix,
            postfix,
            target,
            passthru,
            json,
        } => {
            let args = commands::build::BuildArgs {
                paths,
                output,
                version,
                copy_directories,
                source_directories,
                public_filter,
                encoding,
                prefix,
                postfix,
                target,
                passthru,
                quiet: cli.quiet,
                json,
            };
            commands::build::run(args)?;
        }
    }

    Ok(())
}

/// Log to stderr without timestamps; `RUST_LOG` wins over the flags
fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
