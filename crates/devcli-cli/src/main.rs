mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::clean::Scope;
use commands::{exit_code_for, EXIT_FAILURE};
use devcli_core::{CoreError, Engine, EngineOptions};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

/// File that `--log` appends to, in the current directory.
const LOG_FILE: &str = "devcli.log";

#[derive(Debug, Parser)]
#[command(
    name = "devcli",
    version,
    about = "Bring up a devcontainer for the current directory"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable debug logging.
    #[arg(short, long, default_value_t = false, global = true)]
    debug: bool,

    /// Enable trace-level logging (more detailed than --debug).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    /// Also append log output to ./devcli.log.
    #[arg(short, long, default_value_t = false, global = true)]
    log: bool,

    /// Container runtime driver: docker, podman or mock.
    #[arg(long, env = "DEVCLI_RUNTIME", default_value = "docker", global = true)]
    runtime: String,

    /// Skip the per-user global devcontainer.json.
    #[arg(long, default_value_t = false, global = true)]
    no_global: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create or start the devcontainer and open a shell in it (default).
    Up,
    /// Remove the devcontainer and its image.
    Clean {
        /// Remove every version built for this directory.
        #[arg(long, default_value_t = false, conflicts_with = "global")]
        all: bool,
        /// Remove every devcli container and image on this host.
        #[arg(long, default_value_t = false)]
        global: bool,
    },
    /// Show the resolved configuration, identity and derived names.
    Inspect,
    /// List devcli containers and images.
    List,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    if let Err(msg) = init_logging(&cli) {
        eprintln!("error: {msg}");
        return ExitCode::from(EXIT_FAILURE);
    }

    let command = cli.command.unwrap_or(Commands::Up);
    let result = match command {
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        command => run_with_engine(command, &cli.runtime, cli.no_global, cli.json),
    };
    finish(result)
}

fn run_with_engine(
    command: Commands,
    runtime: &str,
    no_global: bool,
    json: bool,
) -> Result<u8, String> {
    let engine = make_engine(runtime, no_global)?;
    let needs_runtime = !matches!(command, Commands::Inspect);
    if needs_runtime && std::env::var("DEVCLI_SKIP_PREREQS").as_deref() != Ok("1") {
        let missing = devcli_runtime::check_runtime_prereqs(runtime);
        if !missing.is_empty() {
            return Err(devcli_runtime::format_missing(&missing));
        }
    }

    let root = std::env::current_dir()
        .map_err(|e| format!("cannot determine working directory: {e}"))?;

    match command {
        Commands::Up => commands::up::run(&engine, &root, json),
        Commands::Clean { all, global } => {
            let scope = if global {
                Scope::Global
            } else if all {
                Scope::AllVersions
            } else {
                Scope::Current
            };
            commands::clean::run(&engine, &root, scope, json)
        }
        Commands::Inspect => commands::inspect::run(&engine, &root, json),
        Commands::List => commands::list::run(&engine, json),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    }
}

fn finish(result: Result<u8, String>) -> ExitCode {
    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn init_logging(cli: &Cli) -> Result<(), String> {
    let default_level = if cli.trace {
        "trace"
    } else if cli.debug {
        "debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("DEVCLI_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let writer = if cli.log {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(LOG_FILE)
            .map_err(|e| format!("failed to open {LOG_FILE}: {e}"))?;
        BoxMakeWriter::new(std::io::stderr.and(Mutex::new(file)))
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(!cli.log)
        .with_target(false)
        .without_time()
        .init();
    Ok(())
}

fn make_engine(name: &str, no_global: bool) -> Result<Engine, String> {
    let runtime = devcli_runtime::select_runtime(name)
        .map_err(|e| CoreError::from(e).to_string())?;
    tracing::debug!(runtime = name, no_global, "selected container runtime");
    let global_root = if no_global {
        None
    } else {
        Some(global_root()?)
    };
    let options = EngineOptions {
        global_root,
        ..EngineOptions::default()
    };
    // the mock engine needs no time to settle
    let options = if name == "mock" {
        options.immediate()
    } else {
        options
    };
    Ok(Engine::with_options(runtime, options))
}

fn global_root() -> Result<PathBuf, String> {
    devcli_schema::global_config_root().map_err(|e| CoreError::from(e).to_string())
}
