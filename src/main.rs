use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use scriptum_component_registry::MemoryComponentRegistry;
use scriptum_config::{DEFAULT_EVALUATOR, DEFAULT_PROVIDER, RepositoryDef};
use scriptum_engine::{EngineConfig, Repository, ScriptEngine};
use scriptum_provider_fs::{FsProviderConfig, FsScriptProvider};
use scriptum_runtime_lua::LuaEvaluator;

/// Scriptum - back interface methods with scripts
#[derive(Parser)]
#[command(name = "scriptum")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (RUST_LOG takes precedence)
  #[arg(long, global = true)]
  debug: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Invoke one repository method
  Run {
    /// Path to the repository manifest (JSON)
    #[arg(long)]
    manifest: PathBuf,

    /// Method to invoke, as Interface.method
    #[arg(long)]
    method: String,

    /// Arguments as a JSON array (read from stdin when omitted)
    #[arg(long)]
    args: Option<String>,

    /// Directory holding the scripts (default: ~/.scriptum/scripts)
    #[arg(long)]
    scripts_dir: Option<PathBuf>,

    /// Script file extension
    #[arg(long, default_value = "lua")]
    extension: String,

    /// Number of worker slots (default: available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Memory cap for each Lua evaluation, in bytes
    #[arg(long)]
    lua_memory_limit: Option<usize>,
  },

  /// Print the resolved invocation config of every method in a manifest
  Describe {
    /// Path to the repository manifest (JSON)
    #[arg(long)]
    manifest: PathBuf,
  },
}

/// How long exit waits for evaluations abandoned after a timeout.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.debug);

  match cli.command {
    Some(Commands::Run {
      manifest,
      method,
      args,
      scripts_dir,
      extension,
      workers,
      lua_memory_limit,
    }) => {
      let scripts_dir = match scripts_dir {
        Some(dir) => dir,
        None => dirs::home_dir()
          .context("could not determine home directory")?
          .join(".scriptum")
          .join("scripts"),
      };
      let options = RunOptions {
        manifest,
        method,
        args,
        scripts_dir,
        extension,
        workers,
        lua_memory_limit,
      };
      let rt = tokio::runtime::Runtime::new()?;
      let result = rt.block_on(async { run_method(options).await });
      // A timed-out evaluation may still occupy a blocking thread; do not
      // wait for it on exit.
      rt.shutdown_timeout(SHUTDOWN_GRACE);
      result?;
    }
    Some(Commands::Describe { manifest }) => {
      describe(&manifest)?;
    }
    None => {
      println!("scriptum - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing(debug: bool) {
  let default_level = if debug { "debug" } else { "info" };
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();
}

struct RunOptions {
  manifest: PathBuf,
  method: String,
  args: Option<String>,
  scripts_dir: PathBuf,
  extension: String,
  workers: Option<usize>,
  lua_memory_limit: Option<usize>,
}

async fn run_method(options: RunOptions) -> Result<()> {
  let def = load_manifest(&options.manifest).await?;

  let (interface_name, method_name) = options
    .method
    .split_once('.')
    .with_context(|| format!("method must be Interface.method, got '{}'", options.method))?;

  let interface = def
    .interface(interface_name)
    .with_context(|| format!("interface '{}' not found in manifest", interface_name))?;
  let repository = Repository::from_def(interface).context("invalid interface declaration")?;

  let args = match options.args {
    Some(raw) => parse_args(&raw)?,
    None => read_args_from_stdin()?,
  };
  debug!(method = %options.method, args = ?args, "arguments parsed");

  let registry = MemoryComponentRegistry::new();
  registry
    .register_shared_provider(
      DEFAULT_PROVIDER,
      Arc::new(FsScriptProvider::new(
        FsProviderConfig::new(&options.scripts_dir).with_extension(options.extension),
      )),
    )
    .context("failed to register script provider")?;
  let memory_limit = options.lua_memory_limit;
  registry
    .register_per_call_evaluator(DEFAULT_EVALUATOR, move || match memory_limit {
      Some(bytes) => LuaEvaluator::new().with_memory_limit(bytes),
      None => LuaEvaluator::new(),
    })
    .context("failed to register lua evaluator")?;

  let config = match options.workers {
    Some(max_workers) => EngineConfig { max_workers },
    None => EngineConfig::default(),
  };
  let engine = ScriptEngine::with_mappings(config, def.marker_mappings(), Arc::new(registry));

  eprintln!(
    "Invoking {} (scripts: {})",
    options.method,
    options.scripts_dir.display()
  );

  let outcome = engine
    .invoke(&repository, method_name, args)
    .await
    .with_context(|| format!("invocation of {} failed", options.method))?;

  println!("{}", serde_json::to_string_pretty(&outcome)?);

  engine.shutdown();
  Ok(())
}

fn describe(manifest: &Path) -> Result<()> {
  let content = std::fs::read_to_string(manifest)
    .with_context(|| format!("failed to read manifest: {}", manifest.display()))?;
  let def = RepositoryDef::from_json(&content)
    .with_context(|| format!("failed to parse manifest: {}", manifest.display()))?;

  // Describing never resolves components, so an empty registry is enough.
  let engine = ScriptEngine::with_mappings(
    EngineConfig { max_workers: 1 },
    def.marker_mappings(),
    Arc::new(MemoryComponentRegistry::new()),
  );

  let mut output = serde_json::Map::new();
  for interface in &def.interfaces {
    let repository = Repository::from_def(interface)
      .with_context(|| format!("invalid interface declaration: {}", interface.name))?;

    for entry in repository.methods() {
      let described = match engine.describe(&repository, entry.name()) {
        Ok(Some(config)) => serde_json::to_value(config)?,
        Ok(None) => serde_json::json!({
          "scripted": false,
          "has_default": entry.has_default(),
        }),
        Err(e) => serde_json::json!({ "error": e.to_string() }),
      };
      output.insert(entry.descriptor().to_string(), described);
    }
  }

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

async fn load_manifest(path: &Path) -> Result<RepositoryDef> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read manifest: {}", path.display()))?;

  RepositoryDef::from_json(&content)
    .with_context(|| format!("failed to parse manifest: {}", path.display()))
}

fn parse_args(raw: &str) -> Result<Vec<Value>> {
  let value: Value = serde_json::from_str(raw).context("failed to parse arguments JSON")?;
  match value {
    Value::Array(args) => Ok(args),
    other => bail!("arguments must be a JSON array, got {}", other),
  }
}

fn read_args_from_stdin() -> Result<Vec<Value>> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, call without arguments
    return Ok(Vec::new());
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read arguments from stdin")?;

  if input.trim().is_empty() {
    Ok(Vec::new())
  } else {
    parse_args(&input)
  }
}
