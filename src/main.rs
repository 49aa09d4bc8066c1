/*!
 * Starfinder CLI - Command Line Interface
 *
 * Finds star systems near a named system using the EDSM API.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use starfinder::{
    cli_style::{
        cache_table, format_duration, print_banner, print_info, print_success,
        section_header, stats_table, Icons, Theme,
    },
    config::{default_config_path, LogLevel, StarfinderConfig},
    core::{
        api::EdsmEndpoints,
        cache::SphereCache,
        http::{ReqwestTransport, RetryPolicy, RetryingClient},
        observer::{CompositeObserver, SearchObserver, TracingObserver},
        resolver::SystemResolver,
        search::{FallbackPolicy, SearchOrchestrator},
        session::SearchSession,
    },
    error::{Result, StarfinderError, EXIT_PARTIAL, EXIT_SUCCESS},
    logging,
    oplog::{ErrorLog, OperationLogger},
    output::{OperationResult, OutputWriter},
};

#[derive(Parser)]
#[command(name = "starfinder")]
#[command(version, about = "Find star systems near a named system using EDSM", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Data folder holding cache/, logs/ and results/
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Write diagnostic logs to this file (JSON) instead of stderr
    #[arg(long = "log", value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON Lines instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for systems near a star
    Search {
        /// Star system name, e.g. "Alpha Centauri"
        star: String,

        /// Search radius in light-years
        #[arg(short, long)]
        radius: Option<f64>,

        /// Show every field of every system
        #[arg(short, long)]
        details: bool,

        /// Do not retry at the fallback radius when nothing is found
        #[arg(long)]
        no_fallback: bool,

        /// Export the results afterwards (optionally to a specific file)
        #[arg(short, long, value_name = "FILE")]
        export: Option<Option<PathBuf>>,
    },

    /// Look up a system's coordinates
    Resolve {
        /// Star system name
        star: String,
    },

    /// Inspect or clear cached sphere queries
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Search and write the results to a JSON file
    Export {
        /// Star system name
        star: String,

        /// Search radius in light-years
        #[arg(short, long)]
        radius: Option<f64>,

        /// Output file (default: <data_dir>/results/<star>.json)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Display results from a previously exported file
    Import {
        /// File to load
        path: PathBuf,

        /// Show every field of every system
        #[arg(short, long)]
        details: bool,
    },

    /// Show or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// List cache entries with their age
    List,

    /// Show a cached result without contacting EDSM
    Show {
        /// Star system name
        star: String,

        /// Radius the entry was written for
        #[arg(short, long)]
        radius: Option<f64>,

        /// Ignore entries older than cache_ttl_secs
        #[arg(long)]
        fresh: bool,

        /// Show every field of every system
        #[arg(short, long)]
        details: bool,
    },

    /// Delete cache entries for one star, or all of them
    Clear {
        /// Star system name (omit with --all)
        star: Option<String>,

        /// Delete every cache entry
        #[arg(long, conflicts_with = "star")]
        all: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Set one key and save the configuration file
    Set { key: String, value: String },

    /// Print the configuration file location
    Path,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

/// Everything a command needs once configuration is loaded
struct App {
    config: StarfinderConfig,
    config_path: Option<PathBuf>,
    output: OutputWriter,
    oplog: OperationLogger,
    errors: ErrorLog,
}

impl App {
    fn observer(&self) -> Arc<dyn SearchObserver> {
        Arc::new(
            CompositeObserver::new()
                .with(Arc::new(self.oplog.clone()))
                .with(Arc::new(TracingObserver)),
        )
    }

    fn session(&self, no_fallback: bool) -> Result<SearchSession> {
        let observer = self.observer();
        let transport = Arc::new(ReqwestTransport::new()?);
        let mut orchestrator =
            SearchOrchestrator::from_config(&self.config, transport, observer.clone())?;
        if no_fallback {
            orchestrator = orchestrator.with_policy(FallbackPolicy::disabled());
        }
        Ok(SearchSession::new(orchestrator, self.config.clone()).with_observer(observer))
    }

    /// Record a user-facing error in the daily error log
    fn record_error(&self, message: &str) {
        if let Err(e) = self.errors.record(message) {
            tracing::warn!(error = %e, "could not write error log");
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = OutputWriter::new(cli.json);
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            output.failure(&e, hint_for(&e));
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn hint_for(error: &StarfinderError) -> Option<&'static str> {
    match error {
        StarfinderError::InvalidRadius { .. } => Some("Use --radius with a value inside the bounds"),
        StarfinderError::Config(_) => Some("Check the file shown by `starfinder config path`"),
        StarfinderError::Resolution(_) | StarfinderError::Query(_) => {
            Some("Please check the spelling or try increasing the search radius.")
        }
        _ => None,
    }
}

fn run(cli: Cli) -> Result<i32> {

    if let Commands::Completions { shell } = cli.command {
        use clap::CommandFactory;
        use clap_complete::generate;
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "starfinder", &mut std::io::stdout());
        return Ok(EXIT_SUCCESS);
    }

    let config_path = cli.config.clone().or_else(default_config_path);
    let mut config = StarfinderConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log;
    }
    config.verbose |= cli.verbose;
    config.validate()?;
    config.ensure_dirs()?;

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let oplog = OperationLogger::new(&config.logs_dir())?;
    let errors = ErrorLog::new(&config.logs_dir()).with_operation_log(oplog.clone());
    let app = App {
        config,
        config_path,
        output: OutputWriter::new(cli.json),
        oplog,
        errors,
    };

    match cli.command {
        Commands::Search {
            star,
            radius,
            details,
            no_fallback,
            export,
        } => handle_search(&app, &star, radius, details, no_fallback, export),
        Commands::Resolve { star } => handle_resolve(&app, &star),
        Commands::Cache(cmd) => handle_cache_command(&app, cmd),
        Commands::Export {
            star,
            radius,
            output,
        } => handle_search(&app, &star, radius, false, false, Some(output)),
        Commands::Import { path, details } => handle_import(&app, &path, details),
        Commands::Config(cmd) => handle_config_command(app, cmd),
        Commands::Completions { .. } => Ok(EXIT_SUCCESS),
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn handle_search(
    app: &App,
    star: &str,
    radius: Option<f64>,
    details: bool,
    no_fallback: bool,
    export: Option<Option<PathBuf>>,
) -> Result<i32> {
    let session = app.session(no_fallback)?;
    if let Some(radius) = radius {
        session.set_radius(radius)?;
    }
    session.set_show_details(details);

    let handle = session.start_search(star)?;
    let spinner = (!app.output.is_json()).then(|| {
        create_spinner(&format!(
            "{} Scanning {} ly around '{}'",
            Icons::TELESCOPE,
            session.radius(),
            star.trim()
        ))
    });
    let (generation, outcome) = handle.join()?;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    session.accept(generation, outcome.clone());

    if let Some(ref error) = outcome.error {
        app.record_error(error);
    }
    app.output.search_outcome(&outcome, details);

    if let Some(target) = export {
        match session.export(target.as_deref()) {
            Ok(written) => app.output.operation_result(
                &OperationResult::ok("export_results")
                    .with_path(written.display().to_string())
                    .with_count(outcome.systems.len()),
            ),
            Err(e) => {
                app.record_error(&e.to_string());
                app.output.failure(&e, None);
                return Ok(e.exit_code());
            }
        }
    }

    Ok(if outcome.error.is_some() {
        EXIT_PARTIAL
    } else {
        EXIT_SUCCESS
    })
}

fn handle_resolve(app: &App, star: &str) -> Result<i32> {
    let client = RetryingClient::new(
        Arc::new(ReqwestTransport::new()?),
        RetryPolicy::from_config(&app.config)?,
    )
    .with_observer(app.observer());
    let resolver = SystemResolver::new(
        client,
        EdsmEndpoints::new(&app.config.api_base_url)?,
        app.config.request_timeout(),
    )
    .with_observer(app.observer());

    let resolved = match resolver.resolve(star.trim()) {
        Ok(r) => r,
        Err(e) => {
            app.record_error(&e.to_string());
            return Err(e);
        }
    };

    if app.output.is_json() {
        println!(
            "{}",
            json!({"name": resolved.name, "coords": resolved.coords})
        );
    } else {
        section_header(&format!("{} {}", Icons::STAR, resolved.name));
        println!(
            "{}",
            stats_table(&[
                ("x", resolved.coords.x.to_string()),
                ("y", resolved.coords.y.to_string()),
                ("z", resolved.coords.z.to_string()),
            ])
        );
    }
    Ok(EXIT_SUCCESS)
}

fn handle_cache_command(app: &App, cmd: CacheCommands) -> Result<i32> {
    let cache = SphereCache::new(app.config.cache_dir());

    match cmd {
        CacheCommands::List => {
            let entries = cache.list()?;
            if app.output.is_json() {
                for entry in &entries {
                    println!(
                        "{}",
                        json!({
                            "key": entry.key,
                            "path": entry.path.display().to_string(),
                            "size": entry.size,
                            "age_secs": entry.age().map(|a| a.as_secs()),
                        })
                    );
                }
            } else if entries.is_empty() {
                print_info(&format!(
                    "Cache is empty ({} {})",
                    Icons::FOLDER,
                    cache.dir().display()
                ));
            } else {
                section_header(&format!("{} Cache", Icons::FOLDER));
                println!("{}", cache_table(&entries, app.config.cache_ttl()));
                println!(
                    "{} entries, TTL {}",
                    Theme::bold(entries.len()),
                    format_duration(app.config.cache_ttl().as_secs_f64())
                );
            }
            Ok(EXIT_SUCCESS)
        }
        CacheCommands::Show {
            star,
            radius,
            fresh,
            details,
        } => {
            let radius = radius.unwrap_or(app.config.default_radius);
            let systems = if fresh {
                cache.read_fresh(&star, radius, app.config.cache_ttl())?
            } else {
                cache.read(&star, radius)?
            };
            match systems {
                Some(systems) => {
                    let title = format!(
                        "(Cached) Star systems within {} ly of '{}', unfiltered",
                        radius,
                        star.trim()
                    );
                    app.output.systems(&title, &systems, details);
                    Ok(EXIT_SUCCESS)
                }
                None => {
                    app.output.info(&format!(
                        "No {}cache entry for '{}' at {} ly",
                        if fresh { "fresh " } else { "" },
                        star.trim(),
                        radius
                    ));
                    Ok(EXIT_PARTIAL)
                }
            }
        }
        CacheCommands::Clear { star, all } => {
            let (report, scope) = match (star, all) {
                (_, true) => (cache.clear_all()?, "all".to_string()),
                (Some(star), false) if !star.trim().is_empty() => {
                    let star = star.trim().to_string();
                    (cache.clear_star(&star)?, star)
                }
                _ => {
                    return Err(StarfinderError::Config(
                        "No current system to clear cache for. Pass a star name or --all."
                            .to_string(),
                    ))
                }
            };

            for (path, error) in &report.failures {
                app.oplog.log(
                    "cache_clear_error",
                    json!({"file": path.display().to_string(), "error": error}),
                );
            }
            app.oplog.log(
                "cache_clear",
                json!({"scope": scope, "removed": report.removed, "failed": report.failures.len()}),
            );

            app.output.operation_result(
                &OperationResult::ok("cache_clear")
                    .with_path(scope)
                    .with_count(report.removed),
            );
            Ok(if report.failures.is_empty() {
                EXIT_SUCCESS
            } else {
                EXIT_PARTIAL
            })
        }
    }
}

fn handle_import(app: &App, path: &Path, details: bool) -> Result<i32> {
    let session = app.session(false)?;
    if let Err(e) = session.import(path) {
        app.record_error(&e.to_string());
        return Err(e);
    }

    let star = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = format!("(Imported) Star systems of '{}'", star);
    app.output.systems(&title, &session.results(), details);
    Ok(EXIT_SUCCESS)
}

fn handle_config_command(app: App, cmd: ConfigCommands) -> Result<i32> {
    match cmd {
        ConfigCommands::Show => {
            let text = toml::to_string_pretty(&app.config)
                .map_err(|e| StarfinderError::Config(format!("Failed to encode config: {}", e)))?;
            if app.output.is_json() {
                println!("{}", serde_json::to_string(&app.config)?);
            } else {
                print_banner();
                println!("{}", text);
            }
            Ok(EXIT_SUCCESS)
        }
        ConfigCommands::Set { key, value } => {
            let path = app.config_path.clone().ok_or_else(|| {
                StarfinderError::Config("No configuration directory on this platform".to_string())
            })?;
            // start from the file on disk so CLI overrides are not persisted
            let mut config = if path.exists() {
                StarfinderConfig::from_file(&path)?
            } else {
                StarfinderConfig::default()
            };
            config.set_value(&key, &value)?;
            config.to_file(&path)?;
            app.oplog.log(
                "config_changed",
                json!({"key": key, "value": value, "file": path.display().to_string()}),
            );
            print_success(&format!("{} {} = {}", Icons::GEAR, key, value));
            Ok(EXIT_SUCCESS)
        }
        ConfigCommands::Path => {
            match app.config_path {
                Some(path) => println!("{} {}", Icons::FILE, path.display()),
                None => println!("{} no configuration directory", Icons::WARNING),
            }
            Ok(EXIT_SUCCESS)
        }
    }
}
