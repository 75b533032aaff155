pub mod models {
    pub mod sportradar;
}

pub mod client;
pub mod config;
pub mod db {
    pub mod models;
    pub mod store;
}
pub mod dashboard;
pub mod schema;
pub mod utils;
pub mod services {
    pub mod competitions;
    pub mod complexes;
    pub mod ingest;
    pub mod pipeline;
    pub mod rankings;
}

use crate::client::SportradarClient;
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::dashboard::filters::{Bounds, Filters, Gender, NameMatch};
use crate::dashboard::render;
use crate::db::store;
use crate::services::pipeline;
use log::{error, info, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Ingest,
    Dashboard,
}

/// Dashboard filters given on the command line; unset ones keep the seeded value.
#[derive(Debug, Default, PartialEq, Eq)]
struct FilterArgs {
    competitor: Option<NameMatch>,
    country: Option<String>,
    category: Option<String>,
    gender: Option<Gender>,
    rank: Option<Bounds>,
    points: Option<Bounds>,
    played: Option<Bounds>,
}

impl FilterArgs {
    fn is_empty(&self) -> bool {
        *self == FilterArgs::default()
    }

    fn over(self, base: Filters) -> Filters {
        Filters {
            competitor: self.competitor.or(base.competitor),
            country: self.country.or(base.country),
            category: self.category.or(base.category),
            gender: self.gender.or(base.gender),
            rank: self.rank.map_or(base.rank, |b| b.over(base.rank)),
            points: self.points.map_or(base.points, |b| b.over(base.points)),
            competitions_played: self
                .played
                .map_or(base.competitions_played, |b| b.over(base.competitions_played)),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    env_file: Option<PathBuf>,
    mode: Mode,
    filters: FilterArgs,
}

fn run(mode: Mode, filter_args: FilterArgs) -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    let flows = cfg.flows.iter().map(|f| f.to_string()).collect::<Vec<_>>().join(",");
    info!(
        "Config loaded (api_base_url={}, flows={}, run_migrations={}, query_cache_ttl={}s)",
        cfg.api_base_url,
        flows,
        cfg.run_migrations,
        cfg.query_cache_ttl.as_secs()
    );

    if mode == Mode::Dashboard {
        let mut dashboard = Dashboard::connect(&cfg);
        let filters = filter_args.over(dashboard.seeded_filters());
        print!("{}", render::render_dashboard(&mut dashboard, &filters));
        return Ok(());
    }

    // 2) Connect DB
    let mut conn = store::connect(&cfg.database_url).map_err(|e| format!("DB connection failed: {}", e))?;
    info!("Connected to database");

    // 3) Apply pending database migrations
    if cfg.run_migrations {
        store::apply_migrations(&mut conn).map_err(|e| e.to_string())?;
    } else {
        info!("Skipping migrations (RUN_MIGRATIONS={})", cfg.run_migrations);
    }

    // 4) Ingest
    let client = SportradarClient::new(&cfg);
    let report = pipeline::run_all(&mut conn, &client, &cfg.flows);
    if report.failed() > 0 {
        warn!("{} of {} flow(s) failed", report.failed(), report.flows.len());
    } else {
        info!("All {} flow(s) completed", report.flows.len());
    }

    Ok(())
}

fn parse_cli_args(args: impl IntoIterator<Item = OsString>) -> Result<CliArgs, String> {
    let mut args = args.into_iter();
    let mut env_file: Option<PathBuf> = None;
    let mut mode = Mode::Ingest;
    let mut filters = FilterArgs::default();

    while let Some(arg) = args.next() {
        let arg = arg
            .into_string()
            .map_err(|_| "argument contains invalid UTF-8".to_string())?;
        let (flag, inline) = match arg.split_once('=') {
            Some((f, v)) if f.starts_with("--") => (f, Some(v.to_string())),
            _ => (arg.as_str(), None),
        };
        match flag {
            "--env-file" => {
                if env_file.is_some() {
                    return Err("`--env-file` provided more than once".to_string());
                }
                env_file = Some(PathBuf::from(flag_value(flag, inline, &mut args)?));
            }
            "--dashboard" => mode = Mode::Dashboard,
            "--competitor" => filters.competitor = Some(NameMatch::Exact(flag_value(flag, inline, &mut args)?)),
            "--competitor-contains" => {
                filters.competitor = Some(NameMatch::Partial(flag_value(flag, inline, &mut args)?))
            }
            "--country" => filters.country = Some(flag_value(flag, inline, &mut args)?),
            "--category" => filters.category = Some(flag_value(flag, inline, &mut args)?),
            "--gender" => filters.gender = Some(flag_value(flag, inline, &mut args)?.parse::<Gender>()?),
            "--rank" => filters.rank = Some(flag_value(flag, inline, &mut args)?.parse::<Bounds>()?),
            "--points" => filters.points = Some(flag_value(flag, inline, &mut args)?.parse::<Bounds>()?),
            "--played" => filters.played = Some(flag_value(flag, inline, &mut args)?.parse::<Bounds>()?),
            "--" => break,
            other => return Err(format!("unrecognised argument: {}", other)),
        }
    }

    if mode == Mode::Ingest && !filters.is_empty() {
        return Err("filter arguments require `--dashboard`".to_string());
    }
    Ok(CliArgs { env_file, mode, filters })
}

/// Value of `--flag=value` or `--flag value`; never empty.
fn flag_value(
    flag: &str,
    inline: Option<String>,
    args: &mut impl Iterator<Item = OsString>,
) -> Result<String, String> {
    let value = match inline {
        Some(v) => v,
        None => args
            .next()
            .ok_or_else(|| format!("`{}` requires a value", flag))?
            .into_string()
            .map_err(|_| "argument contains invalid UTF-8".to_string())?,
    };
    if value.is_empty() {
        return Err(format!("`{}` requires a value", flag));
    }
    Ok(value)
}

fn configure_env(env_file: Option<PathBuf>) -> Result<Option<LoadedEnvFile>, String> {
    if let Some(path) = env_file {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        load_env_file(&path)?;
        Ok(Some(LoadedEnvFile { path, explicit: true }))
    } else {
        let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
        let default_path = cwd.join(".env");
        if default_path.is_file() {
            load_env_file(&default_path)?;
            Ok(Some(LoadedEnvFile {
                path: default_path,
                explicit: false,
            }))
        } else {
            Ok(None)
        }
    }
}

fn load_env_file(path: &Path) -> Result<(), String> {
    use std::fs::File;
    use std::io::{BufRead, BufReader};

    let file = File::open(path).map_err(|e| format!("failed to open {}: {}", path.display(), e))?;
    let reader = BufReader::new(file);

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("failed to read {} at line {}: {}", path.display(), index + 1, e))?;
        match parse_env_assignment(&line) {
            Ok(Some((key, value))) => {
                // Preserve any value that was already supplied via the process environment.
                if std::env::var_os(&key).is_none() {
                    // Updating process-level environment variables is unsafe on some targets.
                    unsafe {
                        std::env::set_var(key, value);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                return Err(format!("{}:{}: {}", path.display(), index + 1, e));
            }
        }
    }

    Ok(())
}

fn parse_env_assignment(line: &str) -> Result<Option<(String, String)>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let without_export = trimmed
        .strip_prefix("export ")
        .map(|s| s.trim_start())
        .unwrap_or(trimmed);

    let mut parts = without_export.splitn(2, '=');
    let key = parts
        .next()
        .map(str::trim)
        .ok_or_else(|| "missing environment variable name".to_string())?;
    let value_part = parts.next().ok_or_else(|| "missing '=' in assignment".to_string())?;

    if key.is_empty() {
        return Err("environment variable name cannot be empty".to_string());
    }
    if key.chars().any(|c| c.is_whitespace()) {
        return Err(format!("environment variable name contains whitespace: {}", key));
    }

    let value = parse_env_value(value_part)?;
    Ok(Some((key.to_string(), value)))
}

fn parse_env_value(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    if let Some(rest) = trimmed.strip_prefix('"') {
        parse_double_quoted(rest)
    } else if let Some(rest) = trimmed.strip_prefix('\'') {
        parse_single_quoted(rest)
    } else {
        let value = trimmed.splitn(2, '#').next().unwrap_or_default().trim_end();
        Ok(value.to_string())
    }
}

fn parse_double_quoted(input: &str) -> Result<String, String> {
    let mut result = String::new();
    let mut chars = input.chars();
    let mut escape = false;

    while let Some(ch) = chars.next() {
        if escape {
            let value = match ch {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                '\\' => '\\',
                '"' => '"',
                other => other,
            };
            result.push(value);
            escape = false;
            continue;
        }

        match ch {
            '\\' => escape = true,
            '"' => {
                let remainder = chars.as_str().trim();
                if remainder.is_empty() || remainder.starts_with('#') {
                    return Ok(result);
                } else {
                    return Err("unexpected characters after closing double quote".to_string());
                }
            }
            other => result.push(other),
        }
    }

    if escape {
        Err("unterminated escape sequence in double-quoted value".to_string())
    } else {
        Err("unterminated double-quoted value".to_string())
    }
}

fn parse_single_quoted(input: &str) -> Result<String, String> {
    let mut result = String::new();
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        if ch == '\'' {
            let remainder = chars.as_str().trim();
            if remainder.is_empty() || remainder.starts_with('#') {
                return Ok(result);
            } else {
                return Err("unexpected characters after closing single quote".to_string());
            }
        } else {
            result.push(ch);
        }
    }

    Err("unterminated single-quoted value".to_string())
}

fn main() {
    let (cli, loaded_env) = match parse_cli_args(std::env::args_os().skip(1))
        .and_then(|mut cli| configure_env(cli.env_file.take()).map(|env| (cli, env)))
    {
        Ok(v) => v,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "tennis-rankings {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(cli.mode, cli.filters) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
