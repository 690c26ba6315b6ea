//! ObjectIO auth control - inspect and exercise authentication strategies
//!
//! Loads the same TOML the gateway uses, builds the strategy registry and
//! either prints it or runs a single request through it.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use objectio_authn::config::load_settings;
use objectio_authn::{AccessKey, Applier, AuthConfig, AuthRequest, StrategyRegistry, UserStore};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "objectio-authctl")]
#[command(about = "ObjectIO authentication strategy tool")]
#[command(version)]
struct Args {
    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a configuration and print the strategy of every front-end
    Check {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Authenticate one request against the configured strategies
    Authenticate {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Front-end to use instead of routing by path and headers
        #[arg(long)]
        frontend: Option<String>,

        #[arg(long, default_value = "GET")]
        method: String,

        #[arg(long, default_value = "/")]
        path: String,

        /// Request header as `name:value`, repeatable
        #[arg(long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,

        /// Raw query string
        #[arg(long)]
        query: Option<String>,

        /// POST upload form field as `name=value`, repeatable
        #[arg(long = "form", value_name = "NAME=VALUE")]
        form: Vec<String>,
    },
}

/// Users seeded into the in-memory store
#[derive(Debug, Deserialize)]
struct SeedConfig {
    #[serde(default)]
    users: Vec<SeedUser>,
    #[serde(default = "default_token_ttl")]
    token_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    name: String,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    #[serde(default)]
    tokens: Vec<String>,
}

fn default_token_ttl() -> u64 {
    3600
}

fn seed_store(path: &Path) -> Result<Arc<UserStore>> {
    let seed: SeedConfig = load_settings(path)?;
    let store = Arc::new(UserStore::new());
    let ttl = Duration::from_secs(seed.token_ttl_secs);

    for entry in seed.users {
        let user = store.create_user(&entry.name)?;
        match (entry.access_key_id, entry.secret_access_key) {
            (Some(id), Some(secret)) => {
                store.import_access_key(AccessKey::with_secret(id, secret, &user.user_id))?;
            }
            (None, None) => {}
            _ => bail!(
                "user {} needs both access_key_id and secret_access_key",
                entry.name
            ),
        }
        for token in &entry.tokens {
            store.import_token(token, &user.user_id, ttl)?;
        }
        info!("Seeded user {} ({})", entry.name, user.user_id);
    }
    Ok(store)
}

fn parse_headers(raw: &[String]) -> Result<http::HeaderMap> {
    let mut headers = http::HeaderMap::new();
    for entry in raw {
        let (name, value) = entry
            .split_once(':')
            .with_context(|| format!("header must be NAME:VALUE: {entry}"))?;
        headers.append(
            http::HeaderName::from_bytes(name.trim().as_bytes())?,
            http::HeaderValue::from_str(value.trim())?,
        );
    }
    Ok(headers)
}

fn parse_form(raw: &[String]) -> Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("form field must be NAME=VALUE: {entry}"))
        })
        .collect()
}

fn check(config_path: &Path) -> Result<()> {
    let config = AuthConfig::load(config_path)?;
    let store = Arc::new(UserStore::new());
    let registry = StrategyRegistry::new(&config, store.backends())?;
    let snapshot = registry.snapshot();

    println!("Authentication strategies (generation {})", snapshot.generation());
    println!("{}", "=".repeat(40));
    println!("Max clock skew: {}s", config.max_clock_skew_secs);
    println!("Swift prefix:   {}", config.swift_prefix);
    println!();
    println!("{:<16} ENGINES", "FRONT-END");
    println!("{}", "-".repeat(60));
    for frontend in snapshot.frontends() {
        if let Some(strategy) = snapshot.get(frontend) {
            println!("{:<16} {}", frontend, strategy.engine_names().join(" -> "));
        }
    }
    Ok(())
}

async fn authenticate(
    config_path: &Path,
    frontend: Option<&str>,
    method: &str,
    path: &str,
    headers: &[String],
    query: Option<&str>,
    form: &[String],
) -> Result<()> {
    let config = AuthConfig::load(config_path)?;
    let store = seed_store(config_path)?;
    let registry = Arc::new(StrategyRegistry::new(&config, store.backends())?);
    let applier = Applier::from_config(registry.clone(), &config);

    let headers = parse_headers(headers)?;
    let form = parse_form(form)?;
    let mut request = AuthRequest::new(method, path, &headers);
    if let Some(query) = query {
        request = request.with_query(query);
    }
    if !form.is_empty() {
        request = request.with_form(&form);
    }

    let frontend = frontend.unwrap_or_else(|| applier.select_frontend(&request));
    match registry.authenticate(frontend, &request).await {
        Ok(identity) => {
            println!("Front-end: {frontend}");
            println!("{}", serde_json::to_string_pretty(&identity)?);
            Ok(())
        }
        Err(e) => bail!(
            "{} rejected on {}: {} ({})",
            method,
            frontend,
            e.reason(),
            e.status_code()
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match args.command {
        Commands::Check { config } => check(&config),
        Commands::Authenticate {
            config,
            frontend,
            method,
            path,
            headers,
            query,
            form,
        } => {
            authenticate(
                &config,
                frontend.as_deref(),
                &method,
                &path,
                &headers,
                query.as_deref(),
                &form,
            )
            .await
        }
    }
}
