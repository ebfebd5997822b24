use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reqwest::multipart;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

use inventory_console::api::endpoints::{self, Resource};
use inventory_console::api::{ApiError, CallOptions, Session, SessionStore};
use inventory_console::config::{ConfigError, ConsoleConfig, SessionBackend};

/// Command-line front end for the inventory admin backend.
#[derive(Parser, Debug)]
#[command(name = "inventory-console", version)]
struct Cli {
    /// Backend base URL (overrides INVENTORY_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session store: "file" or "keychain" (overrides INVENTORY_SESSION)
    #[arg(long, global = true)]
    session: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// GET a path and print the decoded body
    Get { path: String },
    /// List a collection (unit, category, product, order, ...)
    List { resource: String },
    /// Create an entity from a JSON document
    Add { resource: String, json: String },
    /// Update an entity; the JSON must carry its `_id`
    Update { entity_type: String, json: String },
    /// Delete an entity by identifier
    Delete { resource: String, id: String },
    /// Send a multipart form (file uploads)
    Upload {
        path: String,
        #[arg(long, default_value = "PUT")]
        method: String,
        /// Text field as name=value
        #[arg(long = "field")]
        fields: Vec<String>,
        /// File field as name=path
        #[arg(long = "file")]
        files: Vec<String>,
    },
    /// Call any endpoint
    Call {
        path: String,
        #[arg(long, default_value = "GET")]
        method: String,
        /// JSON body (ignored for GET)
        #[arg(long)]
        data: Option<String>,
        /// Query parameter as name=value
        #[arg(long = "param")]
        params: Vec<String>,
        /// Extra header as name=value
        #[arg(long = "header")]
        headers: Vec<String>,
    },
    /// Show the currency symbol used for prices
    Currency,
    /// Manage the stored login session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand, Debug)]
enum SessionAction {
    /// Store a token obtained at login
    Set {
        token: String,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    /// Print the stored user id and role
    Show,
    /// Forget the stored session
    Clear,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] inventory_console::api::auth::SessionError),
    #[error("{0}")]
    Input(String),
}

impl CliError {
    /// Text for stderr. Validation failures name the bad input; other API
    /// failures get the normalized message.
    fn user_message(&self) -> String {
        match self {
            CliError::Api(e) if e.is_validation() => e.to_string(),
            CliError::Api(e) => e.user_message().to_string(),
            other => other.to_string(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    env_logger::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match &e {
                CliError::Api(api) => match api.status() {
                    Some(status) => log::error!("{} (HTTP {})", e, status.as_u16()),
                    None => log::error!("{}", e),
                },
                _ => log::error!("{}", e),
            }
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ConsoleConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(session) = cli.session {
        config.session = session.parse::<SessionBackend>()?;
    }

    let command = match cli.command {
        Command::Session { action } => {
            return run_session(config.session_store()?.as_ref(), action);
        }
        command => command,
    };

    let client = config.build_client()?;
    log::info!("Using backend {}", client.base_url());

    let output: Value = match command {
        Command::Get { path } => client.get(&path).await?,
        Command::List { resource } => client.list(resource_named(&resource)?).await?,
        Command::Add { resource, json } => {
            client.create(resource_named(&resource)?, &parse_json(&json)?).await?
        }
        Command::Update { entity_type, json } => {
            client.update(&entity_type, &parse_json(&json)?).await?
        }
        Command::Delete { resource, id } => {
            client.delete_by_id(resource_named(&resource)?, &id).await?
        }
        Command::Upload {
            path,
            method,
            fields,
            files,
        } => {
            let form = build_form(&fields, &files).await?;
            client.multipart_with(&path, form, parse_method(&method)?).await?
        }
        Command::Call {
            path,
            method,
            data,
            params,
            headers,
        } => {
            let mut options = CallOptions::new(parse_method(&method)?);
            if let Some(data) = data {
                options = options.data(parse_json(&data)?);
            }
            for param in &params {
                let (name, value) = split_pair(param)?;
                options = options.param(name, value);
            }
            for header in &headers {
                let (name, value) = split_pair(header)?;
                options = options.header(name, value);
            }
            client.custom_call(&path, options).await?
        }
        Command::Currency => Value::String(client.currency_symbol().await),
        Command::Session { .. } => return Ok(()),
    };

    let pretty = serde_json::to_string_pretty(&output)
        .map_err(|e| CliError::Input(format!("cannot print response: {}", e)))?;
    println!("{}", pretty);
    Ok(())
}

fn run_session(store: &dyn SessionStore, action: SessionAction) -> Result<(), CliError> {
    match action {
        SessionAction::Set {
            token,
            user_id,
            role,
        } => {
            store.store(&Session {
                token: Some(token),
                user_id,
                role,
            })?;
            log::info!("Session stored");
        }
        SessionAction::Show => {
            let session = store.load()?;
            println!(
                "token: {}\nuser: {}\nrole: {}",
                if session.token.is_some() { "set" } else { "none" },
                session.user_id.as_deref().unwrap_or("-"),
                session.role.as_deref().unwrap_or("-"),
            );
        }
        SessionAction::Clear => {
            store.clear()?;
            log::info!("Session cleared");
        }
    }
    Ok(())
}

fn resource_named(name: &str) -> Result<&'static Resource, CliError> {
    endpoints::resource_by_name(name).ok_or_else(|| {
        let known: Vec<&str> = endpoints::RESOURCES.iter().map(|r| r.name).collect();
        CliError::Input(format!(
            "unknown resource {:?} (one of: {})",
            name,
            known.join(", ")
        ))
    })
}

fn parse_json(text: &str) -> Result<Value, CliError> {
    serde_json::from_str(text).map_err(|e| CliError::Input(format!("invalid JSON: {}", e)))
}

fn parse_method(method: &str) -> Result<Method, CliError> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| CliError::Input(format!("invalid HTTP method {:?}", method)))
}

fn split_pair(pair: &str) -> Result<(&str, &str), CliError> {
    pair.split_once('=')
        .ok_or_else(|| CliError::Input(format!("expected name=value, got {:?}", pair)))
}

async fn build_form(fields: &[String], files: &[String]) -> Result<multipart::Form, CliError> {
    let mut form = multipart::Form::new();
    for field in fields {
        let (name, value) = split_pair(field)?;
        form = form.text(name.to_string(), value.to_string());
    }
    for file in files {
        let (name, path) = split_pair(file)?;
        let path = PathBuf::from(path);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CliError::Input(format!("cannot read {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(|e| CliError::Input(format!("bad multipart part: {}", e)))?;
        form = form.part(name.to_string(), part);
    }
    Ok(form)
}
