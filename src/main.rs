//! # `vec`
//!
//! Command-line front end for the toolkit.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vec config show` | Resolve credentials and report where they came from |
//! | `vec config save` | Write a profile to `~/.vec_auth.yaml` (or `--path`) |
//! | `vec config delete` | Remove a profile, keeping the others |
//! | `vec index <corpus> <doc.json>` | Create, update, or skip a document by content hash |
//! | `vec lab name <name>` | Print the lab corpus name and key |
//! | `vec lab create <name>` | Create (replacing) a lab corpus |
//! | `vec chat <corpus>` | Chat over a corpus, one query per stdin line |
//!
//! ## Examples
//!
//! ```bash
//! vec config save --profile lab --customer-id 1234 --api-key zqt_...
//! vec --profile lab index docs ./manual.json
//! USERNAME=david@vectara.com vec lab name filter-attributes --key 101-filter-attr
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use vectara_kit::chat::ChatRequest;
use vectara_kit::config::{
    ClientConfig, ConfigResolver, HomeConfigLoader, PathConfigLoader, DEFAULT_PROFILE,
};
use vectara_kit::factory::Factory;
use vectara_kit::lab::lab_names;
use vectara_kit::logging;
use vectara_kit::models::{CreateCorpusRequest, Document, SearchCorporaParameters};
use vectara_kit::settings::{load_settings, Settings};

#[derive(Parser)]
#[command(
    name = "vec",
    about = "Vectara toolkit: idempotent indexing, lab corpora, chat, and credential profiles",
    version
)]
struct Cli {
    /// Application settings (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Credential profile. Falls back to `VECTARA_PROFILE`, then `default`.
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Credentials file, or a directory containing `.vec_auth.yaml`.
    #[arg(long, global = true)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage credential profiles.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Index a JSON document, skipping it when nothing changed.
    Index {
        corpus_key: String,
        /// JSON file holding one document (`id`, `metadata`, `document_parts`).
        document: PathBuf,
    },

    /// Lab corpus naming and creation.
    Lab {
        #[command(subcommand)]
        action: LabAction,
    },

    /// Chat over a corpus. Reads one query per line from stdin.
    Chat { corpus_key: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show which source the credentials resolve from.
    Show,

    /// Save a profile, replacing it if present.
    Save {
        #[arg(long)]
        customer_id: String,
        #[arg(long, conflicts_with_all = ["client_id", "client_secret"])]
        api_key: Option<String>,
        #[arg(long, requires = "client_secret")]
        client_id: Option<String>,
        #[arg(long, requires = "client_id")]
        client_secret: Option<String>,
    },

    /// Delete a profile.
    Delete,
}

#[derive(Args)]
struct LabArgs {
    name: String,
    /// Corpus key. Derived from the name when omitted.
    #[arg(long)]
    key: Option<String>,
    /// Username for the prefix. Defaults to `USERNAME`.
    #[arg(long)]
    username: Option<String>,
    /// Use the name and key as given.
    #[arg(long)]
    no_prefix: bool,
}

#[derive(Subcommand)]
enum LabAction {
    /// Print the lab corpus name and key.
    Name(LabArgs),
    /// Create the lab corpus, deleting any with the same name.
    Create(LabArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(cli.settings.as_deref())?;
    logging::init_with_settings(&settings.logging);

    match cli.command {
        Commands::Config { action } => run_config(action, cli.profile, cli.path),
        Commands::Lab {
            action: LabAction::Name(args),
        } => {
            let names = lab_names(
                &args.name,
                args.key.as_deref(),
                !args.no_prefix,
                args.username.as_deref(),
            )?;
            println!("name: {}", names.name);
            println!("key: {}", names.key);
            Ok(())
        }
        Commands::Lab {
            action: LabAction::Create(args),
        } => {
            let vectara = factory(&cli.profile, &cli.path, settings).build()?;
            let request = CreateCorpusRequest {
                name: Some(args.name),
                key: args.key,
                ..Default::default()
            };
            let corpus = vectara
                .lab()
                .create_lab_corpus(&request, !args.no_prefix, args.username.as_deref())
                .await?;
            println!("created corpus [{}]", corpus.key);
            Ok(())
        }
        Commands::Index {
            corpus_key,
            document,
        } => {
            let content = std::fs::read_to_string(&document)
                .with_context(|| format!("Failed to read document: {}", document.display()))?;
            let doc: Document = serde_json::from_str(&content)
                .with_context(|| format!("Invalid document JSON: {}", document.display()))?;
            let vectara = factory(&cli.profile, &cli.path, settings).build()?;
            let op = vectara.documents().index_doc(&corpus_key, &doc).await?;
            println!("{} {}", op, doc.id);
            Ok(())
        }
        Commands::Chat { corpus_key } => {
            let vectara = factory(&cli.profile, &cli.path, settings).build()?;
            run_chat(&vectara, &corpus_key).await
        }
    }
}

fn factory(profile: &Option<String>, path: &Option<PathBuf>, settings: Settings) -> Factory {
    let mut factory = Factory::new().settings(settings);
    if let Some(profile) = profile {
        factory = factory.profile(profile);
    }
    if let Some(path) = path {
        factory = factory.config_path(path);
    }
    factory
}

fn run_config(action: ConfigAction, profile: Option<String>, path: Option<PathBuf>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let mut resolver = ConfigResolver::new();
            if let Some(profile) = profile {
                resolver = resolver.profile(profile);
            }
            if let Some(path) = path {
                resolver = resolver.config_path(path);
            }
            let resolved = resolver.resolve()?;
            println!("load_method: {}", resolved.method);
            println!("profile: {}", resolved.profile);
            println!("customer_id: {}", resolved.config.customer_id);
            println!("auth: {}", resolved.config.auth.auth_type());
            Ok(())
        }
        ConfigAction::Save {
            customer_id,
            api_key,
            client_id,
            client_secret,
        } => {
            let config = match (api_key, client_id, client_secret) {
                (Some(key), None, None) => ClientConfig::api_key(customer_id, key),
                (None, Some(id), Some(secret)) => ClientConfig::oauth2(customer_id, id, secret),
                _ => bail!("pass either --api-key or both --client-id and --client-secret"),
            };
            let profile_name = profile.as_deref().unwrap_or(DEFAULT_PROFILE);
            let written_to = match path {
                Some(path) => {
                    let loader = PathConfigLoader::new(&path, Some(profile_name));
                    loader.save(&config)?;
                    loader.file_path().to_path_buf()
                }
                None => {
                    let loader = HomeConfigLoader::new(Some(profile_name))?;
                    loader.save(&config)?;
                    loader.file_path().to_path_buf()
                }
            };
            println!("saved profile [{}] to {}", profile_name, written_to.display());
            Ok(())
        }
        ConfigAction::Delete => {
            let profile_name = profile.as_deref().unwrap_or(DEFAULT_PROFILE);
            let deleted = match path {
                Some(path) => PathConfigLoader::new(&path, Some(profile_name)).delete()?,
                None => HomeConfigLoader::new(Some(profile_name))?.delete()?,
            };
            if deleted {
                println!("deleted profile [{}]", profile_name);
            } else {
                println!("profile [{}] not found", profile_name);
            }
            Ok(())
        }
    }
}

async fn run_chat(vectara: &vectara_kit::factory::Vectara, corpus_key: &str) -> Result<()> {
    let manager = vectara.create_chat_manager();
    let search = SearchCorporaParameters::for_corpus(corpus_key);
    let mut chat_id: Option<String> = None;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        let response = manager
            .chat(
                query,
                chat_id.as_deref(),
                ChatRequest::with_search(search.clone()),
            )
            .await?;
        if response.chat_id.is_some() {
            chat_id = response.chat_id.clone();
        }
        println!("{}", response.answer.unwrap_or_default());
    }

    manager.shutdown().await;
    Ok(())
}
