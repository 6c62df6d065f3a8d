//! # vectara-kit
//!
//! Client-side building blocks for the Vectara RAG API.
//!
//! - **Idempotent indexing**: documents carry a SHA-256 of their own content,
//!   so re-indexing an unchanged document is a no-op and a changed one is
//!   replaced.
//! - **Chat continuity**: the parameters a chat was started with are cached
//!   per `chat_id` for later turns, and expire in the background.
//! - **Layered credentials**: explicit values, environment variables, or
//!   named profiles in `~/.vec_auth.yaml`, first match wins.
//! - **Lab corpora**: username-prefixed names for throwaway corpora.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐    ┌─────────┐    ┌──────────────────────────────────┐
//! │ ConfigResolver │──▶ │ Factory │──▶ │ Vectara                          │
//! │ typed/dict/env │    └─────────┘    │  DocumentManager  CorpusManager  │
//! │ path/home      │                   │  LabHelper  ChatSessionManager   │
//! └────────────────┘                   └───────────────┬──────────────────┘
//!                                                      ▼
//!                                          VectaraClient (reqwest, /v2)
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`hash`] | Chunked SHA-256 content fingerprint |
//! | [`models`] | Documents, corpora, search / generation / chat parameters |
//! | [`error`] | `ConfigError` and the crate-wide `Error` |
//! | [`traits`] | `DocumentStore`, `CorpusStore`, `ChatTransport` |
//! | [`memory`] | In-memory `DocumentStore` |
//! | [`document`] | Create / update / skip decisions for documents |
//! | [`session`] | Expiring chat session cache with a background reaper |
//! | [`chat`] | Chat wrapper that replays cached session parameters |
//! | [`config`] | Credential types, loaders, and the resolution chain |
//! | [`settings`] | TOML application settings |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`corpus`] | Exact-name corpus lookup, replace, and delete |
//! | [`lab`] | Lab corpus naming and creation |
//! | [`client`] | REST client implementing the collaborator traits |
//! | [`factory`] | Builds a configured client with its managers |

pub mod chat;
pub mod client;
pub mod config;
pub mod corpus;
pub mod document;
pub mod error;
pub mod factory;
pub mod hash;
pub mod lab;
pub mod logging;
pub mod memory;
pub mod models;
pub mod session;
pub mod settings;
pub mod traits;
