//! Connectors module
//!
//! Per-service trigger integrations:
//! - The `ServiceAdapter` trait every service implements
//! - Service metadata and the registry used for lookup by `ServiceKind`
//! - One adapter per supported service

pub mod discord;
pub mod github;
pub mod gmail;
pub mod jira;
pub mod metadata;
pub mod microsoft;
pub mod registry;
pub mod trait_;
pub mod twitch;

pub use metadata::ServiceMetadata;
pub use registry::{Registry, RegistryError};
pub use trait_::ServiceAdapter;

pub use discord::{DiscordAdapter, register_discord_adapter};
pub use github::{GithubAdapter, register_github_adapter};
pub use gmail::{GmailAdapter, register_gmail_adapter};
pub use jira::{JiraAdapter, register_jira_adapter};
pub use microsoft::{MicrosoftAdapter, register_microsoft_adapter};
pub use twitch::{TwitchAdapter, register_twitch_adapter};
