pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::OAuthCliConfig, CliConfig};

pub use config::toml_config::TomlConfig;
pub use core::{
    backoff::BackoffPolicy,
    copytool::{ActionOutcome, Copytool},
    drive::{DriveClient, DriveSettings},
    lustre::ShellDescriber,
    oauth::{CredentialStore, TokenProvider},
};
pub use domain::model::{HsmAction, LustreFid};
pub use utils::error::{CopytoolError, Result};
