use crate::domain::model::{HsmAction, LustreFid};
use crate::utils::error::Result;
use crate::utils::logger::LOGGING_LEVELS;
use crate::utils::validation::{validate_non_empty_string, validate_one_of, validate_path, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

/// Options of `ct_gdrive`, normally written once in the `[commands]`
/// section of lhsm_cmd.conf with `{fd}` and `{fid}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "ct_gdrive")]
#[command(about = "Google Drive copytool companion for the lhsmtool_cmd Lustre/HSM agent")]
pub struct CliConfig {
    #[arg(long, value_enum)]
    pub action: HsmAction,

    /// File descriptor of the Lustre file, opened by lhsmtool_cmd
    #[arg(long, allow_hyphen_values = true)]
    pub fd: i32,

    /// Lustre FID, with or without brackets
    #[arg(long)]
    pub fid: String,

    /// Lustre mount point
    #[arg(long)]
    pub lustre_root: String,

    /// Google Drive folder ID holding archived files
    #[arg(long)]
    pub gdrive_root: String,

    /// Directory holding ct_gdrive_creds.json
    #[arg(long)]
    pub creds_dir: String,

    #[arg(long, default_value = "ERROR", help = "DEBUG, INFO, WARNING, ERROR or CRITICAL")]
    pub logging_level: String,

    /// Optional TOML file with Drive endpoint and retry tuning
    #[arg(long)]
    pub config: Option<String>,
}

impl CliConfig {
    pub fn lustre_fid(&self) -> Result<LustreFid> {
        LustreFid::parse(&self.fid)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("lustre_root", &self.lustre_root)?;
        validate_non_empty_string("gdrive_root", &self.gdrive_root)?;
        validate_path("creds_dir", &self.creds_dir)?;
        validate_one_of("logging_level", &self.logging_level, &LOGGING_LEVELS)?;
        if let Some(config) = &self.config {
            validate_path("config", config)?;
        }
        Ok(())
    }
}

/// Options of `ct_gdrive_oauth2`, the one-time credentials bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "ct_gdrive_oauth2")]
#[command(about = "Perform the OAuth2 flow and store credentials for ct_gdrive")]
pub struct OAuthCliConfig {
    /// Client secret JSON downloaded from the Google API console
    #[arg(long)]
    pub client_secret: String,

    #[arg(long)]
    pub creds_dir: String,

    #[arg(long, default_value = "ERROR", help = "DEBUG, INFO, WARNING, ERROR or CRITICAL")]
    pub logging_level: String,
}

impl Validate for OAuthCliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("client_secret", &self.client_secret)?;
        validate_path("creds_dir", &self.creds_dir)?;
        validate_one_of("logging_level", &self.logging_level, &LOGGING_LEVELS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive_args(fid: &str) -> Vec<String> {
        [
            "ct_gdrive",
            "--action",
            "push",
            "--fd",
            "7",
            "--fid",
            fid,
            "--lustre-root",
            "/lustre",
            "--gdrive-root",
            "0B1abcROOT",
            "--creds-dir",
            "/etc/ct_gdrive",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_parse_lhsm_cmd_archive_line() {
        let config = CliConfig::try_parse_from(archive_args("[0x200000400:0x1:0x0]")).unwrap();
        assert_eq!(config.action, HsmAction::Push);
        assert_eq!(config.fd, 7);
        assert_eq!(config.logging_level, "ERROR");
        assert!(config.validate().is_ok());
        assert_eq!(config.lustre_fid().unwrap().as_str(), "0x200000400:0x1:0x0");
    }

    #[test]
    fn test_missing_required_option() {
        let mut args = archive_args("0x1:0x2:0x0");
        args.truncate(args.len() - 2);
        assert!(CliConfig::try_parse_from(args).is_err());
    }

    #[test]
    fn test_unknown_action_rejected() {
        let mut args = archive_args("0x1:0x2:0x0");
        args[2] = "copy".to_string();
        assert!(CliConfig::try_parse_from(args).is_err());
    }

    #[test]
    fn test_invalid_logging_level() {
        let mut args = archive_args("0x1:0x2:0x0");
        args.extend(["--logging-level".to_string(), "LOUD".to_string()]);
        let config = CliConfig::try_parse_from(args).unwrap();
        assert!(config.validate().is_err());
    }
}
