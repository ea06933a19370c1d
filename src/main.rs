use clap::Parser;
use ct_gdrive::utils::{logger, validation::Validate};
use ct_gdrive::{
    ActionOutcome, CliConfig, Copytool, CopytoolError, CredentialStore, DriveClient, ShellDescriber,
    TokenProvider, TomlConfig,
};

async fn run(config: &CliConfig) -> Result<ActionOutcome, CopytoolError> {
    // clean Lustre FID (no braces)
    let fid = config.lustre_fid()?;

    let tuning = match &config.config {
        Some(path) => TomlConfig::from_file(path)?,
        None => TomlConfig::default(),
    };
    tuning.validate()?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("ct_gdrive/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let tokens = TokenProvider::from_store(CredentialStore::new(&config.creds_dir), http.clone()).await?;
    let drive = DriveClient::new(http, tokens, tuning.drive_settings(), tuning.backoff_policy());
    let copytool = Copytool::new(drive, ShellDescriber::new(&config.lustre_root), config.gdrive_root.clone());

    copytool.run(config.action, &fid, config.fd).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌 (stderr, collected by lhsmtool_cmd)
    logger::init_cli_logger(&config.logging_level);
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        std::process::exit(e.exit_code());
    }

    match run(&config).await {
        Ok(ActionOutcome::Archived(file)) => {
            tracing::info!("{} {} archived as drive file {}", config.action, config.fid, file.id);
        }
        Ok(ActionOutcome::Restored { drive_id, bytes }) => {
            tracing::info!(
                "{} {} restored from drive file {} ({} bytes)",
                config.action,
                config.fid,
                drive_id,
                bytes
            );
        }
        Err(e) => {
            tracing::error!(
                "{} {} failed: {} (Category: {:?}, Severity: {:?})",
                config.action,
                config.fid,
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("ct_gdrive: {}", e.user_friendly_message());

            // 根據錯誤嚴重程度決定退出碼
            std::process::exit(e.exit_code());
        }
    }
}
