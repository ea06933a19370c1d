use anyhow::{bail, Context, Result};
use clap::Parser;
use ct_gdrive::config::cli::OAuthCliConfig;
use ct_gdrive::core::oauth::{ClientSecretInfo, CredentialStore, OAuthFlow};
use ct_gdrive::utils::{logger, validation::Validate};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

async fn read_verification_code() -> Result<String> {
    print!("Enter verification code: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    let code = line.trim().to_string();
    if code.is_empty() {
        bail!("no verification code entered");
    }
    Ok(code)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = OAuthCliConfig::parse();
    logger::init_cli_logger(&config.logging_level);
    config.validate()?;

    let store = CredentialStore::new(&config.creds_dir);
    match store.load().await {
        Ok(_) => {
            println!("Valid credentials already stored in {}", store.path().display());
            return Ok(());
        }
        Err(e) => tracing::info!("starting OAuth2 flow: {}", e),
    }

    let secret = ClientSecretInfo::from_file(&config.client_secret)
        .await
        .with_context(|| format!("reading client secret {}", config.client_secret))?;
    let flow = OAuthFlow::new(secret, reqwest::Client::new());

    println!("Go to the following link in your browser:");
    println!();
    println!("    {}", flow.authorize_url()?);
    println!();

    let code = read_verification_code().await?;
    let credentials = flow
        .exchange_code(&code)
        .await
        .context("exchanging verification code")?;

    tokio::fs::create_dir_all(&config.creds_dir)
        .await
        .with_context(|| format!("creating {}", config.creds_dir))?;
    store.save(&credentials).await?;
    println!("Storing credentials to {}", store.path().display());
    Ok(())
}
