//! OAuth2 user credentials for the Drive API.
//!
//! `ct_gdrive` only ever reads stored credentials and refreshes the access
//! token. Obtaining a refresh token in the first place is the job of the
//! interactive `ct_gdrive_oauth2` helper, built on [`OAuthFlow`].

use crate::utils::error::{CopytoolError, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use url::Url;

/// On-disk credentials filename inside `--creds-dir`.
pub const OAUTH2_STORAGE_CREDS_FILENAME: &str = "ct_gdrive_creds.json";

/// Per-file access to files created or opened by the application.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

pub const APPLICATION_NAME: &str = "ct_gdrive";

/// Redirect for installed applications without a local web server: the
/// consent page displays the code for the operator to paste back.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Access tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_expiry: Option<DateTime<Utc>>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub invalid: bool,
}

impl Credentials {
    /// True when there is no usable access token at `now`.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.token_expiry) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(_), Some(expiry)) => expiry - ChronoDuration::seconds(EXPIRY_MARGIN_SECS) <= now,
        }
    }

    fn apply_token_response(&mut self, token: TokenResponse, now: DateTime<Utc>) {
        self.access_token = Some(token.access_token);
        self.token_expiry = token
            .expires_in
            .map(|secs| now + ChronoDuration::seconds(secs));
        if let Some(refresh_token) = token.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        if let Some(scope) = token.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

async fn request_token(client: &Client, token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
    let response = client.post(token_uri).form(form).send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<TokenResponse>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<TokenErrorResponse>(&body) {
        Ok(err) if err.error == "invalid_grant" || err.error == "invalid_client" => {
            Err(CopytoolError::unauthorized(format!(
                "{}: {}",
                err.error,
                err.error_description.unwrap_or_default()
            )))
        }
        Ok(err) => Err(CopytoolError::api(
            status.as_u16(),
            format!("{} {}", err.error, err.error_description.unwrap_or_default())
                .trim_end()
                .to_string(),
        )),
        Err(_) => Err(CopytoolError::api(status.as_u16(), body)),
    }
}

/// Credentials file inside a credentials directory.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new<P: AsRef<Path>>(creds_dir: P) -> Self {
        Self {
            path: creds_dir.as_ref().join(OAUTH2_STORAGE_CREDS_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads stored credentials. Never starts an OAuth2 flow.
    pub async fn load(&self) -> Result<Credentials> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CopytoolError::unauthorized(format!(
                    "no credentials stored at {}",
                    self.path.display()
                )));
            }
            Err(e) => return Err(CopytoolError::IoError(e)),
        };

        let credentials: Credentials = serde_json::from_str(&content).map_err(|e| {
            CopytoolError::unauthorized(format!("unreadable credentials {}: {}", self.path.display(), e))
        })?;

        if credentials.invalid {
            return Err(CopytoolError::unauthorized("stored credentials are marked invalid"));
        }
        if credentials.refresh_token.is_none() && credentials.access_token.is_none() {
            return Err(CopytoolError::unauthorized("stored credentials hold no token"));
        }
        Ok(credentials)
    }

    /// Writes through a temporary file and a rename so concurrent copytools
    /// never read a partially written file.
    pub async fn save(&self, credentials: &Credentials) -> Result<()> {
        let data = serde_json::to_vec_pretty(credentials)?;
        let tmp = self.path.with_extension(format!("json.{}.tmp", std::process::id()));
        tokio::fs::write(&tmp, &data).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Hands out valid access tokens, refreshing and persisting them as needed.
pub struct TokenProvider {
    store: CredentialStore,
    client: Client,
    credentials: Mutex<Credentials>,
}

impl TokenProvider {
    pub fn new(store: CredentialStore, client: Client, credentials: Credentials) -> Self {
        Self {
            store,
            client,
            credentials: Mutex::new(credentials),
        }
    }

    pub async fn from_store(store: CredentialStore, client: Client) -> Result<Self> {
        let credentials = store.load().await?;
        Ok(Self::new(store, client, credentials))
    }

    pub async fn access_token(&self) -> Result<String> {
        let mut credentials = self.credentials.lock().await;
        if credentials.needs_refresh(Utc::now()) {
            self.refresh(&mut credentials).await?;
        }
        credentials
            .access_token
            .clone()
            .ok_or_else(|| CopytoolError::unauthorized("no access token after refresh"))
    }

    /// Drops the cached access token after Drive rejected it.
    pub async fn expire_access_token(&self) {
        let mut credentials = self.credentials.lock().await;
        credentials.access_token = None;
    }

    async fn refresh(&self, credentials: &mut Credentials) -> Result<()> {
        let refresh_token = credentials
            .refresh_token
            .clone()
            .ok_or_else(|| CopytoolError::unauthorized("access token expired and no refresh token stored"))?;

        tracing::debug!("refreshing access token at {}", credentials.token_uri);
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];

        match request_token(&self.client, &credentials.token_uri, &form).await {
            Ok(token) => {
                credentials.apply_token_response(token, Utc::now());
                if let Err(e) = self.store.save(credentials).await {
                    // the fresh token is still usable for this run
                    tracing::warn!("failed to store refreshed credentials: {}", e);
                }
                Ok(())
            }
            Err(err @ CopytoolError::Unauthorized { .. }) => {
                credentials.invalid = true;
                if let Err(e) = self.store.save(credentials).await {
                    tracing::warn!("failed to mark credentials invalid: {}", e);
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

/// `installed` or `web` section of a Google client secret file.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecretInfo {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretInfo>,
    web: Option<ClientSecretInfo>,
}

impl ClientSecretInfo {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(content)?;
        file.installed
            .or(file.web)
            .ok_or_else(|| CopytoolError::ConfigValidationError {
                field: "client_secret".to_string(),
                message: "expected an \"installed\" or \"web\" client section".to_string(),
            })
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&content)
    }
}

/// Interactive authorization-code flow for installed applications.
pub struct OAuthFlow {
    secret: ClientSecretInfo,
    scope: String,
    client: Client,
}

impl OAuthFlow {
    pub fn new(secret: ClientSecretInfo, client: Client) -> Self {
        Self {
            secret,
            scope: DRIVE_FILE_SCOPE.to_string(),
            client,
        }
    }

    pub fn authorize_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.secret.auth_uri).map_err(|e| CopytoolError::InvalidConfigValueError {
            field: "client_secret.auth_uri".to_string(),
            value: self.secret.auth_uri.clone(),
            reason: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.secret.client_id)
            .append_pair("redirect_uri", OOB_REDIRECT_URI)
            .append_pair("scope", &self.scope)
            .append_pair("response_type", "code")
            .append_pair("access_type", "offline");
        Ok(url)
    }

    /// Trades the code shown on the consent page for stored credentials.
    pub async fn exchange_code(&self, code: &str) -> Result<Credentials> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code.trim()),
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("redirect_uri", OOB_REDIRECT_URI),
        ];
        let token = request_token(&self.client, &self.secret.token_uri, &form).await?;

        let mut credentials = Credentials {
            client_id: self.secret.client_id.clone(),
            client_secret: self.secret.client_secret.clone(),
            refresh_token: None,
            access_token: None,
            token_expiry: None,
            token_uri: self.secret.token_uri.clone(),
            scopes: vec![self.scope.clone()],
            user_agent: Some(APPLICATION_NAME.to_string()),
            invalid: false,
        };
        credentials.apply_token_response(token, Utc::now());

        if credentials.refresh_token.is_none() {
            tracing::warn!("authorization server returned no refresh token");
        }
        Ok(credentials)
    }
}
