//! Google Drive v3 REST client limited to what the copytool needs.

use crate::core::backoff::BackoffPolicy;
use crate::core::oauth::TokenProvider;
use crate::domain::model::{DriveFile, FileList, FileMetadata, OCTET_STREAM};
use crate::domain::ports::DriveApi;
use crate::utils::error::{CopytoolError, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_RANGE, LOCATION, RANGE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Status Drive uses for "Resume Incomplete" on resumable uploads.
const RESUME_INCOMPLETE: u16 = 308;

#[derive(Debug, Clone, PartialEq)]
pub struct DriveSettings {
    pub api_base: String,
    pub upload_base: String,
    pub chunk_size: usize,
    pub request_timeout: Duration,
}

impl Default for DriveSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_API_BASE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

async fn api_error(response: Response) -> CopytoolError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => CopytoolError::api(envelope.error.code.unwrap_or(status), envelope.error.message),
        Err(_) => CopytoolError::api(status, body),
    }
}

async fn check(response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(api_error(response).await)
    }
}

/// `Content-Range` for a chunk of `len` bytes at `offset`. The total is only
/// announced once the end of the stream has been reached.
pub fn upload_content_range(offset: u64, len: usize, last: bool) -> String {
    let total = if last {
        (offset + len as u64).to_string()
    } else {
        "*".to_string()
    };
    if len == 0 {
        format!("bytes */{}", total)
    } else {
        format!("bytes {}-{}/{}", offset, offset + len as u64 - 1, total)
    }
}

/// Next byte offset the server expects, from a `Range: bytes=0-N` header.
fn committed_offset(response: &Response) -> Result<u64> {
    let Some(value) = response.headers().get(RANGE) else {
        return Ok(0);
    };
    let text = value
        .to_str()
        .map_err(|_| CopytoolError::upload("non-ASCII Range header"))?;
    text.rsplit('-')
        .next()
        .and_then(|end| end.trim().parse::<u64>().ok())
        .map(|end| end + 1)
        .ok_or_else(|| CopytoolError::upload(format!("unexpected Range header: {}", text)))
}

/// Total size from a `Content-Range: bytes a-b/total` response header.
fn content_range_total(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_RANGE)?
        .to_str()
        .ok()?
        .rsplit('/')
        .next()?
        .parse()
        .ok()
}

/// Reads until `buf` is full or the stream ends.
async fn read_chunk(media: &mut (dyn AsyncRead + Unpin + Send), buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = media.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

enum ChunkOutcome {
    /// 308: the session holds this many bytes and waits for the rest.
    Incomplete(u64),
    Complete(DriveFile),
}

pub struct DriveClient {
    client: Client,
    tokens: TokenProvider,
    settings: DriveSettings,
    backoff: BackoffPolicy,
}

impl DriveClient {
    pub fn new(client: Client, tokens: TokenProvider, settings: DriveSettings, backoff: BackoffPolicy) -> Self {
        Self {
            client,
            tokens,
            settings,
            backoff,
        }
    }

    /// Sends a request with a bearer token. A 401 means the cached token was
    /// revoked or expired early: it is dropped and the request sent once more.
    async fn authorized<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&str) -> RequestBuilder + Send + Sync,
    {
        let token = self.tokens.access_token().await?;
        let response = build(token.as_str())
            .timeout(self.settings.request_timeout)
            .send()
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::info!("access token rejected, refreshing");
        self.tokens.expire_access_token().await;
        let token = self.tokens.access_token().await?;
        Ok(build(token.as_str())
            .timeout(self.settings.request_timeout)
            .send()
            .await?)
    }

    async fn start_upload_session(
        &self,
        operation: &str,
        method: Method,
        url: &str,
        metadata: &FileMetadata,
    ) -> Result<String> {
        self.backoff
            .retry(operation, || async {
                let response = self
                    .authorized(|token| {
                        self.client
                            .request(method.clone(), url)
                            .bearer_auth(token)
                            .query(&[("uploadType", "resumable")])
                            .header("X-Upload-Content-Type", OCTET_STREAM)
                            .json(metadata)
                    })
                    .await?;
                let response = check(response).await?;
                response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
                    .ok_or_else(|| CopytoolError::upload("resumable session without Location header"))
            })
            .await
    }

    async fn interpret_chunk_response(response: Response) -> Result<ChunkOutcome> {
        if response.status().as_u16() == RESUME_INCOMPLETE {
            return Ok(ChunkOutcome::Incomplete(committed_offset(&response)?));
        }
        let response = check(response).await?;
        Ok(ChunkOutcome::Complete(response.json::<DriveFile>().await?))
    }

    /// Asks the session how many bytes it holds, used before resending a chunk.
    async fn query_upload_status(&self, session: &str, total: Option<u64>) -> Result<(u64, Option<DriveFile>)> {
        let range = match total {
            Some(total) => format!("bytes */{}", total),
            None => "bytes */*".to_string(),
        };
        let response = self
            .authorized(|token| {
                self.client
                    .put(session)
                    .bearer_auth(token)
                    .header(CONTENT_RANGE, range.as_str())
                    .body(Vec::new())
            })
            .await?;
        if response.status().as_u16() == RESUME_INCOMPLETE {
            return Ok((committed_offset(&response)?, None));
        }
        let response = check(response).await?;
        Ok((0, Some(response.json::<DriveFile>().await?)))
    }

    async fn send_chunk(
        &self,
        session: &str,
        offset: u64,
        chunk: &[u8],
        last: bool,
        resume: bool,
    ) -> Result<ChunkOutcome> {
        let mut skip = 0usize;
        if resume {
            let total = last.then(|| offset + chunk.len() as u64);
            let (committed, done) = self.query_upload_status(session, total).await?;
            if let Some(file) = done {
                return Ok(ChunkOutcome::Complete(file));
            }
            if committed < offset {
                return Err(CopytoolError::upload(format!(
                    "server lost data: committed {} bytes, chunk starts at {}",
                    committed, offset
                )));
            }
            skip = usize::try_from(committed - offset)
                .unwrap_or(chunk.len())
                .min(chunk.len());
            if skip == chunk.len() && !last {
                return Ok(ChunkOutcome::Incomplete(committed));
            }
        }

        let body = &chunk[skip..];
        let range = upload_content_range(offset + skip as u64, body.len(), last);
        tracing::debug!("uploading {}", range);
        let response = self
            .authorized(|token| {
                self.client
                    .put(session)
                    .bearer_auth(token)
                    .header(CONTENT_RANGE, range.as_str())
                    .body(body.to_vec())
            })
            .await?;
        Self::interpret_chunk_response(response).await
    }

    /// Streams `media` into the session. The server may commit less than a
    /// whole chunk; the uncommitted tail stays at the front of the buffer and
    /// the next request starts at the committed offset.
    async fn upload_media(&self, session: &str, media: &mut (dyn AsyncRead + Unpin + Send)) -> Result<DriveFile> {
        let chunk_size = self.settings.chunk_size;
        let mut buf = vec![0u8; chunk_size];
        let mut offset: u64 = 0;
        let mut filled = 0usize;
        let mut eof = false;

        loop {
            if !eof {
                filled += read_chunk(media, &mut buf[filled..]).await?;
                eof = filled < chunk_size;
            }
            let last = eof;
            let chunk = &buf[..filled];
            let end = offset + filled as u64;
            let resending = AtomicBool::new(false);

            let outcome = self
                .backoff
                .retry("drive_push_upload_chunk", || async {
                    let resume = resending.swap(true, Ordering::SeqCst);
                    self.send_chunk(session, offset, chunk, last, resume).await
                })
                .await?;

            let committed = match outcome {
                ChunkOutcome::Complete(file) => {
                    tracing::debug!("upload complete: {} bytes", end);
                    return Ok(file);
                }
                ChunkOutcome::Incomplete(committed) => committed,
            };

            if last && committed == end {
                return Err(CopytoolError::upload(format!(
                    "server expects more data after final chunk at {} bytes",
                    end
                )));
            }
            if committed < offset || committed > end {
                return Err(CopytoolError::upload(format!(
                    "server committed {} bytes, outside of chunk {}-{}",
                    committed, offset, end
                )));
            }
            if committed == offset {
                return Err(CopytoolError::upload(format!(
                    "upload session accepted no data at offset {}",
                    offset
                )));
            }

            let consumed = (committed - offset) as usize;
            if consumed < filled {
                tracing::warn!(
                    "server committed {} of {} bytes, resending from offset {}",
                    consumed,
                    filled,
                    committed
                );
            }
            buf.copy_within(consumed..filled, 0);
            filled -= consumed;
            offset = committed;
        }
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn list_files(&self, query: &str) -> Result<Vec<DriveFile>> {
        let url = format!("{}/drive/v3/files", self.settings.api_base);
        self.backoff
            .retry("drive_list_files", || async {
                let response = self
                    .authorized(|token| {
                        self.client
                            .get(&url)
                            .bearer_auth(token)
                            .query(&[("q", query), ("fields", "files(id,name)")])
                    })
                    .await?;
                let response = check(response).await?;
                Ok(response.json::<FileList>().await?.files)
            })
            .await
    }

    async fn create_file(
        &self,
        metadata: &FileMetadata,
        media: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<DriveFile> {
        let url = format!("{}/upload/drive/v3/files", self.settings.upload_base);
        let session = self
            .start_upload_session("drive_push_create_media", Method::POST, &url, metadata)
            .await?;
        self.upload_media(&session, media).await
    }

    async fn update_file(
        &self,
        file_id: &str,
        metadata: &FileMetadata,
        media: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<DriveFile> {
        let url = format!("{}/upload/drive/v3/files/{}", self.settings.upload_base, file_id);
        let session = self
            .start_upload_session("drive_push_upload_media", Method::PATCH, &url, metadata)
            .await?;
        self.upload_media(&session, media).await
    }

    async fn download_file(&self, file_id: &str, sink: &mut (dyn AsyncWrite + Unpin + Send)) -> Result<u64> {
        let url = format!("{}/drive/v3/files/{}", self.settings.api_base, file_id);
        let chunk_size = self.settings.chunk_size as u64;
        let mut offset: u64 = 0;

        loop {
            let end = offset + chunk_size - 1;
            let fetched = self
                .backoff
                .retry("drive_pull_media", || async {
                    let response = self
                        .authorized(|token| {
                            self.client
                                .get(&url)
                                .bearer_auth(token)
                                .query(&[("alt", "media")])
                                .header(RANGE, format!("bytes={}-{}", offset, end))
                        })
                        .await?;
                    if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
                        return Ok(None);
                    }
                    let response = check(response).await?;
                    let whole = response.status() == StatusCode::OK;
                    let total = content_range_total(&response);
                    let body = response.bytes().await?;
                    Ok(Some((body, total, whole)))
                })
                .await?;

            let Some((body, total, whole)) = fetched else {
                break;
            };

            sink.write_all(&body).await?;
            offset += body.len() as u64;

            if let Some(total) = total.filter(|t| *t > 0) {
                tracing::debug!("Download {}%", offset * 100 / total);
            }

            // a 200 means the range was ignored and the whole file was sent
            if whole || (body.len() as u64) < chunk_size || total.is_some_and(|t| offset >= t) {
                break;
            }
        }

        sink.flush().await?;
        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::oauth::{CredentialStore, Credentials};
    use httpmock::prelude::*;
    use tempfile::TempDir;

    const CHUNK: usize = 256 * 1024;

    fn client_for(server: &MockServer, dir: &TempDir) -> DriveClient {
        let credentials = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: None,
            access_token: Some("test-token".to_string()),
            token_expiry: None,
            token_uri: server.url("/token"),
            scopes: vec![],
            user_agent: None,
            invalid: false,
        };
        let http = Client::new();
        let tokens = TokenProvider::new(CredentialStore::new(dir.path()), http.clone(), credentials);
        let settings = DriveSettings {
            api_base: server.base_url(),
            upload_base: server.base_url(),
            chunk_size: CHUNK,
            request_timeout: Duration::from_secs(10),
        };
        let backoff = BackoffPolicy {
            base: Duration::from_millis(1),
            jitter: Duration::ZERO,
            max_sleep: Duration::from_millis(4),
        };
        DriveClient::new(http, tokens, settings, backoff)
    }

    #[test]
    fn test_upload_content_range() {
        assert_eq!(upload_content_range(0, 10, false), "bytes 0-9/*");
        assert_eq!(upload_content_range(0, 10, true), "bytes 0-9/10");
        assert_eq!(upload_content_range(262144, 5, true), "bytes 262144-262148/262149");
        assert_eq!(upload_content_range(524288, 0, true), "bytes */524288");
        assert_eq!(upload_content_range(0, 0, true), "bytes */0");
    }

    #[tokio::test]
    async fn test_list_files_sends_query_and_token() {
        let server = MockServer::start();
        let dir = TempDir::new().unwrap();
        let list_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/drive/v3/files")
                .query_param("q", "'root' in parents and name = '0x1:0x2:0x0' and trashed = false")
                .query_param("fields", "files(id,name)")
                .header("authorization", "Bearer test-token");
            then.status(200).json_body(serde_json::json!({
                "files": [{"id": "drive-1", "name": "0x1:0x2:0x0"}]
            }));
        });

        let drive = client_for(&server, &dir);
        let files = drive
            .list_files("'root' in parents and name = '0x1:0x2:0x0' and trashed = false")
            .await
            .unwrap();

        list_mock.assert();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, "drive-1");
    }

    #[tokio::test]
    async fn test_list_files_fatal_error_not_retried() {
        let server = MockServer::start();
        let dir = TempDir::new().unwrap();
        let list_mock = server.mock(|when, then| {
            when.method(GET).path("/drive/v3/files");
            then.status(404).json_body(serde_json::json!({
                "error": {"code": 404, "message": "File not found: root."}
            }));
        });

        let err = client_for(&server, &dir).list_files("q").await.unwrap_err();

        list_mock.assert_hits(1);
        match err {
            CopytoolError::ApiError { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "File not found: root.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_files_backend_errors_exhaust_backoff() {
        let server = MockServer::start();
        let dir = TempDir::new().unwrap();
        let list_mock = server.mock(|when, then| {
            when.method(GET).path("/drive/v3/files");
            then.status(503).body("Service Unavailable");
        });

        let err = client_for(&server, &dir).list_files("q").await.unwrap_err();

        // sleeps of 2 and 4 ms are allowed, the third retry would need 8 ms
        list_mock.assert_hits(3);
        assert!(matches!(err, CopytoolError::BackoffExhausted { .. }));
    }

    #[tokio::test]
    async fn test_create_file_resumable_upload_in_chunks() {
        let server = MockServer::start();
        let dir = TempDir::new().unwrap();
        let session_url = server.url("/upload/session/abc");

        let session_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/upload/drive/v3/files")
                .query_param("uploadType", "resumable")
                .header("x-upload-content-type", OCTET_STREAM)
                .json_body(serde_json::json!({
                    "name": "0x1:0x2:0x0",
                    "mimeType": OCTET_STREAM,
                    "description": "archived",
                    "parents": ["root"]
                }));
            then.status(200).header("Location", session_url.as_str());
        });
        let first_chunk = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/abc")
                .header("content-range", "bytes 0-262143/*");
            then.status(308).header("Range", "bytes=0-262143");
        });
        let last_chunk = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/abc")
                .header("content-range", "bytes 262144-262153/262154");
            then.status(200).json_body(serde_json::json!({"id": "drive-new"}));
        });

        let fid = crate::domain::model::LustreFid::parse("0x1:0x2:0x0").unwrap();
        let metadata = FileMetadata::for_create(&fid, "archived".to_string(), "root");
        let data = vec![7u8; CHUNK + 10];
        let mut media: &[u8] = &data;

        let file = client_for(&server, &dir)
            .create_file(&metadata, &mut media)
            .await
            .unwrap();

        session_mock.assert();
        first_chunk.assert();
        last_chunk.assert();
        assert_eq!(file.id, "drive-new");
    }

    #[tokio::test]
    async fn test_update_exact_chunk_multiple_finishes_with_empty_tail() {
        let server = MockServer::start();
        let dir = TempDir::new().unwrap();
        let session_url = server.url("/upload/session/upd");

        let session_mock = server.mock(|when, then| {
            when.method(httpmock::Method::PATCH)
                .path("/upload/drive/v3/files/drive-1")
                .query_param("uploadType", "resumable");
            then.status(200).header("Location", session_url.as_str());
        });
        let data_chunk = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/upd")
                .header("content-range", "bytes 0-262143/*");
            then.status(308).header("Range", "bytes=0-262143");
        });
        let tail = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/upd")
                .header("content-range", "bytes */262144");
            then.status(200).json_body(serde_json::json!({"id": "drive-1"}));
        });

        let metadata = FileMetadata::for_update("new revision".to_string());
        let data = vec![1u8; CHUNK];
        let mut media: &[u8] = &data;

        let file = client_for(&server, &dir)
            .update_file("drive-1", &metadata, &mut media)
            .await
            .unwrap();

        session_mock.assert();
        data_chunk.assert();
        tail.assert();
        assert_eq!(file.id, "drive-1");
    }

    #[tokio::test]
    async fn test_partial_commit_restarts_from_committed_offset() {
        let server = MockServer::start();
        let dir = TempDir::new().unwrap();
        let session_url = server.url("/upload/session/short");

        server.mock(|when, then| {
            when.method(POST).path("/upload/drive/v3/files");
            then.status(200).header("Location", session_url.as_str());
        });
        // only the first half of the chunk made it
        let first = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/short")
                .header("content-range", "bytes 0-262143/*");
            then.status(308).header("Range", "bytes=0-131071");
        });
        let skipped_ahead = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/short")
                .header("content-range", "bytes 262144-524287/*");
            then.status(308).header("Range", "bytes=0-524287");
        });
        let second = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/short")
                .header("content-range", "bytes 131072-393215/*");
            then.status(308).header("Range", "bytes=0-393215");
        });
        let last = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/short")
                .header("content-range", "bytes 393216-524297/524298");
            then.status(200).json_body(serde_json::json!({"id": "drive-short"}));
        });

        let fid = crate::domain::model::LustreFid::parse("0x1:0x2:0x0").unwrap();
        let metadata = FileMetadata::for_create(&fid, "archived".to_string(), "root");
        let data = vec![5u8; 2 * CHUNK + 10];
        let mut media: &[u8] = &data;

        let file = client_for(&server, &dir)
            .create_file(&metadata, &mut media)
            .await
            .unwrap();

        first.assert();
        second.assert();
        last.assert();
        skipped_ahead.assert_hits(0);
        assert_eq!(file.id, "drive-short");
    }

    #[tokio::test]
    async fn test_failed_chunk_resends_uncommitted_tail() {
        let server = MockServer::start();
        let dir = TempDir::new().unwrap();
        let session_url = server.url("/upload/session/retry");

        server.mock(|when, then| {
            when.method(POST).path("/upload/drive/v3/files");
            then.status(200).header("Location", session_url.as_str());
        });
        let failed = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/retry")
                .header("content-range", "bytes 0-9/10");
            then.status(503).body("Service Unavailable");
        });
        let status = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/retry")
                .header("content-range", "bytes */10");
            then.status(308).header("Range", "bytes=0-3");
        });
        let resend = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/retry")
                .header("content-range", "bytes 4-9/10")
                .body("456789");
            then.status(200).json_body(serde_json::json!({"id": "drive-ok"}));
        });

        let fid = crate::domain::model::LustreFid::parse("0x1:0x2:0x0").unwrap();
        let metadata = FileMetadata::for_create(&fid, "archived".to_string(), "root");
        let mut media: &[u8] = b"0123456789";

        let file = client_for(&server, &dir)
            .create_file(&metadata, &mut media)
            .await
            .unwrap();

        failed.assert_hits(1);
        status.assert_hits(1);
        resend.assert_hits(1);
        assert_eq!(file.id, "drive-ok");
    }

    #[tokio::test]
    async fn test_status_below_chunk_start_is_upload_error() {
        let server = MockServer::start();
        let dir = TempDir::new().unwrap();
        let session_url = server.url("/upload/session/lost");

        server.mock(|when, then| {
            when.method(POST).path("/upload/drive/v3/files");
            then.status(200).header("Location", session_url.as_str());
        });
        server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/lost")
                .header("content-range", "bytes 0-262143/*");
            then.status(308).header("Range", "bytes=0-262143");
        });
        let failed = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/lost")
                .header("content-range", "bytes 262144-262153/262154");
            then.status(503).body("Service Unavailable");
        });
        let status = server.mock(|when, then| {
            when.method(PUT)
                .path("/upload/session/lost")
                .header("content-range", "bytes */262154");
            then.status(308).header("Range", "bytes=0-99");
        });

        let fid = crate::domain::model::LustreFid::parse("0x1:0x2:0x0").unwrap();
        let metadata = FileMetadata::for_create(&fid, "archived".to_string(), "root");
        let data = vec![9u8; CHUNK + 10];
        let mut media: &[u8] = &data;

        let err = client_for(&server, &dir)
            .create_file(&metadata, &mut media)
            .await
            .unwrap_err();

        failed.assert_hits(1);
        status.assert_hits(1);
        assert!(matches!(err, CopytoolError::UploadError { .. }), "unexpected error: {:?}", err);
    }

    #[tokio::test]
    async fn test_download_file_in_ranges() {
        let server = MockServer::start();
        let dir = TempDir::new().unwrap();
        let first = vec![3u8; CHUNK];
        let second = vec![4u8; 100];

        let first_range = server.mock(|when, then| {
            when.method(GET)
                .path("/drive/v3/files/drive-1")
                .query_param("alt", "media")
                .header("range", "bytes=0-262143");
            then.status(206)
                .header("Content-Range", "bytes 0-262143/262244")
                .body(first.clone());
        });
        let second_range = server.mock(|when, then| {
            when.method(GET)
                .path("/drive/v3/files/drive-1")
                .query_param("alt", "media")
                .header("range", "bytes=262144-524287");
            then.status(206)
                .header("Content-Range", "bytes 262144-262243/262244")
                .body(second.clone());
        });

        let mut sink: Vec<u8> = Vec::new();
        let written = client_for(&server, &dir)
            .download_file("drive-1", &mut sink)
            .await
            .unwrap();

        first_range.assert();
        second_range.assert();
        assert_eq!(written, (CHUNK + 100) as u64);
        assert_eq!(&sink[..CHUNK], &first[..]);
        assert_eq!(&sink[CHUNK..], &second[..]);
    }

    #[tokio::test]
    async fn test_download_empty_file() {
        let server = MockServer::start();
        let dir = TempDir::new().unwrap();
        server.mock(|when, then| {
            when.method(GET).path("/drive/v3/files/empty");
            then.status(416);
        });

        let mut sink: Vec<u8> = Vec::new();
        let written = client_for(&server, &dir)
            .download_file("empty", &mut sink)
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert!(sink.is_empty());
    }
}
