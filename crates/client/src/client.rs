//! Graph drive HTTP client.
//!
//! Async client over `reqwest`. Session upload URLs returned by Graph
//! are pre-authorized, so range and cancel requests go out without a
//! bearer token; everything else authenticates per request through the
//! [`TokenProvider`].

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_RANGE, CONTENT_TYPE};
use tracing::debug;

use driveup_model::{
    ConflictBehavior, CreateSessionRequest, Destination, DriveItem, UploadSession,
};
use driveup_transfer::{ByteRange, DriveStore, RangeAck, StoreError, StoreFuture};

use crate::auth::{AuthError, TokenProvider};

const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Errors from the Graph client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl From<ClientError> for StoreError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Http(e) => StoreError::Transport(e.to_string()),
            ClientError::Api { status, body } => StoreError::Api {
                status,
                message: body,
            },
            ClientError::Json(e) => StoreError::Decode(e.to_string()),
            ClientError::Auth(e) => StoreError::Auth(e.to_string()),
        }
    }
}

/// Microsoft Graph drive client.
pub struct GraphDriveClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenProvider,
}

impl GraphDriveClient {
    /// Creates a client drawing tokens from `tokens`.
    pub fn new(tokens: TokenProvider) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            tokens,
        })
    }

    /// Sets a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Path addressing `file_name` under a parent item, colon syntax.
    fn item_path(&self, dest: &Destination, file_name: &str) -> String {
        let encoded = utf8_percent_encode(file_name, NON_ALPHANUMERIC);
        format!(
            "{}/drives/{}/items/{}:/{}:",
            self.base_url, dest.drive_id, dest.parent_id, encoded
        )
    }

    async fn create_session(
        &self,
        dest: &Destination,
        file_name: &str,
        conflict: ConflictBehavior,
    ) -> Result<UploadSession, ClientError> {
        let url = format!("{}/createUploadSession", self.item_path(dest, file_name));
        let token = self.tokens.token().await?;

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&CreateSessionRequest::new(file_name, conflict))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(api_error(status, resp).await);
        }

        let body = resp.bytes().await?;
        let session: UploadSession = serde_json::from_slice(&body)?;
        debug!(file = file_name, url = %session.upload_url, "upload session created");
        Ok(session)
    }

    async fn send_range(
        &self,
        session: &UploadSession,
        range: ByteRange,
        total_size: u64,
        body: Vec<u8>,
    ) -> Result<RangeAck, ClientError> {
        let resp = self
            .http
            .put(&session.upload_url)
            .header(CONTENT_RANGE, range.content_range(total_size))
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        match status {
            StatusCode::ACCEPTED => Ok(RangeAck::Accepted),
            StatusCode::OK | StatusCode::CREATED => {
                let body = resp.bytes().await?;
                let item: DriveItem = serde_json::from_slice(&body)?;
                Ok(RangeAck::Completed(item))
            }
            _ => Err(api_error(status, resp).await),
        }
    }

    async fn put_item_content(
        &self,
        dest: &Destination,
        file_name: &str,
        body: Vec<u8>,
    ) -> Result<DriveItem, ClientError> {
        let url = format!("{}/content", self.item_path(dest, file_name));
        let token = self.tokens.token().await?;

        let resp = self
            .http
            .put(&url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(api_error(status, resp).await);
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn delete_session(&self, session: &UploadSession) -> Result<(), ClientError> {
        let resp = self.http.delete(&session.upload_url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(api_error(status, resp).await);
        }
        Ok(())
    }
}

async fn api_error(status: StatusCode, resp: reqwest::Response) -> ClientError {
    let body = resp.text().await.unwrap_or_default();
    ClientError::Api {
        status: status.as_u16(),
        body,
    }
}

impl DriveStore for GraphDriveClient {
    fn create_upload_session(
        &self,
        dest: &Destination,
        file_name: &str,
        conflict: ConflictBehavior,
    ) -> StoreFuture<'_, UploadSession> {
        let dest = dest.clone();
        let file_name = file_name.to_string();
        Box::pin(async move {
            self.create_session(&dest, &file_name, conflict)
                .await
                .map_err(StoreError::from)
        })
    }

    fn upload_range(
        &self,
        session: &UploadSession,
        range: ByteRange,
        total_size: u64,
        body: Vec<u8>,
    ) -> StoreFuture<'_, RangeAck> {
        let session = session.clone();
        Box::pin(async move {
            self.send_range(&session, range, total_size, body)
                .await
                .map_err(StoreError::from)
        })
    }

    fn put_content(
        &self,
        dest: &Destination,
        file_name: &str,
        body: Vec<u8>,
    ) -> StoreFuture<'_, DriveItem> {
        let dest = dest.clone();
        let file_name = file_name.to_string();
        Box::pin(async move {
            self.put_item_content(&dest, &file_name, body)
                .await
                .map_err(StoreError::from)
        })
    }

    fn cancel_upload_session(&self, session: &UploadSession) -> StoreFuture<'_, ()> {
        let session = session.clone();
        Box::pin(async move { self.delete_session(&session).await.map_err(StoreError::from) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Starts a one-request mock HTTP server; the join handle resolves
    /// to the raw request the server saw.
    async fn mock_server(status_line: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let status_line = status_line.to_string();
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;

            let resp = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(resp.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        });

        (url, handle)
    }

    /// Reads one full request, headers plus declared body.
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut block = [0u8; 4096];
        loop {
            let n = stream.read(&mut block).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&block[..n]);

            let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..pos]).into_owned();
            let body_len = head
                .lines()
                .find_map(|line| {
                    let (key, value) = line.split_once(':')?;
                    key.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if buf.len() >= pos + 4 + body_len {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn client(base_url: String) -> GraphDriveClient {
        GraphDriveClient::new(TokenProvider::fixed("test-token"))
            .unwrap()
            .with_base_url(base_url)
    }

    fn dest() -> Destination {
        Destination::new("drive-1", "root")
    }

    const ITEM_JSON: &str = r#"{
        "id": "01ABC",
        "name": "report.pdf",
        "size": 2048,
        "webUrl": "https://contoso.example/report.pdf",
        "file": {"mimeType": "application/pdf"}
    }"#;

    #[tokio::test]
    async fn create_session_posts_conflict_behavior() {
        let json = r#"{"uploadUrl":"https://upload.example/s/1","nextExpectedRanges":["0-"]}"#;
        let (url, handle) = mock_server("200 OK", json).await;

        let session = client(url)
            .create_session(&dest(), "report v2.pdf", ConflictBehavior::Rename)
            .await
            .unwrap();
        assert_eq!(session.upload_url, "https://upload.example/s/1");

        let request = handle.await.unwrap();
        assert!(request.starts_with("POST /drives/drive-1/items/root:/"), "{request}");
        assert!(request.contains(":/createUploadSession"), "{request}");
        // File name is percent-encoded into the path.
        assert!(request.contains("report%20v2%2Epdf"), "{request}");
        assert!(request.contains("authorization: Bearer test-token"), "{request}");
        assert!(
            request.contains(r#""@microsoft.graph.conflictBehavior":"rename""#),
            "{request}"
        );
        assert!(request.contains(r#""name":"report v2.pdf""#), "{request}");
    }

    #[tokio::test]
    async fn create_session_surfaces_api_error() {
        let (url, handle) = mock_server("403 Forbidden", r#"{"error":"accessDenied"}"#).await;

        let err = client(url)
            .create_session(&dest(), "a.bin", ConflictBehavior::Rename)
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("403"), "{msg}");
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn intermediate_range_is_accepted() {
        let json = r#"{"expirationDateTime":"2026-08-30T12:00:00Z","nextExpectedRanges":["10-"]}"#;
        let (url, handle) = mock_server("202 Accepted", json).await;

        let session = UploadSession {
            upload_url: format!("{url}/session/1"),
            expiration_date_time: None,
            next_expected_ranges: Vec::new(),
        };
        let ack = client(url)
            .send_range(&session, ByteRange::new(0, 9), 20, vec![7u8; 10])
            .await
            .unwrap();
        assert_eq!(ack, RangeAck::Accepted);

        let request = handle.await.unwrap();
        assert!(request.starts_with("PUT /session/1"), "{request}");
        assert!(request.contains("content-range: bytes 0-9/20"), "{request}");
        // Session URLs are pre-authorized; no bearer token goes out.
        assert!(!request.to_ascii_lowercase().contains("authorization:"), "{request}");
    }

    #[tokio::test]
    async fn final_range_returns_finalized_item() {
        let (url, handle) = mock_server("201 Created", ITEM_JSON).await;

        let session = UploadSession {
            upload_url: format!("{url}/session/1"),
            expiration_date_time: None,
            next_expected_ranges: Vec::new(),
        };
        let ack = client(url)
            .send_range(&session, ByteRange::new(10, 19), 20, vec![7u8; 10])
            .await
            .unwrap();

        match ack {
            RangeAck::Completed(item) => {
                assert_eq!(item.id, "01ABC");
                assert_eq!(item.name, "report.pdf");
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn rejected_range_is_an_api_error() {
        let (url, handle) = mock_server("500 Internal Server Error", "{}").await;

        let session = UploadSession {
            upload_url: format!("{url}/session/1"),
            expiration_date_time: None,
            next_expected_ranges: Vec::new(),
        };
        let err = client(url)
            .send_range(&session, ByteRange::new(0, 9), 20, vec![0u8; 10])
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Api { status: 500, .. }));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn put_content_uploads_whole_body() {
        let (url, handle) = mock_server("201 Created", ITEM_JSON).await;

        let item = client(url)
            .put_item_content(&dest(), "report.pdf", vec![5u8; 2048])
            .await
            .unwrap();
        assert_eq!(item.id, "01ABC");
        assert_eq!(item.size, 2048);

        let request = handle.await.unwrap();
        assert!(request.starts_with("PUT /drives/drive-1/items/root:/"), "{request}");
        assert!(request.contains(":/content"), "{request}");
        assert!(request.contains("content-length: 2048"), "{request}");
        assert!(request.contains("authorization: Bearer test-token"), "{request}");
    }

    #[tokio::test]
    async fn delete_session_succeeds_on_no_content() {
        let (url, handle) = mock_server("204 No Content", "").await;

        let session = UploadSession {
            upload_url: format!("{url}/session/1"),
            expiration_date_time: None,
            next_expected_ranges: Vec::new(),
        };
        client(url).delete_session(&session).await.unwrap();

        let request = handle.await.unwrap();
        assert!(request.starts_with("DELETE /session/1"), "{request}");
    }

    #[tokio::test]
    async fn request_waits_for_first_token() {
        let (url, handle) = mock_server("201 Created", ITEM_JSON).await;

        let (writer, tokens) = crate::auth::token_channel();
        let client = GraphDriveClient::new(tokens).unwrap().with_base_url(url);

        let publish = async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            writer.publish("late-token");
        };
        let dest = dest();
        let (item, ()) = tokio::join!(
            client.put_item_content(&dest, "report.pdf", vec![1u8; 16]),
            publish,
        );
        assert_eq!(item.unwrap().id, "01ABC");

        let request = handle.await.unwrap();
        assert!(request.contains("authorization: Bearer late-token"), "{request}");
    }
}
