use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use url::Url;

use crate::client_logger::{ClientLogger, TracingLogger};
use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_CLIP_BYTES, CLIENT_CLIP_REQUESTS, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS,
    CLIENT_REQUESTS,
};
use crate::types::{AudioClip, ChatReply, ChatRequest, ChatResponse, SpeechRequest};

/// Where the page's own server listens by default.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/";

const CHAT_PATH: &str = "api/chat";
const TTS_PATH: &str = "api/tts";

/// Sends a user message for one tab and returns the bot's reply.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Issue one chat request.  Implementations must not retry.
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply>;
}

/// Renders text to an audio clip remotely.
#[async_trait]
pub trait SpeechClipSource: Send + Sync {
    /// Request one clip.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioClip>;
}

/// Client for the widget's chat and speech endpoints.
///
/// There is no retry, and by default no timeout: a hung endpoint leaves the
/// request pending until the server gives up.
#[derive(Clone)]
pub struct ChatApi {
    client: ReqwestClient,
    base_url: Url,
    timeout: Option<Duration>,
    logger: Arc<dyn ClientLogger>,
}

impl fmt::Debug for ChatApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatApi")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ChatApi {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = ReqwestClient::builder().default_headers(default_headers());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {}", e),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            client,
            base_url: normalize_base(base_url)?,
            timeout,
            logger: Arc::new(TracingLogger),
        })
    }

    /// Replace the request logger.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// The server root every endpoint is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The configured request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {}", e),
                self.timeout.map(|t| t.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
        }
    }

    /// Process endpoint error responses and convert them to our Error type.
    ///
    /// The body's `error` field becomes the message; any `reply` in a failed
    /// response is ignored.
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        #[derive(Deserialize)]
        struct ErrorBody {
            error: Option<String>,
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {status_code}"))
            });

        match status_code {
            400 => Error::bad_request(message, None),
            404 => Error::not_found(message),
            408 => Error::timeout(message, None),
            500 => Error::internal_server(message),
            502..=504 => Error::service_unavailable(status_code, message),
            _ => Error::api(status_code, message),
        }
    }

    async fn post_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = self.endpoint(CHAT_PATH)?;
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let body = response.json::<ChatResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {}", e),
                Some(Box::new(e)),
            )
        })?;
        body.into_reply()
    }
}

#[async_trait]
impl ChatBackend for ChatApi {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        self.logger.log_request(request);
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self.post_chat(request).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        match &result {
            Ok(reply) => self.logger.log_reply(request, reply),
            Err(err) => {
                CLIENT_REQUEST_ERRORS.click();
                self.logger.log_failure(request, err);
            }
        }
        result
    }
}

#[async_trait]
impl SpeechClipSource for ChatApi {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioClip> {
        self.logger.log_speech_request(request);
        CLIENT_CLIP_REQUESTS.click();
        let url = self.endpoint(TTS_PATH)?;
        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, HeaderValue::from_static("audio/*"))
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .map(String::from);
        let bytes = response.bytes().await.map_err(|e| {
            Error::http_client(format!("Failed to read audio: {}", e), Some(Box::new(e)))
        })?;
        let clip = AudioClip::new(bytes, content_type);
        if clip.is_empty() {
            return Err(Error::speech("endpoint returned no audio"));
        }
        CLIENT_CLIP_BYTES.count(clip.bytes().len() as u64);
        Ok(clip)
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Parse `base_url`, making sure it ends in `/` so endpoint paths join
/// beneath it rather than replacing its last segment.
fn normalize_base(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let api = ChatApi::new("http://localhost:5000/widget").unwrap();
        assert_eq!(api.base_url().as_str(), "http://localhost:5000/widget/");
        assert_eq!(
            api.endpoint(CHAT_PATH).unwrap().as_str(),
            "http://localhost:5000/widget/api/chat"
        );
    }

    #[test]
    fn default_base_url_resolves_endpoints() {
        let api = ChatApi::new(DEFAULT_BASE_URL).unwrap();
        assert_eq!(
            api.endpoint(TTS_PATH).unwrap().as_str(),
            "http://127.0.0.1:5000/api/tts"
        );
        assert_eq!(api.timeout(), None);
    }

    #[test]
    fn invalid_base_url() {
        let err = ChatApi::new("not a url").unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn timeout_is_kept() {
        let api = ChatApi::with_options(DEFAULT_BASE_URL, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(api.timeout(), Some(Duration::from_secs(5)));
    }
}
