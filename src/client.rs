use std::env;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_TTFB,
};
use crate::provider::{ChunkStream, ModelProvider};
use crate::sse::process_sse;
use crate::types::{GenerateContentRequest, GenerateContentResponse, Model};

const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["COPORTIES_API_KEY", "GEMINI_API_KEY", "API_KEY"];

/// Client for the Gemini API.
#[derive(Debug, Clone)]
pub struct Gemini {
    api_key: Option<String>,
    client: ReqwestClient,
    base_url: String,
    timeout: Duration,
}

impl Gemini {
    /// Create a new Gemini client.
    ///
    /// The API key can be provided directly or read from the environment (see
    /// [`API_KEY_ENV_VARS`]).  A missing key is not an error here; it is
    /// reported by [`ModelProvider::ensure_credentials`] before the first
    /// request.
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_options(api_key, None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let api_key = api_key.or_else(api_key_from_env);

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        let mut base_url = base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            api_key,
            client,
            base_url,
            timeout,
        })
    }

    fn api_key_header(&self) -> Result<HeaderValue> {
        let key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::configuration(format!(
                    "API key is missing; set one of {}",
                    API_KEY_ENV_VARS.join(", ")
                ))
            })?;
        let mut value = HeaderValue::from_str(key).map_err(|_| {
            Error::configuration("API key contains characters that cannot be sent in a header")
        })?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("x-goog-api-key", self.api_key_header()?);
        Ok(headers)
    }

    fn endpoint(&self, model: &Model, method: &str, sse: bool) -> Result<Url> {
        let base = Url::parse(&self.base_url)?;
        let mut url = base.join(&format!("models/{model}:{method}"))?;
        if sse {
            url.query_pairs_mut().append_pair("alt", "sse");
        }
        Ok(url)
    }

    async fn post(
        &self,
        url: Url,
        headers: HeaderMap,
        request: &GenerateContentRequest,
    ) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = self
            .client
            .post(url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            });
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let response = result.inspect_err(|_| CLIENT_REQUEST_ERRORS.click())?;
        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ApiErrorBody>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        match serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|parsed| parsed.error)
        {
            Some(mut body) => {
                body.code = Some(status_code);
                body.into_error(retry_after)
            }
            None => ApiErrorBody {
                code: Some(status_code),
                message: Some(error_body),
                status: None,
            }
            .into_error(retry_after),
        }
    }

    /// Send a request and wait for the whole response.
    pub async fn generate(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint(model, "generateContent", false)?;
        let response = self.post(url, self.default_headers()?, request).await?;
        response.json::<GenerateContentResponse>().await.map_err(|e| {
            Error::serialization(
                format!("Failed to parse response: {e}"),
                Some(Box::new(e)),
            )
        })
    }

    /// Send a request and get a streaming response.
    ///
    /// Returns a stream of response chunks that can be processed incrementally.
    pub async fn stream(
        &self,
        model: &Model,
        request: &GenerateContentRequest,
    ) -> Result<ChunkStream> {
        let url = self.endpoint(model, "streamGenerateContent", true)?;

        let mut headers = self.default_headers()?;
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );

        let start = Instant::now();
        let response = self.post(url, headers, request).await?;
        STREAM_TTFB.add(start.elapsed().as_secs_f64());

        Ok(Box::pin(process_sse(response.bytes_stream())))
    }
}

#[async_trait::async_trait]
impl ModelProvider for Gemini {
    fn ensure_credentials(&self) -> Result<()> {
        self.api_key_header().map(|_| ())
    }

    async fn stream_generate(
        &self,
        model: &Model,
        request: GenerateContentRequest,
    ) -> Result<ChunkStream> {
        self.stream(model, &request).await
    }
}

fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

/// The provider's error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub(crate) code: Option<u16>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<String>,
}

impl ApiErrorBody {
    /// Map the envelope onto the error taxonomy.
    pub(crate) fn into_error(self, retry_after: Option<u64>) -> Error {
        let message = self
            .message
            .unwrap_or_else(|| "no error message provided".to_string());
        let status = self.status;
        let status_code = self
            .code
            .or_else(|| status.as_deref().and_then(status_code_for))
            .unwrap_or(500);

        // An unusable key comes back as a 400 with this marker.
        if message.contains("API_KEY_INVALID") || message.contains("API key not valid") {
            return Error::authentication(message);
        }

        match status_code {
            400 => Error::bad_request(message, status),
            401 => Error::authentication(message),
            403 => Error::permission(message),
            404 => Error::not_found(message),
            408 => Error::timeout(message, None),
            429 => Error::rate_limit(message, retry_after),
            500 => Error::internal_server(message),
            502..=504 => Error::service_unavailable(message, retry_after),
            _ => Error::api(status_code, status, message),
        }
    }
}

/// HTTP status implied by a canonical error status name.
fn status_code_for(status: &str) -> Option<u16> {
    match status {
        "INVALID_ARGUMENT" | "FAILED_PRECONDITION" => Some(400),
        "UNAUTHENTICATED" => Some(401),
        "PERMISSION_DENIED" => Some(403),
        "NOT_FOUND" => Some(404),
        "RESOURCE_EXHAUSTED" => Some(429),
        "INTERNAL" => Some(500),
        "UNAVAILABLE" => Some(503),
        "DEADLINE_EXCEEDED" => Some(504),
        _ => None,
    }
}
