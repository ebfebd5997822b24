//! HTTP gateway with auth header injection and envelope decoding.
//!
//! Every request goes to `base_url + path` with `Authorization: Bearer <token>`
//! when the token source has one. Every successful body is decrypted and
//! parsed before it reaches the caller. There is no retry, caching or timeout:
//! a hung backend keeps the caller waiting.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{multipart, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::auth::TokenSource;
use super::decode::ResponseDecoder;
use super::endpoints::{self, Resource, ID_PLACEHOLDER};
use super::error::{normalize_failure, ApiError};
use super::types::{identifier_of, CallOptions, CurrencySettings, DEFAULT_CURRENCY_SYMBOL};

/// HTTP client wrapper for the inventory backend.
///
/// Cheap to share behind an `Arc`; calls are independent of each other.
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
    decoder: ResponseDecoder,
}

impl ApiClient {
    /// Create a client for `base_url`, reading tokens from `tokens` per call.
    pub fn new(base_url: &str, tokens: Arc<dyn TokenSource>, decoder: ResponseDecoder) -> Self {
        let client = Client::builder().build().unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            decoder,
        }
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        log::debug!("{} {}", method, path);
        let mut builder = self.client.request(method, self.url(path));
        if let Some(token) = self.tokens.token()? {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// Send, reject non-2xx, then decrypt and parse the body.
    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            log::warn!("{} failed with status {}", path, status);
            return Err(ApiError::Status {
                status,
                body: body.to_vec(),
            });
        }

        self.decoder.decode(&body).map_err(|e| {
            log::error!("Failed to decode response from {}: {}", path, e);
            ApiError::Decode(e)
        })
    }

    /// GET `path`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let builder = self.request(Method::GET, path)?;
        self.execute(builder, path).await
    }

    /// POST `data` as JSON to `path`.
    pub async fn post<B, T>(&self, path: &str, data: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path)?.json(data);
        self.execute(builder, path).await
    }

    /// PATCH `data` as JSON to `path`, filling `:id` from the payload's identifier.
    ///
    /// A template with `:id` and a payload without an identifier fails before
    /// any request is sent.
    pub async fn patch<B, T>(&self, path: &str, data: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = to_payload(data)?;
        let resolved = if path.contains(ID_PLACEHOLDER) {
            let id = identifier_of(&payload).ok_or_else(|| ApiError::MissingIdentifier {
                entity: path.to_string(),
            })?;
            endpoints::fill_id(path, &id)
        } else {
            path.to_string()
        };

        let builder = self.request(Method::PATCH, &resolved)?.json(&payload);
        self.execute(builder, &resolved).await
    }

    /// DELETE `path` with `:id` replaced by `id`.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str, id: &str) -> Result<T, ApiError> {
        let resolved = endpoints::fill_id(path, id);
        let builder = self.request(Method::DELETE, &resolved)?;
        self.execute(builder, &resolved).await
    }

    /// PUT a `multipart/form-data` body (file-bearing payloads).
    pub async fn multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: multipart::Form,
    ) -> Result<T, ApiError> {
        self.multipart_with(path, form, Method::PUT).await
    }

    /// Send a `multipart/form-data` body with an explicit method.
    pub async fn multipart_with<T: DeserializeOwned>(
        &self,
        path: &str,
        form: multipart::Form,
        method: Method,
    ) -> Result<T, ApiError> {
        let builder = self.request(method, path)?.multipart(form);
        self.execute(builder, path).await
    }

    /// General-purpose call for non-CRUD endpoints.
    ///
    /// Caller headers are sent alongside `Content-Type: application/json`
    /// and the bearer token; the standard headers win on conflict. Without a
    /// token no `Authorization` header is sent, caller-supplied or not. The
    /// body is dropped for GET.
    pub async fn custom_call<T: DeserializeOwned>(
        &self,
        path: &str,
        options: CallOptions,
    ) -> Result<T, ApiError> {
        let CallOptions {
            method,
            data,
            params,
            headers: extra,
        } = options;

        let mut headers = HeaderMap::new();
        for (name, value) in &extra {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ApiError::InvalidRequest(format!("bad header name {:?}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| ApiError::InvalidRequest(format!("bad value for header {}", name)))?;
            headers.insert(name, value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match self.tokens.token()? {
            Some(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| ApiError::InvalidRequest("token is not a valid header".into()))?;
                headers.insert(AUTHORIZATION, value);
            }
            None => {
                headers.remove(AUTHORIZATION);
            }
        }

        log::debug!("{} {} (custom)", method, path);
        let is_get = method == Method::GET;
        let mut builder = self.client.request(method, self.url(path)).headers(headers);
        if !params.is_empty() {
            builder = builder.query(&params);
        }
        if let Some(data) = data.filter(|_| !is_get) {
            builder = builder.body(serde_json::to_vec(&data).map_err(|e| {
                ApiError::InvalidRequest(format!("body is not serializable: {}", e))
            })?);
        }

        self.execute(builder, path).await
    }

    /// POST to a create endpoint, normalizing the failure message.
    ///
    /// The call still fails on error; the error carries a
    /// [`FailureMessage`](super::error::FailureMessage) fit for display.
    pub async fn add<B, T>(&self, path: &str, data: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        match self.post(path, data).await {
            Ok(created) => Ok(created),
            Err(err) => {
                let message = normalize_failure(&err, &self.decoder);
                log::warn!("Create at {} failed: {} ({})", path, message, err);
                Err(ApiError::Create {
                    message,
                    source: Box::new(err),
                })
            }
        }
    }

    /// Fetch a collection's full list.
    pub async fn list<T: DeserializeOwned>(&self, resource: &Resource) -> Result<T, ApiError> {
        self.get(resource.list).await
    }

    /// Create an entity in a collection (normalized errors, see [`ApiClient::add`]).
    pub async fn create<B, T>(&self, resource: &Resource, data: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.add(resource.add, data).await
    }

    /// Delete one entity of a collection by identifier.
    pub async fn delete_by_id<T: DeserializeOwned>(
        &self,
        resource: &Resource,
        id: &str,
    ) -> Result<T, ApiError> {
        self.delete(resource.delete, id).await
    }

    /// Currency symbol for price display, `"$"` when it cannot be fetched.
    pub async fn currency_symbol(&self) -> String {
        match self.get::<CurrencySettings>(endpoints::CURRENCY_SETTINGS).await {
            Ok(settings) => settings.symbol,
            Err(e) => {
                log::warn!("Currency settings unavailable, using default: {}", e);
                DEFAULT_CURRENCY_SYMBOL.to_string()
            }
        }
    }
}

fn to_payload<B: Serialize + ?Sized>(data: &B) -> Result<Value, ApiError> {
    serde_json::to_value(data)
        .map_err(|e| ApiError::InvalidRequest(format!("payload is not serializable: {}", e)))
}
