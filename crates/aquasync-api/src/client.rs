// ── Signed cloud API client ──
//
// Every request carries the vendor header set: `client_id`, `t`
// (millisecond timestamp), `sign_method`, `sign`, and `access_token`
// (empty for the token-issuance call itself). The signature covers the
// request path including its query string, so the path is signed and
// sent as the same bytes.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::sign;
use crate::token::TokenCache;
use crate::types::{CodeValue, DeviceDetail, Envelope, Specification, TokenGrant};

/// Total per-request timeout mandated for the cloud endpoints.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Path for token issuance. Signed with an empty access token.
const TOKEN_PATH: &str = "/v1.0/token?grant_type=1&terminal_id=100";

/// Async client for the vendor cloud API.
///
/// Owns the signing material and the token cache; callers never see the
/// bearer token. Cheap to share behind an `Arc` -- the underlying
/// connection pool handles concurrent calls.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    client_id: String,
    secret: SecretString,
    token: TokenCache,
}

impl ApiClient {
    /// Build a client for the given API server.
    ///
    /// `server` is the vendor hostname (e.g. `openapi.tuyaeu.com`); a
    /// full URL with scheme is accepted as-is for testing against local
    /// mock servers.
    pub fn new(server: &str, client_id: &str, secret: SecretString) -> Result<Self, Error> {
        let raw = if server.contains("://") {
            server.to_owned()
        } else {
            format!("https://{server}")
        };
        let base_url = Url::parse(&raw)?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url,
            client_id: client_id.to_owned(),
            secret,
            token: TokenCache::new(),
        })
    }

    /// The configured API server.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Request plumbing ─────────────────────────────────────────────

    /// Vendor header set for one request. The nonce signs as the empty
    /// string and is not transmitted.
    fn headers(
        &self,
        method: &Method,
        request_path: &str,
        access_token: &str,
        body: &str,
    ) -> Result<HeaderMap, Error> {
        let now = chrono::Utc::now().timestamp_millis();
        let signature = sign::sign(
            &self.client_id,
            self.secret.expose_secret(),
            now,
            "",
            method.as_str(),
            request_path,
            access_token,
            body,
            &[],
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            "client_id",
            HeaderValue::from_str(&self.client_id)
                .map_err(|e| Error::InvalidHeader(format!("client_id: {e}")))?,
        );
        headers.insert("t", HeaderValue::from_str(&now.to_string()).expect("digits"));
        headers.insert("sign_method", HeaderValue::from_static("HMAC-SHA256"));
        headers.insert("sign", HeaderValue::from_str(&signature).expect("hex"));
        let mut token_value = HeaderValue::from_str(access_token)
            .map_err(|e| Error::InvalidHeader(format!("access_token: {e}")))?;
        token_value.set_sensitive(true);
        headers.insert("access_token", token_value);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Issue one signed request and unwrap the envelope.
    async fn request_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        request_path: &str,
        body: Option<String>,
        access_token: &str,
    ) -> Result<T, Error> {
        let url = self
            .base_url
            .join(request_path)
            .map_err(Error::InvalidUrl)?;
        debug!("{method} {url}");

        let headers = self.headers(
            &method,
            request_path,
            access_token,
            body.as_deref().unwrap_or(""),
        )?;

        let mut builder = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            let preview = &text[..text.len().min(200)];
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: text.clone(),
            }
        })?;

        if !envelope.success {
            return Err(Error::Api {
                message: envelope.msg.unwrap_or_else(|| "success=false".into()),
            });
        }

        envelope.result.ok_or_else(|| Error::Deserialization {
            message: "envelope missing result".into(),
            body: text,
        })
    }

    /// Current access token, refreshed on demand through the cache.
    async fn access_token(&self) -> Result<String, Error> {
        self.token
            .get(|| async {
                let grant: TokenGrant = self
                    .request_signed(Method::GET, TOKEN_PATH, None, "")
                    .await
                    .map_err(|e| match e {
                        // Envelope failure on issuance is a token error,
                        // fatal for this refresh attempt only.
                        Error::Api { message } => Error::Token { message },
                        other => other,
                    })?;
                Ok(grant)
            })
            .await
    }

    /// Signed, authenticated GET returning the unwrapped `result`.
    pub async fn get<T: DeserializeOwned>(&self, request_path: &str) -> Result<T, Error> {
        let token = self.access_token().await?;
        self.request_signed(Method::GET, request_path, None, &token)
            .await
    }

    /// Signed, authenticated POST returning the unwrapped `result`.
    ///
    /// The body is serialized exactly once so the signed bytes match the
    /// transmitted bytes.
    pub async fn post<T: DeserializeOwned>(
        &self,
        request_path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        let body = serde_json::to_string(body).map_err(|e| Error::Deserialization {
            message: format!("request body serialization failed: {e}"),
            body: String::new(),
        })?;
        let token = self.access_token().await?;
        self.request_signed(Method::POST, request_path, Some(body), &token)
            .await
    }

    // ━━ Domain operations ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Current status report: the device's `{code, value}` list.
    pub async fn fetch_status(&self, device_id: &str) -> Result<Vec<CodeValue>, Error> {
        self.get(&format!("/v1.0/iot-03/devices/{device_id}/status"))
            .await
    }

    /// Cloud-side liveness flag for the device.
    pub async fn fetch_online_state(&self, device_id: &str) -> Result<bool, Error> {
        let detail: DeviceDetail = self.get(&format!("/v1.0/devices/{device_id}")).await?;
        Ok(detail.online)
    }

    /// Capability layout of the device. Fetched once per session by the
    /// sync engine and cached there.
    pub async fn fetch_specification(&self, device_id: &str) -> Result<Specification, Error> {
        self.get(&format!("/v1.0/iot-03/devices/{device_id}/specification"))
            .await
    }

    /// Read a single capability value (e.g. the cooldown interval or the
    /// selected pump) from its capability-specific endpoint.
    pub async fn fetch_capability(&self, device_id: &str, name: &str) -> Result<Value, Error> {
        self.get(&format!("/v1.0/devices/{device_id}/capabilities/{name}"))
            .await
    }

    /// Send generic `{code, value}` commands to the device.
    pub async fn send_commands(
        &self,
        device_id: &str,
        commands: &[CodeValue],
    ) -> Result<(), Error> {
        let _: Value = self
            .post(
                &format!("/v1.0/devices/{device_id}/commands"),
                &json!({ "commands": commands }),
            )
            .await?;
        Ok(())
    }

    /// Write a single capability value through its capability-specific
    /// endpoint (pump selection, cooldown runtime).
    pub async fn set_capability(
        &self,
        device_id: &str,
        name: &str,
        value: &Value,
    ) -> Result<(), Error> {
        let _: Value = self
            .post(
                &format!("/v1.0/devices/{device_id}/capabilities/{name}"),
                &json!({ "value": value }),
            )
            .await?;
        Ok(())
    }
}
