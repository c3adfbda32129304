// SPDX-FileCopyrightText: 2026 Sawm Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP push gateway transport.
//!
//! POSTs one JSON document per device token to the configured endpoint.
//! A 2xx response is a delivery. Any other status is a failed outcome; if the
//! body carries `{"error": {"code": "..."}}` that code is reported so the
//! token health manager can recognise permanently invalid tokens.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sawm_config::model::PushConfig;
use sawm_core::types::{DeliveryOutcome, DeviceToken, PushMessage};
use sawm_core::{AdapterType, HealthStatus, PluginAdapter, PushTransport, SawmError};

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    token: &'a str,
    platform: &'a str,
    title: &'a str,
    body: &'a str,
    data: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorResponse {
    error: GatewayError,
}

#[derive(Debug, Deserialize)]
struct GatewayError {
    code: String,
}

/// Sends each token's notification to an HTTP push gateway.
#[derive(Debug, Clone)]
pub struct HttpPushTransport {
    client: reqwest::Client,
    endpoint: String,
    authenticated: bool,
}

impl HttpPushTransport {
    /// Build a transport for `endpoint` with optional bearer authentication.
    pub fn new(
        endpoint: impl Into<String>,
        auth_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, SawmError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                SawmError::Config(format!("invalid push auth token header value: {e}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| SawmError::Push {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            authenticated: auth_token.is_some(),
        })
    }

    /// Build from the `[push]` section. Returns `None` when no endpoint is set.
    pub fn from_config(config: &PushConfig) -> Result<Option<Self>, SawmError> {
        config
            .endpoint
            .as_deref()
            .map(|endpoint| Self::new(endpoint, config.auth_token.as_deref(), config.timeout()))
            .transpose()
    }
}

#[async_trait]
impl PluginAdapter for HttpPushTransport {
    fn name(&self) -> &str {
        "http-push"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::PushTransport
    }

    async fn health_check(&self) -> Result<HealthStatus, SawmError> {
        if self.authenticated {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded("push gateway requests are unauthenticated".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), SawmError> {
        Ok(())
    }
}

#[async_trait]
impl PushTransport for HttpPushTransport {
    async fn send(
        &self,
        token: &DeviceToken,
        message: &PushMessage,
    ) -> Result<DeliveryOutcome, SawmError> {
        let request = PushRequest {
            token: &token.token,
            platform: &token.platform,
            title: &message.title,
            body: &message.body,
            data: &message.data,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SawmError::Push {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, user_id = token.user_id, "push gateway responded");
        if status.is_success() {
            return Ok(DeliveryOutcome::delivered(&token.token));
        }

        let body = response.text().await.unwrap_or_default();
        let code = serde_json::from_str::<GatewayErrorResponse>(&body)
            .ok()
            .map(|e| e.error.code);
        warn!(
            status = %status,
            user_id = token.user_id,
            code = code.as_deref().unwrap_or("-"),
            "push gateway rejected token"
        );
        Ok(DeliveryOutcome::failed(&token.token, code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn device(token: &str) -> DeviceToken {
        DeviceToken {
            user_id: 7,
            token: token.into(),
            platform: "android".into(),
            is_active: true,
            last_active_at: Utc::now(),
        }
    }

    fn message() -> PushMessage {
        let mut data = BTreeMap::new();
        data.insert("type".into(), "fast_prayer_reminder".into());
        PushMessage {
            title: "Prayer reminder".into(),
            body: "It's 14:30".into(),
            data,
        }
    }

    fn transport(server: &MockServer, auth: Option<&str>) -> HttpPushTransport {
        HttpPushTransport::new(
            format!("{}/send", server.uri()),
            auth,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn missing_auth_token_reports_degraded() {
        let server = MockServer::start().await;
        assert!(matches!(
            transport(&server, None).health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
        assert_eq!(
            transport(&server, Some("secret")).health_check().await.unwrap(),
            HealthStatus::Healthy
        );
    }

    #[tokio::test]
    async fn success_status_is_a_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer s3cret"))
            .and(body_partial_json(serde_json::json!({
                "token": "tok-1",
                "platform": "android",
                "title": "Prayer reminder",
                "data": {"type": "fast_prayer_reminder"}
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = transport(&server, Some("s3cret"))
            .send(&device("tok-1"), &message())
            .await
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::delivered("tok-1"));
    }

    #[tokio::test]
    async fn error_body_code_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": "messaging/registration-token-not-registered"}
            })))
            .mount(&server)
            .await;

        let outcome = transport(&server, None)
            .send(&device("tok-dead"), &message())
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(
            outcome.error_code.as_deref(),
            Some("messaging/registration-token-not-registered")
        );
    }

    #[tokio::test]
    async fn unparseable_error_body_has_no_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let outcome = transport(&server, None)
            .send(&device("tok-1"), &message())
            .await
            .unwrap();
        assert_eq!(outcome, DeliveryOutcome::failed("tok-1", None));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let transport =
            HttpPushTransport::new("http://127.0.0.1:1/send", None, Duration::from_secs(1))
                .unwrap();
        let err = transport
            .send(&device("tok-1"), &message())
            .await
            .unwrap_err();
        assert!(matches!(err, SawmError::Push { .. }));
    }

    #[test]
    fn from_config_without_endpoint_is_none() {
        assert!(
            HttpPushTransport::from_config(&PushConfig::default())
                .unwrap()
                .is_none()
        );
    }
}
