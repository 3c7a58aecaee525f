//! Twilio WhatsApp transport (Programmable Messaging REST API).

use std::time::Duration;

use serde::Deserialize;

use super::error::TransportError;
use super::traits::MessageTransport;
use crate::config::TwilioConfig;

/// Twilio messaging client over blocking HTTP.
pub struct TwilioTransport {
    client: reqwest::blocking::Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    timeout_secs: u64,
}

impl TwilioTransport {
    /// Every request is bounded by `timeout_secs`.
    pub fn new(config: &TwilioConfig, timeout_secs: u64) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            timeout_secs,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

/// Subset of the message resource returned on success.
#[derive(Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

/// Error body returned with non-2xx statuses.
#[derive(Deserialize)]
struct ErrorResource {
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

impl MessageTransport for TwilioTransport {
    fn send(&self, from: &str, to: &str, body: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else if e.is_connect() {
                    TransportError::Connection(self.api_base.clone())
                } else {
                    TransportError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().unwrap_or_default();
            let message = match serde_json::from_str::<ErrorResource>(&raw) {
                Ok(err) => {
                    tracing::debug!(status = status.as_u16(), code = ?err.code, "Twilio rejected message");
                    err.message
                }
                Err(_) if raw.trim().is_empty() => status.to_string(),
                Err(_) => raw,
            };
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let resource: MessageResource = response
            .json()
            .map_err(|e| TransportError::ResponseParsing(e.to_string()))?;

        tracing::debug!(
            sid = %resource.sid,
            provider_status = resource.status.as_deref().unwrap_or("unknown"),
            "Twilio accepted message"
        );

        Ok(resource.sid)
    }
}
