//! Client for the login service.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Calls `POST {auth_url}/login`.
#[derive(Debug, Clone)]
pub struct LoginClient {
    http: reqwest::Client,
    auth_url: String,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    #[serde(rename = "initData")]
    init_data: &'a str,
    #[serde(rename = "referralCode", skip_serializing_if = "Option::is_none")]
    referral_code: Option<&'a str>,
}

#[derive(Deserialize)]
struct LoginReply {
    token: Option<String>,
}

#[derive(Deserialize)]
struct ErrorReply {
    detail: Option<String>,
}

impl LoginClient {
    pub fn new(auth_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), auth_url)
    }

    pub fn with_client(http: reqwest::Client, auth_url: impl Into<String>) -> Self {
        Self {
            http,
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Exchange raw launch data (and an optional referral code) for a
    /// session token.
    pub async fn login(
        &self,
        init_data: &str,
        referral_code: Option<&str>,
    ) -> Result<String, ClientError> {
        let response = self
            .http
            .post(format!("{}/login", self.auth_url))
            .json(&LoginBody {
                init_data,
                referral_code,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorReply>(&body)
                .ok()
                .and_then(|e| e.detail)
                .unwrap_or(body);
            return Err(ClientError::Login {
                status: status.as_u16(),
                detail,
            });
        }

        response
            .json::<LoginReply>()
            .await?
            .token
            .filter(|t| !t.is_empty())
            .ok_or(ClientError::MissingToken)
    }
}
