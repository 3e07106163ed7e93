//! REST client for the managed backend.
//!
//! Every request carries the project API key in the `apikey` header and a
//! bearer token. On the server the bearer is the service-role key; in the
//! game client it is the player's session token.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// PostgreSQL unique-violation SQLSTATE, surfaced verbatim by the REST layer.
pub const UNIQUE_VIOLATION: &str = "23505";

/// HTTP client for one backend project.
#[derive(Debug, Clone)]
pub struct BaasClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    bearer: String,
}

/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum BaasError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend error ({status}): {message}")]
    Api {
        status: u16,
        /// SQLSTATE or PostgREST error code, when the body carried one.
        code: Option<String>,
        message: String,
    },
}

impl BaasError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, BaasError::Api { code: Some(code), .. } if code == UNIQUE_VIOLATION)
    }
}

/// Error body shape used by PostgREST.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

impl BaasClient {
    /// Create a client that authenticates with the API key alone.
    ///
    /// * `base_url` - Project URL, e.g. `https://xyz.example.co`.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, api_key)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let api_key = api_key.into();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer: api_key.clone(),
            api_key,
        }
    }

    /// Same project and connection pool, different bearer token.
    pub fn with_bearer(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            bearer: token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call a stored procedure and decode its JSON result.
    ///
    /// Sends `POST /rest/v1/rpc/{name}` with `args` as the body.
    pub async fn rpc<A, T>(&self, name: &str, args: &A) -> Result<T, BaasError>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .authorized(self.client.post(self.rest_url(&format!("rpc/{name}"))))
            .json(args)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Call a stored procedure whose result is ignored.
    pub async fn rpc_unit<A>(&self, name: &str, args: &A) -> Result<(), BaasError>
    where
        A: Serialize + ?Sized,
    {
        let response = self
            .authorized(self.client.post(self.rest_url(&format!("rpc/{name}"))))
            .json(args)
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// `GET /rest/v1/{table}` with PostgREST filters, e.g. `("id", "eq.5")`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, BaasError> {
        let mut query: Vec<(&str, &str)> = vec![("select", columns)];
        query.extend(filters.iter().map(|(k, v)| (*k, v.as_str())));

        let response = self
            .authorized(self.client.get(self.rest_url(table)))
            .query(&query)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `POST /rest/v1/{table}` returning the inserted rows.
    pub async fn insert<B, T>(&self, table: &str, body: &B) -> Result<Vec<T>, BaasError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .authorized(self.client.post(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `PATCH /rest/v1/{table}` on the rows matching `filters`, returning them.
    pub async fn update<B, T>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: &B,
    ) -> Result<Vec<T>, BaasError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let query: Vec<(&str, &str)> = filters.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let response = self
            .authorized(self.client.patch(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .query(&query)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
    }

    /// Ensure the response has a success status code, or turn the body into
    /// a [`BaasError::Api`].
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BaasError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        let (code, message) = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => {
                let message = match (parsed.message, parsed.details) {
                    (Some(m), Some(d)) => format!("{m} ({d})"),
                    (Some(m), None) => m,
                    (None, Some(d)) => d,
                    (None, None) => body,
                };
                (parsed.code, message)
            }
            Err(_) => (None, body),
        };

        Err(BaasError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BaasError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), BaasError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = BaasClient::new("https://project.example.co/", "anon");
        assert_eq!(client.base_url(), "https://project.example.co");
        assert_eq!(
            client.rest_url("rpc/start_mining"),
            "https://project.example.co/rest/v1/rpc/start_mining"
        );
    }

    #[test]
    fn unique_violation_is_detected_by_code() {
        let err = BaasError::Api {
            status: 409,
            code: Some(UNIQUE_VIOLATION.into()),
            message: "duplicate key".into(),
        };
        assert!(err.is_unique_violation());

        let other = BaasError::Api {
            status: 400,
            code: Some("PGRST100".into()),
            message: "bad filter".into(),
        };
        assert!(!other.is_unique_violation());
    }

    #[test]
    fn with_bearer_keeps_project() {
        let anon = BaasClient::new("https://p.example.co", "anon");
        let user = anon.with_bearer("session-token");
        assert_eq!(user.base_url(), anon.base_url());
        assert_eq!(user.api_key, "anon");
        assert_eq!(user.bearer, "session-token");
    }
}
