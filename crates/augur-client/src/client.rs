//! Augur HTTP client implementation.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;

use crate::error::ClientError;
use crate::types::{
    ActionId, ActionRecord, ActionStatus, ApiErrorResponse, Balance, ConversionResponse,
    DailyClaim, DailyRewardStatus, HealthResponse, PendingActions, QuotaResponse,
    StatusUpdateRequest, StatusUpdateResponse, SubmissionResponse, TransactionPage,
};

/// Augur API client.
///
/// User operations take the caller's JWT; fulfillment reporting uses the service API key
/// from [`ClientOptions`].
#[derive(Debug, Clone)]
pub struct AugurClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    service_name: String,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    action_type: &'a str,
}

#[derive(Serialize)]
struct ConvertRequest {
    diamonds: i64,
}

impl AugurClient {
    /// Create a client for user operations.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a client with custom options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the HTTP client cannot be built, or
    /// [`ClientError::Configuration`] if the base URL is empty.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base URL is empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: options.api_key,
            service_name: options.service_name,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn as_service(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ClientError::Configuration("service API key not set".into()))?;
        Ok(request
            .header("x-api-key", key)
            .header("x-service-name", &self.service_name))
    }

    /// Service liveness.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.client.get(self.url("/health")).send().await?;
        self.handle_response(response).await
    }

    /// The user's balances. The wallet is created with the welcome credits on first read.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn get_balance(&self, user_jwt: &str) -> Result<Balance, ClientError> {
        let request = as_user(self.client.get(self.url("/v1/wallet/balance")), user_jwt);
        self.handle_response(request.send().await?).await
    }

    /// One page of ledger history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_transactions(
        &self,
        user_jwt: &str,
        limit: usize,
        offset: usize,
    ) -> Result<TransactionPage, ClientError> {
        let request = as_user(self.client.get(self.url("/v1/wallet/transactions")), user_jwt)
            .query(&[("limit", limit), ("offset", offset)]);
        self.handle_response(request.send().await?).await
    }

    /// Convert diamonds into credits.
    ///
    /// # Errors
    ///
    /// [`ClientError::InsufficientDiamonds`] if the user holds fewer diamonds.
    pub async fn convert_diamonds(
        &self,
        user_jwt: &str,
        diamonds: i64,
    ) -> Result<ConversionResponse, ClientError> {
        let request = as_user(self.client.post(self.url("/v1/wallet/convert")), user_jwt)
            .json(&ConvertRequest { diamonds });
        self.handle_response(request.send().await?).await
    }

    /// Zero the user's wallet on account deletion.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn delete_account(&self, user_jwt: &str) -> Result<Balance, ClientError> {
        let request = as_user(self.client.delete(self.url("/v1/wallet/me")), user_jwt);
        self.handle_response(request.send().await?).await
    }

    /// Free uses left today.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn remaining_free_uses(&self, user_jwt: &str) -> Result<QuotaResponse, ClientError> {
        let request = as_user(self.client.get(self.url("/v1/quota")), user_jwt);
        self.handle_response(request.send().await?).await
    }

    /// Submit a billable action.
    ///
    /// # Errors
    ///
    /// [`ClientError::InsufficientCredits`] if the action was denied.
    pub async fn submit_action(
        &self,
        user_jwt: &str,
        action_type: &str,
    ) -> Result<SubmissionResponse, ClientError> {
        let request = as_user(self.client.post(self.url("/v1/actions")), user_jwt)
            .json(&SubmitRequest { action_type });
        self.handle_response(request.send().await?).await
    }

    /// Read one of the user's actions.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotFound`] if the action does not exist or belongs to someone else.
    pub async fn get_action(
        &self,
        user_jwt: &str,
        action_id: &ActionId,
    ) -> Result<ActionRecord, ClientError> {
        let path = format!("/v1/actions/{action_id}");
        let request = as_user(self.client.get(self.url(&path)), user_jwt);
        self.handle_response(request.send().await?).await
    }

    /// Report the fulfillment outcome of an action. Requires the service API key.
    ///
    /// # Errors
    ///
    /// [`ClientError::Configuration`] without an API key; [`ClientError::Api`] with status
    /// 409 if the action already has an outcome.
    pub async fn report_outcome(
        &self,
        action_id: &ActionId,
        status: ActionStatus,
        reason: Option<String>,
    ) -> Result<StatusUpdateResponse, ClientError> {
        let path = format!("/v1/actions/{action_id}/status");
        let request = self
            .as_service(self.client.post(self.url(&path)))?
            .json(&StatusUpdateRequest { status, reason });
        self.handle_response(request.send().await?).await
    }

    /// Actions still waiting for a reported outcome, up to `limit`.
    ///
    /// Uses the service API key. A worker calls this to recover events it never received.
    ///
    /// # Errors
    ///
    /// [`ClientError::Configuration`] if no API key is configured.
    pub async fn list_pending_actions(&self, limit: usize) -> Result<PendingActions, ClientError> {
        let request = self
            .as_service(self.client.get(self.url("/v1/actions")))?
            .query(&[("status", "pending")])
            .query(&[("limit", limit)]);
        self.handle_response(request.send().await?).await
    }

    /// Today's daily reward eligibility.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn daily_reward_status(
        &self,
        user_jwt: &str,
    ) -> Result<DailyRewardStatus, ClientError> {
        let request = as_user(self.client.get(self.url("/v1/rewards/daily")), user_jwt);
        self.handle_response(request.send().await?).await
    }

    /// Claim today's login reward. A repeat claim returns `granted: false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn claim_daily_reward(&self, user_jwt: &str) -> Result<DailyClaim, ClientError> {
        let request = as_user(self.client.post(self.url("/v1/rewards/daily")), user_jwt);
        self.handle_response(request.send().await?).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let Ok(api_error) = response.json::<ApiErrorResponse>().await else {
            return Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            });
        };

        let error = api_error.error;
        tracing::debug!(status = %status, code = %error.code, "augur request failed");

        Err(match error.code.as_str() {
            "insufficient_credits" => ClientError::InsufficientCredits {
                balance: error.detail_i64("balance"),
                required: error.detail_i64("required"),
            },
            "insufficient_diamonds" => ClientError::InsufficientDiamonds {
                balance: error.detail_i64("balance"),
                required: error.detail_i64("required"),
            },
            "already_claimed" => ClientError::AlreadyClaimed {
                message: error.message,
            },
            "not_found" => ClientError::NotFound {
                message: error.message,
            },
            "unavailable" => ClientError::Unavailable {
                message: error.message,
            },
            _ => ClientError::Api {
                code: error.code,
                message: error.message,
                status: status.as_u16(),
            },
        })
    }
}

fn as_user(request: RequestBuilder, user_jwt: &str) -> RequestBuilder {
    request.header("authorization", format!("Bearer {user_jwt}"))
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service API key, needed only for [`AugurClient::report_outcome`].
    pub api_key: Option<String>,
    /// Service name to include in service requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            api_key: None,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Options for a service identified by `name` and authenticated by `api_key`.
    #[must_use]
    pub fn for_service(name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            service_name: name.into(),
            ..Self::default()
        }
    }
}
