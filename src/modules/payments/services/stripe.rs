use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;

use super::gateway_trait::{
    CreateHoldRequest, GatewayHold, GatewayRefund, HoldState, PaymentGateway,
};
use crate::core::{AppError, Result};

/// Stripe gateway client
///
/// Holds are PaymentIntents created with `capture_method=manual`: confirming
/// one authorizes the funds, capture converts the authorization into a
/// charge, and uncaptured authorizations lapse at the gateway after their
/// window. Transient failures are retried by the middleware before they
/// surface as `GatewayUnavailable`.
pub struct StripeGateway {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

impl StripeGateway {
    pub fn new(api_key: String, base_url: String) -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = reqwest_middleware::ClientBuilder::new(Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Self {
            client,
            api_key,
            base_url,
        }
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(String, String)],
        idempotency_key: Option<&str>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .form(form);

        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        request.send().await.map_err(|e| {
            AppError::GatewayUnavailable(format!("Stripe request to {} failed: {}", path, e))
        })
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);

        self.client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| {
                AppError::GatewayUnavailable(format!("Stripe request to {} failed: {}", path, e))
            })
    }

    /// Classify a non-success response into the error taxonomy
    async fn classify_error(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return AppError::GatewayUnavailable(format!("Stripe returned {}: {}", status, body));
        }

        if let Ok(envelope) = serde_json::from_str::<StripeErrorEnvelope>(&body) {
            let error = envelope.error;
            if status == StatusCode::PAYMENT_REQUIRED || error.error_type == "card_error" {
                return AppError::GatewayRejected(format!(
                    "{} ({})",
                    error.message,
                    error.code.unwrap_or_default()
                ));
            }
            if status == StatusCode::NOT_FOUND {
                return AppError::not_found(error.message);
            }
            return AppError::Internal(format!(
                "Stripe {} error: {}",
                error.error_type, error.message
            ));
        }

        AppError::Internal(format!("Stripe returned {}: {}", status, body))
    }

    async fn parse_intent(response: reqwest::Response) -> Result<GatewayHold> {
        let intent: StripeIntent = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Stripe intent: {}", e)))?;
        intent.into_hold()
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_hold(&self, request: CreateHoldRequest) -> Result<GatewayHold> {
        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), request.amount_minor.to_string()),
            ("currency".to_string(), request.currency.clone()),
            ("capture_method".to_string(), "manual".to_string()),
            ("confirm".to_string(), "true".to_string()),
        ];

        if let Some(payment_method) = &request.payment_method {
            form.push(("payment_method".to_string(), payment_method.clone()));
        }

        for (key, value) in &request.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }

        let response = self
            .post_form(
                "/v1/payment_intents",
                &form,
                Some(&request.idempotency_key),
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }

        Self::parse_intent(response).await
    }

    async fn get_hold(&self, hold_ref: &str) -> Result<GatewayHold> {
        let response = self
            .get(&format!("/v1/payment_intents/{}", hold_ref))
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }

        Self::parse_intent(response).await
    }

    async fn capture_hold(&self, hold_ref: &str) -> Result<GatewayHold> {
        let response = self
            .post_form(
                &format!("/v1/payment_intents/{}/capture", hold_ref),
                &[],
                None,
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }

        Self::parse_intent(response).await
    }

    async fn refund_hold(
        &self,
        hold_ref: &str,
        amount_minor: Option<i64>,
    ) -> Result<GatewayRefund> {
        let mut form: Vec<(String, String)> =
            vec![("payment_intent".to_string(), hold_ref.to_string())];

        if let Some(amount) = amount_minor {
            form.push(("amount".to_string(), amount.to_string()));
        }

        let response = self.post_form("/v1/refunds", &form, None).await?;

        if !response.status().is_success() {
            return Err(Self::classify_error(response).await);
        }

        let refund: StripeRefund = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse Stripe refund: {}", e)))?;

        Ok(GatewayRefund {
            reference: refund.id,
            amount_minor: refund.amount,
        })
    }

    fn name(&self) -> &str {
        "stripe"
    }
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    status: String,
    amount: i64,
    #[serde(default)]
    amount_received: i64,
    #[serde(default)]
    cancellation_reason: Option<String>,
}

impl StripeIntent {
    fn into_hold(self) -> Result<GatewayHold> {
        let state = match self.status.as_str() {
            "requires_capture" => HoldState::RequiresCapture,
            "succeeded" => HoldState::Captured,
            "canceled" => {
                if self.cancellation_reason.as_deref() == Some("expired") {
                    HoldState::Expired
                } else {
                    HoldState::Canceled
                }
            }
            other => {
                return Err(AppError::Internal(format!(
                    "Unexpected payment intent status '{}' on '{}'",
                    other, self.id
                )))
            }
        };

        Ok(GatewayHold {
            reference: self.id,
            state,
            amount_minor: self.amount,
            captured_minor: self.amount_received,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StripeRefund {
    id: String,
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(rename = "type")]
    error_type: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_name() {
        let gateway = StripeGateway::new(
            "sk_test_123".to_string(),
            "https://api.stripe.com".to_string(),
        );
        assert_eq!(gateway.name(), "stripe");
    }

    #[test]
    fn test_intent_state_mapping() {
        let intent = StripeIntent {
            id: "pi_1".to_string(),
            status: "requires_capture".to_string(),
            amount: 8500,
            amount_received: 0,
            cancellation_reason: None,
        };
        assert_eq!(intent.into_hold().unwrap().state, HoldState::RequiresCapture);

        let captured = StripeIntent {
            id: "pi_2".to_string(),
            status: "succeeded".to_string(),
            amount: 8500,
            amount_received: 8500,
            cancellation_reason: None,
        };
        let hold = captured.into_hold().unwrap();
        assert_eq!(hold.state, HoldState::Captured);
        assert_eq!(hold.captured_minor, 8500);

        let expired = StripeIntent {
            id: "pi_3".to_string(),
            status: "canceled".to_string(),
            amount: 8500,
            amount_received: 0,
            cancellation_reason: Some("expired".to_string()),
        };
        assert_eq!(expired.into_hold().unwrap().state, HoldState::Expired);

        let unexpected = StripeIntent {
            id: "pi_4".to_string(),
            status: "processing".to_string(),
            amount: 8500,
            amount_received: 0,
            cancellation_reason: None,
        };
        assert!(unexpected.into_hold().is_err());
    }

    #[test]
    fn test_error_envelope_parsing() {
        let body = r#"{"error":{"type":"card_error","code":"card_declined","message":"Your card was declined."}}"#;
        let envelope: StripeErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.error.error_type, "card_error");
        assert_eq!(envelope.error.code.as_deref(), Some("card_declined"));
    }
}
