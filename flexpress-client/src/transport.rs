use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use flexpress_domain::feedback::Feedback;
use flexpress_domain::identity::UserProfile;
use flexpress_domain::matching::{CharterCandidate, MatchSearchDraft, TravelMatch};
use flexpress_domain::message::Message;
use flexpress_domain::payment::Payment;
use flexpress_domain::trip::Trip;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error: {0}")]
    Api(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSearchResponse {
    pub travel_match: TravelMatch,
    pub charters: Vec<CharterCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripCreatedResponse {
    pub travel_match: TravelMatch,
    pub trip: Trip,
}

/// Confirmation carries the authoritative post-debit balance; the client
/// never computes the debit itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripConfirmResponse {
    pub trip: Trip,
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRequest {
    pub rating: u8,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateReportRequest {
    pub reported_user_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub match_id: Option<Uuid>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentRequest {
    pub credits: i64,
    pub amount: i64,
    pub receipt_url: String,
}

/// One method per remote operation the lifecycle controllers drive. The
/// server owns all matching, pricing and persistence; this seam is the whole
/// of the client's view of it.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn create_match_search(
        &self,
        draft: &MatchSearchDraft,
    ) -> Result<MatchSearchResponse, TransportError>;

    async fn select_charter(
        &self,
        match_id: Uuid,
        charter_id: Uuid,
    ) -> Result<TravelMatch, TransportError>;

    async fn charter_respond(
        &self,
        match_id: Uuid,
        accept: bool,
    ) -> Result<TravelMatch, TransportError>;

    async fn create_trip(&self, match_id: Uuid) -> Result<TripCreatedResponse, TransportError>;

    async fn accept_trip(&self, trip_id: Uuid) -> Result<Trip, TransportError>;

    async fn charter_complete(&self, trip_id: Uuid) -> Result<Trip, TransportError>;

    async fn client_confirm(&self, trip_id: Uuid) -> Result<TripConfirmResponse, TransportError>;

    async fn cancel_trip(&self, trip_id: Uuid) -> Result<Trip, TransportError>;

    async fn create_payment(&self, req: &CreatePaymentRequest) -> Result<Payment, TransportError>;

    async fn approve_payment(&self, payment_id: Uuid) -> Result<Payment, TransportError>;

    async fn reject_payment(
        &self,
        payment_id: Uuid,
        reason: &str,
    ) -> Result<Payment, TransportError>;

    async fn send_message(
        &self,
        conversation_id: Uuid,
        body: &str,
    ) -> Result<Message, TransportError>;

    async fn submit_feedback(
        &self,
        trip_id: Uuid,
        req: &FeedbackRequest,
    ) -> Result<Feedback, TransportError>;

    async fn create_report(&self, req: &CreateReportRequest) -> Result<(), TransportError>;

    async fn fetch_profile(&self, user_id: Uuid) -> Result<UserProfile, TransportError>;
}

/// Unwrap the `{success, data}` envelope, tolerating one extra nested layer
/// (some endpoints double-wrap). A `success: false` envelope becomes an Api
/// error; anything undeserializable becomes Malformed.
pub fn unwrap_envelope<T: DeserializeOwned>(value: Value) -> Result<T, TransportError> {
    #[derive(Deserialize)]
    struct Envelope {
        success: bool,
        #[serde(default)]
        data: Value,
        #[serde(default)]
        message: Option<String>,
    }

    let envelope: Envelope = serde_json::from_value(value)
        .map_err(|e| TransportError::Malformed(format!("missing envelope: {}", e)))?;
    if !envelope.success {
        return Err(TransportError::Api(
            envelope.message.unwrap_or_else(|| "request failed".to_string()),
        ));
    }

    let mut data = envelope.data;
    // Defensive second unwrap for double-wrapped payloads.
    if data.get("success").is_some() && data.get("data").is_some() {
        let nested: Envelope = serde_json::from_value(data)
            .map_err(|e| TransportError::Malformed(format!("bad nested envelope: {}", e)))?;
        if !nested.success {
            return Err(TransportError::Api(
                nested.message.unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        data = nested.data;
    }

    serde_json::from_value(data).map_err(|e| TransportError::Malformed(e.to_string()))
}

/// REST transport against the Flexpress API.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            auth_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = self.authorize(req).send().await?;
        let body: Value = response.json().await?;
        unwrap_envelope(body)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        self.execute(self.http.get(self.url(path))).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        self.execute(self.http.post(self.url(path)).json(body)).await
    }

    async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        self.execute(self.http.put(self.url(path)).json(body)).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        self.execute(self.http.patch(self.url(path)).json(body)).await
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn create_match_search(
        &self,
        draft: &MatchSearchDraft,
    ) -> Result<MatchSearchResponse, TransportError> {
        self.post("/travel-matching/matches", draft).await
    }

    async fn select_charter(
        &self,
        match_id: Uuid,
        charter_id: Uuid,
    ) -> Result<TravelMatch, TransportError> {
        self.put(
            &format!("/travel-matching/matches/{}/select-charter", match_id),
            &serde_json::json!({ "charterId": charter_id }),
        )
        .await
    }

    async fn charter_respond(
        &self,
        match_id: Uuid,
        accept: bool,
    ) -> Result<TravelMatch, TransportError> {
        self.put(
            &format!("/travel-matching/charter/matches/{}/respond", match_id),
            &serde_json::json!({ "accept": accept }),
        )
        .await
    }

    async fn create_trip(&self, match_id: Uuid) -> Result<TripCreatedResponse, TransportError> {
        self.post(
            &format!("/travel-matching/matches/{}/create-trip", match_id),
            &serde_json::json!({}),
        )
        .await
    }

    async fn accept_trip(&self, trip_id: Uuid) -> Result<Trip, TransportError> {
        self.put(&format!("/trips/{}/accept", trip_id), &serde_json::json!({})).await
    }

    async fn charter_complete(&self, trip_id: Uuid) -> Result<Trip, TransportError> {
        self.put(&format!("/trips/{}/charter-complete", trip_id), &serde_json::json!({}))
            .await
    }

    async fn client_confirm(&self, trip_id: Uuid) -> Result<TripConfirmResponse, TransportError> {
        self.put(&format!("/trips/{}/client-confirm", trip_id), &serde_json::json!({}))
            .await
    }

    async fn cancel_trip(&self, trip_id: Uuid) -> Result<Trip, TransportError> {
        self.post(&format!("/trips/{}/cancel", trip_id), &serde_json::json!({})).await
    }

    async fn create_payment(&self, req: &CreatePaymentRequest) -> Result<Payment, TransportError> {
        self.post("/payments", req).await
    }

    async fn approve_payment(&self, payment_id: Uuid) -> Result<Payment, TransportError> {
        self.patch(&format!("/payments/{}/approve", payment_id), &serde_json::json!({}))
            .await
    }

    async fn reject_payment(
        &self,
        payment_id: Uuid,
        reason: &str,
    ) -> Result<Payment, TransportError> {
        self.patch(
            &format!("/payments/{}/reject", payment_id),
            &serde_json::json!({ "reason": reason }),
        )
        .await
    }

    async fn send_message(
        &self,
        conversation_id: Uuid,
        body: &str,
    ) -> Result<Message, TransportError> {
        self.post(
            &format!("/conversations/{}/messages", conversation_id),
            &serde_json::json!({ "body": body }),
        )
        .await
    }

    async fn submit_feedback(
        &self,
        trip_id: Uuid,
        req: &FeedbackRequest,
    ) -> Result<Feedback, TransportError> {
        self.post(&format!("/trips/{}/feedback", trip_id), req).await
    }

    async fn create_report(&self, req: &CreateReportRequest) -> Result<(), TransportError> {
        let _: Value = self.post("/reports", req).await?;
        Ok(())
    }

    async fn fetch_profile(&self, user_id: Uuid) -> Result<UserProfile, TransportError> {
        self.get(&format!("/users/{}", user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_wrapped() {
        let value = json!({ "success": true, "data": { "balance": 42 } });

        #[derive(Deserialize)]
        struct Payload {
            balance: i64,
        }
        let payload: Payload = unwrap_envelope(value).unwrap();
        assert_eq!(payload.balance, 42);
    }

    #[test]
    fn test_double_wrapped() {
        let value = json!({
            "success": true,
            "data": { "success": true, "data": { "balance": 42 } }
        });

        #[derive(Deserialize)]
        struct Payload {
            balance: i64,
        }
        let payload: Payload = unwrap_envelope(value).unwrap();
        assert_eq!(payload.balance, 42);
    }

    #[test]
    fn test_failure_envelope_becomes_api_error() {
        let value = json!({ "success": false, "message": "match expired" });
        let result: Result<Value, _> = unwrap_envelope(value);
        assert!(matches!(result, Err(TransportError::Api(msg)) if msg == "match expired"));
    }

    #[test]
    fn test_malformed_body() {
        #[derive(Deserialize)]
        struct Payload {
            #[allow(dead_code)]
            balance: i64,
        }

        let no_envelope: Result<Payload, _> = unwrap_envelope(json!("not an envelope"));
        assert!(matches!(no_envelope, Err(TransportError::Malformed(_))));

        let wrong_shape: Result<Payload, _> =
            unwrap_envelope(json!({ "success": true, "data": { "other": 1 } }));
        assert!(matches!(wrong_shape, Err(TransportError::Malformed(_))));
    }

    #[test]
    fn test_nested_failure_is_surfaced() {
        let value = json!({
            "success": true,
            "data": { "success": false, "data": {}, "message": "insufficient credits" }
        });
        let result: Result<Value, _> = unwrap_envelope(value);
        assert!(matches!(result, Err(TransportError::Api(msg)) if msg == "insufficient credits"));
    }
}
