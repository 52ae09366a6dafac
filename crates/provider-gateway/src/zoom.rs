use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    Client as S3Client,
    config::{Region, SharedCredentialsProvider},
};
use rand::Rng;
use reqwest::Client;
use serde_json::json;

use crate::types::{
    BookedMeeting, BookingRequest, CancelTicket, MeetingProvider, ParticipantsPayload,
    ProviderError, civil_to_utc, json_id,
};

/// The long-lived OAuth token is refreshed out-of-band and kept as metadata
/// on an object-store object; this adapter only ever reads it back.
#[derive(Debug, Clone)]
pub struct ZoomConfig {
    pub api_base: String,
    pub storage_access_key: String,
    pub storage_secret_key: String,
    pub storage_endpoint: String,
    pub storage_region: String,
    pub token_bucket: String,
    pub token_object: String,
}

pub struct ZoomProvider {
    http: Client,
    storage: S3Client,
    cfg: ZoomConfig,
}

impl ZoomProvider {
    pub fn new(http: Client, cfg: ZoomConfig) -> Self {
        let credentials = Credentials::new(
            cfg.storage_access_key.clone(),
            cfg.storage_secret_key.clone(),
            None,
            None,
            "zoom_token_store",
        );

        let sdk_config = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(cfg.storage_endpoint.clone())
            .region(Region::new(cfg.storage_region.clone()))
            .credentials_provider(SharedCredentialsProvider::new(credentials))
            .build();

        let storage = S3Client::new(&sdk_config);

        Self { http, storage, cfg }
    }

    async fn oauth_token(&self) -> Result<String, ProviderError> {
        let head = self
            .storage
            .head_object()
            .bucket(&self.cfg.token_bucket)
            .key(&self.cfg.token_object)
            .send()
            .await
            .map_err(|err| ProviderError::Auth(format!("failed to read zoom token: {err}")))?;

        head.metadata()
            .and_then(|meta| meta.get("access_token"))
            .cloned()
            .ok_or_else(|| ProviderError::Auth("zoom token object has no access_token".to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.api_base, path)
    }
}

#[async_trait::async_trait]
impl MeetingProvider for ZoomProvider {
    async fn create_meeting(
        &self,
        booking: &BookingRequest,
    ) -> Result<BookedMeeting, ProviderError> {
        let start_time = civil_to_utc(booking.date, booking.start)
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string();
        let password = rand::rng().random_range(100_000..=999_999).to_string();
        let token = self.oauth_token().await?;

        let auto_recording = if booking.record.is_cloud() { "cloud" } else { "none" };
        let payload = json!({
            "start_time": start_time,
            "duration": booking.duration_minutes(),
            "topic": booking.topic,
            "password": password,
            "settings": {
                "waiting_room": false,
                "auto_recording": auto_recording,
                "join_before_host": true,
                "jbh_time": 5,
            },
        });

        let response = self
            .http
            .post(self.url(&format!("/v2/users/{}/meetings", booking.host_login)))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 201 {
            return Err(ProviderError::Api { status: status.as_u16() });
        }

        let body: serde_json::Value = response.json().await?;
        let mid = json_id(&body["id"])
            .ok_or(ProviderError::Api { status: status.as_u16() })?;

        Ok(BookedMeeting {
            mid,
            secondary_id: None,
            join_url: body["join_url"].as_str().unwrap_or_default().to_string(),
            start_url: body["start_url"].as_str().map(str::to_string),
            host_id: json_id(&body["host_id"]).unwrap_or_else(|| booking.host_id.clone()),
            timezone: body["timezone"].as_str().map(str::to_string),
        })
    }

    async fn cancel_meeting(&self, ticket: &CancelTicket) -> Result<(), ProviderError> {
        let token = self.oauth_token().await?;
        let response = self
            .http
            .delete(self.url(&format!("/v2/meetings/{}", ticket.mid)))
            .bearer_auth(&token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api { status: status.as_u16() });
        }
        Ok(())
    }

    async fn get_participants(
        &self,
        ticket: &CancelTicket,
    ) -> Result<ParticipantsPayload, ProviderError> {
        let token = self.oauth_token().await?;
        let response = self
            .http
            .get(self.url(&format!(
                "/v2/past_meetings/{}/participants?page_size=300",
                ticket.mid
            )))
            .bearer_auth(&token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api { status: status.as_u16() });
        }

        let body: serde_json::Value = response.json().await?;
        Ok(json!({
            "total_records": body["total_records"],
            "participants": body["participants"],
        }))
    }
}
