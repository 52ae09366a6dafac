use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::json;
use tokio::sync::RwLock;

use crate::types::{
    BookedMeeting, BookingRequest, CancelTicket, MeetingProvider, ParticipantsPayload,
    ProviderError, json_id,
};

#[derive(Debug, Clone)]
pub struct WelinkConfig {
    pub api_base: String,
    pub app_id: String,
    pub app_key: String,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// WeLink wants its own short-lived app token and raw local time strings.
pub struct WelinkProvider {
    http: Client,
    cfg: WelinkConfig,
    token: RwLock<Option<CachedToken>>,
}

impl WelinkProvider {
    pub fn new(http: Client, cfg: WelinkConfig) -> Self {
        Self {
            http,
            cfg,
            token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.api_base, path)
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Instant::now() {
                    return Ok(token.value.clone());
                }
            }
        }

        let response = self
            .http
            .post(self.url("/v1/usg/acs/token"))
            .json(&json!({
                "app_id": self.cfg.app_id,
                "app_key": self.cfg.app_key,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Auth(format!(
                "welink token endpoint returned {status}"
            )));
        }

        let body: serde_json::Value = response.json().await?;
        let value = body["access_token"]
            .as_str()
            .ok_or_else(|| ProviderError::Auth("welink token response has no access_token".to_string()))?
            .to_string();
        // Refresh one minute before the provider-reported expiry.
        let valid_period = body["valid_period"].as_u64().unwrap_or(3600).max(120);
        let expires_at = Instant::now() + Duration::from_secs(valid_period - 60);

        let mut cached = self.token.write().await;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at,
        });

        Ok(value)
    }
}

#[async_trait::async_trait]
impl MeetingProvider for WelinkProvider {
    async fn create_meeting(
        &self,
        booking: &BookingRequest,
    ) -> Result<BookedMeeting, ProviderError> {
        let token = self.access_token().await?;
        let start_time = format!(
            "{} {}",
            booking.date.format("%Y-%m-%d"),
            booking.start.format("%H:%M")
        );

        let mut payload = json!({
            "startTime": start_time,
            "length": booking.duration_minutes(),
            "subject": booking.topic,
            "mediaTypes": "HDVideo",
            "vmrFlag": 0,
        });
        if booking.record.is_cloud() {
            payload["isAutoRecord"] = json!(1);
            payload["recordType"] = json!(2);
        }

        let response = self
            .http
            .post(self.url(&format!(
                "/v1/mmc/management/conferences?userUUID={}",
                booking.host_login
            )))
            .header("X-Access-Token", &token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api { status: status.as_u16() });
        }

        let body: serde_json::Value = response.json().await?;
        let conference = &body["conferences"][0];
        let mid = json_id(&conference["conferenceID"])
            .ok_or(ProviderError::Api { status: status.as_u16() })?;

        Ok(BookedMeeting {
            mid,
            secondary_id: None,
            join_url: conference["guestJoinUri"].as_str().unwrap_or_default().to_string(),
            start_url: conference["chairJoinUri"].as_str().map(str::to_string),
            host_id: booking.host_id.clone(),
            timezone: None,
        })
    }

    async fn cancel_meeting(&self, ticket: &CancelTicket) -> Result<(), ProviderError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .delete(self.url(&format!(
                "/v1/mmc/management/conferences?conferenceID={}&userUUID={}",
                ticket.mid, ticket.host_login
            )))
            .header("X-Access-Token", &token)
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
        let token = self.access_token().await?;
        let response = self
            .http
            .get(self.url(&format!(
                "/v1/mmc/management/conferences/history/confAttendeeRecord?confUUID={}",
                ticket.mid
            )))
            .header("X-Access-Token", &token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api { status: status.as_u16() });
        }

        Ok(response.json().await?)
    }
}
