use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use reqwest::Client;
use serde_json::json;
use sha2::Sha256;

use crate::types::{
    BookedMeeting, BookingRequest, CancelTicket, MeetingProvider, ParticipantsPayload,
    ProviderError, civil_timestamp, json_id,
};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct TencentConfig {
    pub api_base: String,
    pub app_id: String,
    pub sdk_id: String,
    pub secret_id: String,
    pub secret_key: String,
}

/// Tencent Meeting signs every request with HMAC-SHA256 over the method,
/// the X-TC-* header string, the uri (including query) and the exact body.
pub struct TencentProvider {
    http: Client,
    cfg: TencentConfig,
}

impl TencentProvider {
    pub fn new(http: Client, cfg: TencentConfig) -> Self {
        Self { http, cfg }
    }

    fn url(&self, uri: &str) -> String {
        format!("{}{}", self.cfg.api_base, uri)
    }

    fn signature(
        secret_key: &str,
        secret_id: &str,
        nonce: &str,
        timestamp: &str,
        method: &str,
        uri: &str,
        body: &str,
    ) -> Result<String, ProviderError> {
        let header_string =
            format!("X-TC-Key={secret_id}&X-TC-Nonce={nonce}&X-TC-Timestamp={timestamp}");
        let msg = format!("{method}\n{header_string}\n{uri}\n{body}");

        let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
            .map_err(|err| ProviderError::Auth(format!("invalid tencent secret key: {err}")))?;
        mac.update(msg.as_bytes());
        let hexed = hex::encode(mac.finalize().into_bytes());

        Ok(BASE64.encode(hexed))
    }

    fn signed_headers(
        &self,
        method: &str,
        uri: &str,
        body: &str,
    ) -> Result<Vec<(&'static str, String)>, ProviderError> {
        let timestamp = Utc::now().timestamp().to_string();
        let nonce = rand::rng().random_range(0..1_000_000).to_string();
        let signature = Self::signature(
            &self.cfg.secret_key,
            &self.cfg.secret_id,
            &nonce,
            &timestamp,
            method,
            uri,
            body,
        )?;

        Ok(vec![
            ("X-TC-Key", self.cfg.secret_id.clone()),
            ("X-TC-Nonce", nonce),
            ("X-TC-Timestamp", timestamp),
            ("X-TC-Signature", signature),
            ("AppId", self.cfg.app_id.clone()),
            ("SdkId", self.cfg.sdk_id.clone()),
            ("X-TC-Registered", "1".to_string()),
        ])
    }

    fn ticket_mmid(ticket: &CancelTicket) -> Result<&str, ProviderError> {
        ticket
            .secondary_id
            .as_deref()
            .ok_or_else(|| ProviderError::MissingMeetingId(ticket.mid.clone()))
    }
}

#[async_trait::async_trait]
impl MeetingProvider for TencentProvider {
    async fn create_meeting(
        &self,
        booking: &BookingRequest,
    ) -> Result<BookedMeeting, ProviderError> {
        let mut payload = json!({
            "userid": booking.host_login,
            "instanceid": 1,
            "subject": booking.topic,
            "type": 0,
            "start_time": civil_timestamp(booking.date, booking.start).to_string(),
            "end_time": civil_timestamp(booking.date, booking.end).to_string(),
            "settings": {
                "mute_enable_join": true,
            },
        });
        if booking.record.is_cloud() {
            payload["settings"]["auto_record_type"] = json!("cloud");
            payload["settings"]["participant_join_auto_record"] = json!(true);
            payload["settings"]["enable_host_pause_auto_record"] = json!(true);
        }

        let uri = "/v1/meetings";
        let body = payload.to_string();
        let headers = self.signed_headers("POST", uri, &body)?;

        let mut request = self
            .http
            .post(self.url(uri))
            .header("content-type", "application/json")
            .body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(ProviderError::Api { status: status.as_u16() });
        }

        let body: serde_json::Value = response.json().await?;
        let info = &body["meeting_info_list"][0];
        let mid = json_id(&info["meeting_code"])
            .ok_or(ProviderError::Api { status: status.as_u16() })?;

        Ok(BookedMeeting {
            mid,
            secondary_id: json_id(&info["meeting_id"]),
            join_url: info["join_url"].as_str().unwrap_or_default().to_string(),
            start_url: None,
            host_id: booking.host_id.clone(),
            timezone: None,
        })
    }

    async fn cancel_meeting(&self, ticket: &CancelTicket) -> Result<(), ProviderError> {
        let mmid = Self::ticket_mmid(ticket)?;
        let payload = json!({
            "userid": ticket.host_login,
            "instanceid": 1,
            "reason_code": 1,
        });

        let uri = format!("/v1/meetings/{mmid}/cancel");
        let body = payload.to_string();
        let headers = self.signed_headers("POST", &uri, &body)?;

        let mut request = self
            .http
            .post(self.url(&uri))
            .header("content-type", "application/json")
            .body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(ProviderError::Api { status: status.as_u16() });
        }
        Ok(())
    }

    async fn get_participants(
        &self,
        ticket: &CancelTicket,
    ) -> Result<ParticipantsPayload, ProviderError> {
        let mmid = Self::ticket_mmid(ticket)?;
        let uri = format!(
            "/v1/meetings/{}/participants?userid={}",
            mmid, ticket.host_login
        );
        let headers = self.signed_headers("GET", &uri, "")?;

        let mut request = self.http.get(self.url(&uri));
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api { status: status.as_u16() });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_deterministic() {
        let a = TencentProvider::signature(
            "secret", "id", "42", "1700000000", "POST", "/v1/meetings", "{}",
        )
        .unwrap();
        let b = TencentProvider::signature(
            "secret", "id", "42", "1700000000", "POST", "/v1/meetings", "{}",
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_covers_body() {
        let a = TencentProvider::signature(
            "secret", "id", "42", "1700000000", "POST", "/v1/meetings", "{\"a\":1}",
        )
        .unwrap();
        let b = TencentProvider::signature(
            "secret", "id", "42", "1700000000", "POST", "/v1/meetings", "{\"a\":2}",
        )
        .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_signature_is_base64_of_hex_digest() {
        let sig = TencentProvider::signature(
            "secret", "id", "42", "1700000000", "GET", "/v1/meetings/1/participants?userid=u", "",
        )
        .unwrap();
        let decoded = BASE64.decode(sig).unwrap();
        // hex form of a sha256 digest
        assert_eq!(decoded.len(), 64);
        assert!(decoded.iter().all(u8::is_ascii_hexdigit));
    }

    #[test]
    fn test_cancel_requires_recorded_meeting_id() {
        let ticket = CancelTicket {
            mid: "123456789".to_string(),
            secondary_id: None,
            host_id: "host-1".to_string(),
            host_login: "host-1".to_string(),
        };
        assert!(matches!(
            TencentProvider::ticket_mmid(&ticket),
            Err(ProviderError::MissingMeetingId(_))
        ));
    }
}
