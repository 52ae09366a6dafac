use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::core::env::app_env::WechatConfig;
use crate::core::types::errors::notify_error::NotifyError;

/// Subscription-message bodies cap their `thing` fields at 20 characters.
const TOPIC_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct WxClient {
    http: Client,
    cfg: WechatConfig,
}

impl WxClient {
    pub fn new(cfg: WechatConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { http, cfg })
    }

    /// Short-lived token, fetched fresh per send batch.
    pub async fn access_token(&self) -> Result<String, NotifyError> {
        let response = self
            .http
            .get(&self.cfg.token_url)
            .query(&[
                ("appid", self.cfg.app_id.as_str()),
                ("secret", self.cfg.secret.as_str()),
                ("grant_type", "client_credential"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Wechat(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        body["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| NotifyError::Wechat(format!("no access_token in response: {body}")))
    }

    /// Exchanges a mini-program login code for the user's openid.
    pub async fn jscode_to_openid(&self, code: &str) -> Result<String, NotifyError> {
        let response = self
            .http
            .get(&self.cfg.jscode_url)
            .query(&[
                ("appid", self.cfg.app_id.as_str()),
                ("secret", self.cfg.secret.as_str()),
                ("js_code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let body: Value = response.json().await?;
        body["openid"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| NotifyError::Wechat(format!("login code rejected: {body}")))
    }

    pub fn start_template(&self, openid: &str, meeting_id: i32, topic: &str, time: &str) -> Value {
        json!({
            "touser": openid,
            "template_id": self.cfg.start_template_id,
            "page": format!("/pages/meeting/detail?id={meeting_id}"),
            "lang": "zh-CN",
            "data": {
                "thing7": { "value": truncate_topic(topic) },
                "date2": { "value": time },
                "thing6": { "value": "会议即将开始" },
            },
        })
    }

    pub fn cancel_template(&self, openid: &str, topic: &str, time: &str, mid: &str) -> Value {
        json!({
            "touser": openid,
            "template_id": self.cfg.cancel_template_id,
            "page": "/pages/index/index",
            "lang": "zh-CN",
            "data": {
                "thing1": { "value": truncate_topic(topic) },
                "time2": { "value": time },
                "thing4": { "value": format!("会议{mid}已被取消") },
            },
        })
    }

    pub async fn send_subscription(
        &self,
        content: &Value,
        access_token: &str,
    ) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.cfg.subscribe_url)
            .query(&[("access_token", access_token)])
            .json(content)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Wechat(format!(
                "subscription endpoint returned {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let errcode = body["errcode"].as_i64().unwrap_or(0);
        if errcode != 0 {
            warn!(
                "subscription message rejected, errcode: {}, errmsg: {}",
                errcode,
                body["errmsg"].as_str().unwrap_or("")
            );
        } else {
            info!("subscription message sent to {}", content["touser"].as_str().unwrap_or(""));
        }

        Ok(())
    }
}

fn truncate_topic(topic: &str) -> String {
    if topic.chars().count() > TOPIC_LIMIT {
        topic.chars().take(TOPIC_LIMIT).collect()
    } else {
        topic.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_topic_keeps_short_values() {
        assert_eq!(truncate_topic("Weekly Sync"), "Weekly Sync");
    }

    #[test]
    fn test_truncate_topic_counts_characters_not_bytes() {
        let topic = "社区例会社区例会社区例会社区例会社区例会超出";
        let truncated = truncate_topic(topic);
        assert_eq!(truncated.chars().count(), 20);
        assert!(topic.starts_with(&truncated));
    }
}
