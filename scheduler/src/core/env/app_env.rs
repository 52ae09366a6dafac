use std::collections::HashMap;
use std::env;

use dotenvy::dotenv;
use provider_gateway::registry::GatewayConfig;
use provider_gateway::tencent::TencentConfig;
use provider_gateway::welink::WelinkConfig;
use provider_gateway::zoom::ZoomConfig;

/// Static per-platform host pool: platform -> (host_id -> provider login).
pub type MeetingHosts = HashMap<String, HashMap<String, String>>;

#[derive(Debug, Clone)]
pub struct AppEnv {
    pub app_port: u16,
    pub community: String,
    pub timezone: String,
    pub db_uri: DbUri,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub wechat: WechatConfig,
    pub zoom: ZoomConfig,
    pub welink: WelinkConfig,
    pub tencent: TencentConfig,
    pub meeting_hosts: MeetingHosts,
    pub provider_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct DbUri(pub String);

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub jwt_token: String,
    pub refresh_token: String,
    pub token_expires_in_seconds: i64,
    pub refresh_token_expires_in_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct WechatConfig {
    pub app_id: String,
    pub secret: String,
    pub token_url: String,
    pub jscode_url: String,
    pub subscribe_url: String,
    pub start_template_id: String,
    pub cancel_template_id: String,
}

impl Default for AppEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl AppEnv {
    pub fn new() -> Self {
        dotenv().ok();

        let meeting_hosts = env::var("MEETING_HOSTS")
            .ok()
            .and_then(|raw| serde_json::from_str::<MeetingHosts>(&raw).ok())
            .unwrap_or_default();

        Self {
            app_port: Self::get_env("APP_PORT", 3000),
            community: Self::get_str_env("COMMUNITY", "community".to_owned()),
            timezone: Self::get_str_env("MEETING_TIMEZONE", "Asia/Shanghai".to_owned()),
            db_uri: DbUri(env::var("DATABASE_URL").expect("DATABASE_URL must be set")),
            jwt: JwtConfig {
                jwt_token: env::var("AUTH_JWT_SECRET").expect("AUTH_JWT_SECRET must be set"),
                refresh_token: env::var("AUTH_REFRESH_SECRET")
                    .expect("AUTH_REFRESH_SECRET must be set"),
                token_expires_in_seconds: Self::get_dur_env("AUTH_JWT_TOKEN_EXPIRES_IN", 86_400), // a day
                refresh_token_expires_in_seconds: Self::get_dur_env(
                    "AUTH_REFRESH_TOKEN_EXPIRES_IN",
                    31_536_000, // a year
                ),
            },
            smtp: SmtpConfig {
                host: Self::get_str_env("SMTP_SERVER_HOST", "localhost".to_owned()),
                port: Self::get_env("SMTP_SERVER_PORT", 587),
                username: Self::get_str_env("SMTP_SERVER_USER", "".to_owned()),
                password: Self::get_str_env("SMTP_SERVER_PASS", "".to_owned()),
                from: Self::get_str_env(
                    "SMTP_FROM",
                    "Community Conference <conference@localhost>".to_owned(),
                ),
            },
            wechat: WechatConfig {
                app_id: Self::get_str_env("WX_APP_ID", "".to_owned()),
                secret: Self::get_str_env("WX_APP_SECRET", "".to_owned()),
                token_url: Self::get_str_env(
                    "WX_AUTH_URL",
                    "https://api.weixin.qq.com/cgi-bin/token".to_owned(),
                ),
                jscode_url: Self::get_str_env(
                    "WX_JSCODE2SESSION_URL",
                    "https://api.weixin.qq.com/sns/jscode2session".to_owned(),
                ),
                subscribe_url: Self::get_str_env(
                    "WX_SEND_SUBSCRIPTION_URL",
                    "https://api.weixin.qq.com/cgi-bin/message/subscribe/send".to_owned(),
                ),
                start_template_id: Self::get_str_env("WX_START_TEMPLATE_ID", "".to_owned()),
                cancel_template_id: Self::get_str_env("WX_CANCEL_TEMPLATE_ID", "".to_owned()),
            },
            zoom: ZoomConfig {
                api_base: Self::get_str_env("ZOOM_API_BASE", "https://api.zoom.us".to_owned()),
                storage_access_key: Self::get_str_env("ZOOM_STORAGE_ACCESS_KEY", "".to_owned()),
                storage_secret_key: Self::get_str_env("ZOOM_STORAGE_SECRET_KEY", "".to_owned()),
                storage_endpoint: Self::get_str_env("ZOOM_STORAGE_ENDPOINT", "".to_owned()),
                storage_region: Self::get_str_env("ZOOM_STORAGE_REGION", "auto".to_owned()),
                token_bucket: Self::get_str_env("ZOOM_TOKEN_BUCKET", "".to_owned()),
                token_object: Self::get_str_env("ZOOM_TOKEN_OBJECT", "".to_owned()),
            },
            welink: WelinkConfig {
                api_base: Self::get_str_env(
                    "WELINK_API_BASE",
                    "https://api.meeting.huaweicloud.com".to_owned(),
                ),
                app_id: Self::get_str_env("WELINK_APP_ID", "".to_owned()),
                app_key: Self::get_str_env("WELINK_APP_KEY", "".to_owned()),
            },
            tencent: TencentConfig {
                api_base: Self::get_str_env(
                    "TX_API_BASE",
                    "https://api.meeting.qq.com".to_owned(),
                ),
                app_id: Self::get_str_env("TX_MEETING_APPID", "".to_owned()),
                sdk_id: Self::get_str_env("TX_MEETING_SDKID", "".to_owned()),
                secret_id: Self::get_str_env("TX_MEETING_SECRETID", "".to_owned()),
                secret_key: Self::get_str_env("TX_MEETING_SECRETKEY", "".to_owned()),
            },
            meeting_hosts,
            provider_timeout_secs: Self::get_dur_env("PROVIDER_HTTP_TIMEOUT", 30) as u64,
        }
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            zoom: self.zoom.clone(),
            welink: self.welink.clone(),
            tencent: self.tencent.clone(),
            http_timeout_secs: self.provider_timeout_secs,
        }
    }

    fn get_env(var: &str, default: u16) -> u16 {
        env::var(var)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_str_env(var: &str, default: String) -> String {
        env::var(var)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_dur_env(var: &str, default: i64) -> i64 {
        env::var(var)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}
