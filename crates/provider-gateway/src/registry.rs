use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::tencent::{TencentConfig, TencentProvider};
use crate::types::{
    BookedMeeting, BookingRequest, CancelTicket, MeetingPlatform, MeetingProvider,
    ParticipantsPayload, ProviderError,
};
use crate::welink::{WelinkConfig, WelinkProvider};
use crate::zoom::{ZoomConfig, ZoomProvider};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub zoom: ZoomConfig,
    pub welink: WelinkConfig,
    pub tencent: TencentConfig,
    /// Bound on every outbound provider call; a timeout surfaces as a
    /// transport error, never a hang.
    pub http_timeout_secs: u64,
}

/// Dispatch seam between the meeting lifecycle and the per-provider
/// adapters. Adding a platform means one adapter plus one arm here.
#[async_trait::async_trait]
pub trait ProviderDriver: Send + Sync {
    async fn create_meeting(
        &self,
        platform: MeetingPlatform,
        booking: &BookingRequest,
    ) -> Result<BookedMeeting, ProviderError>;

    async fn cancel_meeting(
        &self,
        platform: MeetingPlatform,
        ticket: &CancelTicket,
    ) -> Result<(), ProviderError>;

    async fn get_participants(
        &self,
        platform: MeetingPlatform,
        ticket: &CancelTicket,
    ) -> Result<ParticipantsPayload, ProviderError>;
}

pub struct ProviderRegistry {
    zoom: ZoomProvider,
    welink: WelinkProvider,
    tencent: TencentProvider,
}

impl ProviderRegistry {
    pub fn new(cfg: GatewayConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;

        Ok(Self {
            zoom: ZoomProvider::new(http.clone(), cfg.zoom),
            welink: WelinkProvider::new(http.clone(), cfg.welink),
            tencent: TencentProvider::new(http, cfg.tencent),
        })
    }

    fn provider(&self, platform: MeetingPlatform) -> &dyn MeetingProvider {
        match platform {
            MeetingPlatform::Zoom => &self.zoom,
            MeetingPlatform::Welink => &self.welink,
            MeetingPlatform::Tencent => &self.tencent,
        }
    }
}

#[async_trait::async_trait]
impl ProviderDriver for ProviderRegistry {
    async fn create_meeting(
        &self,
        platform: MeetingPlatform,
        booking: &BookingRequest,
    ) -> Result<BookedMeeting, ProviderError> {
        self.provider(platform).create_meeting(booking).await
    }

    async fn cancel_meeting(
        &self,
        platform: MeetingPlatform,
        ticket: &CancelTicket,
    ) -> Result<(), ProviderError> {
        self.provider(platform).cancel_meeting(ticket).await
    }

    async fn get_participants(
        &self,
        platform: MeetingPlatform,
        ticket: &CancelTicket,
    ) -> Result<ParticipantsPayload, ProviderError> {
        self.provider(platform).get_participants(ticket).await
    }
}

#[async_trait::async_trait]
impl<T: ProviderDriver + ?Sized> ProviderDriver for Arc<T> {
    async fn create_meeting(
        &self,
        platform: MeetingPlatform,
        booking: &BookingRequest,
    ) -> Result<BookedMeeting, ProviderError> {
        (**self).create_meeting(platform, booking).await
    }

    async fn cancel_meeting(
        &self,
        platform: MeetingPlatform,
        ticket: &CancelTicket,
    ) -> Result<(), ProviderError> {
        (**self).cancel_meeting(platform, ticket).await
    }

    async fn get_participants(
        &self,
        platform: MeetingPlatform,
        ticket: &CancelTicket,
    ) -> Result<ParticipantsPayload, ProviderError> {
        (**self).get_participants(platform, ticket).await
    }
}
