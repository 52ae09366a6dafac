pub mod registry;
pub mod tencent;
pub mod types;
pub mod welink;
pub mod zoom;

pub use registry::{GatewayConfig, ProviderDriver, ProviderRegistry};
pub use types::{
    BookedMeeting, BookingRequest, CancelTicket, MeetingPlatform, ParticipantsPayload,
    ProviderError, RecordMode,
};
