use thiserror::Error;

/// Notification failures never propagate to the request that triggered
/// them; they exist only to be logged by the dispatcher.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("wechat api rejected the call: {0}")]
    Wechat(String),

    #[error("smtp failure: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("failed to build mail message: {0}")]
    Mail(#[from] lettre::error::Error),

    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("invalid mail content type: {0}")]
    ContentType(String),
}
