use std::time::Duration;

use async_channel::Receiver;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::core::entities::models::Meeting;
use crate::core::types::errors::notify_error::NotifyError;
use crate::core::utils::wx_utils::WxClient;
use crate::features::notify::email::EmailSender;

const MAIL_ATTEMPTS: u32 = 3;
const MAIL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Lifecycle side effects, queued by the meeting service and drained on a
/// background task so the HTTP response never waits on SMTP or WeChat.
#[derive(Debug, Clone)]
pub enum NotifyEvent {
    Created { meeting: Meeting, record: bool },
    Cancelled { meeting: Meeting, openids: Vec<String> },
}

pub fn spawn_dispatcher(
    receiver: Receiver<NotifyEvent>,
    mailer: EmailSender,
    wx: WxClient,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            match event {
                NotifyEvent::Created { meeting, record } => {
                    let mailer = mailer.clone();
                    let mid = meeting.mid.clone();
                    deliver_mail_with_retry(&mid, "creation", move || {
                        mailer.send_created(&meeting, record)
                    })
                    .await;
                }
                NotifyEvent::Cancelled { meeting, openids } => {
                    let mailer = mailer.clone();
                    let mail_meeting = meeting.clone();
                    deliver_mail_with_retry(&meeting.mid, "cancellation", move || {
                        mailer.send_cancelled(&mail_meeting)
                    })
                    .await;

                    if !openids.is_empty() {
                        if let Err(err) = send_cancel_messages(&wx, &meeting, &openids).await {
                            error!(
                                "failed to push cancel messages for meeting {}: {}",
                                meeting.mid, err
                            );
                        }
                    }
                }
            }
        }
    })
}

/// SMTP runs on the blocking pool; transient failures get a short doubling
/// backoff before the send is abandoned with a log entry.
async fn deliver_mail_with_retry<F>(mid: &str, kind: &str, send: F)
where
    F: Fn() -> Result<(), NotifyError> + Clone + Send + Sync + 'static,
{
    let mut delay = MAIL_RETRY_DELAY;
    for attempt in 1..=MAIL_ATTEMPTS {
        let send = send.clone();
        match tokio::task::spawn_blocking(send).await {
            Ok(Ok(())) => return,
            Ok(Err(err)) if attempt < MAIL_ATTEMPTS => {
                warn!("{kind} mail for meeting {mid} failed (attempt {attempt}): {err}");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Ok(Err(err)) => {
                error!("giving up on {kind} mail for meeting {mid}: {err}");
            }
            Err(err) => {
                error!("{kind} mail task for meeting {mid} aborted: {err}");
                return;
            }
        }
    }
}

async fn send_cancel_messages(
    wx: &WxClient,
    meeting: &Meeting,
    openids: &[String],
) -> Result<(), NotifyError> {
    let access_token = wx.access_token().await?;
    let time = meeting_time(meeting);

    for openid in openids {
        let content = wx.cancel_template(openid, &meeting.topic, &time, &meeting.mid);
        if let Err(err) = wx.send_subscription(&content, &access_token).await {
            error!("cancel message for meeting {} failed: {}", meeting.mid, err);
        }
    }

    Ok(())
}

/// Near-term reminder fan-out used by the periodic sweep.
pub async fn send_start_messages(
    wx: &WxClient,
    meeting: &Meeting,
    openids: &[String],
) -> Result<(), NotifyError> {
    let access_token = wx.access_token().await?;
    let time = meeting_time(meeting);

    for openid in openids {
        let content = wx.start_template(openid, meeting.id, &meeting.topic, &time);
        if let Err(err) = wx.send_subscription(&content, &access_token).await {
            error!("start message for meeting {} failed: {}", meeting.mid, err);
        } else {
            info!("meeting {} subscription message sent.", meeting.mid);
        }
    }

    Ok(())
}

fn meeting_time(meeting: &Meeting) -> String {
    format!(
        "{} {}",
        meeting.date.format("%Y-%m-%d"),
        meeting.start_time.format("%H:%M")
    )
}
