//! One-shot sweep that pushes "about to start" subscription messages for
//! meetings beginning in the next few minutes. Run it from cron or a
//! systemd timer at a fixed interval.

use chrono::{Duration, NaiveTime};
use tracing::{error, info};

use scheduler::core::{
    database::db::establish_connection,
    env::app_env::AppEnv,
    utils::{time_utils::civil_now, wx_utils::WxClient},
};
use scheduler::features::auth::repository::{UserRepository, UserRepositoryImpl};
use scheduler::features::meeting::repository::{MeetingRepository, MeetingRepositoryImpl};
use scheduler::features::notify::dispatcher::send_start_messages;

const LOOKAHEAD_MINUTES: i64 = 10;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt().init();

    let env = AppEnv::new();
    let pool = establish_connection(env.clone());
    let meeting_repository = MeetingRepositoryImpl::new(pool.clone());
    let user_repository = UserRepositoryImpl::new(pool);
    let wx_client = WxClient::new(env.wechat.clone())?;

    info!("start to search meetings...");
    let now = civil_now();
    let until = now + Duration::minutes(LOOKAHEAD_MINUTES);
    // Same-date window; a sweep started just before midnight picks next-day
    // meetings up on its following run.
    let until_time = if until.date() != now.date() {
        NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(until.time())
    } else {
        until.time()
    };

    let meetings = meeting_repository
        .find_starting_between(now.date(), now.time(), until_time)
        .await?;
    if meetings.is_empty() {
        info!("no meeting found, skip meeting notify.");
        return Ok(());
    }

    for meeting in meetings {
        let mut openids = Vec::new();
        match user_repository.get_user_by_id(meeting.user_id).await {
            Ok(creator) => {
                if let Some(openid) = creator.openid {
                    openids.push(openid);
                }
            }
            Err(err) => error!("creator of meeting {} not found: {}", meeting.mid, err),
        }

        let collections = meeting_repository.collects_for_meeting(meeting.id).await?;
        if collections.is_empty() {
            info!("the meeting {} had not been added to Favorites", meeting.mid);
        }
        for collect in collections {
            if let Ok(user) = user_repository.get_user_by_id(collect.user_id).await {
                if let Some(openid) = user.openid {
                    if !openids.contains(&openid) {
                        openids.push(openid);
                    }
                }
            }
        }

        if openids.is_empty() {
            continue;
        }
        if let Err(err) = send_start_messages(&wx_client, &meeting, &openids).await {
            error!("failed to notify meeting {}: {}", meeting.mid, err);
        }
    }

    Ok(())
}
