use std::str::FromStr;
use std::sync::Arc;

use async_channel::Sender;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use provider_gateway::registry::{ProviderDriver, ProviderRegistry};
use provider_gateway::types::{
    BookingRequest, CancelTicket, MeetingPlatform, ParticipantsPayload, RecordMode,
};
use salvo::async_trait;
use tracing::{error, info, warn};

use crate::core::dtos::meeting::create_meeting_dto::CreateMeetingDto;
use crate::core::entities::models::{
    MEETING_ACTIVE, MEETING_DELETED, Meeting, NewCollect, NewMeeting, NewVideo, UserLevel,
};
use crate::core::env::app_env::MeetingHosts;
use crate::core::types::errors::meeting_error::MeetingError;
use crate::core::types::responses::meeting_response::MeetingResponse;
use crate::features::auth::repository::{UserRepository, UserRepositoryImpl};
use crate::features::meeting::allocation::{padded_window, pick_host};
use crate::features::meeting::repository::{MeetingRepository, MeetingRepositoryImpl};
use crate::features::notify::dispatcher::NotifyEvent;

#[async_trait]
pub trait MeetingService: Send + Sync {
    /// `now` is the civil current time, injected so validation stays
    /// deterministic under test.
    async fn create_meeting(
        &self,
        data: CreateMeetingDto,
        user_id: i32,
        now: NaiveDateTime,
    ) -> Result<MeetingResponse, MeetingError>;

    async fn cancel_meeting(&self, mid: &str, user_id: i32) -> Result<(), MeetingError>;

    async fn get_meeting(&self, mid: &str, user_id: i32) -> Result<MeetingResponse, MeetingError>;

    async fn get_participants(&self, mid: &str) -> Result<ParticipantsPayload, MeetingError>;

    async fn collect_meeting(
        &self,
        meeting_id: i32,
        user_id: i32,
        now: NaiveDateTime,
    ) -> Result<(), MeetingError>;

    async fn uncollect_meeting(&self, meeting_id: i32, user_id: i32) -> Result<(), MeetingError>;

    async fn my_collections(&self, user_id: i32) -> Result<Vec<MeetingResponse>, MeetingError>;
}

#[derive(Clone)]
pub struct MeetingServiceImpl<
    R: MeetingRepository = MeetingRepositoryImpl,
    U: UserRepository = UserRepositoryImpl,
    D: ProviderDriver = Arc<ProviderRegistry>,
> {
    meeting_repository: R,
    user_repository: U,
    driver: D,
    hosts: MeetingHosts,
    notifier: Sender<NotifyEvent>,
    community: String,
    timezone: String,
}

impl<R: MeetingRepository, U: UserRepository, D: ProviderDriver> MeetingServiceImpl<R, U, D> {
    pub fn new(
        meeting_repository: R,
        user_repository: U,
        driver: D,
        hosts: MeetingHosts,
        notifier: Sender<NotifyEvent>,
        community: String,
        timezone: String,
    ) -> Self {
        Self {
            meeting_repository,
            user_repository,
            driver,
            hosts,
            notifier,
            community,
            timezone,
        }
    }

    fn host_login(&self, platform: &str, host_id: &str) -> String {
        self.hosts
            .get(platform)
            .and_then(|hosts| hosts.get(host_id))
            .cloned()
            .unwrap_or_else(|| host_id.to_string())
    }

    fn cancel_ticket(&self, meeting: &Meeting) -> CancelTicket {
        CancelTicket {
            mid: meeting.mid.clone(),
            secondary_id: meeting.mmid.clone(),
            host_id: meeting.host_id.clone(),
            host_login: self.host_login(&meeting.mplatform, &meeting.host_id),
        }
    }

    async fn notify(&self, event: NotifyEvent) {
        if let Err(err) = self.notifier.send(event).await {
            warn!("notification channel closed: {err}");
        }
    }
}

fn parse_platform(raw: &str) -> Result<MeetingPlatform, MeetingError> {
    MeetingPlatform::from_str(&raw.to_lowercase())
        .map_err(|_| MeetingError::InvalidField(format!("platform {raw}")))
}

fn parse_civil(data: &CreateMeetingDto) -> Result<(NaiveDate, NaiveTime, NaiveTime), MeetingError> {
    let date = NaiveDate::parse_from_str(&data.date, "%Y-%m-%d")
        .map_err(|_| MeetingError::InvalidField(format!("date {}", data.date)))?;
    let start = NaiveTime::parse_from_str(&data.start, "%H:%M")
        .map_err(|_| MeetingError::InvalidField(format!("start {}", data.start)))?;
    let end = NaiveTime::parse_from_str(&data.end, "%H:%M")
        .map_err(|_| MeetingError::InvalidField(format!("end {}", data.end)))?;
    Ok((date, start, end))
}

#[async_trait]
impl<
    R: MeetingRepository + Send + Sync,
    U: UserRepository + Send + Sync,
    D: ProviderDriver + Send + Sync,
> MeetingService for MeetingServiceImpl<R, U, D>
{
    async fn create_meeting(
        &self,
        data: CreateMeetingDto,
        user_id: i32,
        now: NaiveDateTime,
    ) -> Result<MeetingResponse, MeetingError> {
        let platform = parse_platform(&data.platform)?;
        let (date, start, end) = parse_civil(&data)?;
        let record = match data.record.as_deref() {
            Some("cloud") => RecordMode::Cloud,
            _ => RecordMode::None,
        };

        if start >= end {
            warn!("The end time must be greater than the start time.");
            return Err(MeetingError::TimeConflict);
        }
        if NaiveDateTime::new(date, start) < now {
            warn!("The start time should not be earlier than the current time.");
            return Err(MeetingError::StartTimeTooEarly);
        }

        // Conflict search over the padded window; the meeting table itself
        // is the source of truth for host availability.
        let (win_start, win_end) = padded_window(start, end);
        let busy = self
            .meeting_repository
            .find_busy_hosts(platform.as_str(), date, win_start, win_end)
            .await?;
        let configured = self
            .hosts
            .get(platform.as_str())
            .ok_or_else(|| MeetingError::NoHostAvailable(platform.to_string()))?;
        let (host_id, host_login) = pick_host(configured, &busy)
            .ok_or_else(|| MeetingError::NoHostAvailable(platform.to_string()))?;
        info!("allocated host {host_id} on {platform}");

        let booking = BookingRequest {
            date,
            start,
            end,
            topic: data.topic.clone(),
            host_id,
            host_login,
            record,
        };
        let booked = self.driver.create_meeting(platform, &booking).await?;

        let new_meeting = NewMeeting {
            mid: &booked.mid,
            mmid: booked.secondary_id.as_deref(),
            topic: &data.topic,
            community: &self.community,
            sponsor: &data.sponsor,
            group_name: &data.group_name,
            group_id: data.group_id,
            date,
            start_time: start,
            end_time: end,
            timezone: booked.timezone.as_deref().unwrap_or(&self.timezone),
            etherpad: data.etherpad.as_deref(),
            agenda: data.agenda.as_deref(),
            emaillist: data.emaillist.as_deref().unwrap_or(""),
            host_id: &booked.host_id,
            join_url: &booked.join_url,
            start_url: booked.start_url.as_deref(),
            is_delete: MEETING_ACTIVE,
            user_id,
            mplatform: platform.as_str(),
            created_at: now,
        };
        let meeting = self.meeting_repository.create_meeting(new_meeting).await?;
        info!(
            "{} has created a {} meeting which mid is {}.",
            data.sponsor, platform, meeting.mid
        );

        if record.is_cloud() {
            self.meeting_repository
                .create_video(NewVideo {
                    mid: &meeting.mid,
                    topic: &meeting.topic,
                    community: &meeting.community,
                    group_name: &meeting.group_name,
                    agenda: meeting.agenda.as_deref(),
                    created_at: now,
                })
                .await?;
            info!("meeting {} was created with auto recording.", meeting.mid);
        }

        self.notify(NotifyEvent::Created {
            meeting: meeting.clone(),
            record: record.is_cloud(),
        })
        .await;

        Ok(MeetingResponse::from_meeting(&meeting, true))
    }

    async fn cancel_meeting(&self, mid: &str, user_id: i32) -> Result<(), MeetingError> {
        let meeting = self.meeting_repository.get_meeting_by_mid(mid).await?;
        if meeting.is_delete == MEETING_DELETED {
            return Err(MeetingError::MeetingNotFound(mid.to_string()));
        }

        let user = self
            .user_repository
            .get_user_by_id(user_id)
            .await
            .map_err(|_| MeetingError::NotAllowed)?;
        if meeting.user_id != user_id && user.level != UserLevel::Admin as i32 {
            return Err(MeetingError::NotAllowed);
        }

        let platform = parse_platform(&meeting.mplatform)?;

        // Best-effort: the local record must reflect the cancellation even
        // if the provider call fails transiently.
        let ticket = self.cancel_ticket(&meeting);
        match self.driver.cancel_meeting(platform, &ticket).await {
            Ok(()) => info!("Cancel meeting {mid}"),
            Err(err) => error!("Fail to cancel meeting {mid} on {platform}: {err}"),
        }

        self.meeting_repository.soft_delete_meeting(mid).await?;
        info!("meeting {mid} was cancelled by user {user_id}");

        let mut openids = Vec::new();
        match self.user_repository.get_user_by_id(meeting.user_id).await {
            Ok(creator) => {
                if let Some(openid) = creator.openid {
                    openids.push(openid);
                }
            }
            Err(err) => warn!("creator of meeting {mid} not found: {err}"),
        }
        let collections = self
            .meeting_repository
            .collects_for_meeting(meeting.id)
            .await?;
        for collect in &collections {
            if let Ok(user) = self.user_repository.get_user_by_id(collect.user_id).await {
                if let Some(openid) = user.openid {
                    if !openids.contains(&openid) {
                        openids.push(openid);
                    }
                }
            }
        }

        // The meeting no longer exists to favorite.
        self.meeting_repository
            .delete_collects_for_meeting(meeting.id)
            .await?;

        self.notify(NotifyEvent::Cancelled { meeting, openids }).await;

        Ok(())
    }

    async fn get_meeting(&self, mid: &str, user_id: i32) -> Result<MeetingResponse, MeetingError> {
        let meeting = self.meeting_repository.get_meeting_by_mid(mid).await?;
        if meeting.is_delete == MEETING_DELETED {
            return Err(MeetingError::MeetingNotFound(mid.to_string()));
        }

        Ok(MeetingResponse::from_meeting(
            &meeting,
            meeting.user_id == user_id,
        ))
    }

    async fn get_participants(&self, mid: &str) -> Result<ParticipantsPayload, MeetingError> {
        let meeting = self.meeting_repository.get_meeting_by_mid(mid).await?;
        let platform = parse_platform(&meeting.mplatform)?;
        let ticket = self.cancel_ticket(&meeting);

        Ok(self.driver.get_participants(platform, &ticket).await?)
    }

    async fn collect_meeting(
        &self,
        meeting_id: i32,
        user_id: i32,
        now: NaiveDateTime,
    ) -> Result<(), MeetingError> {
        let meeting = self.meeting_repository.get_meeting_by_id(meeting_id).await?;
        if meeting.is_delete == MEETING_DELETED {
            return Err(MeetingError::MeetingNotFound(meeting.mid));
        }

        if self
            .meeting_repository
            .collect_exists(user_id, meeting_id)
            .await?
        {
            return Ok(());
        }

        self.meeting_repository
            .create_collect(NewCollect {
                user_id,
                meeting_id,
                created_at: now,
            })
            .await?;

        Ok(())
    }

    async fn uncollect_meeting(&self, meeting_id: i32, user_id: i32) -> Result<(), MeetingError> {
        self.meeting_repository
            .delete_collect(user_id, meeting_id)
            .await?;

        Ok(())
    }

    async fn my_collections(&self, user_id: i32) -> Result<Vec<MeetingResponse>, MeetingError> {
        let meetings = self.meeting_repository.collected_meetings(user_id).await?;

        Ok(meetings
            .iter()
            .map(|meeting| MeetingResponse::from_meeting(meeting, meeting.user_id == user_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::DateTime;
    use provider_gateway::types::{BookedMeeting, ProviderError};

    use crate::core::entities::models::{Collect, User, Video};
    use crate::core::types::errors::auth_error::AuthError;

    // --- Sample Data Helpers ---
    fn epoch() -> NaiveDateTime {
        DateTime::from_timestamp(0, 0).unwrap().naive_utc()
    }

    fn test_now() -> NaiveDateTime {
        NaiveDateTime::new(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        )
    }

    fn sample_dto() -> CreateMeetingDto {
        CreateMeetingDto {
            platform: "zoom".to_string(),
            date: "2025-03-10".to_string(),
            start: "09:00".to_string(),
            end: "10:00".to_string(),
            topic: "Weekly Sync".to_string(),
            sponsor: "gopher".to_string(),
            group_name: "Infra".to_string(),
            group_id: 12,
            etherpad: Some("https://etherpad.example.org/p/infra".to_string()),
            emaillist: Some("a@example.com".to_string()),
            agenda: None,
            record: None,
        }
    }

    fn sample_user(id: i32, level: i32, openid: Option<&str>) -> User {
        User {
            id,
            nickname: format!("user-{id}"),
            gitee_name: None,
            avatar: None,
            openid: openid.map(str::to_string),
            level,
            created_at: epoch(),
        }
    }

    fn sample_meeting(mid: &str, user_id: i32, is_delete: i32) -> Meeting {
        Meeting {
            id: 1,
            mid: mid.to_string(),
            mmid: Some("55501".to_string()),
            topic: "Weekly Sync".to_string(),
            community: "community".to_string(),
            sponsor: "gopher".to_string(),
            group_name: "Infra".to_string(),
            group_id: 12,
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            timezone: "Asia/Shanghai".to_string(),
            etherpad: None,
            agenda: None,
            emaillist: "a@example.com".to_string(),
            host_id: "host-1".to_string(),
            join_url: "https://meet.example.com/j/987654321".to_string(),
            start_url: Some("https://meet.example.com/s/987654321".to_string()),
            is_delete,
            user_id,
            mplatform: "tencent".to_string(),
            created_at: epoch(),
        }
    }

    fn sample_booked() -> BookedMeeting {
        BookedMeeting {
            mid: "987654321".to_string(),
            secondary_id: None,
            join_url: "https://meet.example.com/j/987654321".to_string(),
            start_url: Some("https://meet.example.com/s/987654321".to_string()),
            host_id: "host-1".to_string(),
            timezone: None,
        }
    }

    fn single_host() -> MeetingHosts {
        let mut hosts = HashMap::new();
        let mut zoom = HashMap::new();
        zoom.insert("host-1".to_string(), "host-1@example.com".to_string());
        hosts.insert("zoom".to_string(), zoom);
        let mut tencent = HashMap::new();
        tencent.insert("host-1".to_string(), "host-1".to_string());
        hosts.insert("tencent".to_string(), tencent);
        hosts
    }

    fn meeting_from_new(new: &NewMeeting<'_>, id: i32) -> Meeting {
        Meeting {
            id,
            mid: new.mid.to_string(),
            mmid: new.mmid.map(str::to_string),
            topic: new.topic.to_string(),
            community: new.community.to_string(),
            sponsor: new.sponsor.to_string(),
            group_name: new.group_name.to_string(),
            group_id: new.group_id,
            date: new.date,
            start_time: new.start_time,
            end_time: new.end_time,
            timezone: new.timezone.to_string(),
            etherpad: new.etherpad.map(str::to_string),
            agenda: new.agenda.map(str::to_string),
            emaillist: new.emaillist.to_string(),
            host_id: new.host_id.to_string(),
            join_url: new.join_url.to_string(),
            start_url: new.start_url.map(str::to_string),
            is_delete: new.is_delete,
            user_id: new.user_id,
            mplatform: new.mplatform.to_string(),
            created_at: new.created_at,
        }
    }

    // --- Mock Repositories ---
    #[derive(Default, Clone)]
    struct MockMeetingRepository {
        busy: Vec<String>,
        meeting: Option<Meeting>,
        collections: Vec<Collect>,
        created: Arc<Mutex<Vec<Meeting>>>,
        videos: Arc<Mutex<Vec<String>>>,
        soft_deleted: Arc<Mutex<Vec<String>>>,
        collects_cleared: Arc<Mutex<Vec<i32>>>,
        collect_rows: Arc<Mutex<Vec<NewCollect>>>,
        collect_deletes: Arc<Mutex<Vec<(i32, i32)>>>,
    }

    #[async_trait]
    impl MeetingRepository for MockMeetingRepository {
        async fn create_meeting(&self, meeting: NewMeeting<'_>) -> Result<Meeting, MeetingError> {
            let row = meeting_from_new(&meeting, 1);
            self.created.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn get_meeting_by_mid(&self, mid: &str) -> Result<Meeting, MeetingError> {
            self.meeting
                .clone()
                .filter(|meeting| meeting.mid == mid)
                .ok_or(MeetingError::MeetingNotFound(mid.to_string()))
        }

        async fn get_meeting_by_id(&self, meeting_id: i32) -> Result<Meeting, MeetingError> {
            self.meeting
                .clone()
                .filter(|meeting| meeting.id == meeting_id)
                .ok_or(MeetingError::MeetingNotFound(meeting_id.to_string()))
        }

        async fn find_busy_hosts(
            &self,
            _platform: &str,
            _date: NaiveDate,
            _win_start: NaiveTime,
            _win_end: NaiveTime,
        ) -> Result<Vec<String>, MeetingError> {
            Ok(self.busy.clone())
        }

        async fn soft_delete_meeting(&self, mid: &str) -> Result<(), MeetingError> {
            self.soft_deleted.lock().unwrap().push(mid.to_string());
            Ok(())
        }

        async fn find_starting_between(
            &self,
            _date: NaiveDate,
            _after: NaiveTime,
            _until: NaiveTime,
        ) -> Result<Vec<Meeting>, MeetingError> {
            Ok(self.meeting.clone().into_iter().collect())
        }

        async fn create_video(&self, video: NewVideo<'_>) -> Result<Video, MeetingError> {
            self.videos.lock().unwrap().push(video.mid.to_string());
            Ok(Video {
                id: 1,
                mid: video.mid.to_string(),
                topic: video.topic.to_string(),
                community: video.community.to_string(),
                group_name: video.group_name.to_string(),
                agenda: video.agenda.map(str::to_string),
                created_at: video.created_at,
            })
        }

        async fn create_collect(&self, collect: NewCollect) -> Result<Collect, MeetingError> {
            let row = Collect {
                id: 1,
                user_id: collect.user_id,
                meeting_id: collect.meeting_id,
                created_at: collect.created_at,
            };
            self.collect_rows.lock().unwrap().push(collect);
            Ok(row)
        }

        async fn collect_exists(&self, user_id: i32, meeting_id: i32) -> Result<bool, MeetingError> {
            Ok(self
                .collections
                .iter()
                .any(|c| c.user_id == user_id && c.meeting_id == meeting_id))
        }

        async fn delete_collect(
            &self,
            user_id: i32,
            meeting_id: i32,
        ) -> Result<usize, MeetingError> {
            self.collect_deletes.lock().unwrap().push((user_id, meeting_id));
            Ok(1)
        }

        async fn delete_collects_for_meeting(
            &self,
            meeting_id: i32,
        ) -> Result<usize, MeetingError> {
            self.collects_cleared.lock().unwrap().push(meeting_id);
            Ok(self.collections.len())
        }

        async fn collects_for_meeting(
            &self,
            meeting_id: i32,
        ) -> Result<Vec<Collect>, MeetingError> {
            Ok(self
                .collections
                .iter()
                .filter(|c| c.meeting_id == meeting_id)
                .cloned()
                .collect())
        }

        async fn collected_meetings(&self, _user_id: i32) -> Result<Vec<Meeting>, MeetingError> {
            Ok(self.meeting.clone().into_iter().collect())
        }
    }

    #[derive(Default, Clone)]
    struct MockUserRepository {
        users: Vec<User>,
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn get_user_by_id(&self, user_id: i32) -> Result<User, AuthError> {
            self.users
                .iter()
                .find(|user| user.id == user_id)
                .cloned()
                .ok_or_else(|| AuthError::UnexpectedError(format!("User {user_id} not found")))
        }

        async fn get_user_by_openid(&self, _openid: &str) -> Result<User, AuthError> {
            unimplemented!()
        }

        async fn create_user(
            &self,
            _user: crate::core::entities::models::NewUser<'_>,
        ) -> Result<User, AuthError> {
            unimplemented!()
        }

        async fn update_profile(
            &self,
            _user_id: i32,
            _nickname: Option<&str>,
            _avatar: Option<&str>,
        ) -> Result<User, AuthError> {
            unimplemented!()
        }
    }

    #[derive(Default)]
    struct MockDriver {
        booked: Option<BookedMeeting>,
        create_status: Option<u16>,
        cancel_fails: bool,
        create_calls: Arc<AtomicUsize>,
        cancel_calls: Arc<AtomicUsize>,
        last_booking: Arc<Mutex<Option<(MeetingPlatform, BookingRequest)>>>,
    }

    #[async_trait]
    impl ProviderDriver for MockDriver {
        async fn create_meeting(
            &self,
            platform: MeetingPlatform,
            booking: &BookingRequest,
        ) -> Result<BookedMeeting, ProviderError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_booking.lock().unwrap() = Some((platform, booking.clone()));
            if let Some(status) = self.create_status {
                return Err(ProviderError::Api { status });
            }
            self.booked
                .clone()
                .ok_or(ProviderError::Api { status: 500 })
        }

        async fn cancel_meeting(
            &self,
            _platform: MeetingPlatform,
            _ticket: &CancelTicket,
        ) -> Result<(), ProviderError> {
            self.cancel_calls.fetch_add(1, Ordering::SeqCst);
            if self.cancel_fails {
                return Err(ProviderError::Api { status: 500 });
            }
            Ok(())
        }

        async fn get_participants(
            &self,
            _platform: MeetingPlatform,
            _ticket: &CancelTicket,
        ) -> Result<ParticipantsPayload, ProviderError> {
            Ok(serde_json::json!({ "total_records": 0, "participants": [] }))
        }
    }

    fn make_service(
        repo: MockMeetingRepository,
        users: MockUserRepository,
        driver: MockDriver,
    ) -> (
        MeetingServiceImpl<MockMeetingRepository, MockUserRepository, MockDriver>,
        async_channel::Receiver<NotifyEvent>,
    ) {
        let (tx, rx) = async_channel::unbounded();
        let service = MeetingServiceImpl::new(
            repo,
            users,
            driver,
            single_host(),
            tx,
            "community".to_string(),
            "Asia/Shanghai".to_string(),
        );
        (service, rx)
    }

    // --- Create ---
    #[tokio::test]
    async fn test_create_meeting_success() {
        let repo = MockMeetingRepository::default();
        let created = repo.created.clone();
        let users = MockUserRepository {
            users: vec![sample_user(7, 2, Some("wx-7"))],
        };
        let driver = MockDriver {
            booked: Some(sample_booked()),
            ..Default::default()
        };
        let last_booking = driver.last_booking.clone();
        let (service, rx) = make_service(repo, users, driver);

        let result = service.create_meeting(sample_dto(), 7, test_now()).await;
        let response = result.unwrap();
        assert_eq!(response.host_id, "host-1");
        assert!(!response.join_url.is_empty());
        assert_eq!(response.mid, "987654321");

        let rows = created.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].is_delete, MEETING_ACTIVE);
        assert_eq!(rows[0].user_id, 7);

        let (platform, booking) = last_booking.lock().unwrap().clone().unwrap();
        assert_eq!(platform, MeetingPlatform::Zoom);
        assert_eq!(booking.host_login, "host-1@example.com");

        let event = rx.try_recv().unwrap();
        assert!(matches!(event, NotifyEvent::Created { record: false, .. }));
    }

    #[tokio::test]
    async fn test_create_meeting_round_trip_fields() {
        let repo = MockMeetingRepository::default();
        let users = MockUserRepository {
            users: vec![sample_user(7, 2, None)],
        };
        let driver = MockDriver {
            booked: Some(sample_booked()),
            ..Default::default()
        };
        let (service, _rx) = make_service(repo, users, driver);

        let dto = sample_dto();
        let response = service.create_meeting(dto.clone(), 7, test_now()).await.unwrap();
        assert_eq!(response.date, dto.date);
        assert_eq!(response.start, dto.start);
        assert_eq!(response.end, dto.end);
        assert_eq!(response.topic, dto.topic);
    }

    #[tokio::test]
    async fn test_create_meeting_cloud_record_creates_video() {
        let repo = MockMeetingRepository::default();
        let videos = repo.videos.clone();
        let users = MockUserRepository {
            users: vec![sample_user(7, 2, None)],
        };
        let driver = MockDriver {
            booked: Some(sample_booked()),
            ..Default::default()
        };
        let (service, rx) = make_service(repo, users, driver);

        let mut dto = sample_dto();
        dto.record = Some("cloud".to_string());
        service.create_meeting(dto, 7, test_now()).await.unwrap();

        assert_eq!(videos.lock().unwrap().as_slice(), ["987654321"]);
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, NotifyEvent::Created { record: true, .. }));
    }

    #[tokio::test]
    async fn test_create_meeting_rejects_end_before_start() {
        let repo = MockMeetingRepository::default();
        let created = repo.created.clone();
        let driver = MockDriver::default();
        let create_calls = driver.create_calls.clone();
        let (service, _rx) = make_service(repo, MockUserRepository::default(), driver);

        let mut dto = sample_dto();
        dto.start = "10:00".to_string();
        dto.end = "09:00".to_string();
        let result = service.create_meeting(dto, 7, test_now()).await;

        assert!(matches!(result, Err(MeetingError::TimeConflict)));
        assert_eq!(create_calls.load(Ordering::SeqCst), 0);
        assert!(created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_meeting_rejects_past_start() {
        let repo = MockMeetingRepository::default();
        let driver = MockDriver::default();
        let create_calls = driver.create_calls.clone();
        let (service, _rx) = make_service(repo, MockUserRepository::default(), driver);

        let now = NaiveDateTime::new(
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        );
        let result = service.create_meeting(sample_dto(), 7, now).await;

        assert!(matches!(result, Err(MeetingError::StartTimeTooEarly)));
        assert_eq!(create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_meeting_rejects_unknown_platform() {
        let (service, _rx) = make_service(
            MockMeetingRepository::default(),
            MockUserRepository::default(),
            MockDriver::default(),
        );

        let mut dto = sample_dto();
        dto.platform = "teams".to_string();
        let result = service.create_meeting(dto, 7, test_now()).await;

        assert!(matches!(result, Err(MeetingError::InvalidField(_))));
    }

    #[tokio::test]
    async fn test_create_meeting_no_host_available() {
        let repo = MockMeetingRepository {
            busy: vec!["host-1".to_string()],
            ..Default::default()
        };
        let created = repo.created.clone();
        let driver = MockDriver::default();
        let create_calls = driver.create_calls.clone();
        let (service, rx) = make_service(repo, MockUserRepository::default(), driver);

        let result = service.create_meeting(sample_dto(), 7, test_now()).await;

        assert!(matches!(result, Err(MeetingError::NoHostAvailable(_))));
        assert_eq!(create_calls.load(Ordering::SeqCst), 0);
        assert!(created.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_create_meeting_provider_failure_writes_nothing() {
        let repo = MockMeetingRepository::default();
        let created = repo.created.clone();
        let driver = MockDriver {
            create_status: Some(400),
            ..Default::default()
        };
        let (service, rx) = make_service(repo, MockUserRepository::default(), driver);

        let result = service.create_meeting(sample_dto(), 7, test_now()).await;

        assert!(matches!(result, Err(MeetingError::ProviderRejected(400))));
        assert!(created.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    // --- Cancel ---
    #[tokio::test]
    async fn test_cancel_meeting_by_owner() {
        let repo = MockMeetingRepository {
            meeting: Some(sample_meeting("987654321", 7, MEETING_ACTIVE)),
            collections: vec![Collect {
                id: 1,
                user_id: 9,
                meeting_id: 1,
                created_at: epoch(),
            }],
            ..Default::default()
        };
        let soft_deleted = repo.soft_deleted.clone();
        let collects_cleared = repo.collects_cleared.clone();
        let users = MockUserRepository {
            users: vec![
                sample_user(7, 2, Some("wx-7")),
                sample_user(9, 1, Some("wx-9")),
            ],
        };
        let driver = MockDriver {
            booked: None,
            ..Default::default()
        };
        let cancel_calls = driver.cancel_calls.clone();
        let (service, rx) = make_service(repo, users, driver);

        service.cancel_meeting("987654321", 7).await.unwrap();

        assert_eq!(cancel_calls.load(Ordering::SeqCst), 1);
        assert_eq!(soft_deleted.lock().unwrap().as_slice(), ["987654321"]);
        assert_eq!(collects_cleared.lock().unwrap().as_slice(), [1]);

        match rx.try_recv().unwrap() {
            NotifyEvent::Cancelled { openids, .. } => {
                assert_eq!(openids, vec!["wx-7".to_string(), "wx-9".to_string()]);
            }
            event => panic!("unexpected event: {event:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_meeting_by_admin() {
        let repo = MockMeetingRepository {
            meeting: Some(sample_meeting("987654321", 7, MEETING_ACTIVE)),
            ..Default::default()
        };
        let soft_deleted = repo.soft_deleted.clone();
        let users = MockUserRepository {
            users: vec![sample_user(7, 2, None), sample_user(5, 3, None)],
        };
        let (service, _rx) = make_service(repo, users, MockDriver::default());

        service.cancel_meeting("987654321", 5).await.unwrap();
        assert_eq!(soft_deleted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_meeting_unauthorized() {
        let repo = MockMeetingRepository {
            meeting: Some(sample_meeting("987654321", 7, MEETING_ACTIVE)),
            ..Default::default()
        };
        let soft_deleted = repo.soft_deleted.clone();
        let users = MockUserRepository {
            users: vec![sample_user(7, 2, None), sample_user(9, 2, None)],
        };
        let driver = MockDriver::default();
        let cancel_calls = driver.cancel_calls.clone();
        let (service, rx) = make_service(repo, users, driver);

        let result = service.cancel_meeting("987654321", 9).await;

        assert!(matches!(result, Err(MeetingError::NotAllowed)));
        assert_eq!(cancel_calls.load(Ordering::SeqCst), 0);
        assert!(soft_deleted.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_meeting_already_cancelled() {
        let repo = MockMeetingRepository {
            meeting: Some(sample_meeting("987654321", 7, MEETING_DELETED)),
            ..Default::default()
        };
        let users = MockUserRepository {
            users: vec![sample_user(7, 2, None)],
        };
        let driver = MockDriver::default();
        let cancel_calls = driver.cancel_calls.clone();
        let (service, rx) = make_service(repo, users, driver);

        let result = service.cancel_meeting("987654321", 7).await;

        assert!(matches!(result, Err(MeetingError::MeetingNotFound(_))));
        assert_eq!(cancel_calls.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_meeting_provider_failure_still_soft_deletes() {
        let repo = MockMeetingRepository {
            meeting: Some(sample_meeting("987654321", 7, MEETING_ACTIVE)),
            ..Default::default()
        };
        let soft_deleted = repo.soft_deleted.clone();
        let users = MockUserRepository {
            users: vec![sample_user(7, 2, Some("wx-7"))],
        };
        let driver = MockDriver {
            cancel_fails: true,
            ..Default::default()
        };
        let (service, rx) = make_service(repo, users, driver);

        service.cancel_meeting("987654321", 7).await.unwrap();

        assert_eq!(soft_deleted.lock().unwrap().as_slice(), ["987654321"]);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_cancel_meeting_unknown_mid() {
        let (service, _rx) = make_service(
            MockMeetingRepository::default(),
            MockUserRepository::default(),
            MockDriver::default(),
        );

        let result = service.cancel_meeting("nope", 7).await;
        assert!(matches!(result, Err(MeetingError::MeetingNotFound(_))));
    }

    // --- Read back ---
    #[tokio::test]
    async fn test_get_meeting_hides_start_url_from_non_owner() {
        let repo = MockMeetingRepository {
            meeting: Some(sample_meeting("987654321", 7, MEETING_ACTIVE)),
            ..Default::default()
        };
        let (service, _rx) = make_service(repo, MockUserRepository::default(), MockDriver::default());

        let own = service.get_meeting("987654321", 7).await.unwrap();
        assert!(own.start_url.is_some());

        let other = service.get_meeting("987654321", 9).await.unwrap();
        assert!(other.start_url.is_none());
    }

    // --- Collections ---
    #[tokio::test]
    async fn test_collect_meeting_is_idempotent() {
        let repo = MockMeetingRepository {
            meeting: Some(sample_meeting("987654321", 7, MEETING_ACTIVE)),
            collections: vec![Collect {
                id: 1,
                user_id: 9,
                meeting_id: 1,
                created_at: epoch(),
            }],
            ..Default::default()
        };
        let collect_rows = repo.collect_rows.clone();
        let (service, _rx) = make_service(repo, MockUserRepository::default(), MockDriver::default());

        // already collected: no second row
        service.collect_meeting(1, 9, test_now()).await.unwrap();
        assert!(collect_rows.lock().unwrap().is_empty());

        // fresh collect
        service.collect_meeting(1, 11, test_now()).await.unwrap();
        assert_eq!(collect_rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_uncollect_meeting() {
        let repo = MockMeetingRepository::default();
        let collect_deletes = repo.collect_deletes.clone();
        let (service, _rx) = make_service(repo, MockUserRepository::default(), MockDriver::default());

        service.uncollect_meeting(1, 9).await.unwrap();
        assert_eq!(collect_deletes.lock().unwrap().as_slice(), [(9, 1)]);
    }
}
