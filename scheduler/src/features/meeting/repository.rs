use chrono::{NaiveDate, NaiveTime};
use diesel::{
    ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper, delete, insert_into,
    r2d2::{ConnectionManager, Pool, PooledConnection},
    update,
};
use salvo::async_trait;

use crate::core::{
    database::schema::{collects, meetings, videos},
    entities::models::{
        Collect, MEETING_ACTIVE, MEETING_DELETED, Meeting, NewCollect, NewMeeting, NewVideo, Video,
    },
    types::errors::{general::GeneralError, meeting_error::MeetingError},
};

#[async_trait]
pub trait MeetingRepository: Send + Sync {
    async fn create_meeting(&self, meeting: NewMeeting<'_>) -> Result<Meeting, MeetingError>;

    async fn get_meeting_by_mid(&self, mid: &str) -> Result<Meeting, MeetingError>;

    async fn get_meeting_by_id(&self, meeting_id: i32) -> Result<Meeting, MeetingError>;

    /// Host ids of non-deleted meetings on the platform/date whose interval
    /// overlaps the given window (strict inequalities on both ends).
    async fn find_busy_hosts(
        &self,
        platform: &str,
        date: NaiveDate,
        win_start: NaiveTime,
        win_end: NaiveTime,
    ) -> Result<Vec<String>, MeetingError>;

    async fn soft_delete_meeting(&self, mid: &str) -> Result<(), MeetingError>;

    /// Non-deleted meetings on `date` with `after < start <= until`.
    async fn find_starting_between(
        &self,
        date: NaiveDate,
        after: NaiveTime,
        until: NaiveTime,
    ) -> Result<Vec<Meeting>, MeetingError>;

    async fn create_video(&self, video: NewVideo<'_>) -> Result<Video, MeetingError>;

    async fn create_collect(&self, collect: NewCollect) -> Result<Collect, MeetingError>;

    async fn collect_exists(&self, user_id: i32, meeting_id: i32) -> Result<bool, MeetingError>;

    async fn delete_collect(&self, user_id: i32, meeting_id: i32) -> Result<usize, MeetingError>;

    async fn delete_collects_for_meeting(&self, meeting_id: i32) -> Result<usize, MeetingError>;

    async fn collects_for_meeting(&self, meeting_id: i32) -> Result<Vec<Collect>, MeetingError>;

    async fn collected_meetings(&self, user_id: i32) -> Result<Vec<Meeting>, MeetingError>;
}

#[derive(Debug, Clone)]
pub struct MeetingRepositoryImpl {
    pool: Pool<ConnectionManager<PgConnection>>,
}

impl MeetingRepositoryImpl {
    pub fn new(pool: Pool<ConnectionManager<PgConnection>>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, GeneralError> {
        self.pool.get().map_err(|_| GeneralError::DbConnectionError)
    }
}

#[async_trait]
impl MeetingRepository for MeetingRepositoryImpl {
    async fn create_meeting(&self, meeting: NewMeeting<'_>) -> Result<Meeting, MeetingError> {
        let mut conn = self.get_conn()?;

        insert_into(meetings::table)
            .values(&meeting)
            .returning(Meeting::as_select())
            .get_result(&mut conn)
            .map_err(|err| MeetingError::UnexpectedError(err.to_string()))
    }

    async fn get_meeting_by_mid(&self, mid: &str) -> Result<Meeting, MeetingError> {
        let mut conn = self.get_conn()?;

        meetings::table
            .filter(meetings::mid.eq(mid))
            .first::<Meeting>(&mut conn)
            .map_err(|_| MeetingError::MeetingNotFound(mid.to_string()))
    }

    async fn get_meeting_by_id(&self, meeting_id: i32) -> Result<Meeting, MeetingError> {
        let mut conn = self.get_conn()?;

        meetings::table
            .filter(meetings::id.eq(meeting_id))
            .first::<Meeting>(&mut conn)
            .map_err(|_| MeetingError::MeetingNotFound(meeting_id.to_string()))
    }

    async fn find_busy_hosts(
        &self,
        platform: &str,
        date: NaiveDate,
        win_start: NaiveTime,
        win_end: NaiveTime,
    ) -> Result<Vec<String>, MeetingError> {
        let mut conn = self.get_conn()?;

        meetings::table
            .filter(meetings::is_delete.eq(MEETING_ACTIVE))
            .filter(meetings::mplatform.eq(platform))
            .filter(meetings::date.eq(date))
            .filter(meetings::end_time.gt(win_start))
            .filter(meetings::start_time.lt(win_end))
            .select(meetings::host_id)
            .load::<String>(&mut conn)
            .map_err(|_| MeetingError::UnexpectedError("Failed to load booked hosts".to_string()))
    }

    async fn soft_delete_meeting(&self, mid: &str) -> Result<(), MeetingError> {
        let mut conn = self.get_conn()?;

        update(meetings::table)
            .filter(meetings::mid.eq(mid))
            .filter(meetings::is_delete.eq(MEETING_ACTIVE))
            .set(meetings::is_delete.eq(MEETING_DELETED))
            .execute(&mut conn)
            .map_err(|err| MeetingError::UnexpectedError(err.to_string()))?;

        Ok(())
    }

    async fn find_starting_between(
        &self,
        date: NaiveDate,
        after: NaiveTime,
        until: NaiveTime,
    ) -> Result<Vec<Meeting>, MeetingError> {
        let mut conn = self.get_conn()?;

        meetings::table
            .filter(meetings::is_delete.eq(MEETING_ACTIVE))
            .filter(meetings::date.eq(date))
            .filter(meetings::start_time.gt(after))
            .filter(meetings::start_time.le(until))
            .load::<Meeting>(&mut conn)
            .map_err(|_| {
                MeetingError::UnexpectedError("Failed to load upcoming meetings".to_string())
            })
    }

    async fn create_video(&self, video: NewVideo<'_>) -> Result<Video, MeetingError> {
        let mut conn = self.get_conn()?;

        insert_into(videos::table)
            .values(&video)
            .returning(Video::as_select())
            .get_result(&mut conn)
            .map_err(|err| MeetingError::UnexpectedError(err.to_string()))
    }

    async fn create_collect(&self, collect: NewCollect) -> Result<Collect, MeetingError> {
        let mut conn = self.get_conn()?;

        insert_into(collects::table)
            .values(&collect)
            .returning(Collect::as_select())
            .get_result(&mut conn)
            .map_err(|err| MeetingError::UnexpectedError(err.to_string()))
    }

    async fn collect_exists(&self, user_id: i32, meeting_id: i32) -> Result<bool, MeetingError> {
        let mut conn = self.get_conn()?;

        let count: i64 = collects::table
            .filter(collects::user_id.eq(user_id))
            .filter(collects::meeting_id.eq(meeting_id))
            .count()
            .get_result(&mut conn)
            .map_err(|err| MeetingError::UnexpectedError(err.to_string()))?;

        Ok(count > 0)
    }

    async fn delete_collect(&self, user_id: i32, meeting_id: i32) -> Result<usize, MeetingError> {
        let mut conn = self.get_conn()?;

        delete(
            collects::table
                .filter(collects::user_id.eq(user_id))
                .filter(collects::meeting_id.eq(meeting_id)),
        )
        .execute(&mut conn)
        .map_err(|err| MeetingError::UnexpectedError(err.to_string()))
    }

    async fn delete_collects_for_meeting(&self, meeting_id: i32) -> Result<usize, MeetingError> {
        let mut conn = self.get_conn()?;

        delete(collects::table.filter(collects::meeting_id.eq(meeting_id)))
            .execute(&mut conn)
            .map_err(|err| MeetingError::UnexpectedError(err.to_string()))
    }

    async fn collects_for_meeting(&self, meeting_id: i32) -> Result<Vec<Collect>, MeetingError> {
        let mut conn = self.get_conn()?;

        collects::table
            .filter(collects::meeting_id.eq(meeting_id))
            .load::<Collect>(&mut conn)
            .map_err(|err| MeetingError::UnexpectedError(err.to_string()))
    }

    async fn collected_meetings(&self, user_id: i32) -> Result<Vec<Meeting>, MeetingError> {
        let mut conn = self.get_conn()?;

        let meeting_ids = collects::table
            .filter(collects::user_id.eq(user_id))
            .select(collects::meeting_id)
            .load::<i32>(&mut conn)
            .map_err(|err| MeetingError::UnexpectedError(err.to_string()))?;

        if meeting_ids.is_empty() {
            return Ok(vec![]);
        }

        meetings::table
            .filter(meetings::id.eq_any(meeting_ids))
            .filter(meetings::is_delete.eq(MEETING_ACTIVE))
            .order((meetings::date.desc(), meetings::start_time.asc()))
            .load::<Meeting>(&mut conn)
            .map_err(|err| MeetingError::UnexpectedError(err.to_string()))
    }
}
