use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use serde::Serialize;

use crate::core::database::schema::{collects, meetings, users, videos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserLevel {
    Member = 1,
    Maintainer = 2,
    Admin = 3,
}

/// A meeting is never hard-deleted; cancellation only flips `is_delete`
/// so historical bookings keep feeding the host-conflict checks.
pub const MEETING_ACTIVE: i32 = 0;
pub const MEETING_DELETED: i32 = 1;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub nickname: String,
    pub gitee_name: Option<String>,
    pub avatar: Option<String>,
    pub openid: Option<String>,
    pub level: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub nickname: &'a str,
    pub gitee_name: Option<&'a str>,
    pub avatar: Option<&'a str>,
    pub openid: Option<&'a str>,
    pub level: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = meetings)]
pub struct Meeting {
    pub id: i32,
    pub mid: String,
    pub mmid: Option<String>,
    pub topic: String,
    pub community: String,
    pub sponsor: String,
    pub group_name: String,
    pub group_id: i32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: String,
    pub etherpad: Option<String>,
    pub agenda: Option<String>,
    pub emaillist: String,
    pub host_id: String,
    pub join_url: String,
    pub start_url: Option<String>,
    pub is_delete: i32,
    pub user_id: i32,
    pub mplatform: String,
    pub created_at: NaiveDateTime,
}

impl Meeting {
    pub fn start_datetime(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.date, self.start_time)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = meetings)]
pub struct NewMeeting<'a> {
    pub mid: &'a str,
    pub mmid: Option<&'a str>,
    pub topic: &'a str,
    pub community: &'a str,
    pub sponsor: &'a str,
    pub group_name: &'a str,
    pub group_id: i32,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: &'a str,
    pub etherpad: Option<&'a str>,
    pub agenda: Option<&'a str>,
    pub emaillist: &'a str,
    pub host_id: &'a str,
    pub join_url: &'a str,
    pub start_url: Option<&'a str>,
    pub is_delete: i32,
    pub user_id: i32,
    pub mplatform: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = collects)]
pub struct Collect {
    pub id: i32,
    pub user_id: i32,
    pub meeting_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = collects)]
pub struct NewCollect {
    pub user_id: i32,
    pub meeting_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = videos)]
pub struct Video {
    pub id: i32,
    pub mid: String,
    pub topic: String,
    pub community: String,
    pub group_name: String,
    pub agenda: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = videos)]
pub struct NewVideo<'a> {
    pub mid: &'a str,
    pub topic: &'a str,
    pub community: &'a str,
    pub group_name: &'a str,
    pub agenda: Option<&'a str>,
    pub created_at: NaiveDateTime,
}
