use salvo::http::{Method, StatusCode};
use salvo::oapi::{self, EndpointOutRegister, ToSchema};
use salvo::prelude::*;
use serde::Serialize;

use crate::core::entities::models::Meeting;

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct MeetingResponse {
    pub id: i32,
    pub mid: String,
    pub topic: String,
    pub community: String,
    pub sponsor: String,
    pub group_name: String,
    pub group_id: i32,
    pub date: String,
    pub start: String,
    pub end: String,
    pub timezone: String,
    pub etherpad: Option<String>,
    pub agenda: Option<String>,
    pub emaillist: String,
    pub host_id: String,
    pub join_url: String,
    /// Privileged: only present when the caller owns the meeting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,
    pub mplatform: String,
    pub user_id: i32,
}

impl MeetingResponse {
    pub fn from_meeting(meeting: &Meeting, include_start_url: bool) -> Self {
        Self {
            id: meeting.id,
            mid: meeting.mid.clone(),
            topic: meeting.topic.clone(),
            community: meeting.community.clone(),
            sponsor: meeting.sponsor.clone(),
            group_name: meeting.group_name.clone(),
            group_id: meeting.group_id,
            date: meeting.date.format("%Y-%m-%d").to_string(),
            start: meeting.start_time.format("%H:%M").to_string(),
            end: meeting.end_time.format("%H:%M").to_string(),
            timezone: meeting.timezone.clone(),
            etherpad: meeting.etherpad.clone(),
            agenda: meeting.agenda.clone(),
            emaillist: meeting.emaillist.clone(),
            host_id: meeting.host_id.clone(),
            join_url: meeting.join_url.clone(),
            start_url: if include_start_url {
                meeting.start_url.clone()
            } else {
                None
            },
            mplatform: meeting.mplatform.clone(),
            user_id: meeting.user_id,
        }
    }
}

#[async_trait]
impl Writer for MeetingResponse {
    async fn write(self, req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        if req.method() == Method::POST {
            res.status_code(StatusCode::CREATED);
            res.render(Json(self));
        } else {
            res.status_code(StatusCode::OK);
            res.render(Json(self));
        }
    }
}

impl EndpointOutRegister for MeetingResponse {
    fn register(components: &mut oapi::Components, operation: &mut oapi::Operation) {
        operation.responses.insert(
            StatusCode::OK.as_str(),
            oapi::Response::new("OK")
                .add_content("application/json", MeetingResponse::to_schema(components)),
        );
        operation.responses.insert(
            StatusCode::CREATED.as_str(),
            oapi::Response::new("Created")
                .add_content("application/json", MeetingResponse::to_schema(components)),
        );
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListMeetingResponse {
    pub meetings: Vec<MeetingResponse>,
}

#[async_trait]
impl Writer for ListMeetingResponse {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        res.status_code(StatusCode::OK);
        res.render(Json(self));
    }
}

impl EndpointOutRegister for ListMeetingResponse {
    fn register(components: &mut oapi::Components, operation: &mut oapi::Operation) {
        operation.responses.insert(
            StatusCode::OK.as_str(),
            oapi::Response::new("OK")
                .add_content("application/json", ListMeetingResponse::to_schema(components)),
        );
    }
}
