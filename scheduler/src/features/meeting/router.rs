use salvo::{
    oapi::extract::{JsonBody, PathParam},
    prelude::*,
};
use validator::Validate;

use crate::core::{
    dtos::meeting::{collect_dto::CollectDto, create_meeting_dto::CreateMeetingDto},
    types::{
        errors::meeting_error::MeetingError,
        responses::{
            meeting_response::{ListMeetingResponse, MeetingResponse},
            participants_response::ParticipantsResponse,
            success_response::SuccessResponse,
        },
    },
    utils::{jwt_utils::JwtUtils, time_utils::civil_now},
};

use super::service::{MeetingService, MeetingServiceImpl};

pub fn get_meeting_router(jwt_utils: JwtUtils) -> Router {
    let participants_router = Router::with_path("/{mid}/participants").get(get_participants);

    Router::with_hoop(jwt_utils.auth_middleware())
        .path("meetings")
        .post(create_meeting)
        .push(
            Router::with_path("/{mid}")
                .get(get_meeting)
                .delete(cancel_meeting),
        )
        .push(participants_router)
}

pub fn get_collection_router(jwt_utils: JwtUtils) -> Router {
    Router::with_hoop(jwt_utils.auth_middleware())
        .path("collections")
        .post(collect_meeting)
        .get(my_collections)
        .push(Router::with_path("/{meeting_id}").delete(uncollect_meeting))
}

/// Books a host, creates the meeting at the provider and stores the record.
#[endpoint(tags("meeting"), status_codes(201, 400, 401, 404, 409, 500, 502))]
async fn create_meeting(
    _res: &mut Response,
    data: JsonBody<CreateMeetingDto>,
    depot: &mut Depot,
) -> Result<MeetingResponse, MeetingError> {
    let meeting_service = depot.obtain::<MeetingServiceImpl>().unwrap();
    let user_id = depot.get::<String>("user_id").unwrap();
    let create_meeting_dto = data.0;

    create_meeting_dto
        .validate()
        .map_err(|err| MeetingError::InvalidField(err.to_string()))?;

    let meeting = meeting_service
        .create_meeting(create_meeting_dto, user_id.parse().unwrap(), civil_now())
        .await?;

    Ok(meeting)
}

/// Reads one meeting back; the start url only shows for the creator.
#[endpoint(tags("meeting"), status_codes(200, 400, 401, 404, 500))]
async fn get_meeting(
    _res: &mut Response,
    mid: PathParam<String>,
    depot: &mut Depot,
) -> Result<MeetingResponse, MeetingError> {
    let meeting_service = depot.obtain::<MeetingServiceImpl>().unwrap();
    let user_id = depot.get::<String>("user_id").unwrap();

    let meeting = meeting_service
        .get_meeting(&mid.into_inner(), user_id.parse().unwrap())
        .await?;

    Ok(meeting)
}

/// Cancels a meeting at the provider and soft-deletes the local record.
#[endpoint(tags("meeting"), status_codes(200, 400, 401, 404, 500))]
async fn cancel_meeting(
    _res: &mut Response,
    mid: PathParam<String>,
    depot: &mut Depot,
) -> Result<SuccessResponse, MeetingError> {
    let meeting_service = depot.obtain::<MeetingServiceImpl>().unwrap();
    let user_id = depot.get::<String>("user_id").unwrap();

    meeting_service
        .cancel_meeting(&mid.into_inner(), user_id.parse().unwrap())
        .await?;

    Ok(SuccessResponse::new("Delete successfully."))
}

/// Participant report straight from the meeting provider.
#[endpoint(tags("meeting"), status_codes(200, 400, 401, 404, 500, 502))]
async fn get_participants(
    _res: &mut Response,
    mid: PathParam<String>,
    depot: &mut Depot,
) -> Result<ParticipantsResponse, MeetingError> {
    let meeting_service = depot.obtain::<MeetingServiceImpl>().unwrap();

    let participants = meeting_service
        .get_participants(&mid.into_inner())
        .await?;

    Ok(ParticipantsResponse(participants))
}

/// Adds a meeting to the caller's favorites.
#[endpoint(tags("collection"), status_codes(200, 400, 401, 404, 500))]
async fn collect_meeting(
    _res: &mut Response,
    data: JsonBody<CollectDto>,
    depot: &mut Depot,
) -> Result<SuccessResponse, MeetingError> {
    let meeting_service = depot.obtain::<MeetingServiceImpl>().unwrap();
    let user_id = depot.get::<String>("user_id").unwrap();

    meeting_service
        .collect_meeting(data.0.meeting_id, user_id.parse().unwrap(), civil_now())
        .await?;

    Ok(SuccessResponse::new("Collected."))
}

/// Removes a meeting from the caller's favorites.
#[endpoint(tags("collection"), status_codes(200, 400, 401, 404, 500))]
async fn uncollect_meeting(
    _res: &mut Response,
    meeting_id: PathParam<i32>,
    depot: &mut Depot,
) -> Result<SuccessResponse, MeetingError> {
    let meeting_service = depot.obtain::<MeetingServiceImpl>().unwrap();
    let user_id = depot.get::<String>("user_id").unwrap();

    meeting_service
        .uncollect_meeting(meeting_id.into_inner(), user_id.parse().unwrap())
        .await?;

    Ok(SuccessResponse::new("Removed from collections."))
}

/// Lists the caller's favorited meetings.
#[endpoint(tags("collection"), status_codes(200, 401, 500))]
async fn my_collections(
    _res: &mut Response,
    depot: &mut Depot,
) -> Result<ListMeetingResponse, MeetingError> {
    let meeting_service = depot.obtain::<MeetingServiceImpl>().unwrap();
    let user_id = depot.get::<String>("user_id").unwrap();

    let meetings = meeting_service
        .my_collections(user_id.parse().unwrap())
        .await?;

    Ok(ListMeetingResponse { meetings })
}
