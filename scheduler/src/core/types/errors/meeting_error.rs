use provider_gateway::types::ProviderError;
use salvo::http::StatusCode;
use salvo::oapi::{self, EndpointOutRegister, ToSchema};
use salvo::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::general::GeneralError;

use super::{BadRequestError, InternalError, NotFoundError};

#[derive(Debug, Error, ToSchema, Serialize, Clone)]
pub enum MeetingError {
    #[error("Missing or malformed field: {0}")]
    InvalidField(String),

    #[error("The end time must be later than the start time")]
    TimeConflict,

    #[error("The start time should not be earlier than the current time")]
    StartTimeTooEarly,

    #[error("No host available on {0}, please check the website for booked meetings")]
    NoHostAvailable(String),

    #[error("Meeting {0} not found")]
    MeetingNotFound(String),

    #[error("Only the meeting creator or an administrator can do this")]
    NotAllowed,

    #[error("Meeting provider rejected the request with status {0}")]
    ProviderRejected(u16),

    #[error("Meeting provider unreachable: {0}")]
    ProviderUnreachable(String),

    #[error("An unexpected error occurred: {0}")]
    UnexpectedError(String),

    #[error("General error: {0}")]
    General(#[from] GeneralError),
}

impl From<ProviderError> for MeetingError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Api { status } => MeetingError::ProviderRejected(status),
            ProviderError::Transport(err) => MeetingError::ProviderUnreachable(err.to_string()),
            ProviderError::Auth(msg) => MeetingError::ProviderUnreachable(msg),
            ProviderError::MissingMeetingId(mid) => {
                MeetingError::UnexpectedError(format!("no provider meeting id stored for {mid}"))
            }
        }
    }
}

#[async_trait]
impl Writer for MeetingError {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        let status = match self {
            MeetingError::InvalidField(_)
            | MeetingError::TimeConflict
            | MeetingError::StartTimeTooEarly => StatusCode::BAD_REQUEST,
            MeetingError::NoHostAvailable(_) => StatusCode::CONFLICT,
            MeetingError::MeetingNotFound(_) => StatusCode::NOT_FOUND,
            MeetingError::NotAllowed => StatusCode::UNAUTHORIZED,
            MeetingError::ProviderRejected(_) | MeetingError::ProviderUnreachable(_) => {
                StatusCode::BAD_GATEWAY
            }
            MeetingError::UnexpectedError(_) | MeetingError::General(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        res.status_code(status);
        res.render(Json(serde_json::json!({ "message": self.to_string() })));
    }
}

impl EndpointOutRegister for MeetingError {
    fn register(components: &mut oapi::Components, operation: &mut oapi::Operation) {
        operation.responses.insert(
            StatusCode::BAD_REQUEST.as_str(),
            oapi::Response::new("Malformed request or time conflict")
                .add_content("application/json", BadRequestError::to_schema(components)),
        );
        operation.responses.insert(
            StatusCode::UNAUTHORIZED.as_str(),
            oapi::Response::new("Caller may not act on this meeting")
                .add_content("application/json", BadRequestError::to_schema(components)),
        );
        operation.responses.insert(
            StatusCode::NOT_FOUND.as_str(),
            oapi::Response::new("Meeting not found")
                .add_content("application/json", NotFoundError::to_schema(components)),
        );
        operation.responses.insert(
            StatusCode::CONFLICT.as_str(),
            oapi::Response::new("No host available in the requested window")
                .add_content("application/json", BadRequestError::to_schema(components)),
        );
        operation.responses.insert(
            StatusCode::BAD_GATEWAY.as_str(),
            oapi::Response::new("Provider call failed")
                .add_content("application/json", InternalError::to_schema(components)),
        );
        operation.responses.insert(
            StatusCode::INTERNAL_SERVER_ERROR.as_str(),
            oapi::Response::new("Unexpected or general error")
                .add_content("application/json", InternalError::to_schema(components)),
        );
    }
}
