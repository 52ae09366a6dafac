use salvo::http::StatusCode;
use salvo::oapi::{self, EndpointOutRegister, ToSchema};
use salvo::prelude::*;
use serde::Serialize;
use thiserror::Error;

use super::general::GeneralError;

use super::{BadRequestError, InternalError};

#[derive(Debug, Error, ToSchema, Serialize, Clone)]
pub enum AuthError {
    #[error("Failed to resolve the login code: {0}")]
    CodeRejected(String),

    #[error("An unexpected error occurred: {0}")]
    UnexpectedError(String),

    #[error("General error: {0}")]
    General(#[from] GeneralError),
}

#[async_trait]
impl Writer for AuthError {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        let status = match self {
            AuthError::CodeRejected(_) => StatusCode::UNAUTHORIZED,
            AuthError::UnexpectedError(_) | AuthError::General(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        res.status_code(status);
        res.render(Json(serde_json::json!({ "message": self.to_string() })));
    }
}

impl EndpointOutRegister for AuthError {
    fn register(components: &mut oapi::Components, operation: &mut oapi::Operation) {
        operation.responses.insert(
            StatusCode::UNAUTHORIZED.as_str(),
            oapi::Response::new("Login code rejected")
                .add_content("application/json", BadRequestError::to_schema(components)),
        );
        operation.responses.insert(
            StatusCode::INTERNAL_SERVER_ERROR.as_str(),
            oapi::Response::new("Unexpected or general error")
                .add_content("application/json", InternalError::to_schema(components)),
        );
    }
}
