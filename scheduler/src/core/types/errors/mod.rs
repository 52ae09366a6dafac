use salvo::oapi::ToSchema;
use serde::Serialize;

pub mod auth_error;
pub mod general;
pub mod meeting_error;
pub mod notify_error;

#[derive(Debug, ToSchema, Serialize)]
#[salvo(schema(example = json!({"message": ""})))]
struct NotFoundError {
    message: String,
}

#[derive(Debug, ToSchema, Serialize)]
#[salvo(schema(example = json!({"message": ""})))]
struct BadRequestError {
    message: String,
}

#[derive(Debug, ToSchema, Serialize)]
#[salvo(schema(example = json!({"message": ""})))]
struct InternalError {
    message: String,
}
