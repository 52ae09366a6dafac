use salvo::http::StatusCode;
use salvo::oapi::{self, EndpointOutRegister};
use salvo::prelude::*;
use serde::Serialize;

/// Whatever the provider reports for a meeting, passed through untouched.
#[derive(Debug, Serialize)]
pub struct ParticipantsResponse(pub serde_json::Value);

#[async_trait]
impl Writer for ParticipantsResponse {
    async fn write(self, _req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        res.status_code(StatusCode::OK);
        res.render(Json(self.0));
    }
}

impl EndpointOutRegister for ParticipantsResponse {
    fn register(_components: &mut oapi::Components, operation: &mut oapi::Operation) {
        operation
            .responses
            .insert(StatusCode::OK.as_str(), oapi::Response::new("OK"));
    }
}
