use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use validator_derive::Validate;

#[derive(Debug, Serialize, Deserialize, ToSchema, Validate, Clone)]
#[salvo(schema(example = json!(
    {
        "code": "081Kq9Ga1rYcFF0VTMHa1p",
        "nickname": "gopher"
    }
)))]
pub struct LoginDto {
    /// One-shot login code issued by the WeChat mini-program.
    #[validate(length(min = 1))]
    pub code: String,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
}
