use salvo::oapi::ToSchema;
use serde::{Deserialize, Serialize};
use validator_derive::Validate;

fn default_platform() -> String {
    "zoom".to_string()
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Validate, Clone)]
#[salvo(schema(example = json!(
    {
        "platform": "zoom",
        "date": "2025-03-10",
        "start": "09:00",
        "end": "10:00",
        "topic": "Weekly Sync",
        "sponsor": "gopher",
        "group_name": "Infra",
        "group_id": 12,
        "etherpad": "https://etherpad.example.org/p/infra",
        "emaillist": "a@example.com,b@example.com",
        "record": "cloud"
    }
)))]
pub struct CreateMeetingDto {
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Civil date `YYYY-MM-DD`; times are `HH:MM` in the community timezone.
    pub date: String,
    pub start: String,
    pub end: String,
    #[validate(length(min = 1))]
    pub topic: String,
    #[validate(length(min = 1))]
    pub sponsor: String,
    #[validate(length(min = 1))]
    pub group_name: String,
    pub group_id: i32,
    pub etherpad: Option<String>,
    pub emaillist: Option<String>,
    pub agenda: Option<String>,
    pub record: Option<String>,
}
