pub mod auth_response;
pub mod failed_response;
pub mod meeting_response;
pub mod participants_response;
pub mod success_response;
