pub mod jwt_utils;
pub mod time_utils;
pub mod wx_utils;
