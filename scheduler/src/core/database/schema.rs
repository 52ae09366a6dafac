diesel::table! {
    users (id) {
        id -> Int4,
        nickname -> Varchar,
        gitee_name -> Nullable<Varchar>,
        avatar -> Nullable<Varchar>,
        openid -> Nullable<Varchar>,
        level -> Int4,
        created_at -> Timestamp,
    }
}

diesel::table! {
    meetings (id) {
        id -> Int4,
        mid -> Varchar,
        mmid -> Nullable<Varchar>,
        topic -> Varchar,
        community -> Varchar,
        sponsor -> Varchar,
        group_name -> Varchar,
        group_id -> Int4,
        date -> Date,
        #[sql_name = "start"]
        start_time -> Time,
        #[sql_name = "end"]
        end_time -> Time,
        timezone -> Varchar,
        etherpad -> Nullable<Varchar>,
        agenda -> Nullable<Text>,
        emaillist -> Text,
        host_id -> Varchar,
        join_url -> Varchar,
        start_url -> Nullable<Varchar>,
        is_delete -> Int4,
        user_id -> Int4,
        mplatform -> Varchar,
        created_at -> Timestamp,
    }
}

diesel::table! {
    collects (id) {
        id -> Int4,
        user_id -> Int4,
        meeting_id -> Int4,
        created_at -> Timestamp,
    }
}

diesel::table! {
    videos (id) {
        id -> Int4,
        mid -> Varchar,
        topic -> Varchar,
        community -> Varchar,
        group_name -> Varchar,
        agenda -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::joinable!(meetings -> users (user_id));
diesel::joinable!(collects -> users (user_id));
diesel::joinable!(collects -> meetings (meeting_id));

diesel::allow_tables_to_appear_in_same_query!(users, meetings, collects, videos,);
