table! {
    limits (id) {
        id -> Int8,
        team_id -> Int8,
        date -> Date,
        slot -> Nullable<Varchar>,
        role -> Varchar,
        max_count -> Int8,
        created_at -> Nullable<Timestamptz>,
    }
}

table! {
    shifts (id) {
        id -> Int8,
        user_id -> Int8,
        team_id -> Int8,
        date -> Date,
        slot -> Varchar,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

table! {
    teams (id) {
        id -> Int8,
        name -> Varchar,
        invite_code -> Varchar,
        created_at -> Nullable<Timestamptz>,
    }
}

table! {
    users (id) {
        id -> Int8,
        external_identity -> Varchar,
        display_name -> Varchar,
        team_id -> Nullable<Int8>,
        role -> Nullable<Varchar>,
        is_owner -> Bool,
        is_admin -> Bool,
        is_active -> Bool,
        left_at -> Nullable<Timestamptz>,
        created_at -> Nullable<Timestamptz>,
    }
}

table! {
    weeks (id) {
        id -> Int8,
        team_id -> Int8,
        start_date -> Date,
        end_date -> Date,
        is_active -> Bool,
        created_at -> Nullable<Timestamptz>,
    }
}

joinable!(limits -> teams (team_id));
joinable!(shifts -> teams (team_id));
joinable!(shifts -> users (user_id));
joinable!(users -> teams (team_id));
joinable!(weeks -> teams (team_id));

allow_tables_to_appear_in_same_query!(limits, shifts, teams, users, weeks,);
