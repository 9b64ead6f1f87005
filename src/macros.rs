/// Stop with HTTP 403, e.g. when a member tries to manage their team.
#[macro_export]
macro_rules! forbidden {
    ($message:expr) => {
        return Err(crate::errors::ServiceError::Forbidden($message.to_string()));
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err(crate::errors::ServiceError::Forbidden(format!($fmt, $($arg)+)));
    };
}

/// Stop with HTTP 400. The message is shown to the user, chat clients
/// repeat the question with it.
#[macro_export]
macro_rules! bad_request {
    ($message:expr) => {
        return Err(crate::errors::ServiceError::BadRequest($message.to_string()));
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err(crate::errors::ServiceError::BadRequest(format!($fmt, $($arg)+)));
    };
}

/// Stop with HTTP 409
#[macro_export]
macro_rules! conflict {
    ($fmt:expr, $($arg:tt)+) => {
        return Err(crate::errors::ServiceError::Conflict(format!($fmt, $($arg)+)));
    };
}

#[macro_export]
macro_rules! http_created_json {
    ($record:expr) => {
        return Ok(actix_web::HttpResponse::Created().json($record));
    };
}

#[macro_export]
macro_rules! http_ok_json {
    ($record:expr) => {
        return Ok(actix_web::HttpResponse::Ok().json($record));
    };
}
