//! Shared helper functions for Rocket route handlers.

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::store::Created;

/// `201 Created` for a freshly inserted record, `200 OK` for an existing one.
pub fn created_response<T>(created: Created<T>) -> status::Custom<Json<T>> {
    match created {
        Created::New(value) => status::Custom(Status::Created, Json(value)),
        Created::Existing(value) => status::Custom(Status::Ok, Json(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_records_are_201_and_existing_are_200() {
        assert_eq!(created_response(Created::New(1)).0, Status::Created);
        assert_eq!(created_response(Created::Existing(1)).0, Status::Ok);
    }
}
