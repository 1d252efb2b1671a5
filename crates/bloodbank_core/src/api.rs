//! Framework-free request router for the donor collection.
//!
//! # Responsibility
//! - Map `(method, path, body, name filter)` to `(status, JSON body)` for the
//!   `/donantes` resource.
//! - Keep HTTP server concerns outside the core crate: any server adapter
//!   only needs to build an [`ApiRequest`] and write back an [`ApiResponse`].
//!
//! # Invariants
//! - Every failure produces a `{"resultado": ...}` body; nothing panics.
//! - Store messages are passed through unchanged on 500 responses.

use crate::model::donor::{Donor, DonorId};
use crate::repo::donor_repo::DonorRepository;
use crate::service::donor_service::{DonorService, DonorServiceError};
use serde_json::{json, Value};

pub const DONORS_PATH: &str = "/donantes";

pub const MSG_MALFORMED: &str = "no envió insumos para crear el donante...";
pub const MSG_UPDATE_MALFORMED: &str = "no envió insumos para actualizar el donante...";
pub const MSG_MISSING_FIELDS: &str = "revise las propiedades de su solicitud";
pub const MSG_INVALID_VALUES: &str = "revise los valores de su solicitud";
pub const MSG_DONOR_NOT_FOUND: &str = "el donante no existe...";
pub const MSG_ROUTE_NOT_FOUND: &str = "recurso no encontrado...";
pub const MSG_METHOD_NOT_ALLOWED: &str = "método no permitido...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
    Other(String),
}

impl Method {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Structured request as handed over by a transport adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path without query string, e.g. `/donantes/<id>`.
    pub path: String,
    /// Raw request body, if any.
    pub body: Option<String>,
    /// Value of the `name` query parameter, if any.
    pub name_filter: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            name_filter: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_name_filter(mut self, name: impl Into<String>) -> Self {
        self.name_filter = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// `None` for bodiless responses (204).
    pub body: Option<Value>,
}

impl ApiResponse {
    fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }

    fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    fn message(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "resultado": message }))
    }
}

enum Route {
    Collection,
    Item(Option<DonorId>),
    Unknown,
}

fn route(path: &str) -> Route {
    let trimmed = path.trim_end_matches('/');
    if trimmed == DONORS_PATH {
        return Route::Collection;
    }
    match trimmed.strip_prefix(DONORS_PATH).and_then(|rest| rest.strip_prefix('/')) {
        Some(id) if !id.contains('/') => Route::Item(DonorId::parse_str(id).ok()),
        _ => Route::Unknown,
    }
}

/// Dispatches one request against the donor service.
pub fn handle<R: DonorRepository>(service: &DonorService<R>, request: &ApiRequest) -> ApiResponse {
    match route(&request.path) {
        Route::Collection => match request.method {
            Method::Get => list(service, request.name_filter.as_deref()),
            Method::Post => create(service, request.body.as_deref()),
            _ => ApiResponse::message(405, MSG_METHOD_NOT_ALLOWED),
        },
        // An unparseable id cannot name a stored donor.
        Route::Item(None) => match request.method {
            Method::Get | Method::Patch | Method::Delete => {
                ApiResponse::message(404, MSG_DONOR_NOT_FOUND)
            }
            _ => ApiResponse::message(405, MSG_METHOD_NOT_ALLOWED),
        },
        Route::Item(Some(id)) => match request.method {
            Method::Get => respond(service.get_donor(id), 200),
            Method::Patch => update(service, id, request.body.as_deref()),
            Method::Delete => match service.delete_donor(id) {
                Ok(()) => ApiResponse::empty(204),
                Err(err) => error_response(&err),
            },
            _ => ApiResponse::message(405, MSG_METHOD_NOT_ALLOWED),
        },
        Route::Unknown => ApiResponse::message(404, MSG_ROUTE_NOT_FOUND),
    }
}

fn list<R: DonorRepository>(service: &DonorService<R>, name: Option<&str>) -> ApiResponse {
    match service.list_donors(name) {
        Ok(donors) => {
            let records: Vec<Value> = donors.iter().map(donor_body).collect();
            ApiResponse::json(200, Value::Array(records))
        }
        Err(err) => error_response(&err),
    }
}

fn create<R: DonorRepository>(service: &DonorService<R>, body: Option<&str>) -> ApiResponse {
    match parse_body(body) {
        Ok(payload) => respond(service.create_donor(payload.as_ref()), 201),
        Err(err) => error_response(&err),
    }
}

/// Existence is checked before the body is looked at, so a missing donor is
/// always a 404 whatever the payload.
fn update<R: DonorRepository>(
    service: &DonorService<R>,
    id: DonorId,
    body: Option<&str>,
) -> ApiResponse {
    let result = service
        .get_donor(id)
        .and_then(|_| parse_body(body))
        .and_then(|payload| service.update_donor(id, payload.as_ref()));
    match result {
        Ok(donor) => ApiResponse::json(200, donor_body(&donor)),
        Err(DonorServiceError::MalformedRequest) => {
            ApiResponse::message(400, MSG_UPDATE_MALFORMED)
        }
        Err(err) => error_response(&err),
    }
}

/// Absent or blank bodies yield `None`; unparseable ones are malformed.
fn parse_body(body: Option<&str>) -> Result<Option<Value>, DonorServiceError> {
    match body.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|_| DonorServiceError::MalformedRequest),
    }
}

fn respond(result: Result<Donor, DonorServiceError>, status: u16) -> ApiResponse {
    match result {
        Ok(donor) => ApiResponse::json(status, donor_body(&donor)),
        Err(err) => error_response(&err),
    }
}

fn donor_body(donor: &Donor) -> Value {
    json!(donor.record())
}

/// Maps a service failure to its status code and `resultado` body.
///
/// `MalformedRequest` carries the create message here; PATCH answers with
/// [`MSG_UPDATE_MALFORMED`] instead.
pub fn error_response(err: &DonorServiceError) -> ApiResponse {
    match err {
        DonorServiceError::MalformedRequest => ApiResponse::message(400, MSG_MALFORMED),
        DonorServiceError::MissingFields(_) => ApiResponse::message(400, MSG_MISSING_FIELDS),
        DonorServiceError::InvalidFieldValues(_) => ApiResponse::message(400, MSG_INVALID_VALUES),
        DonorServiceError::NotFound(_) => ApiResponse::message(404, MSG_DONOR_NOT_FOUND),
        DonorServiceError::Persistence(message) => ApiResponse::message(500, message),
        DonorServiceError::Transfer(transfer) => ApiResponse::message(500, &transfer.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::{route, Method, Route};

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(Method::parse("patch"), Method::Patch);
        assert_eq!(Method::parse("PUT"), Method::Other("PUT".to_string()));
    }

    #[test]
    fn routes_accept_trailing_slash_and_reject_nested_paths() {
        assert!(matches!(route("/donantes/"), Route::Collection));
        assert!(matches!(route("/donantes/not-a-uuid"), Route::Item(None)));
        assert!(matches!(route("/donantes/a/b"), Route::Unknown));
        assert!(matches!(route("/visitas"), Route::Unknown));
        assert!(matches!(
            route("/donantes/6f1c7a52-3c1e-4f57-9a34-0d8c5b1f2e10"),
            Route::Item(Some(_))
        ));
    }
}
