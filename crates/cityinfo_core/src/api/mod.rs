//! Transport-neutral request router.
//!
//! # Responsibility
//! - Map `(method, path, body)` requests onto point-of-interest use-cases.
//! - Map use-case results onto status codes, JSON bodies and location references.
//!
//! # Invariants
//! - Each route resolves to exactly one service call.
//! - Infrastructure failures answer 500 with a fixed message; internal details
//!   never reach the response.
//! - Log lines carry route names and statuses only, never bodies.

use crate::model::city::{CityId, PointOfInterestDraft, PointOfInterestId};
use crate::model::validation::FieldErrors;
use crate::notify::Notifier;
use crate::patch::PatchDocument;
use crate::repo::city_repo::CityRepository;
use crate::service::point_of_interest_service::{PointOfInterestService, ServiceError};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_NO_CONTENT: u16 = 204;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_METHOD_NOT_ALLOWED: u16 = 405;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Message returned for every infrastructure failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "A problem happened while handling your request.";

const AREAS_SEGMENT: &str = "areas";
const CHILDREN_SEGMENT: &str = "children";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Parses an HTTP verb, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Inbound request as handed over by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path with optional `?query`.
    pub path: String,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Outbound response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
    /// Reference to a created resource.
    pub location: Option<String>,
}

impl ApiResponse {
    fn empty(status: u16) -> Self {
        Self {
            status,
            body: None,
            location: None,
        }
    }

    fn json<T: Serialize>(status: u16, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(body) => Self {
                status,
                body: Some(body),
                location: None,
            },
            Err(err) => {
                error!("event=api_encode module=api status=error error={err}");
                internal_error()
            }
        }
    }

    fn bad_request(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::json(STATUS_BAD_REQUEST, &errors)
    }
}

/// Use-case selected by method and path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ListCities,
    GetCity {
        city_id: CityId,
    },
    ListPointsOfInterest {
        city_id: CityId,
    },
    GetPointOfInterest {
        city_id: CityId,
        poi_id: PointOfInterestId,
    },
    CreatePointOfInterest {
        city_id: CityId,
    },
    UpdatePointOfInterest {
        city_id: CityId,
        poi_id: PointOfInterestId,
    },
    PatchPointOfInterest {
        city_id: CityId,
        poi_id: PointOfInterestId,
    },
    DeletePointOfInterest {
        city_id: CityId,
        poi_id: PointOfInterestId,
    },
}

impl Route {
    fn name(self) -> &'static str {
        match self {
            Self::ListCities => "list_cities",
            Self::GetCity { .. } => "get_city",
            Self::ListPointsOfInterest { .. } => "list_points_of_interest",
            Self::GetPointOfInterest { .. } => "get_point_of_interest",
            Self::CreatePointOfInterest { .. } => "create_point_of_interest",
            Self::UpdatePointOfInterest { .. } => "update_point_of_interest",
            Self::PatchPointOfInterest { .. } => "patch_point_of_interest",
            Self::DeletePointOfInterest { .. } => "delete_point_of_interest",
        }
    }
}

/// Why a request did not resolve to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    NotFound,
    MethodNotAllowed,
}

/// Resolves a path (without query) against the route table.
pub fn resolve_route(method: Method, path: &str) -> Result<Route, RouteError> {
    let segments: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();

    match segments.as_slice() {
        [areas] if *areas == AREAS_SEGMENT => match method {
            Method::Get => Ok(Route::ListCities),
            _ => Err(RouteError::MethodNotAllowed),
        },
        [areas, city_id] if *areas == AREAS_SEGMENT => {
            let city_id = parse_id(city_id)?;
            match method {
                Method::Get => Ok(Route::GetCity { city_id }),
                _ => Err(RouteError::MethodNotAllowed),
            }
        }
        [areas, city_id, children] if *areas == AREAS_SEGMENT && *children == CHILDREN_SEGMENT => {
            let city_id = parse_id(city_id)?;
            match method {
                Method::Get => Ok(Route::ListPointsOfInterest { city_id }),
                Method::Post => Ok(Route::CreatePointOfInterest { city_id }),
                _ => Err(RouteError::MethodNotAllowed),
            }
        }
        [areas, city_id, children, poi_id]
            if *areas == AREAS_SEGMENT && *children == CHILDREN_SEGMENT =>
        {
            let city_id = parse_id(city_id)?;
            let poi_id = parse_id(poi_id)?;
            match method {
                Method::Get => Ok(Route::GetPointOfInterest { city_id, poi_id }),
                Method::Put => Ok(Route::UpdatePointOfInterest { city_id, poi_id }),
                Method::Patch => Ok(Route::PatchPointOfInterest { city_id, poi_id }),
                Method::Delete => Ok(Route::DeletePointOfInterest { city_id, poi_id }),
                Method::Post => Err(RouteError::MethodNotAllowed),
            }
        }
        _ => Err(RouteError::NotFound),
    }
}

/// Location reference of a point of interest.
pub fn point_of_interest_location(city_id: CityId, poi_id: PointOfInterestId) -> String {
    format!("/{AREAS_SEGMENT}/{city_id}/{CHILDREN_SEGMENT}/{poi_id}")
}

#[derive(Debug, Default, Deserialize)]
struct CityQuery {
    #[serde(rename = "includeChildren")]
    include_children: Option<String>,
}

/// Routes one request through the service and builds its response.
pub fn handle_request<R: CityRepository, N: Notifier>(
    service: &PointOfInterestService<R, N>,
    request: &ApiRequest,
) -> ApiResponse {
    let (path, query) = match request.path.split_once('?') {
        Some((path, query)) => (path, query),
        None => (request.path.as_str(), ""),
    };

    let route = match resolve_route(request.method, path) {
        Ok(route) => route,
        Err(RouteError::NotFound) => return ApiResponse::empty(STATUS_NOT_FOUND),
        Err(RouteError::MethodNotAllowed) => return ApiResponse::empty(STATUS_METHOD_NOT_ALLOWED),
    };

    let response = dispatch(service, route, query, request.body.as_deref());
    debug!(
        "event=api_request module=api route={} status={}",
        route.name(),
        response.status
    );
    response
}

fn dispatch<R: CityRepository, N: Notifier>(
    service: &PointOfInterestService<R, N>,
    route: Route,
    query: &str,
    body: Option<&str>,
) -> ApiResponse {
    match route {
        Route::ListCities => match service.list_cities() {
            Ok(cities) => ApiResponse::json(STATUS_OK, &cities),
            Err(err) => error_response(err),
        },
        Route::GetCity { city_id } => {
            let include = match parse_include_children(query) {
                Ok(include) => include,
                Err(response) => return response,
            };
            match service.get_city(city_id, include) {
                Ok(city) => ApiResponse::json(STATUS_OK, &city),
                Err(err) => error_response(err),
            }
        }
        Route::ListPointsOfInterest { city_id } => {
            match service.list_points_of_interest(city_id) {
                Ok(points) => ApiResponse::json(STATUS_OK, &points),
                Err(err) => error_response(err),
            }
        }
        Route::GetPointOfInterest { city_id, poi_id } => {
            match service.get_point_of_interest(city_id, poi_id) {
                Ok(poi) => ApiResponse::json(STATUS_OK, &poi),
                Err(err) => error_response(err),
            }
        }
        Route::CreatePointOfInterest { city_id } => {
            let draft = match parse_draft(body) {
                Ok(draft) => draft,
                Err(response) => return response,
            };
            match service.create_point_of_interest(city_id, draft) {
                Ok(created) => {
                    let mut response = ApiResponse::json(STATUS_CREATED, &created);
                    if response.status == STATUS_CREATED {
                        response.location = Some(point_of_interest_location(city_id, created.id));
                    }
                    response
                }
                Err(err) => error_response(err),
            }
        }
        Route::UpdatePointOfInterest { city_id, poi_id } => {
            let draft = match parse_draft(body) {
                Ok(draft) => draft,
                Err(response) => return response,
            };
            no_content(service.update_point_of_interest(city_id, poi_id, draft))
        }
        Route::PatchPointOfInterest { city_id, poi_id } => {
            let Some(body) = body else {
                return ApiResponse::bad_request("body", "request body is required");
            };
            let document = match PatchDocument::from_json(body) {
                Ok(document) => document,
                Err(err) => return error_response(ServiceError::Patch(err)),
            };
            no_content(service.patch_point_of_interest(city_id, poi_id, document.operations()))
        }
        Route::DeletePointOfInterest { city_id, poi_id } => {
            no_content(service.delete_point_of_interest(city_id, poi_id))
        }
    }
}

fn no_content(result: Result<(), ServiceError>) -> ApiResponse {
    match result {
        Ok(()) => ApiResponse::empty(STATUS_NO_CONTENT),
        Err(err) => error_response(err),
    }
}

fn error_response(err: ServiceError) -> ApiResponse {
    match err {
        ServiceError::NotFound(_) => ApiResponse::empty(STATUS_NOT_FOUND),
        ServiceError::ValidationFailed(errors) => ApiResponse::json(STATUS_BAD_REQUEST, &errors),
        ServiceError::Patch(err) => ApiResponse::bad_request("patch", err.to_string()),
        ServiceError::InfrastructureFailure => internal_error(),
    }
}

fn internal_error() -> ApiResponse {
    ApiResponse {
        status: STATUS_INTERNAL_ERROR,
        body: Some(json!({ "message": INTERNAL_ERROR_MESSAGE })),
        location: None,
    }
}

fn parse_id(segment: &str) -> Result<i64, RouteError> {
    segment.parse().map_err(|_| RouteError::NotFound)
}

fn parse_include_children(query: &str) -> Result<bool, ApiResponse> {
    let query: CityQuery = serde_urlencoded::from_str(query).map_err(|err| {
        ApiResponse::bad_request("query", format!("malformed query string: {err}"))
    })?;
    match query.include_children.as_deref().map(str::to_ascii_lowercase) {
        None => Ok(false),
        Some(value) if value == "true" => Ok(true),
        Some(value) if value == "false" => Ok(false),
        Some(_) => Err(ApiResponse::bad_request(
            "includeChildren",
            "includeChildren must be true or false",
        )),
    }
}

fn parse_draft(body: Option<&str>) -> Result<PointOfInterestDraft, ApiResponse> {
    let Some(body) = body else {
        return Err(ApiResponse::bad_request("body", "request body is required"));
    };
    serde_json::from_str(body)
        .map_err(|err| ApiResponse::bad_request("body", format!("malformed request body: {err}")))
}

#[cfg(test)]
mod tests {
    use super::{resolve_route, Method, Route, RouteError};

    #[test]
    fn resolves_every_table_entry() {
        assert_eq!(resolve_route(Method::Get, "/areas"), Ok(Route::ListCities));
        assert_eq!(
            resolve_route(Method::Get, "/areas/2/"),
            Ok(Route::GetCity { city_id: 2 })
        );
        assert_eq!(
            resolve_route(Method::Post, "areas/2/children"),
            Ok(Route::CreatePointOfInterest { city_id: 2 })
        );
        assert_eq!(
            resolve_route(Method::Patch, "/areas/2/children/9"),
            Ok(Route::PatchPointOfInterest {
                city_id: 2,
                poi_id: 9
            })
        );
        assert_eq!(
            resolve_route(Method::Delete, "/areas/2/children/9"),
            Ok(Route::DeletePointOfInterest {
                city_id: 2,
                poi_id: 9
            })
        );
    }

    #[test]
    fn rejects_unknown_paths_and_methods() {
        assert_eq!(
            resolve_route(Method::Get, "/areas/abc"),
            Err(RouteError::NotFound)
        );
        assert_eq!(
            resolve_route(Method::Get, "/cities/1"),
            Err(RouteError::NotFound)
        );
        assert_eq!(
            resolve_route(Method::Delete, "/areas/1"),
            Err(RouteError::MethodNotAllowed)
        );
        assert_eq!(
            resolve_route(Method::Post, "/areas/1/children/3"),
            Err(RouteError::MethodNotAllowed)
        );
    }

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(Method::parse("patch"), Some(Method::Patch));
        assert_eq!(Method::parse("OPTIONS"), None);
    }
}
