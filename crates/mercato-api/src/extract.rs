//! Request extractors.

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use mercato_commerce::identity::{Actor, Role};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_PHONE_HEADER: &str = "x-user-phone";

/// The caller, read from the identity headers set by the gateway.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl CurrentActor {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let id = header(headers, USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER}")))?;
        let role: Role = header(headers, USER_ROLE_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ROLE_HEADER}")))?
            .parse()
            .map_err(ApiError::Unauthorized)?;

        let mut actor = Actor::new(id, role);
        actor.name = header(headers, USER_NAME_HEADER);
        actor.email = header(headers, USER_EMAIL_HEADER);
        actor.phone = header(headers, USER_PHONE_HEADER);
        Ok(Self(actor))
    }
}

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

/// JSON body whose rejections use the API envelope.
#[derive(Debug, Clone)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Query string whose rejections use the API envelope.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Parse an optional JSON body; an empty body gives the default.
pub fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_actor_from_headers() {
        let CurrentActor(actor) = CurrentActor::from_headers(&headers(&[
            (USER_ID_HEADER, "c1"),
            (USER_ROLE_HEADER, "Customer"),
            (USER_EMAIL_HEADER, "c1@example.com"),
        ]))
        .unwrap();
        assert_eq!(actor.id.as_str(), "c1");
        assert_eq!(actor.role, Role::Customer);
        assert_eq!(actor.email.as_deref(), Some("c1@example.com"));
        assert!(actor.name.is_none());
    }

    #[test]
    fn test_missing_or_bad_identity_is_unauthorized() {
        assert!(matches!(
            CurrentActor::from_headers(&headers(&[(USER_ROLE_HEADER, "admin")])),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            CurrentActor::from_headers(&headers(&[(USER_ID_HEADER, "c1")])),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            CurrentActor::from_headers(&headers(&[
                (USER_ID_HEADER, "c1"),
                (USER_ROLE_HEADER, "wizard")
            ])),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_optional_json() {
        #[derive(Debug, Default, serde::Deserialize, PartialEq)]
        struct Body {
            reason: Option<String>,
        }

        assert_eq!(optional_json::<Body>(&Bytes::new()).unwrap(), Body::default());
        assert_eq!(
            optional_json::<Body>(&Bytes::from_static(br#"{"reason":"late"}"#))
                .unwrap()
                .reason
                .as_deref(),
            Some("late")
        );
        assert!(optional_json::<Body>(&Bytes::from_static(b"{oops")).is_err());
    }
}
