use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// JSON body extractor that reports malformed payloads as a validation error
/// naming the offending field instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|err| AppError::bad_request(err.body_text()))?;

        parse_body(&bytes).map(ValidatedJson)
    }
}

fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let path = err.path().to_string();
        let field = if path == "." { "body".to_string() } else { path };
        AppError::validation(field, err.into_inner().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::budget::BudgetCreateRequest;

    #[test]
    fn type_mismatch_names_the_field() {
        let err = parse_body::<BudgetCreateRequest>(br#"{"year":"soon","amount":1}"#).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "year"));
    }

    #[test]
    fn missing_field_is_reported_against_the_body() {
        let err = parse_body::<BudgetCreateRequest>(br#"{"year":2025}"#).unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "body"));
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err = parse_body::<BudgetCreateRequest>(b"{not json").unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
