use uuid::Uuid;

use crate::api::errors::ApiError;

/// Path ids are UUID strings issued by this service; anything else is
/// rejected before touching the store.
pub(crate) fn validate_id(value: &str, label: &str) -> Result<(), ApiError> {
    if Uuid::try_parse(value).is_ok() {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("Invalid {label} ID")))
    }
}

/// Question payloads carry exactly four options, none of them blank.
pub(crate) fn validate_options(options: &[String]) -> Result<(), ApiError> {
    if options.len() != 4 || options.iter().any(|option| option.trim().is_empty()) {
        return Err(ApiError::BadRequest(
            "Question must have exactly 4 non-empty options".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_uuid_is_accepted() {
        assert!(validate_id("550e8400-e29b-41d4-a716-446655440000", "quiz").is_ok());
    }

    #[test]
    fn malformed_id_names_the_label() {
        let err = validate_id("not-a-uuid", "quiz").unwrap_err();
        match err {
            ApiError::BadRequest(message) => assert_eq!(message, "Invalid quiz ID"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn options_must_be_exactly_four() {
        let three = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(validate_options(&three).is_err());

        let four: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert!(validate_options(&four).is_ok());
    }

    #[test]
    fn blank_option_is_rejected() {
        let options: Vec<String> = ["a", " ", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert!(validate_options(&options).is_err());
    }
}
