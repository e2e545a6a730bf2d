/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The JSON credentials document served by the container and instance metadata endpoints
//!
//! ```json
//! {
//!   "Code" : "Success",
//!   "LastUpdated" : "2021-09-17T20:57:08Z",
//!   "Type" : "AWS-HMAC",
//!   "AccessKeyId" : "ASIARTEST",
//!   "SecretAccessKey" : "xjtest",
//!   "Token" : "IQote///test",
//!   "Expiration" : "2021-09-18T03:31:56Z"
//! }
//! ```

use crate::provider::{self, CredentialsError};
use crate::Credentials;
use bytes::Bytes;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::SystemTime;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug)]
pub(crate) enum InvalidJsonCredentials {
    /// The response did not contain valid JSON
    JsonError(serde_json::Error),
    /// The response was missing a required field
    MissingField(&'static str),
    /// A field was present but could not be used
    InvalidField {
        field: &'static str,
        err: Box<dyn Error + Send + Sync>,
    },
}

impl Display for InvalidJsonCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InvalidJsonCredentials::JsonError(json) => {
                write!(f, "invalid JSON in response: {}", json)
            }
            InvalidJsonCredentials::MissingField(field) => {
                write!(f, "expected field `{}` in response but it was missing", field)
            }
            InvalidJsonCredentials::InvalidField { field, err } => {
                write!(f, "invalid field in response: `{}`. {}", field, err)
            }
        }
    }
}

impl Error for InvalidJsonCredentials {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InvalidJsonCredentials::JsonError(e) => Some(e),
            InvalidJsonCredentials::InvalidField { err, .. } => Some(err.as_ref() as _),
            InvalidJsonCredentials::MissingField(_) => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum JsonCredentials {
    RefreshableCredentials {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
        expiration: SystemTime,
    },
    Error {
        code: String,
        message: String,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Document {
    code: Option<String>,
    message: Option<String>,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    token: Option<String>,
    expiration: Option<String>,
}

/// Parse a credentials document
///
/// A `Code` other than `Success` is reported as [`JsonCredentials::Error`]. Unknown fields
/// (`Type`, `LastUpdated`, `RoleArn`, ...) are ignored.
pub(crate) fn parse_json_credentials(
    credentials_response: &str,
) -> Result<JsonCredentials, InvalidJsonCredentials> {
    let doc: Document =
        serde_json::from_str(credentials_response).map_err(InvalidJsonCredentials::JsonError)?;
    match doc.code.as_deref() {
        None | Some("Success") => {}
        Some(code) => {
            return Ok(JsonCredentials::Error {
                code: code.to_string(),
                message: doc.message.unwrap_or_default(),
            })
        }
    }
    let access_key_id = doc
        .access_key_id
        .ok_or(InvalidJsonCredentials::MissingField("AccessKeyId"))?;
    let secret_access_key = doc
        .secret_access_key
        .ok_or(InvalidJsonCredentials::MissingField("SecretAccessKey"))?;
    let expiration = doc
        .expiration
        .ok_or(InvalidJsonCredentials::MissingField("Expiration"))?;
    let expiration = OffsetDateTime::parse(&expiration, &Rfc3339).map_err(|err| {
        InvalidJsonCredentials::InvalidField {
            field: "Expiration",
            err: err.into(),
        }
    })?;
    Ok(JsonCredentials::RefreshableCredentials {
        access_key_id,
        secret_access_key,
        session_token: doc.token,
        expiration: expiration.into(),
    })
}

/// Turn an HTTP response from a credentials endpoint into credentials attributed to
/// `provider_name`
pub(crate) fn parse_credentials_response(
    response: &http::Response<Bytes>,
    provider_name: &'static str,
) -> provider::Result {
    if !response.status().is_success() {
        return Err(CredentialsError::ProviderError(
            format!(
                "non-success status from {} credentials endpoint: {}",
                provider_name,
                response.status()
            )
            .into(),
        ));
    }
    let body = std::str::from_utf8(response.body().as_ref())
        .map_err(|err| CredentialsError::Unhandled(err.into()))?;
    match parse_json_credentials(body).map_err(|err| CredentialsError::Unhandled(err.into()))? {
        JsonCredentials::RefreshableCredentials {
            access_key_id,
            secret_access_key,
            session_token,
            expiration,
        } => Ok(Credentials::new(
            access_key_id,
            secret_access_key,
            session_token,
            Some(expiration),
            provider_name,
        )),
        JsonCredentials::Error { code, message } => Err(CredentialsError::ProviderError(
            format!("failed to load credentials [{}]: {}", code, message).into(),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::{
        parse_credentials_response, parse_json_credentials, InvalidJsonCredentials,
        JsonCredentials,
    };
    use crate::provider::CredentialsError;
    use bytes::Bytes;
    use std::time::{Duration, UNIX_EPOCH};

    const SUCCESS: &str = r#"{
        "Code" : "Success",
        "LastUpdated" : "2021-09-17T20:57:08Z",
        "Type" : "AWS-HMAC",
        "AccessKeyId" : "ASIARTEST",
        "SecretAccessKey" : "xjtest",
        "Token" : "IQote///test",
        "Expiration" : "2021-09-18T03:31:56Z"
    }"#;

    #[test]
    fn parses_success_document() {
        let creds = parse_json_credentials(SUCCESS).expect("valid document");
        assert_eq!(
            creds,
            JsonCredentials::RefreshableCredentials {
                access_key_id: "ASIARTEST".into(),
                secret_access_key: "xjtest".into(),
                session_token: Some("IQote///test".into()),
                expiration: UNIX_EPOCH + Duration::from_secs(1631935916),
            }
        )
    }

    #[test]
    fn documents_without_a_code_are_accepted() {
        let doc = r#"{"AccessKeyId": "AKID", "SecretAccessKey": "secret", "Expiration": "2009-02-13T23:31:30Z"}"#;
        match parse_json_credentials(doc).expect("valid") {
            JsonCredentials::RefreshableCredentials {
                session_token,
                expiration,
                ..
            } => {
                assert_eq!(session_token, None);
                assert_eq!(expiration, UNIX_EPOCH + Duration::from_secs(1234567890));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn error_codes() {
        let doc = r#"{"Code": "AssumeRoleUnauthorizedAccess", "Message": "EC2 cannot assume the role"}"#;
        assert_eq!(
            parse_json_credentials(doc).expect("valid"),
            JsonCredentials::Error {
                code: "AssumeRoleUnauthorizedAccess".into(),
                message: "EC2 cannot assume the role".into(),
            }
        );
    }

    #[test]
    fn missing_and_invalid_fields() {
        let missing = r#"{"Code": "Success", "AccessKeyId": "AKID", "Expiration": "2021-09-18T03:31:56Z"}"#;
        assert!(matches!(
            parse_json_credentials(missing),
            Err(InvalidJsonCredentials::MissingField("SecretAccessKey"))
        ));
        let bad_date =
            r#"{"AccessKeyId": "AKID", "SecretAccessKey": "s", "Expiration": "tomorrow"}"#;
        let err = parse_json_credentials(bad_date).expect_err("invalid date");
        assert!(err.to_string().contains("Expiration"), "{}", err);
        assert!(matches!(
            parse_json_credentials("not json"),
            Err(InvalidJsonCredentials::JsonError(_))
        ));
    }

    fn response(status: u16, body: &'static str) -> http::Response<Bytes> {
        http::Response::builder()
            .status(status)
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    #[test]
    fn responses_map_to_credentials_errors() {
        let creds = parse_credentials_response(&response(200, SUCCESS), "Ecs").expect("valid");
        assert_eq!(creds.provider_name(), "Ecs");
        assert_eq!(creds.session_token(), Some("IQote///test"));

        assert!(matches!(
            parse_credentials_response(&response(500, SUCCESS), "Ecs"),
            Err(CredentialsError::ProviderError(_))
        ));
        assert!(matches!(
            parse_credentials_response(&response(200, "{}"), "Ecs"),
            Err(CredentialsError::Unhandled(_))
        ));
        let err = parse_credentials_response(
            &response(200, r#"{"Code": "Denied", "Message": "no"}"#),
            "Ecs",
        )
        .expect_err("error code");
        assert!(err.to_string().contains("[Denied]: no"), "{}", err);
    }
}
