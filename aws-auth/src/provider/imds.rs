/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! EC2 instance metadata (IMDSv2) credentials
//!
//! Loading takes three requests:
//! 1. `PUT /latest/api/token` with `x-aws-ec2-metadata-token-ttl-seconds` to obtain a session
//!    token
//! 2. `GET /latest/meta-data/iam/security-credentials/` for the name of the instance role
//! 3. `GET /latest/meta-data/iam/security-credentials/<role>` for the credentials document
//!
//! Requests 2 and 3 carry the session token in `x-aws-ec2-metadata-token`.

use crate::bootstrap::ClientBootstrap;
use crate::provider::json_credentials::parse_credentials_response;
use crate::provider::request::{dispatch, DispatchError};
use crate::provider::{self, future, CredentialsError, ProvideCredentials};
use aws_types::os_shim_internal::Env;
use bytes::Bytes;
use http::StatusCode;
use smithy_http::{Header, HttpMessage};
use std::time::Duration;
use tracing::Instrument;

const IMDS_PROVIDER: &str = "Ec2InstanceMetadata";
const DEFAULT_ENDPOINT: &str = "http://169.254.169.254";
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(21600);

const TOKEN_PATH: &str = "/latest/api/token";
const CREDENTIALS_PATH: &str = "/latest/meta-data/iam/security-credentials/";

const X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const X_AWS_EC2_METADATA_TOKEN: &str = "x-aws-ec2-metadata-token";

const ENV_ENDPOINT: &str = "AWS_EC2_METADATA_SERVICE_ENDPOINT";
const ENV_DISABLED: &str = "AWS_EC2_METADATA_DISABLED";

/// Credentials provider for the instance role of an EC2 instance
#[derive(Debug, Clone)]
pub struct ImdsCredentialsProvider {
    env: Env,
    bootstrap: Option<ClientBootstrap>,
    endpoint: Option<String>,
    token_ttl: Duration,
}

impl ImdsCredentialsProvider {
    pub fn builder() -> Builder {
        Builder::default()
    }

    fn disabled(&self) -> bool {
        self.env
            .get_non_empty(ENV_DISABLED)
            .map(|value| value.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .or_else(|| self.env.get_non_empty(ENV_ENDPOINT))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }

    async fn credentials(&self) -> provider::Result {
        if self.disabled() {
            tracing::debug!("instance metadata service disabled by {}", ENV_DISABLED);
            return Err(CredentialsError::CredentialsNotLoaded);
        }
        let bootstrap = self.bootstrap.as_ref().ok_or_else(|| {
            CredentialsError::InvalidConfiguration(
                "no connector is available to reach the instance metadata service".into(),
            )
        })?;
        let endpoint = self.endpoint();
        let client = Client {
            bootstrap,
            endpoint: &endpoint,
        };
        let token = client.token(self.token_ttl).await?;
        let role = client.role_name(&token).await?;
        tracing::debug!(role = %role, "loaded instance role name");
        let response = client
            .get(&format!("{}{}", CREDENTIALS_PATH, role), &token)
            .await?;
        parse_credentials_response(&response, IMDS_PROVIDER)
    }
}

struct Client<'a> {
    bootstrap: &'a ClientBootstrap,
    endpoint: &'a str,
}

impl Client<'_> {
    async fn token(&self, ttl: Duration) -> Result<String, CredentialsError> {
        let mut message = HttpMessage::new_request("PUT", TOKEN_PATH).map_err(unhandled)?;
        message.add_header(
            Header::new(X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS, ttl.as_secs().to_string())
                .map_err(unhandled)?,
        );
        let response = dispatch(self.bootstrap, message, self.endpoint)
            .await
            .map_err(|err| unreachable_is_not_loaded(err, self.endpoint))?;
        match response.status() {
            status if status.is_success() => body_string(response.into_body()),
            StatusCode::FORBIDDEN => Err(CredentialsError::ProviderError(
                "instance metadata token request was forbidden; IMDS may be disabled on this instance".into(),
            )),
            status => Err(CredentialsError::ProviderError(
                format!("failed to load instance metadata token: {}", status).into(),
            )),
        }
    }

    async fn role_name(&self, token: &str) -> Result<String, CredentialsError> {
        let response = self.get(CREDENTIALS_PATH, token).await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("no instance role is attached to this instance");
            return Err(CredentialsError::CredentialsNotLoaded);
        }
        if !response.status().is_success() {
            return Err(CredentialsError::ProviderError(
                format!("failed to load instance role name: {}", response.status()).into(),
            ));
        }
        let body = body_string(response.into_body())?;
        match body.lines().map(str::trim).find(|line| !line.is_empty()) {
            Some(role) => Ok(role.to_string()),
            None => Err(CredentialsError::CredentialsNotLoaded),
        }
    }

    async fn get(&self, path: &str, token: &str) -> Result<http::Response<Bytes>, CredentialsError> {
        let mut message = HttpMessage::new_request("GET", path).map_err(unhandled)?;
        message.add_header(Header::new(X_AWS_EC2_METADATA_TOKEN, token).map_err(|err| {
            CredentialsError::ProviderError(
                format!("instance metadata returned an unusable token: {}", err).into(),
            )
        })?);
        Ok(dispatch(self.bootstrap, message, self.endpoint).await?)
    }
}

fn unhandled(err: smithy_http::HttpError) -> CredentialsError {
    CredentialsError::Unhandled(err.into())
}

/// When nothing answers at the endpoint we are most likely not running on EC2
fn unreachable_is_not_loaded(err: DispatchError, endpoint: &str) -> CredentialsError {
    if err.is_unreachable() {
        tracing::debug!(endpoint = %endpoint, error = %err, "instance metadata service unreachable");
        CredentialsError::CredentialsNotLoaded
    } else {
        err.into()
    }
}

fn body_string(body: Bytes) -> Result<String, CredentialsError> {
    String::from_utf8(body.to_vec()).map_err(|err| CredentialsError::Unhandled(err.into()))
}

impl ProvideCredentials for ImdsCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(
            self.credentials()
                .instrument(tracing::info_span!("load_credentials", provider = IMDS_PROVIDER)),
        )
    }
}

#[derive(Debug, Default)]
pub struct Builder {
    env: Option<Env>,
    bootstrap: Option<ClientBootstrap>,
    endpoint: Option<String>,
    token_ttl: Option<Duration>,
}

impl Builder {
    /// Connector, sleep and timeouts for metadata requests
    pub fn bootstrap(mut self, bootstrap: ClientBootstrap) -> Self {
        self.bootstrap = Some(bootstrap);
        self
    }

    /// Use this endpoint instead of `$AWS_EC2_METADATA_SERVICE_ENDPOINT` or `http://169.254.169.254`
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Lifetime requested for the session token. Defaults to six hours.
    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = Some(ttl);
        self
    }

    #[doc(hidden)]
    pub fn env(mut self, env: Env) -> Self {
        self.env = Some(env);
        self
    }

    pub fn build(self) -> ImdsCredentialsProvider {
        let bootstrap = self.bootstrap.or_else(|| match ClientBootstrap::builder().build() {
            Ok(bootstrap) => Some(bootstrap),
            Err(err) => {
                tracing::warn!(error = %err, "instance metadata provider has no connector");
                None
            }
        });
        ImdsCredentialsProvider {
            env: self.env.unwrap_or_default(),
            bootstrap,
            endpoint: self.endpoint,
            token_ttl: self.token_ttl.unwrap_or(DEFAULT_TOKEN_TTL),
        }
    }
}

#[cfg(test)]
mod test {
    use super::ImdsCredentialsProvider;
    use crate::bootstrap::ClientBootstrap;
    use crate::provider::{CredentialsError, ProvideCredentials};
    use aws_types::os_shim_internal::Env;
    use http::Method;
    use smithy_http::connector::DynConnector;
    use smithy_http::test_connection::{ReplayEvent, TestConnection};
    use smithy_http::ConnectorError;

    const CREDS: &str = r#"{
        "Code" : "Success",
        "LastUpdated" : "2021-09-17T20:57:08Z",
        "Type" : "AWS-HMAC",
        "AccessKeyId" : "ASIAIMDS",
        "SecretAccessKey" : "imds-secret",
        "Token" : "imds-token",
        "Expiration" : "2021-09-18T03:31:56Z"
    }"#;

    fn provider(env: &[(&str, &str)], conn: TestConnection) -> ImdsCredentialsProvider {
        ImdsCredentialsProvider::builder()
            .env(Env::from_slice(env))
            .bootstrap(
                ClientBootstrap::builder()
                    .connector(DynConnector::new(conn))
                    .build()
                    .unwrap(),
            )
            .build()
    }

    #[tokio::test]
    async fn token_role_then_credentials() {
        let conn = TestConnection::new(vec![
            ReplayEvent::respond(200, "session-token"),
            ReplayEvent::respond(200, "my-role\n"),
            ReplayEvent::respond(200, CREDS),
        ]);
        let creds = provider(&[], conn.clone())
            .provide_credentials()
            .await
            .expect("valid credentials");
        assert_eq!(creds.access_key_id(), "ASIAIMDS");
        assert_eq!(creds.session_token(), Some("imds-token"));
        assert_eq!(creds.provider_name(), "Ec2InstanceMetadata");

        let requests = conn.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, Method::PUT);
        assert_eq!(
            requests[0].uri.to_string(),
            "http://169.254.169.254/latest/api/token"
        );
        assert_eq!(
            requests[0].headers["x-aws-ec2-metadata-token-ttl-seconds"],
            "21600"
        );
        assert!(requests[0].headers.get("x-aws-ec2-metadata-token").is_none());
        assert_eq!(requests[1].method, Method::GET);
        assert_eq!(
            requests[1].uri.path(),
            "/latest/meta-data/iam/security-credentials/"
        );
        assert_eq!(
            requests[2].uri.path(),
            "/latest/meta-data/iam/security-credentials/my-role"
        );
        for request in &requests[1..] {
            assert_eq!(request.headers["x-aws-ec2-metadata-token"], "session-token");
        }
    }

    #[tokio::test]
    async fn endpoint_override_from_env() {
        let conn = TestConnection::new(vec![
            ReplayEvent::respond(200, "token"),
            ReplayEvent::respond(200, "role"),
            ReplayEvent::respond(200, CREDS),
        ]);
        provider(
            &[("AWS_EC2_METADATA_SERVICE_ENDPOINT", "http://[fd00:ec2::254]")],
            conn.clone(),
        )
        .provide_credentials()
        .await
        .expect("valid credentials");
        assert_eq!(
            conn.requests()[0].uri.to_string(),
            "http://[fd00:ec2::254]/latest/api/token"
        );
    }

    #[tokio::test]
    async fn disabled_by_env() {
        let conn = TestConnection::empty();
        let err = provider(&[("AWS_EC2_METADATA_DISABLED", "TRUE")], conn.clone())
            .provide_credentials()
            .await
            .expect_err("disabled");
        assert!(matches!(err, CredentialsError::CredentialsNotLoaded));
        assert!(conn.requests().is_empty());
    }

    #[tokio::test]
    async fn unreachable_is_not_loaded() {
        let conn = TestConnection::new(vec![ReplayEvent::Fail(ConnectorError::Io(
            "connection refused".into(),
        ))]);
        let err = provider(&[], conn)
            .provide_credentials()
            .await
            .expect_err("not on ec2");
        assert!(matches!(err, CredentialsError::CredentialsNotLoaded));
    }

    #[tokio::test]
    async fn forbidden_token_request() {
        let conn = TestConnection::new(vec![ReplayEvent::respond(403, "")]);
        let err = provider(&[], conn)
            .provide_credentials()
            .await
            .expect_err("forbidden");
        assert!(matches!(err, CredentialsError::ProviderError(_)));
        assert!(err.to_string().contains("forbidden"), "{}", err);
    }

    #[tokio::test]
    async fn no_role_attached() {
        let conn = TestConnection::new(vec![
            ReplayEvent::respond(200, "token"),
            ReplayEvent::respond(404, "not found"),
        ]);
        let err = provider(&[], conn)
            .provide_credentials()
            .await
            .expect_err("no role");
        assert!(matches!(err, CredentialsError::CredentialsNotLoaded));
    }
}
