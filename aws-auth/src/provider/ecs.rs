/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Container credentials (ECS task roles)
//!
//! The container agent serves credentials over plain HTTP. The location is announced through
//! the environment:
//! - `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI`: a path on `http://169.254.170.2`
//! - `AWS_CONTAINER_CREDENTIALS_FULL_URI`: a complete URI, used when no relative URI is set.
//!   `https` may name any host; plain `http` is limited to loopback and the container agent hosts
//!   so the authorization token is never sent in the clear to an arbitrary host.
//! - `AWS_CONTAINER_AUTHORIZATION_TOKEN`: sent as the `Authorization` header when set

use crate::bootstrap::ClientBootstrap;
use crate::provider::json_credentials::parse_credentials_response;
use crate::provider::request::dispatch;
use crate::provider::{self, future, CredentialsError, ProvideCredentials};
use aws_types::os_shim_internal::Env;
use http::Uri;
use smithy_http::{Header, HttpMessage};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::Instrument;

const ECS_PROVIDER: &str = "EcsContainer";
const BASE_HOST: &str = "http://169.254.170.2";

const ENV_RELATIVE_URI: &str = "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";
const ENV_FULL_URI: &str = "AWS_CONTAINER_CREDENTIALS_FULL_URI";
const ENV_AUTHORIZATION: &str = "AWS_CONTAINER_AUTHORIZATION_TOKEN";

/// Container agent hosts reachable over plain HTTP besides loopback (ECS, EKS IPv4, EKS IPv6)
const CONTAINER_HOSTS: [IpAddr; 3] = [
    IpAddr::V4(Ipv4Addr::new(169, 254, 170, 2)),
    IpAddr::V4(Ipv4Addr::new(169, 254, 170, 23)),
    IpAddr::V6(Ipv6Addr::new(0xfd00, 0x0ec2, 0, 0, 0, 0, 0, 0x23)),
];

/// Whether credentials may be fetched from `host` without TLS
fn allowed_over_http(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    match host.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback() || CONTAINER_HOSTS.contains(&ip),
        Err(_) => false,
    }
}

/// Credentials provider for the ECS container credentials endpoint
#[derive(Debug, Clone)]
pub struct EcsCredentialsProvider {
    env: Env,
    bootstrap: Option<ClientBootstrap>,
}

impl EcsCredentialsProvider {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// `(endpoint, path)` of the credentials document, if the environment names one
    fn location(&self) -> Result<Option<(String, String)>, CredentialsError> {
        if let Some(relative) = self.env.get_non_empty(ENV_RELATIVE_URI) {
            let path = if relative.starts_with('/') {
                relative
            } else {
                format!("/{}", relative)
            };
            return Ok(Some((BASE_HOST.to_string(), path)));
        }
        let full = match self.env.get_non_empty(ENV_FULL_URI) {
            Some(full) => full,
            None => return Ok(None),
        };
        let uri: Uri = full.parse().map_err(|err| {
            CredentialsError::InvalidConfiguration(
                format!("`{}` is not a valid URI ({}): {}", ENV_FULL_URI, full, err).into(),
            )
        })?;
        match (uri.scheme_str(), uri.authority()) {
            (Some("http"), Some(authority)) if !allowed_over_http(authority.host()) => {
                Err(CredentialsError::InvalidConfiguration(
                    format!(
                        "`{}` uses plain http with host `{}`; \
                         only loopback and container hosts may be used without https",
                        ENV_FULL_URI,
                        authority.host()
                    )
                    .into(),
                ))
            }
            (Some(scheme @ ("http" | "https")), Some(authority)) => {
                let path = uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/")
                    .to_string();
                Ok(Some((format!("{}://{}", scheme, authority), path)))
            }
            _ => Err(CredentialsError::InvalidConfiguration(
                format!("`{}` must be an absolute http(s) URI, got `{}`", ENV_FULL_URI, full).into(),
            )),
        }
    }

    async fn credentials(&self) -> provider::Result {
        let (endpoint, path) = match self.location()? {
            Some(location) => location,
            None => {
                tracing::debug!("container credentials endpoint not configured");
                return Err(CredentialsError::CredentialsNotLoaded);
            }
        };
        let bootstrap = self.bootstrap.as_ref().ok_or_else(|| {
            CredentialsError::InvalidConfiguration(
                "no connector is available to reach the container credentials endpoint".into(),
            )
        })?;
        let mut message = HttpMessage::new_request("GET", path)
            .map_err(|err| CredentialsError::Unhandled(err.into()))?;
        message.add_header(
            Header::new("accept", "application/json")
                .map_err(|err| CredentialsError::Unhandled(err.into()))?,
        );
        if let Some(token) = self.env.get_non_empty(ENV_AUTHORIZATION) {
            let header = Header::new("authorization", token).map_err(|err| {
                CredentialsError::InvalidConfiguration(
                    format!("`{}` is not a valid header value: {}", ENV_AUTHORIZATION, err).into(),
                )
            })?;
            message.add_header(header);
        }
        let response = dispatch(bootstrap, message, &endpoint).await?;
        parse_credentials_response(&response, ECS_PROVIDER)
    }
}

impl ProvideCredentials for EcsCredentialsProvider {
    fn provide_credentials<'a>(&'a self) -> future::ProvideCredentials<'a>
    where
        Self: 'a,
    {
        future::ProvideCredentials::new(
            self.credentials()
                .instrument(tracing::info_span!("load_credentials", provider = ECS_PROVIDER)),
        )
    }
}

#[derive(Default, Debug)]
pub struct Builder {
    env: Option<Env>,
    bootstrap: Option<ClientBootstrap>,
}

impl Builder {
    /// Connector, sleep and timeouts for the credentials request
    pub fn bootstrap(mut self, bootstrap: ClientBootstrap) -> Self {
        self.bootstrap = Some(bootstrap);
        self
    }

    #[doc(hidden)]
    pub fn env(mut self, env: Env) -> Self {
        self.env = Some(env);
        self
    }

    pub fn build(self) -> EcsCredentialsProvider {
        let bootstrap = self.bootstrap.or_else(|| match ClientBootstrap::builder().build() {
            Ok(bootstrap) => Some(bootstrap),
            Err(err) => {
                tracing::warn!(error = %err, "container credentials provider has no connector");
                None
            }
        });
        EcsCredentialsProvider {
            env: self.env.unwrap_or_default(),
            bootstrap,
        }
    }
}
