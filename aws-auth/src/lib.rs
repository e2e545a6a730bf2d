/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! AWS credentials providers
//!
//! Two layers live here:
//! - [`provider`]: the [`ProvideCredentials`](provider::ProvideCredentials) trait, its error type,
//!   and every resolution strategy (static, environment, profile, container, instance metadata,
//!   chains and caching). These are plain async types.
//! - [`CredentialsProvider`]: a cheaply cloneable, reference counted handle around any
//!   `ProvideCredentials` implementation. It reports each resolution exactly once through a
//!   callback and fires an optional shutdown notification once the last reference and the last
//!   in-flight resolution are gone.
//!
//! ```no_run
//! use aws_auth::{CredentialsProvider, StaticConfig};
//!
//! # async fn docs() {
//! let provider = CredentialsProvider::from_static(StaticConfig {
//!     access_key: "AKID".into(),
//!     secret: "secret".into(),
//!     session_token: None,
//!     shutdown_options: None,
//! })
//! .expect("valid static config");
//! provider
//!     .get_credentials(|result| println!("resolved: {:?}", result))
//!     .expect("a tokio runtime is available");
//! # }
//! ```

pub mod bootstrap;
mod handle;
pub mod provider;

pub use aws_types::Credentials;
pub use bootstrap::ClientBootstrap;
pub use handle::{
    Builder, ChainDefaultConfig, Completion, CredentialsProvider, EnvironmentOptions,
    ProfileOptions, RejectedError, ShutdownOptions, StaticConfig,
};
pub use provider::{CredentialsError, ProvideCredentials};
