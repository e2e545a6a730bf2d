/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Types shared by the AWS credentials providers.

pub mod credentials;
pub mod os_shim_internal;
pub mod profile;

pub use credentials::Credentials;
