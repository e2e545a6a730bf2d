/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Future and sleep helpers shared by the credentials providers.
//!
//! Nothing in this crate requires a specific async runtime. A Tokio-backed sleep is provided
//! behind the `rt-tokio` feature (enabled by default).

pub mod future;
pub mod rt;
