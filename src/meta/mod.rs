/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Combinators that compose credential providers

pub mod chain;
pub mod lazy_caching;
