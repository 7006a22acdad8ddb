/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Scripted collaborator implementations for tests
//!
//! Each mock replays a queue of pre-programmed results and records the requests it
//! received, so tests can assert both on outcomes and on what was sent.

use crate::credentials::Credentials;
use crate::ecs::{EcsCredentialsClient, EcsCredentialsError};
use crate::imds::{ImdsClient, ImdsError};
use crate::provider::BoxFuture;
use crate::sts::{AssumeRoleRequest, CallerIdentity, StsClient, StsError, WebIdentityRequest};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scripted STS collaborator
#[derive(Default)]
pub struct MockSts {
    assume_role_results: Mutex<VecDeque<Result<Credentials, StsError>>>,
    web_identity_results: Mutex<VecDeque<Result<Credentials, StsError>>>,
    caller_identity_results: Mutex<VecDeque<Result<CallerIdentity, StsError>>>,
    assume_role_calls: Mutex<Vec<(Credentials, AssumeRoleRequest)>>,
    web_identity_calls: Mutex<Vec<WebIdentityRequest>>,
    caller_identity_calls: Mutex<Vec<Credentials>>,
}

impl MockSts {
    pub fn with_assume_role_results(self, results: Vec<Result<Credentials, StsError>>) -> Self {
        *self.assume_role_results.lock().unwrap() = results.into_iter().collect();
        self
    }

    pub fn with_web_identity_results(self, results: Vec<Result<Credentials, StsError>>) -> Self {
        *self.web_identity_results.lock().unwrap() = results.into_iter().collect();
        self
    }

    pub fn with_caller_identity_results(
        self,
        results: Vec<Result<CallerIdentity, StsError>>,
    ) -> Self {
        *self.caller_identity_results.lock().unwrap() = results.into_iter().collect();
        self
    }

    /// Every `AssumeRole` call received, in order
    pub fn assume_role_calls(&self) -> Vec<(Credentials, AssumeRoleRequest)> {
        self.assume_role_calls.lock().unwrap().clone()
    }

    /// Every `AssumeRoleWithWebIdentity` call received, in order
    pub fn web_identity_calls(&self) -> Vec<WebIdentityRequest> {
        self.web_identity_calls.lock().unwrap().clone()
    }

    /// Every `GetCallerIdentity` call received, in order
    pub fn caller_identity_calls(&self) -> Vec<Credentials> {
        self.caller_identity_calls.lock().unwrap().clone()
    }

    /// True when every scripted response has been consumed
    pub fn exhausted(&self) -> bool {
        self.assume_role_results.lock().unwrap().is_empty()
            && self.web_identity_results.lock().unwrap().is_empty()
            && self.caller_identity_results.lock().unwrap().is_empty()
    }
}

fn unscripted() -> StsError {
    StsError::service("NoScriptedResponse", "the mock has no response for this call")
}

impl StsClient for MockSts {
    fn assume_role<'a>(
        &'a self,
        source: &'a Credentials,
        request: &'a AssumeRoleRequest,
    ) -> BoxFuture<'a, Result<Credentials, StsError>> {
        self.assume_role_calls
            .lock()
            .unwrap()
            .push((source.clone(), request.clone()));
        let result = self
            .assume_role_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unscripted()));
        Box::pin(std::future::ready(result))
    }

    fn assume_role_with_web_identity<'a>(
        &'a self,
        request: &'a WebIdentityRequest,
    ) -> BoxFuture<'a, Result<Credentials, StsError>> {
        self.web_identity_calls.lock().unwrap().push(request.clone());
        let result = self
            .web_identity_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unscripted()));
        Box::pin(std::future::ready(result))
    }

    fn get_caller_identity<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, Result<CallerIdentity, StsError>> {
        self.caller_identity_calls
            .lock()
            .unwrap()
            .push(credentials.clone());
        let result = self
            .caller_identity_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unscripted()));
        Box::pin(std::future::ready(result))
    }
}

/// A valid `GetCallerIdentity` answer for tests
pub fn caller_identity_for_tests() -> CallerIdentity {
    CallerIdentity {
        account_id: "222222222222".to_string(),
        arn: "arn:aws:iam::222222222222:user/Alice".to_string(),
        user_id: "AIDAEXAMPLE".to_string(),
    }
}

/// Scripted instance metadata collaborator, replaying one result
pub struct MockImds {
    result: Result<Credentials, ImdsError>,
    calls: AtomicUsize,
}

impl MockImds {
    pub fn new(result: Result<Credentials, ImdsError>) -> Self {
        MockImds {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn replay(&self) -> Result<Credentials, ImdsError> {
        match &self.result {
            Ok(creds) => Ok(creds.clone()),
            Err(ImdsError::Response { message }) => Err(ImdsError::Response {
                message: message.clone(),
            }),
            Err(ImdsError::Transport(err)) => Err(ImdsError::Transport(err.to_string().into())),
        }
    }
}

impl ImdsClient for MockImds {
    fn fetch_credentials(&self) -> BoxFuture<'_, Result<Credentials, ImdsError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::ready(self.replay()))
    }
}

/// Scripted container credentials collaborator, replaying one result
pub struct MockEcs {
    result: Result<Credentials, EcsCredentialsError>,
    calls: Mutex<Vec<String>>,
}

impl MockEcs {
    pub fn new(result: Result<Credentials, EcsCredentialsError>) -> Self {
        MockEcs {
            result,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The relative URIs requested, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn replay(&self) -> Result<Credentials, EcsCredentialsError> {
        match &self.result {
            Ok(creds) => Ok(creds.clone()),
            Err(EcsCredentialsError::Response { message }) => Err(EcsCredentialsError::Response {
                message: message.clone(),
            }),
            Err(EcsCredentialsError::Transport(err)) => {
                Err(EcsCredentialsError::Transport(err.to_string().into()))
            }
        }
    }
}

impl EcsCredentialsClient for MockEcs {
    fn fetch_credentials<'a>(
        &'a self,
        relative_uri: &'a str,
    ) -> BoxFuture<'a, Result<Credentials, EcsCredentialsError>> {
        self.calls.lock().unwrap().push(relative_uri.to_string());
        Box::pin(std::future::ready(self.replay()))
    }
}
