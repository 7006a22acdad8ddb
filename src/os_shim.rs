/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Abstractions for the process environment:
//! - Reading environment variables
//! - Reading from the file system
//!
//! Every ambient read performed by this crate goes through [`Env`] and [`Fs`] so that
//! credential resolution stays deterministic and testable. Nothing below this module
//! touches `std::env` or `std::fs` directly.

use std::collections::HashMap;
use std::env::VarError;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

/// Process environment abstraction
///
/// Environment variables are global to a process, which makes them hostile to a
/// multi-threaded test runner. `Env` reads either from the real process environment
/// ([`std::env::var`]) or from a fake map.
///
/// # Example
/// ```rust
/// use aws_base::os_shim::Env;
/// let env = Env::from_slice(&[("AWS_PROFILE", "base")]);
/// assert_eq!(env.get("AWS_PROFILE").unwrap(), "base");
/// ```
#[derive(Clone, Debug)]
pub struct Env(Arc<EnvInner>);

#[derive(Debug)]
enum EnvInner {
    Real,
    Fake(HashMap<String, String>),
}

impl Default for Env {
    fn default() -> Self {
        Self::real()
    }
}

impl Env {
    /// An `Env` that delegates to [`std::env::var`]
    pub fn real() -> Self {
        Env(Arc::new(EnvInner::Real))
    }

    /// A fake `Env` backed by a slice of `(key, value)` pairs
    pub fn from_slice(vars: &[(&str, &str)]) -> Self {
        Env(Arc::new(EnvInner::Fake(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )))
    }

    pub fn get(&self, key: &str) -> Result<String, VarError> {
        match self.0.as_ref() {
            EnvInner::Real => std::env::var(key),
            EnvInner::Fake(map) => map.get(key).cloned().ok_or(VarError::NotPresent),
        }
    }
}

impl From<HashMap<String, String>> for Env {
    fn from(map: HashMap<String, String>) -> Self {
        Env(Arc::new(EnvInner::Fake(map)))
    }
}

/// File system abstraction
///
/// Enables in-memory mocking of the files consumed during credential resolution
/// (shared config files, web identity token files).
///
/// # Example
/// ```rust
/// use aws_base::os_shim::Fs;
/// let fs = Fs::from_slice(&[("/home/me/.aws/config", "[default]\nregion = us-east-1")]);
/// assert!(fs.read_to_end("/home/me/.aws/config").is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct Fs(Arc<FsInner>);

#[derive(Debug)]
enum FsInner {
    Real,
    Fake(HashMap<OsString, Vec<u8>>),
}

impl Default for Fs {
    fn default() -> Self {
        Fs::real()
    }
}

impl Fs {
    /// An `Fs` that delegates to `std::fs`
    pub fn real() -> Self {
        Fs(Arc::new(FsInner::Real))
    }

    /// A fake `Fs` backed by a slice of `(path, contents)` pairs
    pub fn from_slice(files: &[(&str, &str)]) -> Self {
        Fs(Arc::new(FsInner::Fake(
            files
                .iter()
                .map(|(path, contents)| (OsString::from(path), contents.as_bytes().to_vec()))
                .collect(),
        )))
    }

    /// A fake `Fs` backed by a map of path to raw contents
    pub fn from_map(files: HashMap<String, Vec<u8>>) -> Self {
        Fs(Arc::new(FsInner::Fake(
            files.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    pub fn read_to_end(&self, path: impl AsRef<Path>) -> std::io::Result<Vec<u8>> {
        let path = path.as_ref();
        match self.0.as_ref() {
            FsInner::Real => std::fs::read(path),
            FsInner::Fake(files) => files
                .get(path.as_os_str())
                .cloned()
                .ok_or_else(|| std::io::ErrorKind::NotFound.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Env, Fs};
    use std::env::VarError;

    #[test]
    fn fake_env_lookup() {
        let env = Env::from_slice(&[("FOO", "bar")]);
        assert_eq!(env.get("FOO").unwrap(), "bar");
        assert_eq!(env.get("MISSING").expect_err("not set"), VarError::NotPresent);
    }

    #[test]
    fn fake_fs_read() {
        let fs = Fs::from_slice(&[("/creds", "[default]")]);
        assert_eq!(fs.read_to_end("/creds").unwrap(), b"[default]".to_vec());
        let err = fs.read_to_end("/missing").expect_err("no such file");
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
