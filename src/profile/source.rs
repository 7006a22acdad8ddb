/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Locate and read the shared config and credentials files
//!
//! File locations are resolved with a fixed precedence: explicitly configured paths
//! win over paths set via environment variables, which win over the default
//! locations under `~/.aws`.

use crate::os_shim::{Env, Fs};
use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

const ENV_CONFIG_FILE: &str = "AWS_CONFIG_FILE";
const ENV_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";
const ENV_PROFILE: &str = "AWS_PROFILE";

const DEFAULT_CONFIG_PATH: &str = "~/.aws/config";
const DEFAULT_CREDENTIALS_PATH: &str = "~/.aws/credentials";
const DEFAULT_PROFILE: &str = "default";

/// In-memory copy of one shared file
#[derive(Debug)]
pub struct File {
    pub path: String,
    pub contents: String,
}

/// In-memory source of profile data
#[derive(Debug)]
pub struct Source {
    /// Contents of the shared config files (`~/.aws/config` by default)
    pub config_files: Vec<File>,

    /// Contents of the shared credentials files (`~/.aws/credentials` by default)
    pub credentials_files: Vec<File>,

    /// Profile to use
    pub profile: Cow<'static, str>,

    /// Whether the profile was chosen explicitly (config or `$AWS_PROFILE`) rather
    /// than defaulted
    pub profile_overridden: bool,
}

/// Load a [`Source`] from the given environment and file system
pub(crate) fn load(
    fs: &Fs,
    env: &Env,
    explicit_config_files: &[PathBuf],
    explicit_credentials_files: &[PathBuf],
    explicit_profile: Option<&str>,
) -> Source {
    let config_files = tracing::info_span!("load_config_files").in_scope(|| {
        read_all(
            fs,
            env,
            explicit_config_files,
            ENV_CONFIG_FILE,
            DEFAULT_CONFIG_PATH,
        )
    });
    let credentials_files = tracing::info_span!("load_credentials_files").in_scope(|| {
        read_all(
            fs,
            env,
            explicit_credentials_files,
            ENV_CREDENTIALS_FILE,
            DEFAULT_CREDENTIALS_PATH,
        )
    });
    let (profile, profile_overridden) = match explicit_profile {
        Some(profile) => (Cow::Owned(profile.to_string()), true),
        None => match env.get(ENV_PROFILE) {
            Ok(profile) => (Cow::Owned(profile), true),
            Err(_) => (Cow::Borrowed(DEFAULT_PROFILE), false),
        },
    };
    Source {
        config_files,
        credentials_files,
        profile,
        profile_overridden,
    }
}

fn read_all(
    fs: &Fs,
    env: &Env,
    explicit_paths: &[PathBuf],
    env_var: &str,
    default_path: &str,
) -> Vec<File> {
    let paths: Vec<PathBuf> = if !explicit_paths.is_empty() {
        explicit_paths.to_vec()
    } else if let Ok(path) = env.get(env_var) {
        vec![PathBuf::from(path)]
    } else {
        vec![PathBuf::from(default_path)]
    };
    let defaulted = explicit_paths.is_empty() && env.get(env_var).is_err();
    paths
        .iter()
        .map(|path| read(fs, env, path, defaulted))
        .collect()
}

fn read(fs: &Fs, env: &Env, path: &Path, defaulted: bool) -> File {
    let expanded = expand_home(path, env);
    tracing::debug!(before = ?path, after = ?expanded, "home directory expanded");
    let data = match fs.read_to_end(&expanded) {
        Ok(data) => data,
        Err(e) => {
            match e.kind() {
                ErrorKind::NotFound if defaulted => {
                    tracing::info!(path = ?path, "shared file not found")
                }
                ErrorKind::NotFound => {
                    tracing::warn!(path = ?path, "explicitly configured shared file not found")
                }
                _other => tracing::warn!(path = ?path, error = %e, "failed to read shared file"),
            };
            Default::default()
        }
    };
    let contents = match String::from_utf8(data) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "shared file did not contain utf-8 encoded data");
            Default::default()
        }
    };
    tracing::info!(path = ?path, size = ?contents.len(), "shared file loaded");
    File {
        // lossy is OK here, the path is only used for debugging
        path: expanded.to_string_lossy().into(),
        contents,
    }
}

fn expand_home(path: &Path, env: &Env) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let mut expanded = match home_dir(env) {
                Some(dir) => dir,
                None => {
                    tracing::warn!(
                        "could not determine home directory but home expansion was requested"
                    );
                    Default::default()
                }
            };
            for component in components {
                expanded.push(component);
            }
            expanded
        }
        // anything that doesn't start with `~/` is used verbatim; such paths come
        // from configuration on the target platform so their separators are already
        // correct
        _ => path.into(),
    }
}

fn home_dir(env: &Env) -> Option<PathBuf> {
    if let Ok(home) = env.get("HOME") {
        return Some(PathBuf::from(home));
    }
    if let Ok(profile) = env.get("USERPROFILE") {
        return Some(PathBuf::from(profile));
    }
    if let (Ok(mut drive), Ok(path)) = (env.get("HOMEDRIVE"), env.get("HOMEPATH")) {
        drive.push_str(&path);
        return Some(drive.into());
    }
    None
}

#[cfg(test)]
mod test {
    use super::{expand_home, load};
    use crate::os_shim::{Env, Fs};
    use std::path::{Path, PathBuf};

    const HOME_CONFIG: &str = "[default]\nregion = us-east-1";
    const ENV_CONFIG: &str = "[default]\nregion = us-east-2";
    const EXPLICIT_CONFIG: &str = "[default]\nregion = us-west-2";

    fn fs() -> Fs {
        Fs::from_slice(&[
            ("/home/me/.aws/config", HOME_CONFIG),
            ("/env/config", ENV_CONFIG),
            ("/explicit/config", EXPLICIT_CONFIG),
        ])
    }

    #[test]
    fn default_location_under_home() {
        let env = Env::from_slice(&[("HOME", "/home/me")]);
        let source = load(&fs(), &env, &[], &[], None);
        assert_eq!(source.config_files[0].contents, HOME_CONFIG);
        assert_eq!(source.profile, "default");
        assert!(!source.profile_overridden);
    }

    #[test]
    fn env_var_overrides_default_location() {
        let env = Env::from_slice(&[("HOME", "/home/me"), ("AWS_CONFIG_FILE", "/env/config")]);
        let source = load(&fs(), &env, &[], &[], None);
        assert_eq!(source.config_files[0].contents, ENV_CONFIG);
    }

    #[test]
    fn explicit_paths_override_env_var() {
        let env = Env::from_slice(&[("HOME", "/home/me"), ("AWS_CONFIG_FILE", "/env/config")]);
        let source = load(&fs(), &env, &[PathBuf::from("/explicit/config")], &[], None);
        assert_eq!(source.config_files[0].contents, EXPLICIT_CONFIG);
    }

    #[test]
    fn profile_from_environment() {
        let env = Env::from_slice(&[("HOME", "/home/me"), ("AWS_PROFILE", "other")]);
        let source = load(&fs(), &env, &[], &[], None);
        assert_eq!(source.profile, "other");
        assert!(source.profile_overridden);
    }

    #[test]
    fn explicit_profile_wins() {
        let env = Env::from_slice(&[("HOME", "/home/me"), ("AWS_PROFILE", "other")]);
        let source = load(&fs(), &env, &[], &[], Some("explicit"));
        assert_eq!(source.profile, "explicit");
    }

    #[test]
    fn missing_file_yields_empty_contents() {
        let env = Env::from_slice(&[("HOME", "/nowhere")]);
        let source = load(&fs(), &env, &[], &[], None);
        assert_eq!(source.config_files[0].contents, "");
    }

    #[test]
    fn expand_home_prefix() {
        let env = Env::from_slice(&[("HOME", "/user/foo")]);
        assert_eq!(
            expand_home(Path::new("~/.aws/config"), &env),
            PathBuf::from("/user/foo/.aws/config")
        );
    }

    #[test]
    fn only_expand_home_as_full_component() {
        let env = Env::from_slice(&[("HOME", "/user/foo")]);
        assert_eq!(
            expand_home(Path::new("~aws/config"), &env),
            PathBuf::from("~aws/config")
        );
    }

    #[test]
    fn home_dir_fallbacks() {
        let env = Env::from_slice(&[("HOMEDRIVE", "C:"), ("HOMEPATH", "/Users/name")]);
        assert_eq!(
            expand_home(Path::new("~/.aws/config"), &env),
            PathBuf::from("C:/Users/name/.aws/config")
        );
    }
}
