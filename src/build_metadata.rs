/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Metadata about this crate and the toolchain it was built with, reported in the
//! user agent.

include!(concat!(env!("OUT_DIR"), "/build_env.rs"));

#[derive(Debug)]
pub struct BuildMetadata {
    pub rust_version: &'static str,
    pub core_pkg_version: &'static str,
    pub os_family: OsFamily,
}

/// The target operating system, normalized to the small set of names reported in
/// user agent strings.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OsFamily {
    Windows,
    Linux,
    Macos,
    Android,
    Ios,
    Other,
}

impl OsFamily {
    pub const fn from_env() -> Self {
        // values of `target_os`: https://doc.rust-lang.org/reference/conditional-compilation.html
        if cfg!(target_os = "linux") {
            OsFamily::Linux
        } else if cfg!(target_os = "windows") {
            OsFamily::Windows
        } else if cfg!(target_os = "macos") {
            OsFamily::Macos
        } else if cfg!(target_os = "android") {
            OsFamily::Android
        } else if cfg!(target_os = "ios") {
            OsFamily::Ios
        } else {
            OsFamily::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Linux => "linux",
            OsFamily::Macos => "macos",
            OsFamily::Android => "android",
            OsFamily::Ios => "ios",
            OsFamily::Other => "other",
        }
    }
}

pub static BUILD_METADATA: BuildMetadata = BuildMetadata {
    rust_version: RUST_VERSION,
    core_pkg_version: env!("CARGO_PKG_VERSION"),
    os_family: OsFamily::from_env(),
};

#[cfg(test)]
mod test {
    use super::BUILD_METADATA;

    #[test]
    fn valid_build_metadata() {
        let meta = &BUILD_METADATA;
        assert!(meta.rust_version.starts_with("1."));
        assert!(!meta.core_pkg_version.is_empty());
    }
}
