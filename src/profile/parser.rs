/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Parse the INI-style shared config and credentials files into a [`ProfileSet`]
//!
//! Section naming differs between the two files: the config file uses
//! `[profile <name>]` (with `[default]` allowed bare), the credentials file uses the
//! profile name directly. Files are merged in parse order, so properties from the
//! credentials files override those from the config files.

use crate::profile::source::{File, Source};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Key-value property pair
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Property {
    key: String,
    value: String,
}

impl Property {
    pub fn new(key: String, value: String) -> Self {
        Property { key, value }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// An individual named profile
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Profile {
    name: String,
    properties: HashMap<String, Property>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Profile {
            name: name.into(),
            properties: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a property; keys are case-insensitive
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .get(&key.to_ascii_lowercase())
            .map(|prop| prop.value())
    }

    fn insert(&mut self, property: Property) {
        self.properties
            .insert(property.key().to_ascii_lowercase(), property);
    }
}

/// All profiles defined across the shared files
#[derive(Debug, Default, Eq, PartialEq)]
pub struct ProfileSet {
    profiles: HashMap<String, Profile>,
}

impl ProfileSet {
    pub fn get_profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    fn insert(&mut self, profile_name: &str, property: Property) {
        self.profiles
            .entry(profile_name.to_string())
            .or_insert_with(|| Profile::new(profile_name))
            .insert(property);
    }
}

/// The shared file could not be parsed
#[derive(Debug)]
pub struct ProfileParseError {
    path: String,
    line: usize,
    message: String,
}

impl Display for ProfileParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error parsing {} on line {}: {}",
            self.path, self.line, self.message
        )
    }
}

impl Error for ProfileParseError {}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum FileKind {
    Config,
    Credentials,
}

use FileKind::{Config, Credentials};

/// Parse and merge every file in `source`
pub(crate) fn parse(source: &Source) -> Result<ProfileSet, ProfileParseError> {
    let mut set = ProfileSet::default();
    for file in &source.config_files {
        merge_file(&mut set, file, FileKind::Config)?;
    }
    for file in &source.credentials_files {
        merge_file(&mut set, file, FileKind::Credentials)?;
    }
    Ok(set)
}

fn merge_file(
    set: &mut ProfileSet,
    file: &File,
    kind: FileKind,
) -> Result<(), ProfileParseError> {
    // `None` means properties are ignored until the next valid section header
    let mut current_profile: Option<String> = None;
    let mut saw_section = false;
    for (index, raw_line) in file.contents.lines().enumerate() {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('[') {
            saw_section = true;
            if !line.ends_with(']') {
                return Err(ProfileParseError {
                    path: file.path.clone(),
                    line: index + 1,
                    message: "section header is missing a closing bracket".to_string(),
                });
            }
            current_profile = section_profile_name(&line[1..line.len() - 1], kind);
            continue;
        }
        let (key, value) = match split_property(line) {
            Some(pair) => pair,
            None => {
                return Err(ProfileParseError {
                    path: file.path.clone(),
                    line: index + 1,
                    message: "expected `key = value`".to_string(),
                })
            }
        };
        if !saw_section {
            return Err(ProfileParseError {
                path: file.path.clone(),
                line: index + 1,
                message: "property is not attached to a profile".to_string(),
            });
        }
        if let Some(profile) = &current_profile {
            set.insert(profile, Property::new(key.to_string(), value.to_string()));
        }
    }
    Ok(())
}

/// Map a section header to a profile name, or `None` when the section is not a
/// profile and must be skipped
fn section_profile_name(header: &str, kind: FileKind) -> Option<String> {
    let header = header.trim();
    match kind {
        Credentials => Some(header.to_string()),
        Config => {
            if header == "default" {
                return Some(header.to_string());
            }
            match header.strip_prefix("profile") {
                Some(name) if name.starts_with(char::is_whitespace) => {
                    Some(name.trim().to_string())
                }
                _ => {
                    tracing::warn!(section = %header, "ignoring config file section without a `profile` prefix");
                    None
                }
            }
        }
    }
}

fn split_property(line: &str) -> Option<(&str, &str)> {
    let eq = line.find('=')?;
    let key = line[..eq].trim();
    let value = line[eq + 1..].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

fn strip_comment(line: &str) -> &str {
    match line.find(|c| c == '#' || c == ';') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

#[cfg(test)]
mod test {
    use super::parse;
    use crate::profile::source::{File, Source};

    fn source(config: &str, credentials: &str) -> Source {
        Source {
            config_files: vec![File {
                path: "~/.aws/config".to_string(),
                contents: config.to_string(),
            }],
            credentials_files: vec![File {
                path: "~/.aws/credentials".to_string(),
                contents: credentials.to_string(),
            }],
            profile: "default".into(),
            profile_overridden: false,
        }
    }

    #[test]
    fn profile_prefix_is_stripped_in_config_files() {
        let set = parse(&source(
            "[profile base]\nregion = us-east-1\n\n[default]\nregion = us-west-2",
            "",
        ))
        .unwrap();
        assert_eq!(set.get_profile("base").unwrap().get("region"), Some("us-east-1"));
        assert_eq!(set.get_profile("default").unwrap().get("region"), Some("us-west-2"));
    }

    #[test]
    fn bare_sections_in_config_files_are_ignored() {
        let set = parse(&source("[base]\nregion = us-east-1", "")).unwrap();
        assert!(set.get_profile("base").is_none());
    }

    #[test]
    fn credentials_files_use_bare_profile_names() {
        let set = parse(&source(
            "",
            "[myprofile]\naws_access_key_id = accesskey1\naws_secret_access_key = secretkey1",
        ))
        .unwrap();
        let profile = set.get_profile("myprofile").unwrap();
        assert_eq!(profile.get("aws_access_key_id"), Some("accesskey1"));
        assert_eq!(profile.get("aws_secret_access_key"), Some("secretkey1"));
    }

    #[test]
    fn credentials_file_overrides_config_file() {
        let set = parse(&source(
            "[profile shared]\naws_access_key_id = from_config",
            "[shared]\naws_access_key_id = from_credentials",
        ))
        .unwrap();
        assert_eq!(
            set.get_profile("shared").unwrap().get("aws_access_key_id"),
            Some("from_credentials")
        );
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let set = parse(&source(
            "# leading comment\n[default]\n; another comment\nregion = us-east-1 # trailing\n\n",
            "",
        ))
        .unwrap();
        assert_eq!(set.get_profile("default").unwrap().get("region"), Some("us-east-1"));
    }

    #[test]
    fn property_keys_are_case_insensitive() {
        let set = parse(&source("[default]\nAWS_ACCESS_KEY_ID = upper", "")).unwrap();
        assert_eq!(
            set.get_profile("default").unwrap().get("aws_access_key_id"),
            Some("upper")
        );
    }

    #[test]
    fn garbage_line_is_an_error() {
        let err = parse(&source("[default]\nthis is not a property", ""))
            .expect_err("line is invalid");
        let rendered = format!("{}", err);
        assert!(rendered.contains("line 2"), "{}", rendered);
    }

    #[test]
    fn dangling_property_is_an_error() {
        let err = parse(&source("region = us-east-1", "")).expect_err("no section");
        assert!(format!("{}", err).contains("line 1"));
    }

    #[test]
    fn empty_files_produce_an_empty_set() {
        assert!(parse(&source("", "")).unwrap().is_empty());
    }
}
