// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Sectioned key-value configuration.

Configuration files are TOML documents whose top-level tables are
*sections*. Three section names are reserved:

`":globals:"`
   Product level settings: `title`, `welcome`, `readme`, `license`, `arch`.
`":scripts:"`
   `title` and `description` of the component holding command line scripts.
`":mods:"`
   `title` and `description` of the component holding top-level modules
   and data files.

Every other section is named after a top-level package (or the distribution
name when a single library package is built) and may define `title` and
`description` for that component.

```toml
[":globals:"]
title = "Acme Tools"

["acme"]
description = """
The acme package.
"""
```
*/

use {
    crate::Result,
    std::{collections::BTreeMap, path::Path},
};

pub const GLOBALS_SECTION: &str = ":globals:";
pub const SCRIPTS_SECTION: &str = ":scripts:";
pub const MODULES_SECTION: &str = ":mods:";

/// Configuration values grouped by section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstallerConfig {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl InstallerConfig {
    /// Parse configuration from a TOML string.
    ///
    /// Every top-level key must be a table and every value within a table
    /// must be a string.
    pub fn from_toml(s: &str) -> Result<Self> {
        let sections = toml::from_str::<BTreeMap<String, BTreeMap<String, String>>>(s)?;

        Ok(Self { sections })
    }

    /// Parse configuration from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;

        Self::from_toml(&data)
    }

    /// Merge another configuration into this one.
    ///
    /// Keys defined by `other` replace keys of the same name in the same
    /// section. Keys only present in `self` are retained.
    pub fn merge(&mut self, other: InstallerConfig) {
        for (section, values) in other.sections {
            self.sections.entry(section).or_default().extend(values);
        }
    }

    /// Obtain the value of `key` in `section`.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|values| values.get(key))
            .map(|value| value.as_str())
    }

    /// Obtain the value of `key` in `section`, falling back to `default`.
    pub fn get_or(&self, section: &str, key: &str, default: impl Into<String>) -> String {
        match self.get(section, key) {
            Some(value) => value.to_string(),
            None => default.into(),
        }
    }

    /// Obtain the value of `key` in the `":globals:"` section.
    pub fn global(&self, key: &str) -> Option<&str> {
        self.get(GLOBALS_SECTION, key)
    }

    #[cfg(test)]
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(|name| name.as_str())
    }
}
