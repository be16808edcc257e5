// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Metadata of the distribution being packaged. */

use {crate::python::PythonTarget, url::Url};

/// Identifier prefix used when the distribution URL has no usable host.
pub const UNKNOWN_ID_PREFIX: &str = "unknown";

/// Describes the software distribution being packaged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistributionMetadata {
    /// Name of the distribution. e.g. `acme`.
    pub name: String,

    /// Version string of the distribution. Copied verbatim onto components.
    pub version: String,

    /// Homepage of the distribution.
    pub url: Option<String>,

    /// License of the distribution.
    pub license: Option<String>,

    /// Explicit full name. Defaults to `<name>-<version>`.
    pub fullname: Option<String>,
}

impl DistributionMetadata {
    pub fn new(name: impl ToString, version: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            url: None,
            license: None,
            fullname: None,
        }
    }

    /// The `<name>-<version>` string used in archive file names.
    pub fn fullname(&self) -> String {
        match &self.fullname {
            Some(fullname) => fullname.clone(),
            None => format!("{}-{}", self.name, self.version),
        }
    }

    /// Derive the reverse-DNS prefix used for component identifiers.
    ///
    /// This is the reversed host component of the distribution URL.
    pub fn id_prefix(&self) -> String {
        self.url
            .as_deref()
            .map(id_prefix_from_url)
            .unwrap_or_else(|| UNKNOWN_ID_PREFIX.to_string())
    }

    /// File name of the final product archive.
    ///
    /// Distributions with native code are qualified with the interpreter's
    /// platform tag since the archive is only usable on that platform.
    pub fn product_archive_name(&self, target: &PythonTarget, has_native_code: bool) -> String {
        let platform = if has_native_code {
            target.platform.as_str()
        } else {
            "macosx"
        };

        format!(
            "{}.{}-py{}.pkg",
            self.fullname(),
            platform,
            target.major_minor()
        )
    }
}

/// Reverse the host of a URL into an identifier prefix.
///
/// `https://www.example.org:8080/foo` becomes `org.example.www`.
pub fn id_prefix_from_url(url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));

    match host {
        Some(host) if !host.is_empty() => host.rsplit('.').collect::<Vec<_>>().join("."),
        _ => UNKNOWN_ID_PREFIX.to_string(),
    }
}
