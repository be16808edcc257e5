// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Product level settings resolved once per build. */

use {
    crate::{config::InstallerConfig, metadata::DistributionMetadata, python::PythonTarget},
    std::path::PathBuf,
};

/// Values given explicitly, e.g. on the command line.
///
/// Set fields take precedence over the `":globals:"` config section.
#[derive(Clone, Debug, Default)]
pub struct SettingsOverrides {
    pub title: Option<String>,
    pub welcome: Option<PathBuf>,
    pub readme: Option<PathBuf>,
    pub license: Option<PathBuf>,
    pub arch: Option<String>,
    pub id_prefix: Option<String>,
    pub single_lib_pkg: bool,
    pub keep_temp: bool,
}

/// Effective settings of the product package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductSettings {
    /// Title displayed by the installer.
    pub title: String,
    /// Welcome document. A default one is generated when `None`.
    pub welcome: Option<PathBuf>,
    pub readme: Option<PathBuf>,
    pub license: Option<PathBuf>,
    /// `hostArchitectures` value used when the product contains native code.
    pub arch: String,
    /// Reverse-DNS prefix of component identifiers.
    pub id_prefix: String,
    /// Build one component for all of `site-packages`.
    pub single_lib_pkg: bool,
    /// Retain the temporary build directory.
    pub keep_temp: bool,
}

impl ProductSettings {
    pub fn resolve(
        overrides: SettingsOverrides,
        config: &InstallerConfig,
        metadata: &DistributionMetadata,
        target: &PythonTarget,
    ) -> Self {
        let global_path = |key: &str| config.global(key).map(PathBuf::from);

        Self {
            title: overrides
                .title
                .or_else(|| config.global("title").map(|s| s.to_string()))
                .unwrap_or_else(|| metadata.name.clone()),
            welcome: overrides.welcome.or_else(|| global_path("welcome")),
            readme: overrides.readme.or_else(|| global_path("readme")),
            license: overrides.license.or_else(|| global_path("license")),
            arch: overrides
                .arch
                .or_else(|| config.global("arch").map(|s| s.to_string()))
                .unwrap_or_else(|| target.host_architectures()),
            id_prefix: overrides
                .id_prefix
                .unwrap_or_else(|| metadata.id_prefix()),
            single_lib_pkg: overrides.single_lib_pkg,
            keep_temp: overrides.keep_temp,
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::Result};

    fn target() -> PythonTarget {
        PythonTarget {
            major: 3,
            minor: 10,
            platform: "macosx-10.9-x86_64".to_string(),
            cflags: "-arch x86_64 -g".to_string(),
        }
    }

    #[test]
    fn test_defaults() {
        let mut metadata = DistributionMetadata::new("acme", "1.0");
        metadata.url = Some("https://acme.example.com/".to_string());

        let settings = ProductSettings::resolve(
            SettingsOverrides::default(),
            &InstallerConfig::default(),
            &metadata,
            &target(),
        );

        assert_eq!(settings.title, "acme");
        assert_eq!(settings.welcome, None);
        assert_eq!(settings.arch, "x86_64");
        assert_eq!(settings.id_prefix, "com.example.acme");
        assert!(!settings.single_lib_pkg);
    }

    #[test]
    fn test_precedence() -> Result<()> {
        let config = InstallerConfig::from_toml(
            "[\":globals:\"]\ntitle = \"From config\"\nreadme = \"README.rtf\"\narch = \"arm64\"\n",
        )?;
        let metadata = DistributionMetadata::new("acme", "1.0");

        let settings = ProductSettings::resolve(
            SettingsOverrides::default(),
            &config,
            &metadata,
            &target(),
        );
        assert_eq!(settings.title, "From config");
        assert_eq!(settings.readme, Some(PathBuf::from("README.rtf")));
        assert_eq!(settings.arch, "arm64");

        let settings = ProductSettings::resolve(
            SettingsOverrides {
                title: Some("From CLI".to_string()),
                readme: Some(PathBuf::from("docs/README.html")),
                id_prefix: Some("org.acme".to_string()),
                ..Default::default()
            },
            &config,
            &metadata,
            &target(),
        );
        assert_eq!(settings.title, "From CLI");
        assert_eq!(settings.readme, Some(PathBuf::from("docs/README.html")));
        assert_eq!(settings.id_prefix, "org.acme");

        Ok(())
    }
}
