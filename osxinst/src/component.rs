// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Component packages.

A *component* is an installable unit materialized by a single `pkgbuild`
invocation. By default every top-level Python package becomes its own
component so users can see what gets installed. Top-level modules and data
files are collected into a `modules.pkg` component and scripts go into
`scripts.pkg`.
*/

use {
    crate::{
        config::{InstallerConfig, MODULES_SECTION, SCRIPTS_SECTION},
        metadata::DistributionMetadata,
        python::PythonTarget,
        settings::ProductSettings,
        staging::{copy_modules_and_data, has_entries, StagedContents, StagedInstall},
        OsxInstError, Result,
    },
    log::info,
    std::{
        collections::HashSet,
        path::{Path, PathBuf},
    },
};

pub const MODULES_ARCHIVE_NAME: &str = "modules.pkg";
pub const SCRIPTS_ARCHIVE_NAME: &str = "scripts.pkg";

/// All data needed to produce an individual component package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentPackage {
    /// File name of the `.pkg` archive (without path).
    pub archive_name: String,

    /// Package identifier. Stable across rebuilds of the same component.
    pub identifier: String,

    /// Version of the component.
    pub version: String,

    /// Name of the component in the installer's choice list.
    pub title: String,

    /// Description of the component displayed by the installer.
    pub description: String,

    /// Directory in the stage area holding the component's files.
    pub source_root: PathBuf,

    /// Absolute path the files are installed to.
    ///
    /// e.g. `/Library/Frameworks/Python.framework/Versions/3.9/lib/python3.9/site-packages`.
    pub install_location: PathBuf,
}

impl ComponentPackage {
    /// Verify the invariants of a component.
    ///
    /// A relative install location would be interpreted relative to the
    /// installer's notion of the target volume, so it is never accepted.
    pub fn validated(self) -> Result<Self> {
        if !self.install_location.is_absolute() {
            return Err(OsxInstError::RelativeInstallLocation {
                archive: self.archive_name,
                location: self.install_location.display().to_string(),
            });
        }

        if !has_entries(&self.source_root)? {
            return Err(OsxInstError::EmptyComponentSource(self.source_root));
        }

        Ok(self)
    }

    /// The archive name without its `.pkg` extension.
    pub fn base_name(&self) -> &str {
        self.archive_name
            .strip_suffix(".pkg")
            .unwrap_or(&self.archive_name)
    }
}

/// Derives the `ComponentPackage`s of a build.
pub struct ComponentPlanner<'a> {
    metadata: &'a DistributionMetadata,
    config: &'a InstallerConfig,
    id_prefix: String,
    python_version: String,
    single_lib_pkg: bool,
}

impl<'a> ComponentPlanner<'a> {
    pub fn new(
        metadata: &'a DistributionMetadata,
        config: &'a InstallerConfig,
        settings: &ProductSettings,
        target: &PythonTarget,
    ) -> Self {
        Self {
            metadata,
            config,
            id_prefix: settings.id_prefix.clone(),
            python_version: target.major_minor(),
            single_lib_pkg: settings.single_lib_pkg,
        }
    }

    /// Build a package identifier for a component with the given name.
    ///
    /// The Python version suffix keeps packages built for different Python
    /// versions apart.
    pub fn identifier(&self, name: &str) -> String {
        format!("{}_{}_py{}", self.id_prefix, name, self.python_version)
    }

    /// Determine the components of a staged install.
    ///
    /// `stage_mod_dir` is where top-level modules and data get copied to
    /// when they are split from packages. `target_lib_dir` and
    /// `target_scripts_dir` are the absolute install paths of the staged
    /// library and scripts directories.
    pub fn plan(
        &self,
        staged: &StagedInstall,
        stage_mod_dir: &Path,
        target_lib_dir: &Path,
        target_scripts_dir: &Path,
    ) -> Result<Vec<ComponentPackage>> {
        let mut packages = vec![];

        if self.single_lib_pkg {
            if staged.has_modules {
                packages.push(self.single_lib_component(&staged.lib_dir, target_lib_dir)?);
            }
        } else if staged.has_modules {
            let contents = StagedContents::scan(&staged.lib_dir)?;
            info!(
                "{} packages, {} files, {} directories",
                contents.packages.len(),
                contents.files.len(),
                contents.directories.len()
            );

            for name in &contents.packages {
                packages.push(self.package_component(name, &staged.lib_dir, target_lib_dir)?);
            }

            if contents.has_loose_content() {
                copy_modules_and_data(&contents, &staged.lib_dir, stage_mod_dir)?;
                packages.push(self.modules_component(stage_mod_dir, target_lib_dir)?);
            }
        }

        if staged.has_scripts {
            packages.push(self.scripts_component(&staged.scripts_dir, target_scripts_dir)?);
        }

        let mut seen = HashSet::new();
        for package in &packages {
            if !seen.insert(package.identifier.as_str()) {
                return Err(OsxInstError::DuplicateIdentifier(package.identifier.clone()));
            }
        }

        Ok(packages)
    }

    fn component(
        &self,
        archive_name: String,
        identifier_name: &str,
        section: &str,
        default_title: String,
        default_description: &str,
        source_root: PathBuf,
        install_location: PathBuf,
    ) -> Result<ComponentPackage> {
        ComponentPackage {
            identifier: self.identifier(identifier_name),
            version: self.metadata.version.clone(),
            title: self.config.get_or(section, "title", default_title),
            description: self
                .config
                .get_or(section, "description", default_description),
            archive_name,
            source_root,
            install_location,
        }
        .validated()
    }

    /// A component for one top-level Python package.
    fn package_component(
        &self,
        name: &str,
        stage_lib_dir: &Path,
        target_lib_dir: &Path,
    ) -> Result<ComponentPackage> {
        let archive_name = format!("pkg.{}.pkg", name);
        let identifier_name = format!("pkg.{}", name);

        self.component(
            archive_name,
            &identifier_name,
            name,
            format!("{} package", name),
            &format!("Python package \"{}\".", name),
            stage_lib_dir.join(name),
            target_lib_dir.join(name),
        )
    }

    /// A component for the entire library directory.
    ///
    /// The component is named after the distribution; the name needn't
    /// refer to anything inside the library directory.
    fn single_lib_component(
        &self,
        stage_lib_dir: &Path,
        target_lib_dir: &Path,
    ) -> Result<ComponentPackage> {
        let name = &self.metadata.name;

        self.component(
            format!("pkg.{}.pkg", name),
            &format!("pkg.{}", name),
            name,
            format!("{} package", name),
            "Python packages and modules.",
            stage_lib_dir.to_path_buf(),
            target_lib_dir.to_path_buf(),
        )
    }

    /// A component for top-level modules and data files/directories.
    fn modules_component(
        &self,
        stage_mod_dir: &Path,
        target_lib_dir: &Path,
    ) -> Result<ComponentPackage> {
        self.component(
            MODULES_ARCHIVE_NAME.to_string(),
            &format!("{}-mods", self.metadata.name),
            MODULES_SECTION,
            "Modules".to_string(),
            "This package contains top-level modules and data files.",
            stage_mod_dir.to_path_buf(),
            target_lib_dir.to_path_buf(),
        )
    }

    /// A component for the command line scripts.
    fn scripts_component(
        &self,
        stage_scripts_dir: &Path,
        target_scripts_dir: &Path,
    ) -> Result<ComponentPackage> {
        self.component(
            SCRIPTS_ARCHIVE_NAME.to_string(),
            &format!("{}-scripts", self.metadata.name),
            SCRIPTS_SECTION,
            "Scripts".to_string(),
            "This package contains command line scripts.",
            stage_scripts_dir.to_path_buf(),
            target_scripts_dir.to_path_buf(),
        )
    }
}
