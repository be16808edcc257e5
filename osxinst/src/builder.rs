// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Building product installer packages.

[InstallerBuilder] turns a staged install into a product `.pkg`:

1. The staged library and scripts directories are mapped to their install
   paths.
2. Component packages are planned and built with `pkgbuild` into the
   `pkgs` directory.
3. The resources directory is populated.
4. The Distribution XML is written and `productbuild` assembles the
   product archive in the dist directory.

Every command is also recorded in `mkpkg.sh`. Without `keep_temp` the
build directory is deleted after a successful build and the script is
preserved next to the product archive.
*/

use {
    crate::{
        component::{ComponentPackage, ComponentPlanner},
        config::InstallerConfig,
        distribution_xml::DistributionDocument,
        metadata::DistributionMetadata,
        python::PythonTarget,
        resources::{init_resources, BACKGROUND_IMAGE_NAME},
        script::{ReproScript, SCRIPT_FILE_NAME},
        settings::ProductSettings,
        staging::{stage_dir_to_install_dir, StagedInstall},
        tools::{pkgbuild, productbuild, run_checked, ToolRunner},
        OsxInstError, Result,
    },
    log::{info, warn},
    std::path::{Path, PathBuf},
};

/// Fail unless running on macOS.
///
/// `pkgbuild` and `productbuild` only exist there.
pub fn ensure_host_platform() -> Result<()> {
    if cfg!(target_os = "macos") {
        Ok(())
    } else {
        Err(OsxInstError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }
}

/// Filesystem locations used by a build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildLayout {
    /// Temporary directory holding everything below except `dist_dir`.
    pub bdist_dir: PathBuf,
    /// Root of the staged install.
    pub stage_dir: PathBuf,
    /// Top-level modules and data files split off from packages.
    pub stage_mod_dir: PathBuf,
    /// Component package archives.
    pub pkgs_dir: PathBuf,
    pub resources_dir: PathBuf,
    pub distribution_xml: PathBuf,
    pub script_path: PathBuf,
    /// Where the product archive is written.
    pub dist_dir: PathBuf,
}

impl BuildLayout {
    pub fn new(bdist_dir: impl AsRef<Path>, dist_dir: impl AsRef<Path>) -> Self {
        let bdist_dir = bdist_dir.as_ref();

        Self {
            bdist_dir: bdist_dir.to_path_buf(),
            stage_dir: bdist_dir.join("stage"),
            stage_mod_dir: bdist_dir.join("stage_mod"),
            pkgs_dir: bdist_dir.join("pkgs"),
            resources_dir: bdist_dir.join("resources"),
            distribution_xml: bdist_dir.join("Distribution"),
            script_path: bdist_dir.join(SCRIPT_FILE_NAME),
            dist_dir: dist_dir.as_ref().to_path_buf(),
        }
    }
}

/// Result of a successful build.
#[derive(Clone, Debug)]
pub struct BuiltProduct {
    pub archive_path: PathBuf,
    pub packages: Vec<ComponentPackage>,
    /// Final location of the reproducibility script.
    pub script_path: PathBuf,
}

/// Builds a product installer package from a staged install.
pub struct InstallerBuilder<'a> {
    metadata: &'a DistributionMetadata,
    config: &'a InstallerConfig,
    settings: &'a ProductSettings,
    target: &'a PythonTarget,
    runner: &'a dyn ToolRunner,
}

impl<'a> InstallerBuilder<'a> {
    pub fn new(
        metadata: &'a DistributionMetadata,
        config: &'a InstallerConfig,
        settings: &'a ProductSettings,
        target: &'a PythonTarget,
        runner: &'a dyn ToolRunner,
    ) -> Self {
        Self {
            metadata,
            config,
            settings,
            target,
            runner,
        }
    }

    /// The `hostArchitectures` constraint for a staged install, if any.
    fn host_architectures(&self, staged: &StagedInstall) -> Option<&str> {
        if !staged.has_native_code {
            return None;
        }

        if self.settings.arch.is_empty() {
            warn!("native code present but no host architectures known; not constraining hosts");
            None
        } else {
            Some(self.settings.arch.as_str())
        }
    }

    pub fn build(&self, layout: &BuildLayout, staged: &StagedInstall) -> Result<BuiltProduct> {
        let target_lib_dir = stage_dir_to_install_dir(&staged.lib_dir, &staged.stage_root)?;
        let target_scripts_dir = stage_dir_to_install_dir(&staged.scripts_dir, &staged.stage_root)?;

        info!("Target lib dir: {}", target_lib_dir.display());
        info!("Target scripts dir: {}", target_scripts_dir.display());

        // Content of earlier builds reusing the build directory.
        for dir in [&layout.stage_mod_dir, &layout.pkgs_dir] {
            if dir.exists() {
                info!("removing {}", dir.display());
                std::fs::remove_dir_all(dir)?;
            }
        }

        let planner = ComponentPlanner::new(self.metadata, self.config, self.settings, self.target);
        let packages = planner.plan(
            staged,
            &layout.stage_mod_dir,
            &target_lib_dir,
            &target_scripts_dir,
        )?;

        let mut script = ReproScript::create(&layout.script_path, &self.metadata.name)?;

        script.section("Build component packages", &layout.pkgs_dir)?;
        std::fs::create_dir_all(&layout.pkgs_dir)?;

        for package in &packages {
            info!("Create component package '{}'", package.archive_name);
            let invocation = pkgbuild(package, &layout.pkgs_dir.join(&package.archive_name))?;
            run_checked(self.runner, &invocation)?;
            script.command(&invocation)?;
        }

        let documents = init_resources(
            &layout.resources_dir,
            self.settings,
            self.metadata,
            self.target,
        )?;

        script.blank()?;
        script.section("Build product package", &layout.dist_dir)?;
        std::fs::create_dir_all(&layout.dist_dir)?;

        let resources = documents
            .iter()
            .map(|document| document.reference(self.runner))
            .collect::<Result<Vec<_>>>()?;

        let document = DistributionDocument::for_product(
            &self.settings.title,
            &packages,
            &resources,
            self.host_architectures(staged),
            BACKGROUND_IMAGE_NAME,
            &target_lib_dir,
            &self.target.major_minor(),
        )?;
        document.write_to_path(&layout.distribution_xml)?;

        let archive_path = layout.dist_dir.join(
            self.metadata
                .product_archive_name(self.target, staged.has_native_code),
        );

        let invocation = productbuild(
            &layout.distribution_xml,
            &layout.pkgs_dir,
            &layout.resources_dir,
            &archive_path,
        )?;
        run_checked(self.runner, &invocation)?;
        script.command(&invocation)?;
        drop(script);

        let script_path = if self.settings.keep_temp {
            layout.script_path.clone()
        } else {
            let mut preserved = archive_path.clone().into_os_string();
            preserved.push(".mkpkg.sh");
            let preserved = PathBuf::from(preserved);

            std::fs::copy(&layout.script_path, &preserved)?;
            info!("removing {}", layout.bdist_dir.display());
            std::fs::remove_dir_all(&layout.bdist_dir)?;

            preserved
        };

        info!("wrote {}", archive_path.display());

        Ok(BuiltProduct {
            archive_path,
            packages,
            script_path,
        })
    }
}
