// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Inspection of the temporary install ("stage") area.

A distribution is first installed into a stage directory as if it were
installed into the real filesystem root. The functionality in this module
classifies what got installed and maps stage paths back to the paths the
files will occupy on the machine the installer runs on.
*/

use {
    crate::{OsxInstError, Result},
    log::debug,
    path_dedot::ParseDot,
    std::{
        ffi::OsStr,
        path::{Path, PathBuf},
    },
};

/// File whose presence turns a directory into a Python package.
pub const PACKAGE_MARKER: &str = "__init__.py";

/// Extensions of metadata files that are never shipped as payload.
pub const EXCLUDED_FILE_EXTENSIONS: &[&str] = &["egg-info"];

/// File extensions identifying compiled extension modules.
pub const NATIVE_CODE_EXTENSIONS: &[&str] = &["so", "dylib"];

/// Name of the directory the staged library directory must resolve to.
pub const SITE_PACKAGES: &str = "site-packages";

/// Classification of the immediate children of a staged library directory.
///
/// Each child appears in exactly one list. Lists are sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StagedContents {
    /// Directories containing a package marker file.
    pub packages: Vec<String>,
    /// Plain files, minus excluded metadata files.
    pub files: Vec<String>,
    /// Directories without a package marker file.
    pub directories: Vec<String>,
}

impl StagedContents {
    /// Classify the immediate children of `lib_dir`.
    ///
    /// Nothing below the first level is inspected.
    pub fn scan(lib_dir: &Path) -> Result<Self> {
        let mut contents = Self::default();

        for entry in std::fs::read_dir(lib_dir)? {
            let path = entry?.path();
            let name = path
                .file_name()
                .and_then(OsStr::to_str)
                .ok_or_else(|| OsxInstError::NonUtf8Path(path.clone()))?
                .to_string();

            if path.is_dir() {
                if path.join(PACKAGE_MARKER).is_file() {
                    contents.packages.push(name);
                } else {
                    contents.directories.push(name);
                }
            } else if !is_excluded_file(&path) {
                contents.files.push(name);
            } else {
                debug!("ignoring metadata file {}", path.display());
            }
        }

        contents.packages.sort();
        contents.files.sort();
        contents.directories.sort();

        Ok(contents)
    }

    /// Whether nothing installable was found.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && !self.has_loose_content()
    }

    /// Whether there are top-level files or non-package directories.
    pub fn has_loose_content(&self) -> bool {
        !self.files.is_empty() || !self.directories.is_empty()
    }
}

fn is_excluded_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| EXCLUDED_FILE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Convert a directory within the stage area into an absolute install path.
///
/// The `stage_root` prefix is removed from `stage_dir` and the remainder is
/// normalized. The remainder of a path under the stage root is always
/// absolute; anything else means the staging layout is broken.
pub fn stage_dir_to_install_dir(stage_dir: &Path, stage_root: &Path) -> Result<PathBuf> {
    let outside_root = || OsxInstError::StagePathOutsideRoot {
        path: stage_dir.to_path_buf(),
        root: stage_root.to_path_buf(),
    };

    let stage = stage_dir
        .to_str()
        .ok_or_else(|| OsxInstError::NonUtf8Path(stage_dir.to_path_buf()))?;
    let root = stage_root
        .to_str()
        .ok_or_else(|| OsxInstError::NonUtf8Path(stage_root.to_path_buf()))?
        .trim_end_matches('/');

    let remainder = Path::new(stage.strip_prefix(root).ok_or_else(outside_root)?);

    // Normalizing a relative path would resolve it against the current
    // directory, so reject it first.
    if !remainder.is_absolute() {
        return Err(OsxInstError::InstallPathNotAbsolute(remainder.to_path_buf()));
    }

    let install_dir = remainder.parse_dot()?.to_path_buf();
    debug!(
        "{} installs to {}",
        stage_dir.display(),
        install_dir.display()
    );

    Ok(install_dir)
}

/// Resolve the `site-packages` directory a library install directory lives in.
///
/// Install commands may report a directory below `site-packages` (e.g. when
/// an extra path is configured). Packages are always rooted at
/// `site-packages`, so walk up until it is reached.
pub fn site_packages_root(lib_dir: &Path) -> Result<PathBuf> {
    lib_dir
        .ancestors()
        .find(|p| p.file_name() == Some(OsStr::new(SITE_PACKAGES)))
        .map(|p| p.to_path_buf())
        .ok_or_else(|| OsxInstError::LibDirNotSitePackages(lib_dir.to_path_buf()))
}

/// Copy top-level files and non-package directories into a separate tree.
///
/// `dest_dir` is created if missing. Directories already present in
/// `dest_dir` are replaced. The resulting tree can serve as the root of a
/// component that installs those files without any package.
pub fn copy_modules_and_data(
    contents: &StagedContents,
    lib_dir: &Path,
    dest_dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(dest_dir)?;

    for name in &contents.files {
        std::fs::copy(lib_dir.join(name), dest_dir.join(name))?;
    }

    for name in &contents.directories {
        let dest = dest_dir.join(name);
        if dest.exists() {
            std::fs::remove_dir_all(&dest)?;
        }
        copy_tree(&lib_dir.join(name), &dest)?;
    }

    Ok(())
}

/// Recursively copy a directory. Symlinks are followed.
pub fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        let rel_path = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| OsxInstError::StagePathOutsideRoot {
                path: entry.path().to_path_buf(),
                root: source.to_path_buf(),
            })?;
        let dest_path = dest.join(rel_path);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest_path)?;
        } else {
            std::fs::copy(entry.path(), &dest_path)?;
        }
    }

    Ok(())
}

/// Whether a directory tree contains compiled extension modules.
pub fn contains_native_code(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    for entry in walkdir::WalkDir::new(path) {
        let entry = entry?;

        if entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .map(|ext| NATIVE_CODE_EXTENSIONS.contains(&ext))
                .unwrap_or(false)
        {
            debug!("found native code in {}", entry.path().display());
            return Ok(true);
        }
    }

    Ok(false)
}

/// Whether a directory exists and has at least one entry.
pub fn has_entries(path: &Path) -> Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }

    Ok(std::fs::read_dir(path)?.next().is_some())
}

/// Result of installing a distribution into a stage area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedInstall {
    /// Root of the stage area.
    pub stage_root: PathBuf,

    /// The `site-packages` directory inside the stage area.
    pub lib_dir: PathBuf,

    /// Directory inside the stage area scripts were installed to.
    pub scripts_dir: PathBuf,

    /// Whether compiled extension modules were installed.
    pub has_native_code: bool,

    /// Whether any scripts were installed.
    pub has_scripts: bool,

    /// Whether any modules or packages were installed.
    pub has_modules: bool,
}

impl StagedInstall {
    /// Describe a populated stage area by inspecting its content.
    pub fn inspect(stage_root: &Path, lib_dir: &Path, scripts_dir: &Path) -> Result<Self> {
        let lib_dir = site_packages_root(lib_dir)?;

        Ok(Self {
            stage_root: stage_root.to_path_buf(),
            has_native_code: contains_native_code(&lib_dir)?,
            has_scripts: has_entries(scripts_dir)?,
            has_modules: has_entries(&lib_dir)?,
            lib_dir,
            scripts_dir: scripts_dir.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::{
            collections::BTreeSet,
            fs::{create_dir_all, write},
        },
    };

    fn temp_dir() -> Result<tempfile::TempDir> {
        Ok(tempfile::Builder::new().prefix("osxinst-test").tempdir()?)
    }

    #[test]
    fn test_scan_package_and_loose_file() -> Result<()> {
        let td = temp_dir()?;
        let lib = td.path();

        create_dir_all(lib.join("foo"))?;
        write(lib.join("foo").join(PACKAGE_MARKER), "")?;
        write(lib.join("bar.cfg"), "[bar]")?;

        let contents = StagedContents::scan(lib)?;
        assert_eq!(contents.packages, vec!["foo".to_string()]);
        assert_eq!(contents.files, vec!["bar.cfg".to_string()]);
        assert!(contents.directories.is_empty());
        assert!(contents.has_loose_content());

        Ok(())
    }

    #[test]
    fn test_scan_partitions_children() -> Result<()> {
        let td = temp_dir()?;
        let lib = td.path();

        create_dir_all(lib.join("pkg_a").join("sub"))?;
        write(lib.join("pkg_a").join(PACKAGE_MARKER), "")?;
        // A marker nested deeper does not make the parent a package.
        create_dir_all(lib.join("data").join("nested"))?;
        write(lib.join("data").join("nested").join(PACKAGE_MARKER), "")?;
        // Other content does not stop a package from being a package.
        create_dir_all(lib.join("pkg_b").join("data"))?;
        write(lib.join("pkg_b").join(PACKAGE_MARKER), "")?;
        write(lib.join("pkg_b").join("README.txt"), "")?;
        write(lib.join("module.py"), "")?;
        write(lib.join("ext.so"), "")?;
        write(lib.join("acme-1.0-py3.9.egg-info"), "Metadata-Version: 1.1")?;

        let contents = StagedContents::scan(lib)?;
        assert_eq!(contents.packages, vec!["pkg_a", "pkg_b"]);
        assert_eq!(contents.files, vec!["ext.so", "module.py"]);
        assert_eq!(contents.directories, vec!["data"]);

        let mut seen = BTreeSet::new();
        for name in contents
            .packages
            .iter()
            .chain(contents.files.iter())
            .chain(contents.directories.iter())
        {
            assert!(seen.insert(name.clone()), "{} listed twice", name);
        }
        assert_eq!(seen.len(), std::fs::read_dir(lib)?.count() - 1);

        Ok(())
    }

    #[test]
    fn test_excluded_file_only() -> Result<()> {
        let td = temp_dir()?;
        write(td.path().join("acme.egg-info"), "")?;

        let contents = StagedContents::scan(td.path())?;
        assert!(contents.files.is_empty());
        assert!(contents.is_empty());

        Ok(())
    }

    #[test]
    fn test_scan_empty() -> Result<()> {
        let td = temp_dir()?;

        let contents = StagedContents::scan(td.path())?;
        assert_eq!(contents, StagedContents::default());
        assert!(contents.is_empty());

        Ok(())
    }

    #[test]
    fn test_stage_dir_to_install_dir() -> Result<()> {
        let root = Path::new("/tmp/build/stage");
        let lib = Path::new(
            "/tmp/build/stage/Library/Frameworks/Python.framework/Versions/3.9/lib/python3.9/site-packages",
        );

        let install = stage_dir_to_install_dir(lib, root)?;
        assert_eq!(
            install,
            Path::new("/Library/Frameworks/Python.framework/Versions/3.9/lib/python3.9/site-packages")
        );
        assert!(install.is_absolute());
        assert_eq!(root.join(install.strip_prefix("/").unwrap()), lib);

        assert_eq!(
            stage_dir_to_install_dir(Path::new("/tmp/build/stage/usr/./local/bin"), root)?,
            Path::new("/usr/local/bin")
        );
        assert_eq!(
            stage_dir_to_install_dir(
                Path::new("/tmp/build/stage/usr/bin"),
                Path::new("/tmp/build/stage/")
            )?,
            Path::new("/usr/bin")
        );

        Ok(())
    }

    #[test]
    fn test_stage_dir_outside_root() {
        let root = Path::new("/tmp/build/stage");

        assert!(matches!(
            stage_dir_to_install_dir(Path::new("/usr/local/bin"), root),
            Err(OsxInstError::StagePathOutsideRoot { .. })
        ));
        assert!(matches!(
            stage_dir_to_install_dir(Path::new("/tmp/build/stage2/bin"), root),
            Err(OsxInstError::InstallPathNotAbsolute(_))
        ));
        assert!(matches!(
            stage_dir_to_install_dir(root, root),
            Err(OsxInstError::InstallPathNotAbsolute(_))
        ));
    }

    #[test]
    fn test_site_packages_root() -> Result<()> {
        assert_eq!(
            site_packages_root(Path::new("/stage/lib/python3.9/site-packages/extra"))?,
            Path::new("/stage/lib/python3.9/site-packages")
        );
        assert_eq!(
            site_packages_root(Path::new("/stage/lib/python3.9/site-packages"))?,
            Path::new("/stage/lib/python3.9/site-packages")
        );
        assert!(matches!(
            site_packages_root(Path::new("/stage/lib/python3.9")),
            Err(OsxInstError::LibDirNotSitePackages(_))
        ));

        Ok(())
    }

    #[test]
    fn test_copy_modules_and_data() -> Result<()> {
        let td = temp_dir()?;
        let lib = td.path().join("site-packages");
        let dest = td.path().join("stage_mod");

        create_dir_all(lib.join("data").join("icons"))?;
        write(lib.join("data").join("icons").join("a.png"), "png")?;
        write(lib.join("module.py"), "x = 1")?;

        // Stale content from an earlier build gets replaced.
        create_dir_all(dest.join("data"))?;
        write(dest.join("data").join("stale.txt"), "")?;

        let contents = StagedContents::scan(&lib)?;
        copy_modules_and_data(&contents, &lib, &dest)?;

        assert_eq!(std::fs::read_to_string(dest.join("module.py"))?, "x = 1");
        assert!(dest.join("data").join("icons").join("a.png").is_file());
        assert!(!dest.join("data").join("stale.txt").exists());

        Ok(())
    }

    #[test]
    fn test_staged_install_inspect() -> Result<()> {
        let td = temp_dir()?;
        let root = td.path();
        let lib = root.join("lib").join("python3.9").join("site-packages");
        let scripts = root.join("bin");

        create_dir_all(lib.join("acme"))?;
        write(lib.join("acme").join(PACKAGE_MARKER), "")?;

        let staged = StagedInstall::inspect(root, &lib, &scripts)?;
        assert!(staged.has_modules);
        assert!(!staged.has_scripts);
        assert!(!staged.has_native_code);

        write(lib.join("acme").join("_speedups.cpython-39-darwin.so"), "")?;
        create_dir_all(&scripts)?;
        write(scripts.join("acme-cli"), "#!/usr/bin/env python")?;

        let staged = StagedInstall::inspect(root, &lib, &scripts)?;
        assert!(staged.has_scripts);
        assert!(staged.has_native_code);

        Ok(())
    }
}
