// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Staging of distributions through their `setup.py`. */

use {
    crate::interpreter::InterpreterInfo,
    anyhow::{anyhow, Context, Result},
    duct::cmd,
    log::info,
    osxinst::{metadata::DistributionMetadata, staging::StagedInstall},
    serde::Deserialize,
    std::{
        ffi::OsString,
        io::{BufRead, BufReader},
        path::{Path, PathBuf},
    },
};

/// Loads `setup.py` without running any command and prints its metadata.
///
/// Output of `setup.py` itself is sent to stderr so stdout only carries
/// the JSON document.
const METADATA_SCRIPT: &str = r#"
import contextlib, json, sys
try:
    import setuptools
except ImportError:
    pass
from distutils.core import run_setup
with contextlib.redirect_stdout(sys.stderr):
    dist = run_setup("setup.py", stop_after="init")
print(json.dumps({
    "name": dist.get_name(),
    "version": dist.get_version(),
    "fullname": dist.get_fullname(),
    "url": dist.get_url(),
    "license": dist.get_license(),
}))
"#;

/// Value distutils reports for metadata fields that aren't set.
const UNKNOWN: &str = "UNKNOWN";

#[derive(Debug, Deserialize)]
struct SetupMetadata {
    name: String,
    version: String,
    fullname: Option<String>,
    url: Option<String>,
    license: Option<String>,
}

fn parse_metadata_output(data: &[u8]) -> Result<DistributionMetadata> {
    let raw: SetupMetadata =
        serde_json::from_slice(data).context("parsing distribution metadata")?;

    let known = |value: Option<String>| value.filter(|v| v != UNKNOWN && !v.trim().is_empty());

    let mut metadata = DistributionMetadata::new(raw.name, raw.version);
    metadata.fullname = known(raw.fullname);
    metadata.url = known(raw.url);
    metadata.license = known(raw.license);

    Ok(metadata)
}

/// Maps an absolute install path into the stage area.
fn stage_path(stage_root: &Path, path: &Path) -> PathBuf {
    stage_root.join(path.strip_prefix("/").unwrap_or(path))
}

/// Installs a distribution into a stage area by running its `setup.py`.
pub struct SetupPyStaging {
    python: PathBuf,
    source_dir: PathBuf,
}

impl SetupPyStaging {
    pub fn new(python: impl AsRef<Path>, source_dir: impl AsRef<Path>) -> Self {
        Self {
            python: python.as_ref().to_path_buf(),
            source_dir: source_dir.as_ref().to_path_buf(),
        }
    }

    /// Run `setup.py` with arguments, forwarding its output to the log.
    fn run_logged(&self, args: Vec<OsString>) -> Result<()> {
        let mut full_args = vec![OsString::from("setup.py")];
        full_args.extend(args);

        info!(
            "running {} {}",
            self.python.display(),
            full_args
                .iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let command = cmd(&self.python, &full_args)
            .dir(&self.source_dir)
            .stderr_to_stdout()
            .unchecked()
            .reader()?;
        {
            let reader = BufReader::new(&command);
            for line in reader.lines() {
                info!("{}", line?);
            }
        }

        let output = command
            .try_wait()?
            .ok_or_else(|| anyhow!("unable to wait on setup.py"))?;
        if output.status.success() {
            Ok(())
        } else {
            Err(anyhow!("setup.py exited with {}", output.status))
        }
    }

    /// Obtain the metadata of the distribution.
    pub fn metadata(&self) -> Result<DistributionMetadata> {
        let output = cmd(&self.python, &["-c", METADATA_SCRIPT])
            .dir(&self.source_dir)
            .stdout_capture()
            .run()
            .context("reading distribution metadata from setup.py")?;

        parse_metadata_output(&output.stdout)
    }

    /// Build and install the distribution into `stage_root`.
    ///
    /// Any previous content of `stage_root` is removed.
    pub fn stage(
        &self,
        stage_root: &Path,
        interpreter: &InterpreterInfo,
        skip_build: bool,
    ) -> Result<StagedInstall> {
        if stage_root.exists() {
            std::fs::remove_dir_all(stage_root)
                .with_context(|| format!("removing {}", stage_root.display()))?;
        }

        if !skip_build {
            self.run_logged(vec!["build".into()])
                .context("building distribution")?;
        }

        info!("installing to {}", stage_root.display());
        self.run_logged(vec![
            "install".into(),
            "--root".into(),
            stage_root.as_os_str().to_owned(),
            "--skip-build".into(),
        ])
        .context("installing distribution into stage directory")?;

        let lib_dir = stage_path(stage_root, &interpreter.purelib);
        let scripts_dir = stage_path(stage_root, &interpreter.scripts);

        Ok(StagedInstall::inspect(stage_root, &lib_dir, &scripts_dir)?)
    }
}
