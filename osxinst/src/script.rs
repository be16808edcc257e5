// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Shell script reproducing the packaging commands of a build. */

use {
    crate::{tools::ToolInvocation, Result},
    std::{
        fs::File,
        io::{BufWriter, Write},
        path::Path,
    },
};

pub const SCRIPT_FILE_NAME: &str = "mkpkg.sh";

/// Writer of `mkpkg.sh`.
///
/// Commands are appended as the build executes them, so a failed build
/// leaves a script covering every step up to the failure.
pub struct ReproScript {
    writer: BufWriter<File>,
}

impl ReproScript {
    /// Create the script, writing its header.
    pub fn create(path: &Path, distribution_name: &str) -> Result<Self> {
        let mut script = Self {
            writer: BufWriter::new(File::create(path)?),
        };

        script.line(&format!("# Create '{}' installer package.", distribution_name))?;
        script.line(
            "# (if you want to run this script you need to be in the root directory of the package)",
        )?;
        script.line("")?;

        Ok(script)
    }

    fn line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;

        Ok(())
    }

    /// Start a block of commands creating `dir` first.
    pub fn section(&mut self, comment: &str, dir: &Path) -> Result<()> {
        self.line(&format!("# {}", comment))?;
        self.command(&ToolInvocation::new("mkdir").arg("-p").path_arg(dir)?)
    }

    pub fn command(&mut self, invocation: &ToolInvocation) -> Result<()> {
        self.line(&invocation.shell_line())
    }

    pub fn blank(&mut self) -> Result<()> {
        self.line("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_layout() -> Result<()> {
        let td = tempfile::Builder::new().prefix("osxinst-test").tempdir()?;
        let path = td.path().join(SCRIPT_FILE_NAME);

        let mut script = ReproScript::create(&path, "acme")?;
        script.section("Build component packages", Path::new("build/pkgs"))?;
        script.command(&ToolInvocation::new("pkgbuild").arg("--root").arg("stage dir"))?;

        // Content is on disk before the script is dropped.
        let partial = std::fs::read_to_string(&path)?;
        assert!(partial.contains("pkgbuild --root"));

        script.blank()?;
        script.section("Build product package", Path::new("dist"))?;
        drop(script);

        let lines = std::fs::read_to_string(&path)?
            .lines()
            .map(|l| l.to_string())
            .collect::<Vec<_>>();

        assert_eq!(lines[0], "# Create 'acme' installer package.");
        assert!(lines[1].starts_with("# (if you want to run this script"));
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "# Build component packages");
        assert_eq!(shlex::split(&lines[4]), Some(vec!["mkdir".into(), "-p".into(), "build/pkgs".into()]));
        assert_eq!(
            shlex::split(&lines[5]),
            Some(vec!["pkgbuild".into(), "--root".into(), "stage dir".into()])
        );
        assert_eq!(lines[6], "");
        assert_eq!(lines[7], "# Build product package");
        assert_eq!(shlex::split(&lines[8]), Some(vec!["mkdir".into(), "-p".into(), "dist".into()]));

        Ok(())
    }
}
