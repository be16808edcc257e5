// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
Invocation of the platform's packaging command line tools.

Archive construction is delegated to `pkgbuild` and `productbuild`. This
module defines the argument lists for those tools and a [ToolRunner]
abstraction that executes them and captures their output.
*/

use {
    crate::{component::ComponentPackage, OsxInstError, Result},
    duct::cmd,
    log::{error, info},
    std::{borrow::Cow, path::Path},
};

/// A command line to execute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    pub fn new(program: impl ToString) -> Self {
        Self {
            program: program.to_string(),
            args: vec![],
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl ToString) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Append a path argument. Paths must be valid UTF-8.
    pub fn path_arg(self, path: &Path) -> Result<Self> {
        let arg = path
            .to_str()
            .ok_or_else(|| OsxInstError::NonUtf8Path(path.to_path_buf()))?;

        Ok(self.arg(arg))
    }

    /// Render as a line that can be pasted into a POSIX shell.
    pub fn shell_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|word| shell_quote(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(word: &str) -> Cow<'_, str> {
    match shlex::try_quote(word) {
        Ok(quoted) => quoted,
        // Only NUL bytes are unquotable and no argument can contain them.
        Err(_) => Cow::Owned(format!("'{}'", word.replace('\0', ""))),
    }
}

/// Captured result of running a tool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code. `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Something that can execute a [ToolInvocation].
pub trait ToolRunner {
    /// Run a command to completion, capturing its output.
    ///
    /// A non-zero exit is not an error at this level.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;
}

/// A [ToolRunner] spawning real processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        let output = cmd(&invocation.program, &invocation.args)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Run a command and turn a non-zero exit into an error.
///
/// The command line is logged before execution. On failure the captured
/// streams are logged and carried in the returned error.
pub fn run_checked(runner: &dyn ToolRunner, invocation: &ToolInvocation) -> Result<ToolOutput> {
    let command = invocation.shell_line();
    info!("{}", command);

    let output = runner.run(invocation)?;

    if output.success() {
        Ok(output)
    } else {
        let stdout = output.stdout_lossy();
        let stderr = output.stderr_lossy();

        error!("ERROR running command:");
        error!("{}", stdout);
        error!("{}", stderr);

        Err(OsxInstError::ToolFailed {
            command,
            status: match output.code {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            },
            stdout,
            stderr,
        })
    }
}

/// `pkgbuild` invocation producing the component archive at `archive_path`.
pub fn pkgbuild(package: &ComponentPackage, archive_path: &Path) -> Result<ToolInvocation> {
    ToolInvocation::new("pkgbuild")
        .arg("--root")
        .path_arg(&package.source_root)?
        .arg("--identifier")
        .arg(&package.identifier)
        .arg("--version")
        .arg(&package.version)
        .arg("--install-location")
        .path_arg(&package.install_location)?
        .path_arg(archive_path)
}

/// `productbuild` invocation producing the product archive at `output_path`.
pub fn productbuild(
    distribution_path: &Path,
    package_path: &Path,
    resources_path: &Path,
    output_path: &Path,
) -> Result<ToolInvocation> {
    ToolInvocation::new("productbuild")
        .arg("--distribution")
        .path_arg(distribution_path)?
        .arg("--package-path")
        .path_arg(package_path)?
        .arg("--resources")
        .path_arg(resources_path)?
        .path_arg(output_path)
}

/// `mdls` invocation printing the Uniform Type Identifier of a file.
pub fn mdls_content_type(path: &Path) -> Result<ToolInvocation> {
    ToolInvocation::new("mdls")
        .arg("-name")
        .arg("kMDItemContentType")
        .arg("-raw")
        .path_arg(path)
}

#[cfg(test)]
mod tests {
    use {super::*, crate::testutil::RecordingRunner};

    #[test]
    fn test_shell_line() -> Result<()> {
        let invocation = productbuild(
            Path::new("/tmp/bdist/Distribution"),
            Path::new("/tmp/bdist/pkgs"),
            Path::new("/tmp/my resources"),
            Path::new("dist/acme-1.0.macosx-py3.9.pkg"),
        )?;

        let line = invocation.shell_line();
        assert!(line.starts_with("productbuild "));
        assert_eq!(
            shlex::split(&line),
            Some(vec![
                "productbuild".to_string(),
                "--distribution".to_string(),
                "/tmp/bdist/Distribution".to_string(),
                "--package-path".to_string(),
                "/tmp/bdist/pkgs".to_string(),
                "--resources".to_string(),
                "/tmp/my resources".to_string(),
                "dist/acme-1.0.macosx-py3.9.pkg".to_string(),
            ])
        );

        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_path_arg_rejects_non_utf8() -> Result<()> {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let path = Path::new(OsStr::from_bytes(b"/tmp/caf\xe9"));

        match mdls_content_type(path) {
            Err(OsxInstError::NonUtf8Path(p)) => assert_eq!(p, path),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(ToolInvocation::new("mkdir").path_arg(path).is_err());

        let invocation = ToolInvocation::new("mkdir").path_arg(Path::new("/tmp/café"))?;
        assert_eq!(invocation.args, vec!["/tmp/café".to_string()]);

        Ok(())
    }

    #[test]
    fn test_run_checked_failure_surfaces_output() {
        let runner = RecordingRunner::default().fail_program("pkgbuild");
        let invocation = ToolInvocation::new("pkgbuild").arg("--root").arg("/x");

        let err = run_checked(&runner, &invocation).unwrap_err();
        match err {
            OsxInstError::ToolFailed {
                command,
                status,
                stdout,
                stderr,
            } => {
                assert_eq!(
                    shlex::split(&command),
                    Some(vec!["pkgbuild".to_string(), "--root".to_string(), "/x".to_string()])
                );
                assert_eq!(status, "exit code 1");
                assert_eq!(stdout, "pkgbuild output");
                assert_eq!(stderr, "pkgbuild: error: bad input");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(runner.invocations().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_captures_streams() -> Result<()> {
        let invocation = ToolInvocation::new("sh")
            .arg("-c")
            .arg("echo out; echo err >&2; exit 3");

        let output = ProcessRunner.run(&invocation)?;
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout_lossy(), "out\n");
        assert_eq!(output.stderr_lossy(), "err\n");

        assert!(matches!(
            run_checked(&ProcessRunner, &invocation),
            Err(OsxInstError::ToolFailed { .. })
        ));

        let output = run_checked(&ProcessRunner, &ToolInvocation::new("true"))?;
        assert!(output.success());

        Ok(())
    }
}
