// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Uniform Type Identifier resolution for installer documents. */

use {
    crate::{
        tools::{mdls_content_type, run_checked, ToolRunner},
        OsxInstError, Result,
    },
    log::debug,
    std::{ffi::OsStr, path::Path},
};

pub const HTML_UTI: &str = "public.html";

/// Determine the Uniform Type Identifier of a file.
///
/// HTML documents are identified by extension. `mdls` reports `(null)`
/// for files Spotlight hasn't indexed yet, which includes freshly
/// generated ones. Everything else is queried through `mdls` and the
/// answer must look like a dotted identifier.
pub fn resolve_uti(path: &Path, runner: &dyn ToolRunner) -> Result<String> {
    let is_html = path
        .extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.eq_ignore_ascii_case("html"))
        .unwrap_or(false);

    if is_html {
        return Ok(HTML_UTI.to_string());
    }

    let output = run_checked(runner, &mdls_content_type(path)?)?;
    let uti = output.stdout_lossy().trim().to_string();

    if !uti.contains('.') {
        return Err(OsxInstError::InvalidUti {
            path: path.to_path_buf(),
            value: uti,
        });
    }

    debug!("{} has uti {}", path.display(), uti);

    Ok(uti)
}

#[cfg(test)]
mod tests {
    use {super::*, crate::testutil::RecordingRunner};

    #[test]
    fn test_html_fast_path() -> Result<()> {
        let runner = RecordingRunner::default();

        assert_eq!(resolve_uti(Path::new("docs/welcome.html"), &runner)?, HTML_UTI);
        assert_eq!(resolve_uti(Path::new("WELCOME.HTML"), &runner)?, HTML_UTI);
        assert!(runner.invocations().is_empty());

        Ok(())
    }

    #[test]
    fn test_mdls_query() -> Result<()> {
        let runner = RecordingRunner::default().uti("com.apple.rtfd\n");

        assert_eq!(resolve_uti(Path::new("README.rtfd"), &runner)?, "com.apple.rtfd");
        assert_eq!(runner.programs(), vec!["mdls"]);
        assert_eq!(
            runner.invocations()[0].args,
            vec!["-name", "kMDItemContentType", "-raw", "README.rtfd"]
        );

        Ok(())
    }

    #[test]
    fn test_malformed_uti() {
        let runner = RecordingRunner::default().uti("(null)");

        assert!(matches!(
            resolve_uti(Path::new("LICENSE.txt"), &runner),
            Err(OsxInstError::InvalidUti { value, .. }) if value == "(null)"
        ));
    }

    #[test]
    fn test_mdls_failure() {
        let runner = RecordingRunner::default().fail_program("mdls");

        assert!(matches!(
            resolve_uti(Path::new("LICENSE.txt"), &runner),
            Err(OsxInstError::ToolFailed { .. })
        ));
    }
}
