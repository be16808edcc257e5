// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Inspection of the Python interpreter packages are built with. */

use {
    anyhow::{Context, Result},
    duct::cmd,
    log::debug,
    osxinst::python::PythonTarget,
    serde::Deserialize,
    std::path::{Path, PathBuf},
};

const PROBE_SCRIPT: &str = r#"
import json, sys, sysconfig
print(json.dumps({
    "major": sys.version_info[0],
    "minor": sys.version_info[1],
    "platform": sysconfig.get_platform(),
    "cflags": sysconfig.get_config_var("CFLAGS") or "",
    "purelib": sysconfig.get_path("purelib"),
    "scripts": sysconfig.get_path("scripts"),
}))
"#;

/// What an interpreter reports about itself.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct InterpreterInfo {
    pub major: u32,
    pub minor: u32,
    pub platform: String,
    pub cflags: String,
    /// Install directory of pure Python modules.
    pub purelib: PathBuf,
    /// Install directory of scripts.
    pub scripts: PathBuf,
}

impl InterpreterInfo {
    pub fn target(&self) -> PythonTarget {
        PythonTarget {
            major: self.major,
            minor: self.minor,
            platform: self.platform.clone(),
            cflags: self.cflags.clone(),
        }
    }
}

fn parse_probe_output(data: &[u8]) -> Result<InterpreterInfo> {
    serde_json::from_slice(data).context("parsing interpreter probe output")
}

/// Run `python` to obtain its [InterpreterInfo].
pub fn probe_interpreter(python: &Path) -> Result<InterpreterInfo> {
    let output = cmd(python, &["-c", PROBE_SCRIPT])
        .stdout_capture()
        .run()
        .with_context(|| format!("probing Python interpreter {}", python.display()))?;

    let info = parse_probe_output(&output.stdout)?;
    debug!("interpreter {} reports {:?}", python.display(), info);

    Ok(info)
}
