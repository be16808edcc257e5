// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Description of the Python runtime packages are built for. */

/// The Python interpreter an installer package targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PythonTarget {
    /// Major version of the interpreter.
    pub major: u32,

    /// Minor version of the interpreter.
    pub minor: u32,

    /// Platform tag as reported by `sysconfig.get_platform()`.
    ///
    /// e.g. `macosx-10.9-universal2`.
    pub platform: String,

    /// The `CFLAGS` the interpreter was compiled with.
    pub cflags: String,
}

impl PythonTarget {
    /// The `<major>.<minor>` version string.
    pub fn major_minor(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    /// Default value for the `hostArchitectures` attribute.
    ///
    /// Only meaningful for distributions containing extension modules.
    pub fn host_architectures(&self) -> String {
        host_architectures_from_cflags(&self.cflags)
    }
}

/// Derive a `hostArchitectures` value from compiler flags.
///
/// `-arch i386` matches both 32 and 64 bit Intel hosts, so `x86_64` is only
/// emitted when `i386` is absent.
pub fn host_architectures_from_cflags(cflags: &str) -> String {
    let tokens = cflags.split_whitespace().collect::<Vec<_>>();

    let targets = tokens
        .windows(2)
        .filter(|pair| pair[0] == "-arch")
        .map(|pair| pair[1])
        .collect::<Vec<_>>();

    let has = |arch: &str| targets.iter().any(|target| *target == arch);

    let mut archs = vec![];

    if has("i386") {
        archs.push("i386");
    } else if has("x86_64") {
        archs.push("x86_64");
    }
    if has("arm64") {
        archs.push("arm64");
    }
    if has("ppc") {
        archs.push("ppc");
    }

    archs.join(",")
}
