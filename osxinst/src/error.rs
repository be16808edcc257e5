// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {std::path::PathBuf, thiserror::Error};

/// Unified error type for installer package construction.
#[derive(Debug, Error)]
pub enum OsxInstError {
    #[error("installer packages must be created on macOS (current platform: {0})")]
    UnsupportedPlatform(String),

    #[error("unexpected temp install directory path: {path:?} is not inside {root:?}")]
    StagePathOutsideRoot { path: PathBuf, root: PathBuf },

    #[error("target install path not absolute: {0:?}")]
    InstallPathNotAbsolute(PathBuf),

    #[error("unexpected lib install directory path: {0:?}")]
    LibDirNotSitePackages(PathBuf),

    #[error("install location of component {archive} is not absolute: {location}")]
    RelativeInstallLocation { archive: String, location: String },

    #[error("component source root does not exist or is empty: {0:?}")]
    EmptyComponentSource(PathBuf),

    #[error("component identifier used more than once: {0}")]
    DuplicateIdentifier(String),

    #[error("path is not valid UTF-8: {0:?}")]
    NonUtf8Path(PathBuf),

    #[error("running a system command failed: {command} ({status})\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    ToolFailed {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("invalid uti for file {path:?}: {value:?}")]
    InvalidUti { path: PathBuf, value: String },

    #[error("resource path does not name a file: {0:?}")]
    InvalidResourcePath(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("XML writing error: {0}")]
    XmlWrite(#[from] xml::writer::Error),

    #[error("config parsing error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("template rendering error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("base64 decoding error: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, OsxInstError>;
