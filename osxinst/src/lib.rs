// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! macOS installer packages for Python distributions.
//!
//! This crate turns a Python distribution that was installed into a
//! temporary *stage* directory into a flat `.pkg` installer for the
//! python.org framework builds of Python.
//!
//! # Components
//!
//! Product installers are assembled from *component* packages built with
//! `pkgbuild`. By default every top-level Python package found in the
//! staged `site-packages` becomes one component, so users can see what gets
//! installed:
//!
//! `pkg.<name>.pkg`
//!    A top-level package (a directory with an `__init__.py`).
//! `modules.pkg`
//!    Top-level modules, data files and non-package directories.
//! `scripts.pkg`
//!    Command line scripts.
//!
//! Alternatively a single `pkg.<distribution>.pkg` covers all of
//! `site-packages` (see [settings::ProductSettings::single_lib_pkg]).
//!
//! # Products
//!
//! The product package is built with `productbuild` from the components, a
//! resources directory and a *Distribution* XML document (see
//! [distribution_xml]) describing the installer's choices. The document
//! embeds a check refusing installation on volumes without the targeted
//! Python version.
//!
//! The external tools are invoked through the [tools::ToolRunner] trait. Every
//! invocation is recorded in a `mkpkg.sh` script ([script]) so the
//! packaging steps can be repeated by hand.
//!
//! # Usage
//!
//! Resolve [settings::ProductSettings] from command line overrides and an
//! [config::InstallerConfig], describe the staged install with
//! [staging::StagedInstall::inspect] and hand everything to
//! [builder::InstallerBuilder].

pub mod builder;
pub mod component;
pub mod config;
pub mod distribution_xml;
mod error;
pub mod metadata;
pub mod python;
pub mod resources;
pub mod script;
pub mod settings;
pub mod staging;
#[cfg(test)]
mod testutil;
pub mod tools;
pub mod uti;

pub use error::{OsxInstError, Result};
