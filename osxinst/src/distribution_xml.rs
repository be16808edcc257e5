// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Distribution XML documents.

A *Distribution* file defines the installer experience of a product
package: its title, the choices presented to the user, the component
packages backing each choice and scripts evaluated by the installer.

See Apple's Distribution XML reference at
<https://developer.apple.com/library/archive/documentation/DeveloperTools/Reference/DistributionDefinitionRef/Chapters/Distribution_XML_Ref.html>.

A [DistributionDocument] is an ordered list of [Section]s which is
serialized once. Values are escaped by the XML emitter, so attribute
and text content can be arbitrary strings.
*/

use {
    crate::{component::ComponentPackage, OsxInstError, Result},
    std::{io::Write, path::Path},
    xml::{
        common::XmlVersion,
        writer::{EmitterConfig, Error as EmitterError, EventWriter, XmlEvent},
    },
};

/// Name of the function evaluated by the `<volume-check>` element.
pub const VOLUME_CHECK_FUNCTION: &str = "checkForPythonInstall";

/// A document displayed by the installer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Welcome,
    Readme,
    License,
}

impl ResourceKind {
    pub fn element_name(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Readme => "readme",
            Self::License => "license",
        }
    }
}

/// Reference to a file in the resources directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    /// File name relative to the resources directory.
    pub file: String,
    /// Uniform Type Identifier of the file.
    pub uti: String,
}

/// An element of `<installer-gui-script>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Section {
    Title(String),
    Domains {
        enable_anywhere: bool,
        enable_current_user_home: bool,
        enable_local_system: bool,
    },
    HostArchitectures(String),
    Background {
        file: String,
        uti: String,
        alignment: String,
        scaling: String,
    },
    VolumeCheck {
        script: String,
    },
    Resource(ResourceRef),
    /// `<choices-outline>` with one `<line>` per choice id.
    ChoicesOutline(Vec<String>),
    Choice {
        id: String,
        title: String,
        description: String,
        pkg_ref: String,
    },
    PkgRef {
        id: String,
        version: String,
        archive_name: String,
    },
    Script(String),
}

impl Section {
    pub fn write_xml<W: Write>(
        &self,
        writer: &mut EventWriter<W>,
    ) -> std::result::Result<(), EmitterError> {
        match self {
            Self::Title(title) => {
                writer.write(XmlEvent::start_element("title"))?;
                writer.write(XmlEvent::characters(title))?;
                writer.write(XmlEvent::end_element())?;
            }
            Self::Domains {
                enable_anywhere,
                enable_current_user_home,
                enable_local_system,
            } => {
                let anywhere = enable_anywhere.to_string();
                let current_user_home = enable_current_user_home.to_string();
                let local_system = enable_local_system.to_string();

                writer.write(
                    XmlEvent::start_element("domains")
                        .attr("enable_anywhere", &anywhere)
                        .attr("enable_currentUserHome", &current_user_home)
                        .attr("enable_localSystem", &local_system),
                )?;
                writer.write(XmlEvent::end_element())?;
            }
            Self::HostArchitectures(archs) => {
                writer.write(XmlEvent::start_element("options").attr("hostArchitectures", archs))?;
                writer.write(XmlEvent::end_element())?;
            }
            Self::Background {
                file,
                uti,
                alignment,
                scaling,
            } => {
                writer.write(
                    XmlEvent::start_element("background")
                        .attr("file", file)
                        .attr("uti", uti)
                        .attr("alignment", alignment)
                        .attr("scaling", scaling),
                )?;
                writer.write(XmlEvent::end_element())?;
            }
            Self::VolumeCheck { script } => {
                writer.write(XmlEvent::start_element("volume-check").attr("script", script))?;
                writer.write(XmlEvent::end_element())?;
            }
            Self::Resource(resource) => {
                writer.write(
                    XmlEvent::start_element(resource.kind.element_name())
                        .attr("file", &resource.file)
                        .attr("uti", &resource.uti),
                )?;
                writer.write(XmlEvent::end_element())?;
            }
            Self::ChoicesOutline(choices) => {
                writer.write(XmlEvent::start_element("choices-outline"))?;
                for choice in choices {
                    writer.write(XmlEvent::start_element("line").attr("choice", choice))?;
                    writer.write(XmlEvent::end_element())?;
                }
                writer.write(XmlEvent::end_element().name("choices-outline"))?;
            }
            Self::Choice {
                id,
                title,
                description,
                pkg_ref,
            } => {
                writer.write(
                    XmlEvent::start_element("choice")
                        .attr("id", id)
                        .attr("title", title)
                        .attr("description", description),
                )?;
                writer.write(XmlEvent::start_element("pkg-ref").attr("id", pkg_ref))?;
                writer.write(XmlEvent::end_element())?;
                writer.write(XmlEvent::end_element().name("choice"))?;
            }
            Self::PkgRef {
                id,
                version,
                archive_name,
            } => {
                writer.write(
                    XmlEvent::start_element("pkg-ref")
                        .attr("id", id)
                        .attr("version", version),
                )?;
                writer.write(XmlEvent::characters(archive_name))?;
                writer.write(XmlEvent::end_element())?;
            }
            Self::Script(script) => {
                writer.write(XmlEvent::start_element("script"))?;
                writer.write(XmlEvent::cdata(script))?;
                writer.write(XmlEvent::end_element())?;
            }
        }

        Ok(())
    }
}

/// Collapse line breaks so a value fits on a single line.
pub fn flatten_description(s: &str) -> String {
    s.replace("\r\n", " ")
        .replace(|c: char| c == '\n' || c == '\r', " ")
}

fn escape_js_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());

    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }

    escaped
}

/// JavaScript refusing installation on volumes lacking `target_lib_dir`.
pub fn volume_check_script(target_lib_dir: &str, python_version: &str) -> String {
    format!(
        r#"
function {function}()
{{
    if (system.files.fileExistsAtPath(my.target.mountpoint + "{lib_dir}"))
    {{
        return true;
    }}
    else
    {{
        my.result.type = "Fatal";
        my.result.message = "Python {version} (from www.python.org) is not installed on this volume.";
        return false;
    }}
}}
"#,
        function = VOLUME_CHECK_FUNCTION,
        lib_dir = escape_js_string(target_lib_dir),
        version = escape_js_string(python_version),
    )
}

/// An ordered, append-only `<installer-gui-script>` document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DistributionDocument {
    sections: Vec<Section>,
}

impl DistributionDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct the document of a product package.
    ///
    /// `host_architectures` should only be set if the product contains
    /// native code. Choices appear in the order of `packages`.
    pub fn for_product(
        title: &str,
        packages: &[ComponentPackage],
        resources: &[ResourceRef],
        host_architectures: Option<&str>,
        background_image: &str,
        target_lib_dir: &Path,
        python_version: &str,
    ) -> Result<Self> {
        let lib_dir = target_lib_dir
            .to_str()
            .ok_or_else(|| OsxInstError::NonUtf8Path(target_lib_dir.to_path_buf()))?;

        let mut doc = Self::new();

        doc.push(Section::Title(title.to_string()));
        doc.push(Section::Domains {
            enable_anywhere: true,
            enable_current_user_home: false,
            enable_local_system: true,
        });
        if let Some(archs) = host_architectures {
            doc.push(Section::HostArchitectures(archs.to_string()));
        }
        doc.push(Section::Background {
            file: background_image.to_string(),
            uti: "public.png".to_string(),
            alignment: "left".to_string(),
            scaling: "proportional".to_string(),
        });
        doc.push(Section::VolumeCheck {
            script: format!("{}()", VOLUME_CHECK_FUNCTION),
        });
        for resource in resources {
            doc.push(Section::Resource(resource.clone()));
        }

        let choice_ids = (1..=packages.len())
            .map(|i| format!("choice{}", i))
            .collect::<Vec<_>>();

        doc.push(Section::ChoicesOutline(choice_ids.clone()));

        for (id, package) in choice_ids.into_iter().zip(packages) {
            doc.push(Section::Choice {
                id,
                title: package.title.clone(),
                description: flatten_description(&package.description),
                pkg_ref: package.identifier.clone(),
            });
        }

        for package in packages {
            doc.push(Section::PkgRef {
                id: package.identifier.clone(),
                version: package.version.clone(),
                archive_name: package.archive_name.clone(),
            });
        }

        doc.push(Section::Script(volume_check_script(lib_dir, python_version)));

        Ok(doc)
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    #[cfg(test)]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn write_xml<W: Write>(
        &self,
        writer: &mut EventWriter<W>,
    ) -> std::result::Result<(), EmitterError> {
        writer.write(XmlEvent::StartDocument {
            version: XmlVersion::Version10,
            encoding: Some("utf-8"),
            standalone: None,
        })?;

        writer.write(XmlEvent::start_element("installer-gui-script").attr("minSpecVersion", "1"))?;

        for section in &self.sections {
            section.write_xml(writer)?;
        }

        writer.write(XmlEvent::end_element().name("installer-gui-script"))?;

        Ok(())
    }

    /// Serialize to pretty-printed XML.
    pub fn to_xml(&self) -> Result<Vec<u8>> {
        let mut emitter = EmitterConfig::new()
            .perform_indent(true)
            .create_writer(Vec::new());
        self.write_xml(&mut emitter)?;

        Ok(emitter.into_inner())
    }

    /// Write the serialized document to a file.
    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_xml()?)?;

        Ok(())
    }
}
