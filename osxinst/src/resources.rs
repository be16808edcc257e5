// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*!
The resources directory of a product package.

`productbuild --resources` reads every document the Distribution file
refers to from one directory. It holds copies of the welcome, readme and
license documents, a generated welcome document when none is configured,
and the background image.
*/

use {
    crate::{
        distribution_xml::{ResourceKind, ResourceRef},
        metadata::DistributionMetadata,
        python::PythonTarget,
        settings::ProductSettings,
        tools::ToolRunner,
        uti::resolve_uti,
        OsxInstError, Result,
    },
    handlebars::Handlebars,
    log::info,
    serde::Serialize,
    std::path::{Path, PathBuf},
};

pub const BACKGROUND_IMAGE_NAME: &str = "background-dimmed.png";
pub const WELCOME_FILE_NAME: &str = "welcome.html";

const BACKGROUND_IMAGE_BASE64: &str = include_str!("../assets/background-dimmed.png.b64");
const WELCOME_TEMPLATE: &str = include_str!("templates/welcome.html.hbs");

/// Decode the PNG background image shown by the installer.
pub fn background_image() -> Result<Vec<u8>> {
    let encoded = BACKGROUND_IMAGE_BASE64
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>();

    Ok(base64::decode(encoded)?)
}

#[derive(Serialize)]
struct WelcomeData<'a> {
    title: &'a str,
    name: &'a str,
    version: &'a str,
    license: Option<&'a str>,
    homepage: Option<&'a str>,
    python_version: String,
}

/// Render the default welcome document.
pub fn render_welcome(
    title: &str,
    metadata: &DistributionMetadata,
    target: &PythonTarget,
) -> Result<String> {
    let data = WelcomeData {
        title,
        name: &metadata.name,
        version: &metadata.version,
        license: metadata.license.as_deref(),
        homepage: metadata.url.as_deref(),
        python_version: target.major_minor(),
    };

    Ok(Handlebars::new().render_template(WELCOME_TEMPLATE, &data)?)
}

/// A document placed in the resources directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceDocument {
    pub kind: ResourceKind,
    /// The file the document was created from.
    pub source: PathBuf,
    /// Name of the file within the resources directory.
    pub file_name: String,
}

impl ResourceDocument {
    /// Resolve the Distribution XML reference of this document.
    ///
    /// The UTI is obtained from the source file. Copies in the resources
    /// directory may not be indexed yet.
    pub fn reference(&self, runner: &dyn ToolRunner) -> Result<ResourceRef> {
        Ok(ResourceRef {
            kind: self.kind,
            file: self.file_name.clone(),
            uti: resolve_uti(&self.source, runner)?,
        })
    }
}

fn copy_document(kind: ResourceKind, source: &Path, resources_dir: &Path) -> Result<ResourceDocument> {
    let file_name = source
        .file_name()
        .ok_or_else(|| OsxInstError::InvalidResourcePath(source.to_path_buf()))?
        .to_str()
        .ok_or_else(|| OsxInstError::NonUtf8Path(source.to_path_buf()))?
        .to_string();

    std::fs::copy(source, resources_dir.join(&file_name))?;

    Ok(ResourceDocument {
        kind,
        source: source.to_path_buf(),
        file_name,
    })
}

/// Create and populate the resources directory.
///
/// Returns the documents to reference from the Distribution XML, in
/// welcome, readme, license order.
pub fn init_resources(
    resources_dir: &Path,
    settings: &ProductSettings,
    metadata: &DistributionMetadata,
    target: &PythonTarget,
) -> Result<Vec<ResourceDocument>> {
    std::fs::create_dir_all(resources_dir)?;

    let mut documents = vec![];

    if let Some(welcome) = &settings.welcome {
        documents.push(copy_document(ResourceKind::Welcome, welcome, resources_dir)?);
    } else {
        let path = resources_dir.join(WELCOME_FILE_NAME);
        info!("writing default welcome document to {}", path.display());
        std::fs::write(&path, render_welcome(&settings.title, metadata, target)?)?;

        documents.push(ResourceDocument {
            kind: ResourceKind::Welcome,
            source: path,
            file_name: WELCOME_FILE_NAME.to_string(),
        });
    }

    if let Some(readme) = &settings.readme {
        documents.push(copy_document(ResourceKind::Readme, readme, resources_dir)?);
    }
    if let Some(license) = &settings.license {
        documents.push(copy_document(ResourceKind::License, license, resources_dir)?);
    }

    std::fs::write(resources_dir.join(BACKGROUND_IMAGE_NAME), background_image()?)?;

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{config::InstallerConfig, settings::SettingsOverrides, testutil::RecordingRunner},
    };

    fn target() -> PythonTarget {
        PythonTarget {
            major: 3,
            minor: 11,
            platform: "macosx-11.0-arm64".to_string(),
            cflags: "-arch arm64".to_string(),
        }
    }

    #[test]
    fn test_background_image_is_png() -> Result<()> {
        let data = background_image()?;

        assert!(data.starts_with(b"\x89PNG\r\n\x1a\n"));
        assert_eq!(data.len(), 42915);

        Ok(())
    }

    #[test]
    fn test_render_welcome() -> Result<()> {
        let mut metadata = DistributionMetadata::new("acme<x>", "1.2");
        metadata.url = Some("https://acme.org/?a=1&b=2".to_string());

        let html = render_welcome("Acme & Co", &metadata, &target())?;
        assert!(html.contains("<h1>Acme &amp; Co</h1>"));
        assert!(html.contains("<b>acme&lt;x&gt;</b>"));
        assert!(html.contains("https://acme.org/?a&#x3D;1&amp;b&#x3D;2"));
        assert!(!html.contains("License:"));
        assert!(html.contains("This will install acme&lt;x&gt; v1.2 for Python 3.11."));

        let metadata = DistributionMetadata::new("acme", "1.2");
        let html = render_welcome("Acme", &metadata, &target())?;
        assert!(!html.contains("Homepage:"));

        Ok(())
    }

    #[test]
    fn test_init_resources() -> Result<()> {
        let td = tempfile::Builder::new().prefix("osxinst-test").tempdir()?;
        let license = td.path().join("LICENSE.rtf");
        std::fs::write(&license, "{\\rtf1}")?;

        let mut metadata = DistributionMetadata::new("acme", "1.2");
        metadata.license = Some("MIT".to_string());
        let settings = ProductSettings::resolve(
            SettingsOverrides {
                license: Some(license.clone()),
                ..Default::default()
            },
            &InstallerConfig::default(),
            &metadata,
            &target(),
        );

        let resources_dir = td.path().join("resources");
        let documents = init_resources(&resources_dir, &settings, &metadata, &target())?;

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].kind, ResourceKind::Welcome);
        assert_eq!(documents[0].file_name, WELCOME_FILE_NAME);
        assert_eq!(documents[1].kind, ResourceKind::License);
        assert_eq!(documents[1].source, license);

        let welcome = std::fs::read_to_string(resources_dir.join(WELCOME_FILE_NAME))?;
        assert!(welcome.contains("<b>MIT</b>"));
        assert!(resources_dir.join("LICENSE.rtf").is_file());
        assert!(resources_dir.join(BACKGROUND_IMAGE_NAME).is_file());

        let runner = RecordingRunner::default();
        let welcome_ref = documents[0].reference(&runner)?;
        assert_eq!(welcome_ref.uti, "public.html");
        let license_ref = documents[1].reference(&runner)?;
        assert_eq!(license_ref.file, "LICENSE.rtf");
        assert_eq!(license_ref.uti, "public.rtf");
        assert_eq!(runner.invocations()[0].args.last(), Some(&license.display().to_string()));

        Ok(())
    }
}
