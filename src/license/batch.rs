use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use super::assembly::{LicenseContext, short_artifact_name};
use super::render::render;
use super::templates::{HEAD, TemplateStore, TemplateVersion};
use crate::error::Result;
use crate::types::{License, LicenseFamily, artifacts_from_flags};

/// Renders each family against every non-empty artifact selection, without
/// restrictions, into `out`. Returns the written paths.
pub fn render_all(templates: &TemplateStore, out: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out)?;
    let mut written = Vec::new();

    for family in LicenseFamily::ALL {
        let source = templates.load(family, TemplateVersion::Head)?;

        for mask in 1u8..8 {
            let (application, model, sourcecode) =
                (mask & 0b001 != 0, mask & 0b010 != 0, mask & 0b100 != 0);
            let code = short_artifact_name(&artifacts_from_flags(application, model, sourcecode));

            let license = License {
                id: Uuid::nil(),
                timestamp: Utc::now(),
                name: format!("{family}-{code}"),
                family,
                application,
                model,
                sourcecode,
                data: false,
                template_version: HEAD.to_string(),
                restrictions: Vec::new(),
                domains: Vec::new(),
            };

            let text = render(&source, &LicenseContext::for_license(&license, Vec::new()))?;
            let path = out.join(format!("license={family}-artifact={code}.md"));
            std::fs::write(&path, text)?;
            written.push(path);
        }

        tracing::info!(%family, "Rendered all artifact combinations");
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_all_combinations() {
        let temp = TempDir::new().unwrap();
        let template_dir = temp.path().join("templates");
        std::fs::create_dir_all(&template_dir).unwrap();
        for family in LicenseFamily::ALL {
            std::fs::write(
                template_dir.join(family.template_file()),
                "{{ LICENSE_NAME }} covers {{ ARTIFACTS | join(', ') }}",
            )
            .unwrap();
        }

        let out = temp.path().join("out");
        let written = render_all(&TemplateStore::new(&template_dir), &out).unwrap();
        assert_eq!(written.len(), 21);

        let text = std::fs::read_to_string(out.join("license=OpenRAIL-artifact=MS.md")).unwrap();
        assert_eq!(text, "OpenRAIL-MS covers Model, Source Code");
        assert!(out.join("license=RAIL-artifact=AMS.md").exists());
        assert!(!out.join("license=RAIL-artifact=AMSD.md").exists());
    }

    #[test]
    fn test_render_all_requires_templates() {
        let temp = TempDir::new().unwrap();
        let result = render_all(&TemplateStore::new(temp.path()), &temp.path().join("out"));
        assert!(result.is_err());
    }
}
