use minijinja::Environment;

use super::assembly::LicenseContext;
use crate::error::{Error, Result};

/// Renders Jinja template source with a license context.
pub fn render(source: &str, context: &LicenseContext) -> Result<String> {
    let env = Environment::new();
    env.render_str(source, context)
        .map_err(|e| Error::Template(e.to_string()))
}
