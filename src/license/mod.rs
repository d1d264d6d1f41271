pub mod assembly;
pub mod batch;
pub mod convert;
pub mod filename;
pub mod render;
pub mod templates;

pub use assembly::{LicenseContext, RestrictionGroup, clause_label, group_clauses};
pub use batch::render_all;
pub use convert::{Converter, Document, MediaType, TempFileReader};
pub use render::render;
pub use templates::{TemplateError, TemplateStore, TemplateVersion};
