mod family;
mod models;

pub use family::{Artifact, FamilyInfo, LicenseFamily};
pub use models::*;
