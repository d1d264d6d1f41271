use std::fmt;
use std::str::FromStr;

use rusqlite::ToSql;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The base legal template a license is generated from.
///
/// Families are a closed set. Everything that varies per family (wire name,
/// template file) lives in [`LicenseFamily::info`], so adding a family is one
/// variant plus one arm there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum LicenseFamily {
    Rail,
    OpenRail,
    ResearchRail,
}

#[derive(Debug, Clone, Copy)]
pub struct FamilyInfo {
    pub name: &'static str,
    pub template: &'static str,
}

impl LicenseFamily {
    pub const ALL: [LicenseFamily; 3] = [Self::Rail, Self::OpenRail, Self::ResearchRail];

    #[must_use]
    pub const fn info(self) -> FamilyInfo {
        match self {
            Self::Rail => FamilyInfo {
                name: "RAIL",
                template: "RAIL-AMS.jinja",
            },
            Self::OpenRail => FamilyInfo {
                name: "OpenRAIL",
                template: "OpenRAIL-AMS.jinja",
            },
            Self::ResearchRail => FamilyInfo {
                name: "ResearchRAIL",
                template: "ResearchUseRAIL.jinja",
            },
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.info().name
    }

    #[must_use]
    pub const fn template_file(self) -> &'static str {
        self.info().template
    }
}

impl fmt::Display for LicenseFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| Error::UnsupportedFamily(s.to_string()))
    }
}

impl TryFrom<String> for LicenseFamily {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LicenseFamily> for &'static str {
    fn from(family: LicenseFamily) -> Self {
        family.as_str()
    }
}

impl ToSql for LicenseFamily {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for LicenseFamily {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        raw.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A kind of thing a license can cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Artifact {
    Application,
    Model,
    SourceCode,
}

impl Artifact {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Application => "Application",
            Self::Model => "Model",
            Self::SourceCode => "Source Code",
        }
    }

    #[must_use]
    pub const fn initial(self) -> char {
        match self {
            Self::Application => 'A',
            Self::Model => 'M',
            Self::SourceCode => 'S',
        }
    }
}
