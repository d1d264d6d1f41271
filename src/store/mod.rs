pub mod crud;
mod schema;
pub mod seed;
mod sqlite;

pub use crud::{Entity, Filter, Page, Repository};
pub use sqlite::SqliteStore;

use uuid::Uuid;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Catalog and license repositories
    fn licenses(&self) -> &dyn Repository<License>;
    fn domains(&self) -> &dyn Repository<LicenseDomain>;
    fn sources(&self) -> &dyn Repository<LicenseSource>;
    fn restrictions(&self) -> &dyn Repository<LicenseRestriction>;

    fn get_domain_by_name(&self, name: &str) -> Result<Option<LicenseDomain>>;
    fn get_source_by_name(&self, name: &str) -> Result<Option<LicenseSource>>;

    /// Approved restrictions of a license joined with their domain names,
    /// in the order they were associated.
    fn license_clauses(&self, license_id: &Uuid) -> Result<Vec<Clause>>;

    // User operations
    fn create_user(&self, user: &NewUser) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self, page: Page) -> Result<Vec<User>>;
    fn has_superuser(&self) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn delete_expired_tokens(&self) -> Result<usize>;
}
