use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, Transaction, params, params_from_iter};
use uuid::Uuid;

use super::Store;
use super::crud::{Entity, Filter, Page, Repository};
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database. Useful for tests and dry runs.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Maps row decoding failures, surfacing unsupported license families.
fn read_error(e: rusqlite::Error) -> Error {
    if let rusqlite::Error::FromSqlConversionFailure(_, _, source) = &e {
        if let Some(Error::UnsupportedFamily(name)) = source.downcast_ref::<Error>() {
            tracing::error!("License row carries unsupported family '{name}'");
            return Error::UnsupportedFamily(name.clone());
        }
    }
    Error::from(e)
}

/// Maps constraint violations on writes to domain errors.
fn write_error(e: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.code == ErrorCode::ConstraintViolation {
            match err.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Error::ForeignKey,
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => return Error::AlreadyExists,
                _ => {}
            }
        }
    }
    Error::from(e)
}

// Generic row access shared by every entity

fn fetch_one<E: Entity>(conn: &Connection, id: &E::Id) -> Result<Option<E>> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", E::COLUMNS, E::TABLE);
    conn.query_row(&sql, [E::key(id)], E::from_row)
        .optional()
        .map_err(read_error)
}

fn fetch_page<E: Entity>(conn: &Connection, page: Page, filter: &Filter) -> Result<Vec<E>> {
    let mut sql = format!("SELECT {} FROM {}", E::COLUMNS, E::TABLE);
    let mut values: Vec<Value> = Vec::with_capacity(filter.conditions().len() + 2);

    for (index, (column, value)) in filter.conditions().iter().enumerate() {
        if !E::FILTERABLE.contains(column) {
            return Err(Error::Validation(format!(
                "{} cannot be filtered by '{column}'",
                E::NAME
            )));
        }
        let joiner = if index == 0 { " WHERE" } else { " AND" };
        sql.push_str(&format!("{joiner} {column} = ?{}", index + 1));
        values.push(value.clone());
    }

    sql.push_str(&format!(
        " ORDER BY rowid LIMIT ?{} OFFSET ?{}",
        values.len() + 1,
        values.len() + 2
    ));
    values.push(Value::Integer(i64::from(page.limit)));
    values.push(Value::Integer(i64::from(page.skip)));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), E::from_row)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(read_error)
}

fn delete_one<E: Entity>(conn: &Connection, id: &E::Id) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", E::TABLE);
    let rows = conn.execute(&sql, [E::key(id)]).map_err(write_error)?;
    Ok(rows > 0)
}

// Entity mappings

impl Entity for LicenseDomain {
    type Id = i64;
    type Create = NewName;
    type Update = NamePatch;

    const NAME: &'static str = "License Domain";
    const TABLE: &'static str = "licensedomain";
    const COLUMNS: &'static str = "id, name";
    const FILTERABLE: &'static [&'static str] = &["name"];

    fn key(id: &i64) -> Value {
        Value::Integer(*id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }
}

impl Entity for LicenseSource {
    type Id = i64;
    type Create = NewName;
    type Update = NamePatch;

    const NAME: &'static str = "License Source";
    const TABLE: &'static str = "licensesource";
    const COLUMNS: &'static str = "id, name";
    const FILTERABLE: &'static [&'static str] = &["name"];

    fn key(id: &i64) -> Value {
        Value::Integer(*id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }
}

impl Entity for LicenseRestriction {
    type Id = i64;
    type Create = NewRestriction;
    type Update = RestrictionPatch;

    const NAME: &'static str = "License Restriction";
    const TABLE: &'static str = "licenserestriction";
    const COLUMNS: &'static str = "id, text, domain_id, source_id, approved";
    const FILTERABLE: &'static [&'static str] = &["approved", "domain_id", "source_id"];

    fn key(id: &i64) -> Value {
        Value::Integer(*id)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            text: row.get(1)?,
            domain_id: row.get(2)?,
            source_id: row.get(3)?,
            approved: row.get(4)?,
        })
    }
}

impl Entity for License {
    type Id = Uuid;
    type Create = NewLicense;
    type Update = LicensePatch;

    const NAME: &'static str = "License";
    const TABLE: &'static str = "license";
    const COLUMNS: &'static str =
        "id, timestamp, name, license, application, model, sourcecode, data, git_commit_hash";
    const FILTERABLE: &'static [&'static str] = &["license", "name"];

    fn key(id: &Uuid) -> Value {
        Value::Text(id.to_string())
    }

    /// Relations are left empty; the store attaches them afterwards.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let raw_id: String = row.get(0)?;
        let id = Uuid::parse_str(&raw_id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

        Ok(Self {
            id,
            timestamp: parse_datetime(&row.get::<_, String>(1)?),
            name: row.get(2)?,
            family: row.get(3)?,
            application: row.get(4)?,
            model: row.get(5)?,
            sourcecode: row.get(6)?,
            data: row.get(7)?,
            template_version: row.get(8)?,
            restrictions: Vec::new(),
            domains: Vec::new(),
        })
    }
}

fn attach_relations(conn: &Connection, license: &mut License) -> Result<()> {
    let id = license.id.to_string();

    let mut stmt = conn.prepare(
        "SELECT r.id, r.text, r.domain_id, r.source_id, r.approved
         FROM license_licenserestriction_link l
         JOIN licenserestriction r ON r.id = l.restriction_id
         WHERE l.license_id = ?1
         ORDER BY l.rowid",
    )?;
    license.restrictions = stmt
        .query_map(params![id], LicenseRestriction::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT d.id, d.name
         FROM license_licensedomain_link l
         JOIN licensedomain d ON d.id = l.domain_id
         WHERE l.license_id = ?1
         ORDER BY l.rowid",
    )?;
    license.domains = stmt
        .query_map(params![id], LicenseDomain::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(())
}

fn fetch_license(conn: &Connection, id: &Uuid) -> Result<Option<License>> {
    let Some(mut license) = fetch_one::<License>(conn, id)? else {
        return Ok(None);
    };
    attach_relations(conn, &mut license)?;
    Ok(Some(license))
}

/// Replaces the link rows of a license, keeping the order given and
/// dropping repeated ids.
fn replace_links(
    tx: &Transaction<'_>,
    table: &str,
    column: &str,
    license_id: &str,
    ids: &[i64],
) -> Result<()> {
    tx.execute(
        &format!("DELETE FROM {table} WHERE license_id = ?1"),
        params![license_id],
    )?;

    let sql = format!("INSERT OR IGNORE INTO {table} (license_id, {column}) VALUES (?1, ?2)");
    for id in ids {
        tx.execute(&sql, params![license_id, id])
            .map_err(write_error)?;
    }
    Ok(())
}

// Repositories

impl Repository<LicenseDomain> for SqliteStore {
    fn get(&self, id: &i64) -> Result<Option<LicenseDomain>> {
        fetch_one(&self.conn(), id)
    }

    fn get_multi(&self, page: Page, filter: &Filter) -> Result<Vec<LicenseDomain>> {
        fetch_page(&self.conn(), page, filter)
    }

    fn create(&self, input: &NewName) -> Result<LicenseDomain> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO licensedomain (name) VALUES (?1)",
            params![input.name],
        )
        .map_err(write_error)?;

        Ok(LicenseDomain {
            id: conn.last_insert_rowid(),
            name: input.name.clone(),
        })
    }

    fn update(&self, id: &i64, patch: &NamePatch) -> Result<Option<LicenseDomain>> {
        let conn = self.conn();
        let Some(mut domain) = fetch_one::<LicenseDomain>(&conn, id)? else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            domain.name = name.clone();
        }

        conn.execute(
            "UPDATE licensedomain SET name = ?1 WHERE id = ?2",
            params![domain.name, domain.id],
        )
        .map_err(write_error)?;

        Ok(Some(domain))
    }

    fn remove(&self, id: &i64) -> Result<Option<LicenseDomain>> {
        let conn = self.conn();
        let Some(domain) = fetch_one::<LicenseDomain>(&conn, id)? else {
            return Ok(None);
        };
        delete_one::<LicenseDomain>(&conn, id)?;
        Ok(Some(domain))
    }
}

impl Repository<LicenseSource> for SqliteStore {
    fn get(&self, id: &i64) -> Result<Option<LicenseSource>> {
        fetch_one(&self.conn(), id)
    }

    fn get_multi(&self, page: Page, filter: &Filter) -> Result<Vec<LicenseSource>> {
        fetch_page(&self.conn(), page, filter)
    }

    fn create(&self, input: &NewName) -> Result<LicenseSource> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO licensesource (name) VALUES (?1)",
            params![input.name],
        )
        .map_err(write_error)?;

        Ok(LicenseSource {
            id: conn.last_insert_rowid(),
            name: input.name.clone(),
        })
    }

    fn update(&self, id: &i64, patch: &NamePatch) -> Result<Option<LicenseSource>> {
        let conn = self.conn();
        let Some(mut source) = fetch_one::<LicenseSource>(&conn, id)? else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            source.name = name.clone();
        }

        conn.execute(
            "UPDATE licensesource SET name = ?1 WHERE id = ?2",
            params![source.name, source.id],
        )
        .map_err(write_error)?;

        Ok(Some(source))
    }

    fn remove(&self, id: &i64) -> Result<Option<LicenseSource>> {
        let conn = self.conn();
        let Some(source) = fetch_one::<LicenseSource>(&conn, id)? else {
            return Ok(None);
        };
        delete_one::<LicenseSource>(&conn, id)?;
        Ok(Some(source))
    }
}

impl Repository<LicenseRestriction> for SqliteStore {
    fn get(&self, id: &i64) -> Result<Option<LicenseRestriction>> {
        fetch_one(&self.conn(), id)
    }

    fn get_multi(&self, page: Page, filter: &Filter) -> Result<Vec<LicenseRestriction>> {
        fetch_page(&self.conn(), page, filter)
    }

    fn create(&self, input: &NewRestriction) -> Result<LicenseRestriction> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO licenserestriction (text, source_id, domain_id, approved)
             VALUES (?1, ?2, ?3, ?4)",
            params![input.text, input.source_id, input.domain_id, input.approved],
        )
        .map_err(write_error)?;

        Ok(LicenseRestriction {
            id: conn.last_insert_rowid(),
            text: input.text.clone(),
            domain_id: input.domain_id,
            source_id: input.source_id,
            approved: input.approved,
        })
    }

    fn update(&self, id: &i64, patch: &RestrictionPatch) -> Result<Option<LicenseRestriction>> {
        let conn = self.conn();
        let Some(mut restriction) = fetch_one::<LicenseRestriction>(&conn, id)? else {
            return Ok(None);
        };

        if let Some(text) = &patch.text {
            restriction.text = text.clone();
        }
        if let Some(domain_id) = patch.domain_id {
            restriction.domain_id = domain_id;
        }
        if let Some(source_id) = patch.source_id {
            restriction.source_id = source_id;
        }
        if let Some(approved) = patch.approved {
            restriction.approved = approved;
        }

        conn.execute(
            "UPDATE licenserestriction SET text = ?1, domain_id = ?2, source_id = ?3, approved = ?4
             WHERE id = ?5",
            params![
                restriction.text,
                restriction.domain_id,
                restriction.source_id,
                restriction.approved,
                restriction.id,
            ],
        )
        .map_err(write_error)?;

        Ok(Some(restriction))
    }

    fn remove(&self, id: &i64) -> Result<Option<LicenseRestriction>> {
        let conn = self.conn();
        let Some(restriction) = fetch_one::<LicenseRestriction>(&conn, id)? else {
            return Ok(None);
        };
        delete_one::<LicenseRestriction>(&conn, id)?;
        Ok(Some(restriction))
    }
}

impl Repository<License> for SqliteStore {
    fn get(&self, id: &Uuid) -> Result<Option<License>> {
        fetch_license(&self.conn(), id)
    }

    fn get_multi(&self, page: Page, filter: &Filter) -> Result<Vec<License>> {
        let conn = self.conn();
        let mut licenses = fetch_page::<License>(&conn, page, filter)?;
        for license in &mut licenses {
            attach_relations(&conn, license)?;
        }
        Ok(licenses)
    }

    fn create(&self, input: &NewLicense) -> Result<License> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let id = input.id.to_string();

        tx.execute(
            "INSERT INTO license (id, timestamp, name, license, application, model, sourcecode, data, git_commit_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                format_datetime(&input.timestamp),
                input.name,
                input.family,
                input.application,
                input.model,
                input.sourcecode,
                input.data,
                input.template_version,
            ],
        )
        .map_err(write_error)?;

        replace_links(
            &tx,
            "license_licenserestriction_link",
            "restriction_id",
            &id,
            &input.restriction_ids,
        )?;
        replace_links(
            &tx,
            "license_licensedomain_link",
            "domain_id",
            &id,
            &input.domain_ids,
        )?;

        tx.commit()?;

        fetch_license(&conn, &input.id)?.ok_or(Error::NotFound)
    }

    fn update(&self, id: &Uuid, patch: &LicensePatch) -> Result<Option<License>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let Some(mut license) = fetch_one::<License>(&tx, id)? else {
            return Ok(None);
        };

        if let Some(timestamp) = patch.timestamp {
            license.timestamp = timestamp;
        }
        if let Some(name) = &patch.name {
            license.name = name.clone();
        }
        if let Some(family) = patch.family {
            license.family = family;
        }
        if let Some(application) = patch.application {
            license.application = application;
        }
        if let Some(model) = patch.model {
            license.model = model;
        }
        if let Some(sourcecode) = patch.sourcecode {
            license.sourcecode = sourcecode;
        }
        if let Some(data) = patch.data {
            license.data = data;
        }

        let key = id.to_string();
        tx.execute(
            "UPDATE license SET timestamp = ?1, name = ?2, license = ?3, application = ?4,
                model = ?5, sourcecode = ?6, data = ?7
             WHERE id = ?8",
            params![
                format_datetime(&license.timestamp),
                license.name,
                license.family,
                license.application,
                license.model,
                license.sourcecode,
                license.data,
                key,
            ],
        )
        .map_err(write_error)?;

        if let Some(ids) = &patch.restriction_ids {
            replace_links(&tx, "license_licenserestriction_link", "restriction_id", &key, ids)?;
        }
        if let Some(ids) = &patch.domain_ids {
            replace_links(&tx, "license_licensedomain_link", "domain_id", &key, ids)?;
        }

        tx.commit()?;

        fetch_license(&conn, id)
    }

    fn remove(&self, id: &Uuid) -> Result<Option<License>> {
        let conn = self.conn();
        let Some(license) = fetch_license(&conn, id)? else {
            return Ok(None);
        };
        delete_one::<License>(&conn, id)?;
        Ok(Some(license))
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        hashed_password: row.get(3)?,
        is_active: row.get(4)?,
        is_superuser: row.get(5)?,
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_datetime(&s)),
        last_used_at: row
            .get::<_, Option<String>>(6)?
            .map(|s| parse_datetime(&s)),
    })
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn licenses(&self) -> &dyn Repository<License> {
        self
    }

    fn domains(&self) -> &dyn Repository<LicenseDomain> {
        self
    }

    fn sources(&self) -> &dyn Repository<LicenseSource> {
        self
    }

    fn restrictions(&self) -> &dyn Repository<LicenseRestriction> {
        self
    }

    fn get_domain_by_name(&self, name: &str) -> Result<Option<LicenseDomain>> {
        fetch_page::<LicenseDomain>(
            &self.conn(),
            Page::new(None, Some(1)),
            &Filter::new().eq("name", name.to_string()),
        )
        .map(|rows| rows.into_iter().next())
    }

    fn get_source_by_name(&self, name: &str) -> Result<Option<LicenseSource>> {
        fetch_page::<LicenseSource>(
            &self.conn(),
            Page::new(None, Some(1)),
            &Filter::new().eq("name", name.to_string()),
        )
        .map(|rows| rows.into_iter().next())
    }

    fn license_clauses(&self, license_id: &Uuid) -> Result<Vec<Clause>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT d.name, r.text
             FROM license_licenserestriction_link l
             JOIN licenserestriction r ON r.id = l.restriction_id
             JOIN licensedomain d ON d.id = r.domain_id
             WHERE l.license_id = ?1 AND r.approved = 1
             ORDER BY l.rowid",
        )?;

        let rows = stmt.query_map(params![license_id.to_string()], |row| {
            Ok(Clause {
                domain: row.get(0)?,
                text: row.get(1)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // User operations

    fn create_user(&self, user: &NewUser) -> Result<User> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO users (email, full_name, hashed_password, is_active, is_superuser)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.email,
                user.full_name,
                user.hashed_password,
                user.is_active,
                user.is_superuser,
            ],
        )
        .map_err(write_error)?;

        Ok(User {
            id: conn.last_insert_rowid(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            hashed_password: user.hashed_password.clone(),
            is_active: user.is_active,
            is_superuser: user.is_superuser,
        })
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, email, full_name, hashed_password, is_active, is_superuser
             FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, email, full_name, hashed_password, is_active, is_superuser
             FROM users WHERE email = ?1",
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, page: Page) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, email, full_name, hashed_password, is_active, is_superuser
             FROM users ORDER BY id LIMIT ?1 OFFSET ?2",
        )?;

        let rows = stmt.query_map(params![page.limit, page.skip], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn has_superuser(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE is_superuser = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
                    && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(Error::TokenLookupCollision)
            }
            Err(e) => Err(write_error(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn delete_expired_tokens(&self) -> Result<usize> {
        let rows = self.conn().execute(
            "DELETE FROM tokens WHERE expires_at IS NOT NULL AND expires_at < ?1",
            params![format_datetime(&Utc::now())],
        )?;
        Ok(rows)
    }
}
