pub const SCHEMA: &str = r#"
-- Licenses generated by users
CREATE TABLE IF NOT EXISTS license (
    id TEXT PRIMARY KEY,
    timestamp TEXT NOT NULL,
    name TEXT NOT NULL,
    license TEXT NOT NULL,             -- family wire name (RAIL, OpenRAIL, ResearchRAIL)
    application INTEGER NOT NULL DEFAULT 0,
    model INTEGER NOT NULL DEFAULT 0,
    sourcecode INTEGER NOT NULL DEFAULT 0,
    data INTEGER NOT NULL DEFAULT 0,
    git_commit_hash TEXT NOT NULL      -- template revision at creation ('head' if unversioned)
);

-- Categories restrictions are grouped under
CREATE TABLE IF NOT EXISTS licensedomain (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Attribution for restrictions
CREATE TABLE IF NOT EXISTS licensesource (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Restriction clauses; only approved rows are visible to the public
CREATE TABLE IF NOT EXISTS licenserestriction (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    source_id INTEGER NOT NULL REFERENCES licensesource(id),
    domain_id INTEGER NOT NULL REFERENCES licensedomain(id),
    approved INTEGER NOT NULL DEFAULT 0
);

-- License <-> restriction; rowid order is association order
CREATE TABLE IF NOT EXISTS license_licenserestriction_link (
    license_id TEXT NOT NULL REFERENCES license(id) ON DELETE CASCADE,
    restriction_id INTEGER NOT NULL REFERENCES licenserestriction(id),
    PRIMARY KEY (license_id, restriction_id)
);

-- License <-> domains explicitly in scope
CREATE TABLE IF NOT EXISTS license_licensedomain_link (
    license_id TEXT NOT NULL REFERENCES license(id) ON DELETE CASCADE,
    domain_id INTEGER NOT NULL REFERENCES licensedomain(id),
    PRIMARY KEY (license_id, domain_id)
);

-- Administrative accounts
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL DEFAULT '',
    hashed_password TEXT NOT NULL,     -- argon2id hash with embedded salt
    is_active INTEGER NOT NULL DEFAULT 1,
    is_superuser INTEGER NOT NULL DEFAULT 0
);

-- Bearer credentials issued at login
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- short prefix for fast lookup
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_restriction_domain ON licenserestriction(domain_id);
CREATE INDEX IF NOT EXISTS idx_restriction_source ON licenserestriction(source_id);
CREATE INDEX IF NOT EXISTS idx_restriction_link_restriction ON license_licenserestriction_link(restriction_id);
CREATE INDEX IF NOT EXISTS idx_domain_link_domain ON license_licensedomain_link(domain_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
"#;
