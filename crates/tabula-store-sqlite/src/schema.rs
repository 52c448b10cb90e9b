//! SQL schema for the Tabula SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One document per activity. Fields and relationship edges are embedded;
-- edges are duplicated on both activities they connect.
CREATE TABLE IF NOT EXISTS activities (
    activity_id        TEXT PRIMARY KEY,
    organization_id    TEXT NOT NULL,
    created_by         TEXT NOT NULL,
    name               TEXT NOT NULL,
    description        TEXT,
    fields_json        TEXT NOT NULL DEFAULT '[]',
    relationships_json TEXT NOT NULL DEFAULT '[]',
    created_at         TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at         TEXT NOT NULL,
    deleted_at         TEXT             -- set once; rows are never deleted
);

CREATE INDEX IF NOT EXISTS activities_org_idx
    ON activities(organization_id, created_at)
    WHERE deleted_at IS NULL;

PRAGMA user_version = 1;
";
