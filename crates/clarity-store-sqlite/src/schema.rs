//! SQL schema for the Clarity SQLite store.
//!
//! Executed once at connection startup. Steps that only apply when upgrading
//! an older file are gated on `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS terms (
    term_id               TEXT PRIMARY KEY,
    term                  TEXT NOT NULL,
    base_definition       TEXT NOT NULL,
    category              TEXT,
    code_name             TEXT,
    tags                  TEXT NOT NULL DEFAULT '[]',   -- JSON array
    compliance_frameworks TEXT NOT NULL DEFAULT '[]',   -- JSON array
    created_by            TEXT,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL,
    updated_by            TEXT
);

CREATE TABLE IF NOT EXISTS term_contexts (
    context_id          TEXT PRIMARY KEY,
    term_id             TEXT NOT NULL REFERENCES terms(term_id) ON DELETE CASCADE,
    cluster             TEXT,
    system              TEXT,
    product             TEXT,
    context_definition  TEXT NOT NULL,
    business_rules      TEXT NOT NULL DEFAULT '[]',     -- JSON array
    compliance_required INTEGER NOT NULL DEFAULT 0,
    created_by          TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

-- Versions are strictly append-only and outlive the term they describe.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS term_versions (
    version_id     TEXT PRIMARY KEY,
    term_id        TEXT NOT NULL,
    version_number INTEGER NOT NULL,
    term_data      TEXT NOT NULL,   -- JSON snapshot document
    changed_by     TEXT,
    change_reason  TEXT,
    created_at     TEXT NOT NULL,
    UNIQUE (term_id, version_number),
    CHECK  (version_number >= 1)
);

CREATE TABLE IF NOT EXISTS clusters (
    cluster_id  TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    owner_id    TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS gap_analyses (
    gap_id            TEXT PRIMARY KEY,
    term_id           TEXT NOT NULL REFERENCES terms(term_id) ON DELETE CASCADE,
    gap_type          TEXT NOT NULL,   -- 'missing_context' | 'conflicting_definition' | 'outdated'
    affected_clusters TEXT NOT NULL,   -- JSON array, never empty
    severity          TEXT NOT NULL,   -- 'low' | 'medium' | 'high'
    description       TEXT NOT NULL,
    detected_at       TEXT NOT NULL,
    resolved_at       TEXT,
    resolved_by       TEXT,
    CHECK (json_array_length(affected_clusters) > 0)
);

CREATE TABLE IF NOT EXISTS term_usage_logs (
    term_id    TEXT NOT NULL REFERENCES terms(term_id) ON DELETE CASCADE,
    cluster    TEXT,
    user_id    TEXT,
    action     TEXT NOT NULL,   -- 'viewed' | 'searched' | 'referenced'
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS term_examples (
    example_id   TEXT PRIMARY KEY,
    term_id      TEXT NOT NULL REFERENCES terms(term_id) ON DELETE CASCADE,
    context_id   TEXT REFERENCES term_contexts(context_id) ON DELETE SET NULL,
    example_text TEXT NOT NULL,
    source       TEXT,
    created_by   TEXT,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS term_relationships (
    relationship_id   TEXT PRIMARY KEY,
    term_id           TEXT NOT NULL REFERENCES terms(term_id) ON DELETE CASCADE,
    related_term_id   TEXT NOT NULL REFERENCES terms(term_id) ON DELETE CASCADE,
    relationship_type TEXT NOT NULL,   -- 'synonym' | 'antonym' | 'related' | 'see_also' | 'parent' | 'child'
    created_by        TEXT,
    created_at        TEXT NOT NULL,
    UNIQUE (term_id, related_term_id, relationship_type),
    CHECK  (term_id != related_term_id)
);

-- Proposals survive the term they are about.
CREATE TABLE IF NOT EXISTS term_proposals (
    proposal_id   TEXT PRIMARY KEY,
    term_id       TEXT REFERENCES terms(term_id) ON DELETE SET NULL,
    proposal_type TEXT NOT NULL,   -- 'create' | 'update' | 'delete' | 'merge'
    proposed_data TEXT NOT NULL,   -- JSON object
    reason        TEXT,
    status        TEXT NOT NULL DEFAULT 'pending',
    proposed_by   TEXT,
    reviewed_by   TEXT,
    reviewed_at   TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS term_flags (
    flag_id     TEXT PRIMARY KEY,
    term_id     TEXT NOT NULL REFERENCES terms(term_id) ON DELETE CASCADE,
    flag_type   TEXT NOT NULL,     -- 'inconsistency' | 'outdated' | 'duplicate' | 'incorrect' | 'other'
    description TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'open',
    flagged_by  TEXT,
    resolved_by TEXT,
    resolved_at TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS onboarding_paths (
    path_id     TEXT PRIMARY KEY,
    role        TEXT NOT NULL,
    cluster     TEXT,
    term_ids    TEXT NOT NULL DEFAULT '[]',   -- JSON array of term ids, in reading order
    order_index INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_onboarding (
    user_id      TEXT PRIMARY KEY,
    completed_at TEXT NOT NULL
);

-- Full-text index over term names and definitions, kept in step with
-- `terms` by the triggers below.
CREATE VIRTUAL TABLE IF NOT EXISTS terms_fts USING fts5(
    term_id UNINDEXED,
    term,
    base_definition
);

CREATE TRIGGER IF NOT EXISTS terms_fts_insert AFTER INSERT ON terms BEGIN
    INSERT INTO terms_fts (term_id, term, base_definition)
    VALUES (new.term_id, new.term, new.base_definition);
END;

CREATE TRIGGER IF NOT EXISTS terms_fts_delete AFTER DELETE ON terms BEGIN
    DELETE FROM terms_fts WHERE term_id = old.term_id;
END;

CREATE TRIGGER IF NOT EXISTS terms_fts_update
AFTER UPDATE OF term, base_definition ON terms BEGIN
    DELETE FROM terms_fts WHERE term_id = old.term_id;
    INSERT INTO terms_fts (term_id, term, base_definition)
    VALUES (new.term_id, new.term, new.base_definition);
END;

CREATE INDEX IF NOT EXISTS terms_name_idx        ON terms(term);
CREATE INDEX IF NOT EXISTS contexts_term_idx     ON term_contexts(term_id);
CREATE INDEX IF NOT EXISTS contexts_cluster_idx  ON term_contexts(cluster);
CREATE INDEX IF NOT EXISTS gaps_detected_idx     ON gap_analyses(detected_at);
CREATE INDEX IF NOT EXISTS usage_user_idx        ON term_usage_logs(user_id, created_at);
CREATE INDEX IF NOT EXISTS usage_term_idx        ON term_usage_logs(term_id);
CREATE INDEX IF NOT EXISTS examples_term_idx     ON term_examples(term_id, created_at);
CREATE INDEX IF NOT EXISTS proposals_created_idx ON term_proposals(created_at);
CREATE INDEX IF NOT EXISTS flags_term_idx        ON term_flags(term_id);
CREATE INDEX IF NOT EXISTS paths_role_idx        ON onboarding_paths(role, order_index);
";

/// Schema version written by [`SCHEMA`].
pub const SCHEMA_VERSION: i64 = 2;

/// Fill the search index from rows written before it existed (version 1).
pub const REBUILD_SEARCH_INDEX: &str = "
DELETE FROM terms_fts;
INSERT INTO terms_fts (term_id, term, base_definition)
SELECT term_id, term, base_definition FROM terms;
";
