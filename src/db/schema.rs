/// Schema for the cache partitions and the fingerprint store.
pub const SCHEMA: &str = r#"
-- Partition metadata, one row per synced scope
CREATE TABLE IF NOT EXISTS cache_scopes (
    entity_type TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    window_end TEXT,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    entity_count INTEGER NOT NULL,
    PRIMARY KEY (entity_type, scope_key)
);

CREATE INDEX IF NOT EXISTS idx_cache_scopes_window
    ON cache_scopes(entity_type, window_end);

-- Cached entities (serialized JSON), one row per fetched item.
-- Keyed by position: a remote collection may repeat an id.
CREATE TABLE IF NOT EXISTS cache_entities (
    entity_type TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    position INTEGER NOT NULL,
    entity_key TEXT NOT NULL,
    data BLOB NOT NULL,
    PRIMARY KEY (entity_type, scope_key, position)
);

-- Persisted key/value store for fingerprints and sync timestamps
CREATE TABLE IF NOT EXISTS fingerprints (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
