//! SQL schema for the memping SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS prompts (
    prompt_id     TEXT PRIMARY KEY,
    created_at    TEXT NOT NULL,               -- ISO 8601 UTC; server-assigned
    kind          TEXT NOT NULL,               -- 'text' | 'photo'
    text          TEXT,
    photo_url     TEXT,
    tag           TEXT,
    active        INTEGER NOT NULL DEFAULT 1,
    cooldown_days INTEGER NOT NULL DEFAULT 0 CHECK (cooldown_days >= 0),
    last_sent_at  TEXT,
    times_sent    INTEGER NOT NULL DEFAULT 0 CHECK (times_sent >= 0),
    CHECK ((kind = 'text'  AND text IS NOT NULL AND photo_url IS NULL)
        OR (kind = 'photo' AND photo_url IS NOT NULL AND text IS NULL)),
    CHECK ((times_sent = 0) = (last_sent_at IS NULL))
);

-- Append-only audit log. No foreign key: deliveries outlive their prompt.
CREATE TABLE IF NOT EXISTS deliveries (
    delivery_id TEXT PRIMARY KEY,
    prompt_id   TEXT NOT NULL,
    sent_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS prompts_created_idx    ON prompts(created_at);
CREATE INDEX IF NOT EXISTS prompts_active_idx     ON prompts(active);
CREATE INDEX IF NOT EXISTS deliveries_prompt_idx  ON deliveries(prompt_id);

PRAGMA user_version = 1;
";
