//! SQL schema for the SQLite contact ledger.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS campaigns (
    campaign_id          TEXT PRIMARY KEY,
    tenant_id            TEXT NOT NULL,
    name                 TEXT NOT NULL,
    status               TEXT NOT NULL,   -- CampaignStatus, snake_case
    max_concurrent_calls INTEGER NOT NULL CHECK (max_concurrent_calls >= 1),
    max_retries          INTEGER NOT NULL CHECK (max_retries >= 0),
    retry_delay_hours    REAL    NOT NULL CHECK (retry_delay_hours BETWEEN 0 AND 8760),
    assistant_id         TEXT,
    phone_number_id      TEXT,
    sms_from_number      TEXT,
    -- Derived from `contacts`; refreshed in the transaction that changes them.
    total_contacts       INTEGER NOT NULL DEFAULT 0,
    contacts_called      INTEGER NOT NULL DEFAULT 0,
    contacts_answered    INTEGER NOT NULL DEFAULT 0,
    contacts_failed      INTEGER NOT NULL DEFAULT 0,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS calling_schedules (
    schedule_id TEXT PRIMARY KEY,
    campaign_id TEXT NOT NULL REFERENCES campaigns(campaign_id),
    day_of_week INTEGER NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
    start_time  TEXT NOT NULL,   -- HH:MM:SS, contact-local
    end_time    TEXT NOT NULL,
    is_active   INTEGER NOT NULL DEFAULT 1,
    CHECK (start_time < end_time)
);

CREATE TABLE IF NOT EXISTS triggers (
    trigger_id         TEXT PRIMARY KEY,
    campaign_id        TEXT NOT NULL REFERENCES campaigns(campaign_id),
    intent_description TEXT NOT NULL,
    message_template   TEXT NOT NULL,
    priority           INTEGER NOT NULL,
    is_active          INTEGER NOT NULL DEFAULT 1,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contacts (
    contact_id      TEXT PRIMARY KEY,
    campaign_id     TEXT NOT NULL REFERENCES campaigns(campaign_id),
    phone_number    TEXT NOT NULL,   -- E.164
    first_name      TEXT,
    last_name       TEXT,
    email           TEXT,
    custom_fields   TEXT NOT NULL DEFAULT '{}',
    area_code       TEXT,
    timezone        TEXT,            -- IANA name; NULL means unrestricted
    status          TEXT NOT NULL DEFAULT 'pending',
    attempt_count   INTEGER NOT NULL DEFAULT 0,
    last_attempt_at TEXT,
    next_attempt_at TEXT,
    call_result     TEXT,
    created_at      TEXT NOT NULL,
    UNIQUE (campaign_id, phone_number)
);

-- Append-only apart from settling the outcome once and the message flag.
CREATE TABLE IF NOT EXISTS call_attempts (
    attempt_id       TEXT PRIMARY KEY,
    campaign_id      TEXT NOT NULL REFERENCES campaigns(campaign_id),
    contact_id       TEXT NOT NULL REFERENCES contacts(contact_id) ON DELETE CASCADE,
    call_handle      TEXT NOT NULL UNIQUE,
    attempt_number   INTEGER NOT NULL,
    started_at       TEXT NOT NULL,
    ended_at         TEXT,
    duration_seconds INTEGER,
    transcript       TEXT,
    summary          TEXT,
    recording_url    TEXT,
    ended_reason     TEXT,
    outcome          TEXT,
    message_sent     INTEGER NOT NULL DEFAULT 0,
    trigger_fired    TEXT
);

-- A trigger fires at most once per contact, across all attempts.
CREATE TABLE IF NOT EXISTS fired_triggers (
    contact_id TEXT NOT NULL REFERENCES contacts(contact_id) ON DELETE CASCADE,
    trigger_id TEXT NOT NULL REFERENCES triggers(trigger_id),
    attempt_id TEXT NOT NULL,
    fired_at   TEXT NOT NULL,
    PRIMARY KEY (contact_id, trigger_id)
);

CREATE INDEX IF NOT EXISTS contacts_dispatch_idx  ON contacts(campaign_id, status, next_attempt_at);
CREATE INDEX IF NOT EXISTS contacts_calling_idx   ON contacts(status, last_attempt_at);
CREATE INDEX IF NOT EXISTS attempts_contact_idx   ON call_attempts(contact_id);
CREATE INDEX IF NOT EXISTS attempts_campaign_idx  ON call_attempts(campaign_id, started_at);
CREATE INDEX IF NOT EXISTS triggers_campaign_idx  ON triggers(campaign_id, priority);
CREATE INDEX IF NOT EXISTS schedules_campaign_idx ON calling_schedules(campaign_id);

PRAGMA user_version = 1;
";

/// Recompute a campaign's aggregate counters from its contacts.
///
/// `?1` is the campaign id, `?2` the `updated_at` timestamp.
pub const REFRESH_COUNTERS: &str = "
UPDATE campaigns SET
    total_contacts    = (SELECT COUNT(*) FROM contacts WHERE campaign_id = ?1),
    contacts_called   = (SELECT COUNT(*) FROM contacts
                         WHERE campaign_id = ?1 AND status IN ('completed', 'failed')),
    contacts_answered = (SELECT COUNT(*) FROM contacts
                         WHERE campaign_id = ?1 AND status = 'completed'),
    contacts_failed   = (SELECT COUNT(*) FROM contacts
                         WHERE campaign_id = ?1 AND status = 'failed'),
    updated_at        = ?2
WHERE campaign_id = ?1
";
