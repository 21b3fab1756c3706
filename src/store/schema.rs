//! SQLite schema for the transactional store. WAL mode and a generous
//! page cache keep concurrent job reads off the write path; `WITHOUT
//! ROWID` clusters the primary-key-ordered tables that are always
//! looked up by their opaque id.

pub const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -64000;
PRAGMA temp_store = MEMORY;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS instruments (
    id TEXT PRIMARY KEY,
    instrument_type TEXT NOT NULL,
    symbol TEXT NOT NULL,
    exchange TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_instruments_symbol ON instruments(symbol);

CREATE TABLE IF NOT EXISTS instrument_identifiers (
    instrument_id TEXT NOT NULL REFERENCES instruments(id),
    identifier_type TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (instrument_id, identifier_type)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_identifiers_value ON instrument_identifiers(identifier_type, value);

CREATE TABLE IF NOT EXISTS markets (
    condition_id TEXT PRIMARY KEY,
    question TEXT NOT NULL,
    outcomes_json TEXT NOT NULL,
    outcome_tokens_json TEXT NOT NULL,
    expiry TEXT,
    last_prices_json TEXT NOT NULL,
    liquidity TEXT,
    volume TEXT,
    active INTEGER NOT NULL,
    last_updated_block INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_markets_active ON markets(active);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    document_type TEXT NOT NULL,
    source_id TEXT NOT NULL UNIQUE,
    source_url TEXT NOT NULL,
    title TEXT NOT NULL,
    published_at TEXT,
    status TEXT NOT NULL,
    storage_path TEXT,
    content_hash TEXT,
    error_message TEXT,
    downloaded_at TEXT,
    parsed_at TEXT,
    created_at TEXT NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_documents_status_type ON documents(status, document_type, created_at);

CREATE TABLE IF NOT EXISTS document_contents (
    document_id TEXT PRIMARY KEY REFERENCES documents(id),
    full_text TEXT NOT NULL,
    sections_json TEXT NOT NULL,
    word_count INTEGER NOT NULL
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS document_instrument_links (
    document_id TEXT NOT NULL REFERENCES documents(id),
    instrument_id TEXT NOT NULL REFERENCES instruments(id),
    relevance_score REAL NOT NULL,
    match_method TEXT NOT NULL,
    PRIMARY KEY (document_id, instrument_id)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_doc_links_instrument ON document_instrument_links(instrument_id);

CREATE TABLE IF NOT EXISTS facts (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES documents(id),
    fact_type TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    evidence_json TEXT NOT NULL,
    confidence REAL NOT NULL,
    severity TEXT NOT NULL,
    created_at TEXT NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_facts_document ON facts(document_id);

CREATE TABLE IF NOT EXISTS orderbook_snapshots (
    market_id TEXT NOT NULL,
    outcome TEXT NOT NULL,
    bids_json TEXT NOT NULL,
    asks_json TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    PRIMARY KEY (market_id, outcome)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS orderbook_events (
    id TEXT PRIMARY KEY,
    market_id TEXT NOT NULL,
    outcome TEXT NOT NULL,
    ts TEXT NOT NULL,
    best_bid REAL,
    best_ask REAL,
    mid REAL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_ob_events_range ON orderbook_events(market_id, outcome, ts);

CREATE TABLE IF NOT EXISTS trade_events (
    id TEXT PRIMARY KEY,
    market_id TEXT NOT NULL,
    outcome TEXT NOT NULL,
    ts TEXT NOT NULL,
    price REAL NOT NULL,
    size REAL NOT NULL
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_trade_events_range ON trade_events(market_id, outcome, ts);

CREATE TABLE IF NOT EXISTS candles (
    instrument_id TEXT NOT NULL,
    interval TEXT NOT NULL,
    start_time TEXT NOT NULL,
    source TEXT NOT NULL,
    end_time TEXT NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    volume REAL NOT NULL,
    forward_filled INTEGER NOT NULL,
    PRIMARY KEY (instrument_id, interval, start_time, source)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS etf_metrics (
    id TEXT PRIMARY KEY,
    instrument_id TEXT NOT NULL REFERENCES instruments(id),
    as_of_date TEXT NOT NULL,
    source_type TEXT NOT NULL,
    nav REAL,
    market_price REAL,
    premium_discount_bps REAL,
    shares_outstanding REAL,
    net_flow REAL,
    ap_concentration_hhi REAL,
    top_ap_share REAL,
    created_at TEXT NOT NULL,
    UNIQUE (instrument_id, as_of_date, source_type)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_etf_metrics_instrument ON etf_metrics(instrument_id, as_of_date DESC);

CREATE TABLE IF NOT EXISTS signals (
    id TEXT PRIMARY KEY,
    instrument_id TEXT NOT NULL REFERENCES instruments(id),
    signal_type TEXT NOT NULL,
    severity TEXT NOT NULL,
    score REAL NOT NULL,
    confidence REAL NOT NULL,
    reason TEXT NOT NULL,
    evidence_json TEXT NOT NULL,
    computed_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    UNIQUE (instrument_id, signal_type)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_signals_active ON signals(expires_at, instrument_id);

CREATE TABLE IF NOT EXISTS instrument_relationships (
    instrument_id TEXT NOT NULL REFERENCES instruments(id),
    related_instrument_id TEXT NOT NULL REFERENCES instruments(id),
    relationship_type TEXT NOT NULL,
    confidence REAL NOT NULL,
    PRIMARY KEY (instrument_id, related_instrument_id, relationship_type)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_relationships_instrument ON instrument_relationships(instrument_id, relationship_type);

CREATE TABLE IF NOT EXISTS backfill_status (
    market_id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    trade_events_count INTEGER NOT NULL DEFAULT 0,
    earliest_ts TEXT,
    latest_ts TEXT,
    error_message TEXT,
    updated_at TEXT NOT NULL
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS sync_watermarks (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
) WITHOUT ROWID;
"#;

pub fn initialize(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
