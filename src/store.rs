// ==============================================================================
// store.rs - Variant Annotation Store
// ==============================================================================
// Description: Single-file ordered store mapping VariantKey -> VariantProperties
// Author: Matt Barham
// Created: 2025-11-12
// Modified: 2026-10-19
// Version: 2.0.0
// ==============================================================================
// Layout (SQLite):
//   alleles   (chromosome, position, ref_allele, alt_allele) -> properties BLOB
//             WITHOUT ROWID, so rows live in key order inside the primary B-tree
//   resources one row per ingested resource (build ledger)
//   metadata  schema version, build id, creation time
// ==============================================================================

use chrono::Utc;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::merge::merge;
use crate::models::{FrequencySource, PathogenicitySource, VariantKey, VariantProperties};

/// Bumped whenever the encoding of [`VariantProperties`] changes incompatibly
pub const SCHEMA_VERSION: u32 = 1;

/// Writes are grouped into transactions of this many keys
const COMMIT_BATCH: u64 = 100_000;

const KEY_SCHEMA_VERSION: &str = "schema_version";
const KEY_BUILD_ID: &str = "build_id";
const KEY_CREATED_AT: &str = "created_at";

const UPSERT_SQL: &str = "INSERT INTO alleles (chromosome, position, ref_allele, alt_allele, properties)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (chromosome, position, ref_allele, alt_allele)
     DO UPDATE SET properties = merge_properties(properties, excluded.properties)";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode/decode variant properties: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Store schema version {found} does not match supported version {expected}")]
    SchemaMismatch { found: String, expected: u32 },

    #[error("Resource '{0}' has already been ingested into this store")]
    DuplicateResource(String),

    #[error("Store is read-only: {0:?}")]
    ReadOnly(PathBuf),
}

/// Ledger entry for one ingested resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceEntry {
    pub name: String,
    pub version: String,
    pub path: String,
    pub sha256: String,
    pub processed: u64,
    pub retained: u64,
    pub frequency_sources: Vec<FrequencySource>,
    pub pathogenicity_sources: Vec<PathogenicitySource>,
    /// RFC 3339 timestamp
    pub ingested_at: String,
}

/// The persistent variant annotation store
pub struct VariantStore {
    conn: Connection,
    path: PathBuf,
    read_only: bool,
    in_transaction: bool,
    pending_writes: u64,
}

impl VariantStore {
    /// Open or create a store for writing
    ///
    /// The connection is tuned for a single long bulk load: no rollback
    /// journal (no old page versions are retained), no fsync, exclusive lock.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        info!("Opening variant store for build: {:?}", path);

        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "PRAGMA page_size = 32768;
             PRAGMA journal_mode = OFF;
             PRAGMA synchronous = OFF;
             PRAGMA cache_size = -1000000;
             PRAGMA locking_mode = EXCLUSIVE;
             PRAGMA temp_store = MEMORY;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS alleles (
                chromosome INTEGER NOT NULL,
                position INTEGER NOT NULL,
                ref_allele TEXT NOT NULL,
                alt_allele TEXT NOT NULL,
                properties BLOB NOT NULL,
                PRIMARY KEY (chromosome, position, ref_allele, alt_allele)
             ) WITHOUT ROWID;
             CREATE TABLE IF NOT EXISTS resources (
                name TEXT PRIMARY KEY,
                version TEXT NOT NULL,
                path TEXT NOT NULL,
                sha256 TEXT NOT NULL,
                processed INTEGER NOT NULL,
                retained INTEGER NOT NULL,
                frequency_sources TEXT NOT NULL,
                pathogenicity_sources TEXT NOT NULL,
                ingested_at TEXT NOT NULL
             );",
        )?;

        register_merge_function(&conn)?;

        let store = Self {
            conn,
            path,
            read_only: false,
            in_transaction: false,
            pending_writes: 0,
        };

        match store.metadata(KEY_SCHEMA_VERSION)? {
            Some(version) => check_schema_version(&version)?,
            None => {
                store.set_metadata(KEY_SCHEMA_VERSION, &SCHEMA_VERSION.to_string())?;
                store.set_metadata(KEY_BUILD_ID, &Uuid::new_v4().to_string())?;
                store.set_metadata(KEY_CREATED_AT, &Utc::now().to_rfc3339())?;
                info!("Initialized new variant store (schema version {})", SCHEMA_VERSION);
            }
        }

        Ok(store)
    }

    /// Open a finished store for point lookups
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let store = Self {
            conn,
            path,
            read_only: true,
            in_transaction: false,
            pending_writes: 0,
        };

        let version = store
            .metadata(KEY_SCHEMA_VERSION)?
            .unwrap_or_else(|| "missing".to_string());
        check_schema_version(&version)?;

        Ok(store)
    }

    /// Insert `properties` for `key`, or merge them into the stored value
    ///
    /// Each call is a single statement, so a key is never visible half-merged.
    pub fn upsert(&mut self, key: &VariantKey, properties: &VariantProperties) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly(self.path.clone()));
        }
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN")?;
            self.in_transaction = true;
        }

        let encoded = bincode::serialize(properties)?;
        {
            let mut stmt = self.conn.prepare_cached(UPSERT_SQL)?;
            stmt.execute(params![
                key.chromosome,
                key.position,
                key.ref_allele,
                key.alt_allele,
                encoded,
            ])?;
        }

        self.pending_writes += 1;
        if self.pending_writes >= COMMIT_BATCH {
            self.commit()?;
        }
        Ok(())
    }

    /// Commit any open write transaction
    pub fn commit(&mut self) -> Result<(), StoreError> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT")?;
            debug!("Committed {} store writes", self.pending_writes);
            self.in_transaction = false;
            self.pending_writes = 0;
        }
        Ok(())
    }

    /// Point lookup by key
    pub fn get(&self, key: &VariantKey) -> Result<Option<VariantProperties>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT properties FROM alleles
             WHERE chromosome = ?1 AND position = ?2 AND ref_allele = ?3 AND alt_allele = ?4",
        )?;
        let encoded: Option<Vec<u8>> = stmt
            .query_row(
                params![key.chromosome, key.position, key.ref_allele, key.alt_allele],
                |row| row.get(0),
            )
            .optional()?;

        match encoded {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Number of distinct keys in the store
    pub fn count(&self) -> Result<u64, StoreError> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM alleles", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn metadata(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set_metadata(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO metadata (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Identifier assigned when the store was created
    pub fn build_id(&self) -> Result<Option<String>, StoreError> {
        self.metadata(KEY_BUILD_ID)
    }

    pub fn has_resource(&self, name: &str) -> Result<bool, StoreError> {
        let found: Option<String> = self
            .conn
            .query_row("SELECT name FROM resources WHERE name = ?1", params![name], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    /// Add a resource to the build ledger; each name may be recorded once
    pub fn record_resource(&mut self, entry: &ResourceEntry) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly(self.path.clone()));
        }
        if self.has_resource(&entry.name)? {
            return Err(StoreError::DuplicateResource(entry.name.clone()));
        }
        self.commit()?;

        self.conn.execute(
            "INSERT INTO resources (name, version, path, sha256, processed, retained,
                                    frequency_sources, pathogenicity_sources, ingested_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.name,
                entry.version,
                entry.path,
                entry.sha256,
                entry.processed,
                entry.retained,
                join_tags(entry.frequency_sources.iter().map(|s| s.tag())),
                join_tags(entry.pathogenicity_sources.iter().map(|s| s.tag())),
                entry.ingested_at,
            ],
        )?;
        Ok(())
    }

    /// Ledger entries in ingestion order
    pub fn resources(&self) -> Result<Vec<ResourceEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, version, path, sha256, processed, retained,
                    frequency_sources, pathogenicity_sources, ingested_at
             FROM resources ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            let frequency_sources: String = row.get(6)?;
            let pathogenicity_sources: String = row.get(7)?;
            Ok(ResourceEntry {
                name: row.get(0)?,
                version: row.get(1)?,
                path: row.get(2)?,
                sha256: row.get(3)?,
                processed: row.get(4)?,
                retained: row.get(5)?,
                frequency_sources: split_tags(&frequency_sources),
                pathogenicity_sources: split_tags(&pathogenicity_sources),
                ingested_at: row.get(8)?,
            })
        })?;

        let mut entries = Vec::new();
        for entry in rows {
            entries.push(entry?);
        }
        Ok(entries)
    }

    /// Commit, refresh planner statistics and close the file
    pub fn close(mut self) -> Result<(), StoreError> {
        self.commit()?;
        if !self.read_only {
            self.conn.execute_batch("PRAGMA optimize;")?;
        }
        let path = self.path.clone();
        self.conn.close().map_err(|(_, e)| e)?;
        info!("Closed variant store {:?}", path);
        Ok(())
    }
}

/// Install `merge_properties(existing, incoming)` on the connection
fn register_merge_function(conn: &Connection) -> Result<(), StoreError> {
    conn.create_scalar_function(
        "merge_properties",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let existing: Vec<u8> = ctx.get(0)?;
            let incoming: Vec<u8> = ctx.get(1)?;
            if existing == incoming {
                return Ok(existing);
            }

            let existing: VariantProperties = bincode::deserialize(&existing)
                .map_err(|e| rusqlite::Error::UserFunctionError(e))?;
            let incoming: VariantProperties = bincode::deserialize(&incoming)
                .map_err(|e| rusqlite::Error::UserFunctionError(e))?;

            bincode::serialize(&merge(existing, incoming))
                .map_err(|e| rusqlite::Error::UserFunctionError(e))
        },
    )?;
    Ok(())
}

fn check_schema_version(found: &str) -> Result<(), StoreError> {
    if found.parse::<u32>().ok() != Some(SCHEMA_VERSION) {
        return Err(StoreError::SchemaMismatch {
            found: found.to_string(),
            expected: SCHEMA_VERSION,
        });
    }
    Ok(())
}

fn join_tags<'a>(tags: impl Iterator<Item = &'a str>) -> String {
    tags.collect::<Vec<_>>().join(",")
}

fn split_tags<T: std::str::FromStr>(joined: &str) -> Vec<T> {
    joined
        .split(',')
        .filter(|tag| !tag.is_empty())
        .filter_map(|tag| tag.parse().ok())
        .collect()
}
