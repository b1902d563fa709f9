//! Catalog store adapter: full-table read and full-table replace.
//!
//! [`CsvFileStore`] keeps the sheet as a CSV file. Two decorators layer the
//! read policy on top of any store:
//!
//! - [`RetryingStore`] retries transient read failures with increasing
//!   delays and surfaces the last error once the attempts run out. It never
//!   turns a failed read into an empty table.
//! - [`CachedStore`] serves reads from memory for a freshness window and drops
//!   the cached copy before any write returns.

use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use crate::{
    config::Config,
    error::StoreError,
    io_utils,
    record::{CATALOG_HEADERS, CatalogRow, Wine},
};

/// Whole-table access to the catalog. There is no row-level update.
pub trait CatalogStore {
    fn read(&self) -> Result<Vec<Wine>, StoreError>;
    fn replace_all(&self, wines: &[Wine]) -> Result<(), StoreError>;
}

/// The store stack used by the command line.
pub type DefaultStore = CachedStore<RetryingStore<CsvFileStore>>;

pub fn open_default_store(config: &Config) -> DefaultStore {
    CachedStore::new(
        RetryingStore::new(CsvFileStore::new(&config.catalog), config.read_backoff()),
        config.cache_ttl(),
    )
}

#[derive(Debug, Clone)]
pub struct CsvFileStore {
    path: PathBuf,
}

impl CsvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogStore for CsvFileStore {
    fn read(&self) -> Result<Vec<Wine>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("Catalog {:?} does not exist yet; starting empty", self.path);
                return Ok(Vec::new());
            }
            Err(err) => return Err(classify_io_error(&self.path, err)),
        };
        let mut reader =
            io_utils::open_csv_reader(BufReader::new(file), io_utils::DEFAULT_CSV_DELIMITER);
        let mut wines = Vec::new();
        for (row_idx, row) in reader.deserialize::<CatalogRow>().enumerate() {
            let row = row.map_err(|err| classify_csv_error(&self.path, row_idx + 2, err))?;
            wines.push(Wine::from(row));
        }
        debug!("Read {} wine(s) from {:?}", wines.len(), self.path);
        Ok(wines)
    }

    fn replace_all(&self, wines: &[Wine]) -> Result<(), StoreError> {
        io_utils::replace_csv_file(&self.path, |writer| {
            writer.write_record(CATALOG_HEADERS)?;
            for wine in wines {
                writer.serialize(CatalogRow::from(wine))?;
            }
            Ok(())
        })
        .map_err(|err| StoreError::Write(format!("{err:#}")))?;
        debug!("Wrote {} wine(s) to {:?}", wines.len(), self.path);
        Ok(())
    }
}

fn classify_io_error(path: &Path, err: io::Error) -> StoreError {
    let message = format!("{path:?}: {err}");
    match err.kind() {
        io::ErrorKind::Interrupted
        | io::ErrorKind::TimedOut
        | io::ErrorKind::WouldBlock
        | io::ErrorKind::ResourceBusy => StoreError::Transient(message),
        _ => StoreError::Permanent(message),
    }
}

fn classify_csv_error(path: &Path, line: usize, err: csv::Error) -> StoreError {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(io_err) => classify_io_error(path, io_err),
        _ => StoreError::Permanent(format!("{path:?} row {line}: {message}")),
    }
}

#[derive(Debug)]
pub struct RetryingStore<S> {
    inner: S,
    backoff: Vec<Duration>,
}

impl<S: CatalogStore> RetryingStore<S> {
    pub fn new(inner: S, backoff: Vec<Duration>) -> Self {
        Self { inner, backoff }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: CatalogStore> CatalogStore for RetryingStore<S> {
    fn read(&self) -> Result<Vec<Wine>, StoreError> {
        let mut delays = self.backoff.iter();
        loop {
            match self.inner.read() {
                Ok(wines) => return Ok(wines),
                Err(err) if err.is_transient() => match delays.next() {
                    Some(delay) => {
                        warn!("{err}; retrying in {} ms", delay.as_millis());
                        thread::sleep(*delay);
                    }
                    None => return Err(err),
                },
                Err(err) => return Err(err),
            }
        }
    }

    fn replace_all(&self, wines: &[Wine]) -> Result<(), StoreError> {
        self.inner.replace_all(wines)
    }
}

#[derive(Debug)]
struct CachedRead {
    fetched_at: Instant,
    wines: Vec<Wine>,
}

#[derive(Debug)]
pub struct CachedStore<S> {
    inner: S,
    ttl: Duration,
    cached: Mutex<Option<CachedRead>>,
}

impl<S: CatalogStore> CachedStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cached: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn invalidate(&self) {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl<S: CatalogStore> CatalogStore for CachedStore<S> {
    fn read(&self) -> Result<Vec<Wine>, StoreError> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = cached.as_ref()
            && entry.fetched_at.elapsed() < self.ttl
        {
            return Ok(entry.wines.clone());
        }
        let wines = self.inner.read()?;
        *cached = Some(CachedRead {
            fetched_at: Instant::now(),
            wines: wines.clone(),
        });
        Ok(wines)
    }

    fn replace_all(&self, wines: &[Wine]) -> Result<(), StoreError> {
        let outcome = self.inner.replace_all(wines);
        self.invalidate();
        outcome
    }
}
