//! Data sources for the sample register
//!
//! - [`FileSource`]: a local CSV file
//! - [`HttpSource`]: a CSV download over HTTP(S)
//! - [`SheetExport`]: the CSV export URL of a published spreadsheet tab
//! - [`CachedSource`]: TTL memoization of the parsed table

use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use labdash_core::{DataSource, FetchError, Table};

use crate::csv;

const USER_AGENT: &str = concat!("labdash/", env!("CARGO_PKG_VERSION"));
const SHEETS_BASE: &str = "https://docs.google.com/spreadsheets/d/";

// ============================================================================
// File
// ============================================================================

/// CSV file on the local filesystem
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        Ok(std::fs::read(&self.path)?)
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// CSV download with a blocking client
#[derive(Clone, Debug)]
pub struct HttpSource {
    url: Url,
    http: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { url, http })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl DataSource for HttpSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        debug!(url = %self.url, "downloading");
        let resp = self
            .http
            .get(self.url.clone())
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Published spreadsheet tab exported as CSV
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetExport {
    pub sheet_id: String,
    pub sheet_name: String,
}

impl SheetExport {
    pub fn new(sheet_id: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }

    /// `.../d/{id}/gviz/tq?tqx=out:csv&sheet={name}` with both parts encoded
    pub fn url(&self) -> Result<Url, FetchError> {
        let mut url = Url::parse(SHEETS_BASE).map_err(|e| FetchError::Malformed(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| FetchError::Malformed(format!("cannot extend {SHEETS_BASE}")))?
            .pop_if_empty()
            .push(&self.sheet_id)
            .push("gviz")
            .push("tq");
        url.query_pairs_mut()
            .append_pair("tqx", "out:csv")
            .append_pair("sheet", &self.sheet_name);
        Ok(url)
    }

    pub fn into_source(self, timeout: Duration) -> Result<HttpSource, FetchError> {
        HttpSource::new(self.url()?, timeout)
    }
}

/// Pick a source for a location: `http(s)://` URLs are downloaded, anything
/// else is read as a file path.
pub fn open_location(location: &str, timeout: Duration) -> Result<Box<dyn DataSource>, FetchError> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let url = Url::parse(location).map_err(|e| FetchError::Malformed(format!("{location}: {e}")))?;
        Ok(Box::new(HttpSource::new(url, timeout)?))
    } else {
        Ok(Box::new(FileSource::new(location)))
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Parse fetched bytes as a CSV table
pub fn table_from_bytes(bytes: &[u8]) -> Result<Table, FetchError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(FetchError::Empty);
    }
    let text = std::str::from_utf8(bytes).map_err(|e| FetchError::Malformed(format!("not UTF-8: {e}")))?;
    Ok(csv::parse_table(text)?)
}

/// Fetch and parse in one step
pub fn load_table(source: &dyn DataSource) -> Result<Table, FetchError> {
    let bytes = source.fetch()?;
    let table = table_from_bytes(&bytes)?;
    info!(
        source = %source.describe(),
        rows = table.len(),
        columns = table.columns().len(),
        "table loaded"
    );
    Ok(table)
}

// ============================================================================
// Cache
// ============================================================================

struct CachedTable {
    stored_at: Instant,
    table: Arc<Table>,
}

/// Reuses the last parsed table while it is younger than the TTL.
///
/// The lock is held across a refresh, so concurrent callers wait for one
/// fetch instead of racing. Failed fetches leave the previous entry alone.
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    slot: Mutex<Option<CachedTable>>,
}

impl<S: DataSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Current table, fetching when the cache is empty or stale
    pub fn snapshot(&self) -> Result<Arc<Table>, FetchError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = slot.as_ref() {
            if hit.stored_at.elapsed() < self.ttl {
                debug!(source = %self.inner.describe(), "cache hit");
                return Ok(Arc::clone(&hit.table));
            }
        }

        let table = Arc::new(load_table(&self.inner)?);
        *slot = Some(CachedTable {
            stored_at: Instant::now(),
            table: Arc::clone(&table),
        });
        Ok(table)
    }

    /// Drop the cached table; the next snapshot fetches
    pub fn invalidate(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labdash_core::CellValue;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        body: &'static str,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(body: &'static str) -> Self {
            Self {
                body,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DataSource for Counting {
        fn describe(&self) -> String {
            "counting".into()
        }

        fn fetch(&self) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.as_bytes().to_vec())
        }
    }

    struct Failing;

    impl DataSource for Failing {
        fn describe(&self) -> String {
            "failing".into()
        }

        fn fetch(&self) -> Result<Vec<u8>, FetchError> {
            Err(FetchError::Status { status: 503 })
        }
    }

    #[test]
    fn sheet_export_url() {
        let url = SheetExport::new("1AbC_x", "REGISTRO").url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://docs.google.com/spreadsheets/d/1AbC_x/gviz/tq?tqx=out%3Acsv&sheet=REGISTRO"
        );
    }

    #[test]
    fn sheet_export_encodes_name() {
        let url = SheetExport::new("id", "Registro 2024/Análises").url().unwrap();
        let sheet = url
            .query_pairs()
            .find(|(k, _)| k == "sheet")
            .map(|(_, v)| v.into_owned());
        assert_eq!(sheet.as_deref(), Some("Registro 2024/Análises"));
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn open_location_picks_by_scheme() {
        let timeout = Duration::from_secs(5);
        let http = open_location("https://example.org/data.csv", timeout).unwrap();
        assert_eq!(http.describe(), "https://example.org/data.csv");
        let file = open_location("data/register.csv", timeout).unwrap();
        assert_eq!(file.describe(), "data/register.csv");
    }

    #[test]
    fn blank_body_is_empty() {
        assert!(matches!(table_from_bytes(b""), Err(FetchError::Empty)));
        assert!(matches!(table_from_bytes(b" \r\n"), Err(FetchError::Empty)));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        assert!(matches!(
            table_from_bytes(&[b'a', b'\n', 0xff, 0xfe]),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn syntax_error_is_malformed() {
        let err = table_from_bytes(b"a,b\n\"open,1\n").unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn cache_reuses_table_within_ttl() {
        let cached = CachedSource::new(Counting::new("Qtdade\n2\n"), Duration::from_secs(60));
        let first = cached.snapshot().unwrap();
        let second = cached.snapshot().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cached.inner().calls(), 1);
        assert_eq!(first.row(0).unwrap().get("Qtdade"), &CellValue::Number(2.0));
    }

    #[test]
    fn zero_ttl_always_refetches() {
        let cached = CachedSource::new(Counting::new("a\n1\n"), Duration::ZERO);
        cached.snapshot().unwrap();
        cached.snapshot().unwrap();
        assert_eq!(cached.inner().calls(), 2);
    }

    #[test]
    fn invalidate_forces_refetch() {
        let cached = CachedSource::new(Counting::new("a\n1\n"), Duration::from_secs(60));
        cached.snapshot().unwrap();
        cached.invalidate();
        cached.snapshot().unwrap();
        assert_eq!(cached.inner().calls(), 2);
    }

    #[test]
    fn fetch_failure_propagates() {
        let cached = CachedSource::new(Failing, Duration::from_secs(60));
        assert!(matches!(cached.snapshot(), Err(FetchError::Status { status: 503 })));
    }
}
