//! In-memory collaborators for tests.
//!
//! Each mock records every call so tests can assert on ordering and counts,
//! and can be told to fail specific operations.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use super::{Geocoder, OtpVerifier, StorageProvider, TableProvider};
use crate::api::error::ApiError;
use crate::types::{Coordinates, NearbyStore, UploadFile};

/// One recorded call against any mock, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Upload { bucket: String, path: String },
    Remove { bucket: String, paths: Vec<String> },
    Insert { table: String, record: Value },
    Select { table: String, column: String, value: String },
    Verify { phone: String, code: String },
    Geocode { address: String, country_code: String },
    Nearby { around: Coordinates, radius_m: u32 },
}

/// Shared call log so separate mocks can be checked for relative ordering
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<MockCall>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: MockCall) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.0.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Upload { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn inserts_into(&self, table: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Insert { table: t, record } if t == table => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }
}

/// Storage that keeps uploaded object paths in memory
#[derive(Default)]
pub struct MockStorage {
    pub log: CallLog,
    objects: Mutex<HashSet<String>>,
    /// Uploads whose path contains any of these fragments fail
    fail_fragments: Mutex<Vec<String>>,
}

impl MockStorage {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    /// Make every upload whose path contains `fragment` fail with a 500
    pub fn fail_uploads_containing(&self, fragment: &str) {
        self.fail_fragments.lock().unwrap().push(fragment.to_string());
    }

    pub fn objects(&self) -> HashSet<String> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageProvider for MockStorage {
    fn name(&self) -> &str {
        "mock-storage"
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        _file: &UploadFile,
        _upsert: bool,
    ) -> Result<(), ApiError> {
        self.log.push(MockCall::Upload {
            bucket: bucket.to_string(),
            path: path.to_string(),
        });
        let fails = self
            .fail_fragments
            .lock()
            .unwrap()
            .iter()
            .any(|f| path.contains(f.as_str()));
        if fails {
            return Err(ApiError::http(self.name(), 500, "upload rejected"));
        }
        self.objects.lock().unwrap().insert(path.to_string());
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("https://storage.test/{}/{}", bucket, path)
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), ApiError> {
        self.log.push(MockCall::Remove {
            bucket: bucket.to_string(),
            paths: paths.to_vec(),
        });
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }
}

/// Tables backed by in-memory row lists
#[derive(Default)]
pub struct MockTables {
    pub log: CallLog,
    rows: Mutex<HashMap<String, Vec<Value>>>,
    failing_tables: Mutex<HashSet<String>>,
    /// Table -> 1-based insert attempt that fails
    failing_attempts: Mutex<HashMap<String, usize>>,
    next_id: AtomicU64,
}

impl MockTables {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            next_id: AtomicU64::new(1),
            ..Default::default()
        }
    }

    /// Make every insert into `table` fail
    pub fn fail_inserts_into(&self, table: &str) {
        self.failing_tables.lock().unwrap().insert(table.to_string());
    }

    /// Make only the `nth` insert attempt into `table` fail (1-based)
    pub fn fail_nth_insert_into(&self, table: &str, nth: usize) {
        self.failing_attempts
            .lock()
            .unwrap()
            .insert(table.to_string(), nth);
    }

    /// Seed an existing row
    pub fn seed(&self, table: &str, row: Value) {
        self.rows
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.rows
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn store(&self, table: &str, mut record: Value) -> Result<Value, ApiError> {
        self.log.push(MockCall::Insert {
            table: table.to_string(),
            record: record.clone(),
        });
        let attempt = self.log.inserts_into(table).len();
        let fails_now = self.failing_attempts.lock().unwrap().get(table) == Some(&attempt);
        if fails_now || self.failing_tables.lock().unwrap().contains(table) {
            return Err(ApiError::http(self.name(), 409, "insert rejected"));
        }
        if let Value::Object(map) = &mut record {
            if !map.contains_key("id") {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst).max(1);
                map.insert("id".to_string(), Value::from(id));
            }
        }
        self.seed(table, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl TableProvider for MockTables {
    fn name(&self) -> &str {
        "mock-tables"
    }

    async fn insert(&self, table: &str, record: Value) -> Result<(), ApiError> {
        self.store(table, record).map(|_| ())
    }

    async fn insert_returning(&self, table: &str, record: Value) -> Result<Value, ApiError> {
        self.store(table, record)
    }

    async fn select_eq(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Vec<Value>, ApiError> {
        self.log.push(MockCall::Select {
            table: table.to_string(),
            column: column.to_string(),
            value: value.to_string(),
        });
        Ok(self
            .rows(table)
            .into_iter()
            .filter(|row| row.get(column).and_then(Value::as_str) == Some(value))
            .collect())
    }
}

/// Verifier with a scripted answer
pub struct MockOtpVerifier {
    pub log: CallLog,
    answer: Mutex<Result<bool, ApiError>>,
}

impl MockOtpVerifier {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            answer: Mutex::new(Ok(true)),
        }
    }

    pub fn answer(&self, answer: Result<bool, ApiError>) {
        *self.answer.lock().unwrap() = answer;
    }
}

#[async_trait]
impl OtpVerifier for MockOtpVerifier {
    fn name(&self) -> &str {
        "mock-otp"
    }

    async fn verify(&self, phone: &str, code: &str) -> Result<bool, ApiError> {
        self.log.push(MockCall::Verify {
            phone: phone.to_string(),
            code: code.to_string(),
        });
        self.answer.lock().unwrap().clone()
    }
}

/// Geocoder answering from a fixed address table
#[derive(Default)]
pub struct MockGeocoder {
    pub log: CallLog,
    places: Mutex<HashMap<String, Coordinates>>,
    stores: Mutex<Vec<NearbyStore>>,
    fail_nearby: Mutex<bool>,
}

impl MockGeocoder {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    pub fn add_place(&self, address: &str, coordinates: Coordinates) {
        self.places
            .lock()
            .unwrap()
            .insert(address.to_string(), coordinates);
    }

    pub fn set_stores(&self, stores: Vec<NearbyStore>) {
        *self.stores.lock().unwrap() = stores;
    }

    pub fn fail_nearby(&self, fail: bool) {
        *self.fail_nearby.lock().unwrap() = fail;
    }

    pub fn geocoded_addresses(&self) -> Vec<String> {
        self.log
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Geocode { address, .. } => Some(address),
                _ => None,
            })
            .collect()
    }

    pub fn nearby_lookups(&self) -> Vec<Coordinates> {
        self.log
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::Nearby { around, .. } => Some(around),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    fn name(&self) -> &str {
        "mock-geocoder"
    }

    async fn geocode(
        &self,
        address: &str,
        country_code: &str,
    ) -> Result<Option<Coordinates>, ApiError> {
        self.log.push(MockCall::Geocode {
            address: address.to_string(),
            country_code: country_code.to_string(),
        });
        Ok(self.places.lock().unwrap().get(address).copied())
    }

    async fn nearby_stores(
        &self,
        around: Coordinates,
        radius_m: u32,
    ) -> Result<Vec<NearbyStore>, ApiError> {
        self.log.push(MockCall::Nearby { around, radius_m });
        if *self.fail_nearby.lock().unwrap() {
            return Err(ApiError::network(self.name(), "connection reset"));
        }
        Ok(self.stores.lock().unwrap().clone())
    }
}

/// All four mocks sharing one call log
pub struct MockBackend {
    pub log: CallLog,
    pub storage: Arc<MockStorage>,
    pub tables: Arc<MockTables>,
    pub otp: Arc<MockOtpVerifier>,
    pub geocoder: Arc<MockGeocoder>,
}

impl MockBackend {
    pub fn new() -> Self {
        let log = CallLog::new();
        Self {
            storage: Arc::new(MockStorage::new(log.clone())),
            tables: Arc::new(MockTables::new(log.clone())),
            otp: Arc::new(MockOtpVerifier::new(log.clone())),
            geocoder: Arc::new(MockGeocoder::new(log.clone())),
            log,
        }
    }

    /// Bundle the mocks as wizard services with default resource names
    pub fn services(&self) -> crate::api::Services {
        crate::api::Services::new(
            self.storage.clone(),
            self.tables.clone(),
            self.otp.clone(),
            self.geocoder.clone(),
        )
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}
