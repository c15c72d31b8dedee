//! Company registration step: profile fields, logo, PDF documents and a
//! map location, persisted as one company row plus one file row per document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::providers::to_row;
use crate::api::{ApiError, Services};
use crate::types::{
    storage_path, CompanyRecord, Coordinates, FileRecord, NearbyStore, PreviewRef, StorageKind,
    UploadFile,
};
use crate::wizard::debounce::Resolution;
use crate::wizard::error::{messages, StepError, ValidationError};
use crate::wizard::WizardHost;

/// Form state for the company being registered
#[derive(Debug, Clone, Default)]
pub struct CompanyDraft {
    pub activity: String,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    pub nearby_stores: Vec<NearbyStore>,
    logo: Option<UploadFile>,
    logo_preview: Option<PreviewRef>,
    documents: Vec<UploadFile>,
    document_previews: Vec<PreviewRef>,
}

impl CompanyDraft {
    pub fn logo(&self) -> Option<&UploadFile> {
        self.logo.as_ref()
    }

    pub fn logo_preview(&self) -> Option<&PreviewRef> {
        self.logo_preview.as_ref()
    }

    pub fn documents(&self) -> &[UploadFile] {
        &self.documents
    }

    pub fn document_previews(&self) -> &[PreviewRef] {
        &self.document_previews
    }
}

/// Serializable part of the draft; file contents are not kept
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanySnapshot {
    #[serde(default)]
    pub activity: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub coordinates: Coordinates,
    #[serde(default)]
    pub logo_name: Option<String>,
    #[serde(default)]
    pub document_names: Vec<String>,
}

/// Outcome of handing a batch of documents to the intake filter
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeReport {
    pub accepted: usize,
    /// Names of the files that were not PDFs
    pub rejected: Vec<String>,
    /// Set iff at least one file was dropped
    pub warning: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFailure {
    pub file_name: String,
    pub reason: String,
}

/// What a successful submission actually saved
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReport {
    pub company_id: Uuid,
    pub logo_url: Option<String>,
    /// A logo was chosen but could not be uploaded
    pub logo_failed: bool,
    /// Public URLs of documents that were uploaded and recorded
    pub saved_documents: Vec<String>,
    pub failed_documents: Vec<DocumentFailure>,
}

impl SubmissionReport {
    /// Everything the user chose was saved
    pub fn is_complete(&self) -> bool {
        !self.logo_failed && self.failed_documents.is_empty()
    }
}

/// Second wizard step
#[derive(Debug, Default)]
pub struct CompanyRegistrationStep {
    pub draft: CompanyDraft,
    /// Id of the company this step already created
    submitted: Option<Uuid>,
    error: Option<&'static str>,
}

impl CompanyRegistrationStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a map center other than the built-in fallback
    pub fn with_fallback(fallback: Coordinates) -> Self {
        let mut step = Self::new();
        step.draft.coordinates = fallback;
        step
    }

    /// Restore the text fields and location of a saved draft
    pub fn from_snapshot(snapshot: &CompanySnapshot) -> Self {
        let mut step = Self::new();
        step.draft.activity = snapshot.activity.clone();
        step.draft.name = snapshot.name.clone();
        step.draft.address = snapshot.address.clone();
        step.draft.coordinates = snapshot.coordinates;
        step
    }

    pub fn snapshot(&self) -> CompanySnapshot {
        CompanySnapshot {
            activity: self.draft.activity.clone(),
            name: self.draft.name.clone(),
            address: self.draft.address.clone(),
            coordinates: self.draft.coordinates,
            logo_name: self.draft.logo.as_ref().map(|f| f.name.clone()),
            document_names: self.draft.documents.iter().map(|f| f.name.clone()).collect(),
        }
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    pub fn submitted_company(&self) -> Option<Uuid> {
        self.submitted
    }

    pub fn set_logo(&mut self, file: UploadFile) {
        self.draft.logo_preview = Some(PreviewRef::for_file(&file));
        self.draft.logo = Some(file);
    }

    /// Replace the document set with the PDFs among `files`
    pub fn set_documents(&mut self, files: Vec<UploadFile>) -> IntakeReport {
        let (accepted, rejected): (Vec<UploadFile>, Vec<UploadFile>) =
            files.into_iter().partition(UploadFile::is_pdf);

        let warning = if rejected.is_empty() {
            None
        } else {
            warn!(
                "Dropped {} non-PDF document(s): {:?}",
                rejected.len(),
                rejected.iter().map(|f| &f.name).collect::<Vec<_>>()
            );
            Some(messages::PDF_ONLY)
        };

        self.draft.document_previews = accepted.iter().map(PreviewRef::for_file).collect();
        self.draft.documents = accepted;

        IntakeReport {
            accepted: self.draft.documents.len(),
            rejected: rejected.into_iter().map(|f| f.name).collect(),
            warning,
        }
    }

    /// Record an address edit.
    ///
    /// Resolution happens asynchronously through the address debouncer;
    /// this only stores the text.
    pub fn set_address(&mut self, address: impl Into<String>) {
        self.draft.address = address.into();
    }

    /// Apply a debounced geocoding hit.
    ///
    /// Hits for an address the user has since edited are ignored; a fresher
    /// lookup is already on its way.
    pub async fn apply_resolution(&mut self, services: &Services, resolution: Resolution) -> bool {
        if resolution.address != self.draft.address {
            debug!(
                "Ignoring stale resolution for {:?} (address is now {:?})",
                resolution.address, self.draft.address
            );
            return false;
        }
        self.move_to(services, resolution.coordinates).await;
        true
    }

    /// Geocode the current address right away, bypassing the debounce.
    ///
    /// Returns whether the coordinates moved. Misses and failures leave the
    /// location unchanged.
    pub async fn resolve_address_now(&mut self, services: &Services) -> bool {
        let address = self.draft.address.trim().to_string();
        if address.is_empty() {
            return false;
        }
        match services
            .geocoder
            .geocode(&address, &services.geocoding.country_code)
            .await
        {
            Ok(Some(coordinates)) => {
                self.move_to(services, coordinates).await;
                true
            }
            Ok(None) => {
                debug!("No geocoding result for {:?}", address);
                false
            }
            Err(e) => {
                warn!("Geocoding {:?} failed: {}", address, e);
                false
            }
        }
    }

    /// Point chosen directly on the map
    pub async fn select_map_point(
        &mut self,
        services: &Services,
        lat: f64,
        lng: f64,
    ) -> Result<(), ValidationError> {
        let coordinates =
            Coordinates::new(lat, lng).ok_or(ValidationError::InvalidCoordinates(lat, lng))?;
        self.move_to(services, coordinates).await;
        Ok(())
    }

    async fn move_to(&mut self, services: &Services, coordinates: Coordinates) {
        self.draft.coordinates = coordinates;
        match services
            .geocoder
            .nearby_stores(coordinates, services.geocoding.nearby_radius_m)
            .await
        {
            Ok(stores) => self.draft.nearby_stores = stores,
            Err(e) => warn!("Nearby shop lookup around {} failed: {}", coordinates, e),
        }
    }

    /// Upload files, create the company and its file rows, then advance.
    ///
    /// A step creates at most one company; once that succeeded, further
    /// calls fail with `AlreadySubmitted` and touch nothing.
    pub async fn submit<H: WizardHost>(
        &mut self,
        services: &Services,
        host: &mut H,
    ) -> Result<SubmissionReport, StepError> {
        if let Some(company_id) = self.submitted {
            warn!("Company {} was already saved by this step", company_id);
            return Err(StepError::AlreadySubmitted);
        }
        if let Err(err) = self.check_ready(host.login().user_id.as_deref()) {
            self.error = Some(err.user_message());
            return Err(err.into());
        }
        let user_id = host.login().user_id.clone().unwrap_or_default();
        let phone = host.login().phone_number.clone();

        self.error = None;
        let result = save_company(services, &self.draft, &user_id, &phone).await;

        match result {
            Ok(report) => {
                info!(
                    company_id = %report.company_id,
                    documents = report.saved_documents.len(),
                    failed = report.failed_documents.len(),
                    "Company saved"
                );
                self.submitted = Some(report.company_id);
                host.set_page(host.page() + 1);
                Ok(report)
            }
            Err(err) => {
                error!("Error saving company: {}", err);
                self.error = Some(messages::COMPANY_SAVE_FAILED);
                Err(err.into())
            }
        }
    }

    fn check_ready(&self, user_id: Option<&str>) -> Result<(), ValidationError> {
        if user_id.map_or(true, str::is_empty) {
            return Err(ValidationError::MissingUser);
        }
        if self.draft.name.trim().is_empty() {
            return Err(ValidationError::MissingCompanyName);
        }
        Ok(())
    }

    /// Return to the previous page
    pub fn back<H: WizardHost>(&self, host: &mut H) {
        host.set_page(host.page().saturating_sub(1));
    }
}

/// Upload one file to `path` and return its public URL
async fn upload(services: &Services, path: &str, file: &UploadFile) -> Result<String, ApiError> {
    let bucket = &services.backend.bucket;
    services.storage.upload(bucket, path, file, true).await?;
    Ok(services.storage.public_url(bucket, path))
}

/// Best-effort removal of objects nothing references any more
async fn discard(services: &Services, paths: &[String]) {
    if paths.is_empty() {
        return;
    }
    if let Err(e) = services
        .storage
        .remove(&services.backend.bucket, paths)
        .await
    {
        warn!("Could not remove orphaned objects {:?}: {}", paths, e);
    }
}

async fn save_company(
    services: &Services,
    draft: &CompanyDraft,
    user_id: &str,
    phone: &str,
) -> Result<SubmissionReport, ApiError> {
    let company_id = Uuid::new_v4();
    let service = services.tables.name().to_string();

    let mut logo_path = None;
    let mut logo_url = None;
    let mut logo_failed = false;
    if let Some(logo) = &draft.logo {
        let path = storage_path(company_id, StorageKind::Logo, &logo.name);
        match upload(services, &path, logo).await {
            Ok(url) => {
                logo_path = Some(path);
                logo_url = Some(url);
            }
            Err(e) => {
                warn!("Logo upload failed, saving company without logo: {}", e);
                logo_failed = true;
            }
        }
    }

    let record = CompanyRecord {
        id: company_id,
        user_id: user_id.to_string(),
        name: draft.name.trim().to_string(),
        activity: draft.activity.trim().to_string(),
        location: draft.address.trim().to_string(),
        lat: draft.coordinates.lat(),
        lng: draft.coordinates.lng(),
        logo: logo_url.clone(),
        phone_number: (!phone.is_empty()).then(|| phone.to_string()),
    };
    let inserted = match to_row(&service, &record) {
        Ok(row) => services
            .tables
            .insert(&services.backend.companies_table, row)
            .await,
        Err(e) => Err(e),
    };
    if let Err(e) = inserted {
        discard(services, logo_path.as_slice()).await;
        return Err(e);
    }

    // Each storage path belongs to the first document that maps to it, so
    // discarding a path never removes another document's object.
    let mut claimed: HashMap<String, &str> = HashMap::new();
    let mut saved_documents = Vec::new();
    let mut failed_documents = Vec::new();
    for document in &draft.documents {
        let path = storage_path(company_id, StorageKind::Document, &document.name);
        if let Some(owner) = claimed.get(&path) {
            warn!(
                "Skipping document {:?}: {} is already used by {:?}",
                document.name, path, owner
            );
            failed_documents.push(DocumentFailure {
                file_name: document.name.clone(),
                reason: format!("same storage path as {}", owner),
            });
            continue;
        }
        claimed.insert(path.clone(), &document.name);

        let url = match upload(services, &path, document).await {
            Ok(url) => url,
            Err(e) => {
                warn!("Document {:?} upload failed: {}", document.name, e);
                failed_documents.push(DocumentFailure {
                    file_name: document.name.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let recorded = match to_row(&service, &FileRecord::document(company_id, &url)) {
            Ok(row) => services
                .tables
                .insert(&services.backend.files_table, row)
                .await,
            Err(e) => Err(e),
        };
        match recorded {
            Ok(()) => saved_documents.push(url),
            Err(e) => {
                warn!("Recording document {:?} failed: {}", document.name, e);
                discard(services, std::slice::from_ref(&path)).await;
                failed_documents.push(DocumentFailure {
                    file_name: document.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(SubmissionReport {
        company_id,
        logo_url,
        logo_failed,
        saved_documents,
        failed_documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::providers::mock::{MockBackend, MockCall};
    use crate::types::{PendingRegistration, PDF_MEDIA_TYPE};
    use crate::wizard::{Wizard, WizardStage};

    fn pdf(name: &str) -> UploadFile {
        UploadFile::new(name, PDF_MEDIA_TYPE, b"%PDF".to_vec())
    }

    fn png(name: &str) -> UploadFile {
        UploadFile::new(name, "image/png", b"PNG".to_vec())
    }

    fn verified_host() -> Wizard {
        let mut host = Wizard::new(
            PendingRegistration::new("Sara", "0500000000", "secret").with_user_id("7"),
        );
        host.set_page(1);
        host
    }

    fn filled_step() -> CompanyRegistrationStep {
        let mut step = CompanyRegistrationStep::new();
        step.draft.name = "Takalfa Trading".to_string();
        step.draft.activity = "Retail".to_string();
        step.set_address("الرياض");
        step
    }

    fn riyadh() -> Coordinates {
        Coordinates::new(24.0, 46.0).unwrap()
    }

    #[test]
    fn test_intake_keeps_exactly_the_pdfs() {
        let mut step = CompanyRegistrationStep::new();
        let report = step.set_documents(vec![pdf("a.pdf"), png("b.png"), pdf("c.pdf")]);

        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected, vec!["b.png".to_string()]);
        assert_eq!(report.warning, Some(messages::PDF_ONLY));
        let names: Vec<&str> = step.draft.documents().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "c.pdf"]);
        assert_eq!(step.draft.document_previews().len(), 2);
    }

    #[test]
    fn test_intake_without_drops_has_no_warning() {
        let mut step = CompanyRegistrationStep::new();
        assert_eq!(step.set_documents(vec![pdf("a.pdf")]).warning, None);
        assert_eq!(step.set_documents(vec![]).warning, None);
        assert!(step.draft.documents().is_empty());
    }

    #[test]
    fn test_logo_gets_preview() {
        let mut step = CompanyRegistrationStep::new();
        step.set_logo(png("logo.png"));
        assert!(step.draft.logo().is_some());
        assert!(step.draft.logo_preview().is_some());
    }

    #[test]
    fn test_coordinates_default_to_fallback() {
        let step = CompanyRegistrationStep::new();
        assert_eq!(step.draft.coordinates, Coordinates::default());
    }

    #[tokio::test]
    async fn test_resolution_updates_coordinates_and_fetches_stores() {
        let backend = MockBackend::new();
        let services = backend.services();
        let store = NearbyStore {
            coordinates: Coordinates::new(24.001, 46.001).unwrap(),
            display_name: "Bakery".to_string(),
        };
        backend.geocoder.set_stores(vec![store.clone()]);

        let mut step = filled_step();
        let applied = step
            .apply_resolution(
                &services,
                Resolution {
                    address: "الرياض".to_string(),
                    coordinates: riyadh(),
                },
            )
            .await;

        assert!(applied);
        assert_eq!(step.draft.coordinates, riyadh());
        assert_eq!(backend.geocoder.nearby_lookups(), vec![riyadh()]);
        assert_eq!(step.draft.nearby_stores, vec![store]);
    }

    #[tokio::test]
    async fn test_stale_resolution_is_ignored() {
        let backend = MockBackend::new();
        let services = backend.services();
        let mut step = filled_step();
        step.set_address("جدة");

        let applied = step
            .apply_resolution(
                &services,
                Resolution {
                    address: "الرياض".to_string(),
                    coordinates: riyadh(),
                },
            )
            .await;
        assert!(!applied);
        assert_eq!(step.draft.coordinates, Coordinates::default());
        assert!(backend.geocoder.nearby_lookups().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_now_miss_leaves_coordinates() {
        let backend = MockBackend::new();
        let services = backend.services();
        let mut step = filled_step();

        assert!(!step.resolve_address_now(&services).await);
        assert_eq!(step.draft.coordinates, Coordinates::default());

        backend.geocoder.add_place("الرياض", riyadh());
        assert!(step.resolve_address_now(&services).await);
        assert_eq!(step.draft.coordinates, riyadh());
        assert_eq!(
            backend.geocoder.geocoded_addresses(),
            vec!["الرياض".to_string(), "الرياض".to_string()]
        );
    }

    #[tokio::test]
    async fn test_resolve_now_blank_address_makes_no_call() {
        let backend = MockBackend::new();
        let services = backend.services();
        let mut step = filled_step();
        step.set_address("   ");

        assert!(!step.resolve_address_now(&services).await);
        assert!(backend.log.calls().is_empty());
    }

    #[tokio::test]
    async fn test_map_click_moves_and_refreshes_stores() {
        let backend = MockBackend::new();
        let services = backend.services();
        let mut step = filled_step();

        step.select_map_point(&services, 21.5, 39.2).await.unwrap();
        let point = Coordinates::new(21.5, 39.2).unwrap();
        assert_eq!(step.draft.coordinates, point);
        assert_eq!(backend.geocoder.nearby_lookups(), vec![point]);
        assert!(backend.geocoder.geocoded_addresses().is_empty());

        let err = step.select_map_point(&services, 95.0, 0.0).await.unwrap_err();
        assert_eq!(err, ValidationError::InvalidCoordinates(95.0, 0.0));
        assert_eq!(step.draft.coordinates, point);
    }

    #[tokio::test]
    async fn test_nearby_failure_keeps_previous_stores() {
        let backend = MockBackend::new();
        let services = backend.services();
        let mut step = filled_step();
        step.draft.nearby_stores = vec![NearbyStore {
            coordinates: riyadh(),
            display_name: "Old".to_string(),
        }];
        backend.geocoder.fail_nearby(true);

        step.select_map_point(&services, 21.5, 39.2).await.unwrap();
        assert_eq!(step.draft.coordinates, Coordinates::new(21.5, 39.2).unwrap());
        assert_eq!(step.draft.nearby_stores[0].display_name, "Old");
    }

    #[tokio::test]
    async fn test_submission_order_and_records() {
        let backend = MockBackend::new();
        let services = backend.services();
        let mut host = verified_host();
        let mut step = filled_step();
        step.draft.coordinates = riyadh();
        step.set_logo(png("my logo.png"));
        step.set_documents(vec![pdf("cr one.pdf"), pdf("vat.pdf")]);

        let report = step.submit(&services, &mut host).await.unwrap();
        let id = report.company_id;

        let uploads = backend.log.uploads();
        assert_eq!(
            uploads,
            vec![
                format!("companies/{}/logo/my_logo.png", id),
                format!("companies/{}/docs/cr_one.pdf", id),
                format!("companies/{}/docs/vat.pdf", id),
            ]
        );

        // logo upload, company insert, then upload + record per document
        let kinds: Vec<&str> = backend
            .log
            .calls()
            .iter()
            .map(|c| match c {
                MockCall::Upload { .. } => "upload",
                MockCall::Insert { table, .. } if table == "companies" => "company",
                MockCall::Insert { table, .. } if table == "files" => "file",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["upload", "company", "upload", "file", "upload", "file"]
        );

        let company = &backend.log.inserts_into("companies")[0];
        assert_eq!(company["id"], id.to_string());
        assert_eq!(company["user_id"], "7");
        assert_eq!(company["lat"], 24.0);
        assert_eq!(company["lng"], 46.0);
        assert_eq!(company["location"], "الرياض");
        assert_eq!(company["phone_number"], "0500000000");
        assert_eq!(
            company["logo"],
            format!("https://storage.test/files/companies/{}/logo/my_logo.png", id)
        );

        let files = backend.log.inserts_into("files");
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f["file_type"] == "document"));
        assert!(report.is_complete());
        assert_eq!(report.saved_documents.len(), 2);
        assert_eq!(host.stage(), WizardStage::Complete);
    }

    #[tokio::test]
    async fn test_logo_failure_still_saves_company_without_logo() {
        let backend = MockBackend::new();
        backend.storage.fail_uploads_containing("/logo/");
        let services = backend.services();
        let mut host = verified_host();
        let mut step = filled_step();
        step.set_logo(png("logo.png"));

        let report = step.submit(&services, &mut host).await.unwrap();
        assert!(report.logo_failed);
        assert!(report.logo_url.is_none());
        let company = &backend.log.inserts_into("companies")[0];
        assert!(company["logo"].is_null());
        assert_eq!(host.stage(), WizardStage::Complete);
    }

    #[tokio::test]
    async fn test_company_insert_failure_uploads_no_documents() {
        let backend = MockBackend::new();
        backend.tables.fail_inserts_into("companies");
        let services = backend.services();
        let mut host = verified_host();
        let mut step = filled_step();
        step.set_logo(png("logo.png"));
        step.set_documents(vec![pdf("a.pdf"), pdf("b.pdf")]);

        let err = step.submit(&services, &mut host).await.unwrap_err();
        assert!(matches!(err, StepError::Transport(_)));
        assert_eq!(step.error(), Some(messages::COMPANY_SAVE_FAILED));

        let uploads = backend.log.uploads();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].contains("/logo/"));
        assert!(backend.log.inserts_into("files").is_empty());
        // the orphaned logo is removed again
        assert!(backend.storage.objects().is_empty());
        assert_eq!(host.stage(), WizardStage::CompanyRegistration);
        assert!(step.submitted_company().is_none());
    }

    #[tokio::test]
    async fn test_failed_document_is_reported_not_fatal() {
        let backend = MockBackend::new();
        backend.storage.fail_uploads_containing("broken");
        let services = backend.services();
        let mut host = verified_host();
        let mut step = filled_step();
        step.set_documents(vec![pdf("broken.pdf"), pdf("ok.pdf")]);

        let report = step.submit(&services, &mut host).await.unwrap();
        assert_eq!(report.saved_documents.len(), 1);
        assert_eq!(report.failed_documents.len(), 1);
        assert_eq!(report.failed_documents[0].file_name, "broken.pdf");
        assert!(!report.is_complete());
        assert_eq!(backend.log.inserts_into("files").len(), 1);
        assert_eq!(host.stage(), WizardStage::Complete);
    }

    #[tokio::test]
    async fn test_file_record_failure_removes_uploaded_document() {
        let backend = MockBackend::new();
        backend.tables.fail_inserts_into("files");
        let services = backend.services();
        let mut host = verified_host();
        let mut step = filled_step();
        step.set_documents(vec![pdf("a.pdf")]);

        let report = step.submit(&services, &mut host).await.unwrap();
        assert_eq!(report.failed_documents.len(), 1);
        assert!(backend.storage.objects().is_empty());
    }

    #[tokio::test]
    async fn test_colliding_document_names_are_not_overwritten() {
        let backend = MockBackend::new();
        let services = backend.services();
        let mut host = verified_host();
        let mut step = filled_step();
        // both sanitize to ".pdf"
        step.set_documents(vec![pdf("عقد.pdf"), pdf("سجل.pdf")]);

        let report = step.submit(&services, &mut host).await.unwrap();
        assert_eq!(report.saved_documents.len(), 1);
        assert_eq!(report.failed_documents.len(), 1);
        assert_eq!(report.failed_documents[0].file_name, "سجل.pdf");
        assert_eq!(
            report.failed_documents[0].reason,
            "same storage path as عقد.pdf"
        );
        assert!(!report.is_complete());
        assert_eq!(backend.log.uploads().len(), 1);
        assert_eq!(backend.log.inserts_into("files").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_record_keeps_earlier_document_object() {
        let backend = MockBackend::new();
        backend.tables.fail_nth_insert_into("files", 2);
        let services = backend.services();
        let mut host = verified_host();
        let mut step = filled_step();
        step.set_documents(vec![pdf("a b.pdf"), pdf("a_b.pdf"), pdf("c.pdf")]);

        let report = step.submit(&services, &mut host).await.unwrap();
        let id = report.company_id;
        let kept = format!("companies/{}/docs/a_b.pdf", id);

        assert_eq!(
            report.saved_documents,
            vec![format!("https://storage.test/files/{}", kept)]
        );
        let failed: Vec<&str> = report
            .failed_documents
            .iter()
            .map(|f| f.file_name.as_str())
            .collect();
        assert_eq!(failed, vec!["a_b.pdf", "c.pdf"]);

        let objects = backend.storage.objects();
        assert!(objects.contains(&kept));
        assert!(!objects.contains(&format!("companies/{}/docs/c.pdf", id)));
    }

    #[tokio::test]
    async fn test_second_submit_is_refused() {
        let backend = MockBackend::new();
        let services = backend.services();
        let mut host = verified_host();
        let mut step = filled_step();

        let report = step.submit(&services, &mut host).await.unwrap();
        assert_eq!(step.submitted_company(), Some(report.company_id));
        let calls = backend.log.calls().len();

        let err = step.submit(&services, &mut host).await.unwrap_err();
        assert!(matches!(err, StepError::AlreadySubmitted));
        assert_eq!(backend.log.calls().len(), calls);
        assert_eq!(backend.log.inserts_into("companies").len(), 1);
        assert_eq!(host.stage(), WizardStage::Complete);
    }

    #[tokio::test]
    async fn test_submit_requires_verified_user_and_name() {
        let backend = MockBackend::new();
        let services = backend.services();

        let mut host = Wizard::new(PendingRegistration::new("Sara", "050", "x"));
        host.set_page(1);
        let err = filled_step().submit(&services, &mut host).await.unwrap_err();
        assert!(matches!(
            err,
            StepError::Validation(ValidationError::MissingUser)
        ));

        let mut host = verified_host();
        let mut step = filled_step();
        step.draft.name = "  ".to_string();
        let err = step.submit(&services, &mut host).await.unwrap_err();
        assert!(matches!(
            err,
            StepError::Validation(ValidationError::MissingCompanyName)
        ));
        assert_eq!(step.error(), Some(messages::COMPANY_NAME_REQUIRED));
        assert!(backend.log.calls().is_empty());
    }

    #[test]
    fn test_snapshot_round_trip_keeps_fields() {
        let mut step = filled_step();
        step.draft.coordinates = riyadh();
        step.set_documents(vec![pdf("a.pdf")]);

        let snapshot = step.snapshot();
        assert_eq!(snapshot.document_names, vec!["a.pdf".to_string()]);

        let restored = CompanyRegistrationStep::from_snapshot(&snapshot);
        assert_eq!(restored.draft.name, "Takalfa Trading");
        assert_eq!(restored.draft.coordinates, riyadh());
        assert!(restored.draft.documents().is_empty());
    }
}
