//! Domain types shared by the wizard steps and the backend providers.

mod coordinates;
mod registration;
mod upload;

pub use coordinates::{Coordinates, NearbyStore, FALLBACK_LAT, FALLBACK_LNG};
pub use registration::{
    CompanyRecord, FileRecord, NewUser, PendingRegistration, UserRow, DOCUMENT_FILE_TYPE,
};
pub use upload::{
    media_type_for_path, sanitize_file_name, storage_path, PreviewRef, StorageKind, UploadFile,
    PDF_MEDIA_TYPE,
};
