//! Report upload, extraction and review.
//!
//! The upload pipeline stores the bytes first and only then creates the record, so a storage
//! failure never leaves a record pointing at nothing. Extraction runs after storage and never
//! prevents the record from being created.

use super::{existing_account, optional_id, require_role, treats};
use crate::constants::{ALLOWED_REPORT_MEDIA_TYPES, MAX_UPLOAD_BYTES};
use crate::extraction::{ExtractionInput, ReportExtractor};
use crate::models::{Account, ExtractedData, Report, ReportStatus, Role, StoredFile};
use crate::store::{Database, Snapshot};
use crate::validation::{self, optional_text, required_text};
use crate::{HospitalError, HospitalResult, RecordId};
use api_shared::{ReportQuery, UpdateStatusReq, UploadReportMeta};
use chrono::Utc;
use hms_files::{detect_media_type, FilesError, ObjectStorage, StoredObject};
use std::sync::Arc;

const REVIEW_ROLES: &[Role] = &[Role::Doctor, Role::Nurse, Role::Admin];

/// A file received from a client, before validation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ReportService {
    db: Arc<Database>,
    storage: Arc<dyn ObjectStorage>,
    extractor: Option<Arc<dyn ReportExtractor>>,
}

impl ReportService {
    pub fn new(
        db: Arc<Database>,
        storage: Arc<dyn ObjectStorage>,
        extractor: Option<Arc<dyn ReportExtractor>>,
    ) -> Self {
        Self {
            db,
            storage,
            extractor,
        }
    }

    /// Stores the file, runs extraction if configured and records the report.
    ///
    /// Blocks on storage and on the extraction call.
    pub fn upload(
        &self,
        actor: &Account,
        meta: UploadReportMeta,
        file: UploadedFile,
    ) -> HospitalResult<Report> {
        let patient_id = match actor.role() {
            Role::Patient => {
                let named = optional_id("patientId", meta.patient_id.as_deref())?;
                if named.is_some_and(|id| id != actor.id) {
                    return Err(HospitalError::forbidden(
                        "Patients can only upload their own reports",
                    ));
                }
                actor.id.clone()
            }
            _ => {
                let value = meta.patient_id.as_deref().unwrap_or_default();
                existing_account(&self.db, "patientId", value, Role::Patient)?.id
            }
        };
        let title = required_text("title", &meta.title)?;
        let report_type = match optional_text(meta.report_type) {
            Some(t) => validation::choice("reportType", &t)?,
            None => Default::default(),
        };

        if file.bytes.is_empty() {
            return Err(HospitalError::validation("file", "File is empty"));
        }
        if file.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(HospitalError::PayloadTooLarge {
                limit: MAX_UPLOAD_BYTES,
            });
        }
        let content_type = detect_media_type(&file.bytes, &file.filename)
            .filter(|m| ALLOWED_REPORT_MEDIA_TYPES.contains(&m.as_str()))
            .ok_or_else(|| {
                HospitalError::validation(
                    "file",
                    "Only PDF, PNG, JPEG and plain text files are accepted",
                )
            })?;

        let stored = self.storage.upload(&file.bytes, &file.filename).map_err(|e| {
            tracing::error!(error = %e, patient = %patient_id, "report upload to storage failed");
            HospitalError::Storage(e)
        })?;
        let storage_id = stored.id.to_string();

        let now = Utc::now();
        let mut report = Report {
            id: RecordId::new(),
            patient_id,
            uploaded_by: actor.id.clone(),
            title,
            report_type,
            file: StoredFile {
                url: stored.url,
                storage_id: storage_id.clone(),
                original_filename: stored.original_filename.as_str().to_string(),
                content_type,
                size_bytes: stored.size_bytes,
            },
            extracted: None,
            ai_processed: false,
            extraction_error: None,
            status: ReportStatus::Unprocessed,
            created_at: now,
            updated_at: now,
            reviewed_by: None,
        };
        if let Some(outcome) = self.run_extraction(&report, &file.bytes) {
            report.apply_extraction(outcome);
        }

        // A concurrent delete may have released the shared object since it was stored. The
        // reports write lock orders this check against every release.
        let inserted = self.db.reports.insert_with(|_| {
            if let Some(restored) = self.restore_object(&storage_id, &file)? {
                report.file.storage_id = restored.id.to_string();
                report.file.url = restored.url;
            }
            Ok(report)
        });
        match inserted {
            Ok(report) => {
                tracing::info!(
                    report = %report.id,
                    patient = %report.patient_id,
                    ai_processed = report.ai_processed,
                    "report uploaded"
                );
                Ok(report)
            }
            Err(e) => {
                self.db
                    .reports
                    .locked(|reports| self.release_object(reports, &storage_id));
                Err(e)
            }
        }
    }

    /// Patients see their own reports; doctors see reports they uploaded or for patients they
    /// are booked with; other staff see all.
    fn visible(&self, actor: &Account, report: &Report) -> bool {
        match actor.role() {
            Role::Patient => report.patient_id == actor.id,
            Role::Doctor => {
                report.uploaded_by == actor.id || treats(&self.db, &actor.id, &report.patient_id)
            }
            _ => true,
        }
    }

    /// Newest first, limited to what the caller may see.
    pub fn list(&self, actor: &Account, query: &ReportQuery) -> HospitalResult<Vec<Report>> {
        let mut patient_id = optional_id("patientId", query.patient_id.as_deref())?;
        let status: Option<ReportStatus> = query
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| validation::choice("status", s))
            .transpose()?;

        if actor.role() == Role::Patient {
            if patient_id.as_ref().is_some_and(|id| id != &actor.id) {
                return Ok(Vec::new());
            }
            patient_id = Some(actor.id.clone());
        }

        let mut reports = self.db.reports.find(|r| {
            patient_id.as_ref().map_or(true, |id| &r.patient_id == id)
                && status.map_or(true, |s| r.status == s)
                && self.visible(actor, r)
        });
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }

    pub fn get(&self, actor: &Account, id: &str) -> HospitalResult<Report> {
        let id = validation::record_id("id", id)?;
        let report = self
            .db
            .reports
            .get(&id)
            .ok_or(HospitalError::NotFound("Report"))?;
        if !self.visible(actor, &report) {
            return Err(HospitalError::forbidden(
                "You do not have access to this report",
            ));
        }
        Ok(report)
    }

    pub fn update_status(
        &self,
        actor: &Account,
        id: &str,
        req: UpdateStatusReq,
    ) -> HospitalResult<Report> {
        require_role(actor, REVIEW_ROLES, "review reports")?;
        let id = validation::record_id("id", id)?;
        let next: ReportStatus = validation::choice("status", &req.status)?;

        let report = self.db.reports.update(&id, |report| {
            if !self.visible(actor, report) {
                return Err(HospitalError::forbidden(
                    "You do not have access to this report",
                ));
            }
            if !report.status.can_transition_to(next) {
                return Err(HospitalError::validation(
                    "status",
                    format!("Cannot change report status from {} to {}", report.status, next),
                ));
            }
            report.status = next;
            if next == ReportStatus::Reviewed {
                report.reviewed_by = Some(actor.id.clone());
            }
            report.updated_at = Utc::now();
            Ok(())
        })?;

        tracing::info!(report = %report.id, status = %next, by = %actor.id, "report status changed");
        Ok(report)
    }

    /// Runs extraction again on the stored bytes of an existing report.
    pub fn reprocess(&self, actor: &Account, id: &str) -> HospitalResult<Report> {
        let existing = self.get(actor, id)?;
        if actor.role() == Role::Receptionist {
            return Err(HospitalError::forbidden(
                "Your role is not permitted to reprocess reports",
            ));
        }
        if self.extractor.is_none() {
            return Err(HospitalError::ExtractionUnavailable);
        }

        let bytes = self.storage.read(&existing.file.storage_id)?;
        let outcome = self
            .run_extraction(&existing, &bytes)
            .ok_or(HospitalError::ExtractionUnavailable)?;

        let report = self.db.reports.update(&existing.id, |report| {
            report.apply_extraction(outcome);
            report.updated_at = Utc::now();
            Ok(())
        })?;

        tracing::info!(report = %report.id, ai_processed = report.ai_processed, "report reprocessed");
        Ok(report)
    }

    /// Deletes the record, and the stored object once no other report references it.
    pub fn delete(&self, actor: &Account, id: &str) -> HospitalResult<()> {
        let existing = self.get(actor, id)?;
        if existing.uploaded_by != actor.id && actor.role() != Role::Admin {
            return Err(HospitalError::forbidden(
                "Only the uploader or an administrator can delete a report",
            ));
        }

        let removed = self.db.reports.remove_with(&existing.id, |remaining, removed| {
            self.release_object(remaining, &removed.file.storage_id)
        })?;

        tracing::info!(report = %removed.id, by = %actor.id, "report deleted");
        Ok(())
    }

    /// Streams a stored object to a caller who can see at least one report referencing it.
    pub fn read_file(&self, actor: &Account, storage_id: &str) -> HospitalResult<(StoredFile, Vec<u8>)> {
        let report = self
            .db
            .reports
            .find_one(|r| r.file.storage_id == storage_id && self.visible(actor, r))
            .ok_or(HospitalError::NotFound("File"))?;
        let bytes = self.storage.read(storage_id).map_err(|e| match e {
            FilesError::NotFound(_) => HospitalError::NotFound("File"),
            other => HospitalError::Storage(other),
        })?;
        Ok((report.file, bytes))
    }

    fn run_extraction(
        &self,
        report: &Report,
        bytes: &[u8],
    ) -> Option<Result<ExtractedData, String>> {
        let extractor = self.extractor.as_ref()?;
        let outcome = extractor.extract(ExtractionInput {
            filename: &report.file.original_filename,
            content_type: &report.file.content_type,
            bytes,
        });
        Some(outcome.map_err(|e| {
            tracing::warn!(report = %report.id, error = %e, "report extraction failed");
            e.to_string()
        }))
    }

    /// Stores the bytes again if the object behind `storage_id` has gone.
    ///
    /// Called under the reports write lock.
    fn restore_object(
        &self,
        storage_id: &str,
        file: &UploadedFile,
    ) -> HospitalResult<Option<StoredObject>> {
        if self.storage.exists(storage_id)? {
            return Ok(None);
        }
        tracing::warn!(storage_id, "stored object released during upload, storing again");
        Ok(Some(self.storage.upload(&file.bytes, &file.filename)?))
    }

    /// Deletes a stored object unless a report in `reports` still references it.
    ///
    /// `reports` must come from the reports write lock, so no upload can start referencing the
    /// object between the check and the delete.
    fn release_object(&self, reports: &Snapshot<'_, Report>, storage_id: &str) {
        if reports.any(|r| r.file.storage_id == storage_id) {
            return;
        }
        match self.storage.delete(storage_id) {
            Ok(()) | Err(FilesError::NotFound(_)) => {}
            Err(e) => tracing::warn!(storage_id, error = %e, "failed to delete stored object"),
        }
    }
}
