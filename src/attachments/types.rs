//! Attachment replication task descriptors.
//!
//! Text data contracts:
//! - UPDATEATTACHMENT: `[siteName, fileGuid, fileName, fileExtension, deleteOldFiles]`,
//!   file content in the binary data, relative storage path in the file path.
//! - DELETEATTACHMENT: `[siteName, fileGuid, fileName, deleteDirectory]`.

use super::store::AttachmentStore;
use crate::error::TaskResult;
use crate::membership::types::ServerName;
use crate::tasks::types::{TaskKind, TaskPayload};

use uuid::Uuid;

pub const TARGET_FILE_UPDATE: &str = "FileUpdate";
pub const TARGET_FILE_DELETE: &str = "FileDelete";

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAttachmentTask {
    pub site_name: String,
    pub file_guid: Uuid,
    pub file_name: String,
    pub file_extension: String,
    /// Remove other stored files of the same attachment (e.g. a previous extension).
    pub delete_old_files: bool,
    pub content: Vec<u8>,
}

impl UpdateAttachmentTask {
    /// Only replicated while attachment synchronization is switched on.
    /// Checks the text arity without decoding the file content.
    pub fn condition(payload: &TaskPayload, store: &AttachmentStore) -> bool {
        store.sync_enabled() && payload.expect_arity(5).is_ok()
    }

    pub fn execute(&self, store: &AttachmentStore) -> TaskResult<()> {
        if self.delete_old_files {
            store.delete_files(&self.site_name, &self.file_guid, false)?;
        }
        store.write_file(
            &self.site_name,
            &self.file_guid,
            &self.file_extension,
            &self.content,
        )?;
        Ok(())
    }

    pub fn into_payload(self, origin: ServerName) -> TaskPayload {
        let file_path =
            AttachmentStore::relative_path(&self.site_name, &self.file_guid, &self.file_extension);
        TaskPayload::new(
            origin,
            TaskKind::UpdateAttachment.as_str(),
            vec![
                self.site_name,
                self.file_guid.to_string(),
                self.file_name,
                self.file_extension,
                self.delete_old_files.to_string(),
            ],
        )
        .with_target(Some(TARGET_FILE_UPDATE.to_string()))
        .with_binary(Some(file_path), Some(self.content))
    }

    pub fn from_payload(payload: &TaskPayload) -> TaskResult<Self> {
        payload.expect_arity(5)?;

        let content = payload
            .binary_data
            .clone()
            .ok_or_else(|| payload.invalid("missing file content"))?;

        Ok(Self {
            site_name: payload.text(0)?.to_string(),
            file_guid: parse_guid(payload, 1)?,
            file_name: payload.text(2)?.to_string(),
            file_extension: payload.text(3)?.to_string(),
            delete_old_files: payload.bool_arg(4)?,
            content,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteAttachmentTask {
    pub site_name: String,
    pub file_guid: Uuid,
    pub file_name: String,
    /// Remove the containing directory once it is empty.
    pub delete_directory: bool,
}

impl DeleteAttachmentTask {
    pub fn condition(payload: &TaskPayload, store: &AttachmentStore) -> bool {
        store.sync_enabled() && payload.expect_arity(4).is_ok()
    }

    pub fn execute(&self, store: &AttachmentStore) -> TaskResult<()> {
        store.delete_files(&self.site_name, &self.file_guid, self.delete_directory)?;
        Ok(())
    }

    pub fn into_payload(self, origin: ServerName) -> TaskPayload {
        TaskPayload::new(
            origin,
            TaskKind::DeleteAttachment.as_str(),
            vec![
                self.site_name,
                self.file_guid.to_string(),
                self.file_name,
                self.delete_directory.to_string(),
            ],
        )
        .with_target(Some(TARGET_FILE_DELETE.to_string()))
    }

    pub fn from_payload(payload: &TaskPayload) -> TaskResult<Self> {
        payload.expect_arity(4)?;

        Ok(Self {
            site_name: payload.text(0)?.to_string(),
            file_guid: parse_guid(payload, 1)?,
            file_name: payload.text(2)?.to_string(),
            delete_directory: payload.bool_arg(3)?,
        })
    }
}

fn parse_guid(payload: &TaskPayload, index: usize) -> TaskResult<Uuid> {
    let raw = payload.text(index)?;
    Uuid::parse_str(raw).map_err(|e| payload.invalid(format!("invalid file GUID '{}': {}", raw, e)))
}
