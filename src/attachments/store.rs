//! Local attachment file storage.
//!
//! Files live at `<root>/<site>/files/<first two GUID chars>/<guid><extension>`.

use crate::error::{TaskError, TaskResult};

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

pub struct AttachmentStore {
    root: PathBuf,
    sync_enabled: AtomicBool,
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>, sync_enabled: bool) -> Self {
        Self {
            root: root.into(),
            sync_enabled: AtomicBool::new(sync_enabled),
        }
    }

    pub fn sync_enabled(&self) -> bool {
        self.sync_enabled.load(Ordering::Relaxed)
    }

    pub fn set_sync_enabled(&self, enabled: bool) {
        self.sync_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Storage path relative to the attachment root.
    pub fn relative_path(site_name: &str, file_guid: &Uuid, extension: &str) -> String {
        let guid = file_guid.to_string();
        format!("{}/files/{}/{}{}", site_name, &guid[..2], guid, extension)
    }

    fn directory(&self, site_name: &str, file_guid: &Uuid) -> TaskResult<PathBuf> {
        validate_segment(site_name)?;
        let guid = file_guid.to_string();
        Ok(self.root.join(site_name).join("files").join(&guid[..2]))
    }

    pub fn file_path(&self, site_name: &str, file_guid: &Uuid, extension: &str) -> TaskResult<PathBuf> {
        validate_extension(extension)?;
        Ok(self
            .directory(site_name, file_guid)?
            .join(format!("{}{}", file_guid, extension)))
    }

    pub fn write_file(
        &self,
        site_name: &str,
        file_guid: &Uuid,
        extension: &str,
        content: &[u8],
    ) -> TaskResult<PathBuf> {
        let path = self.file_path(site_name, file_guid, extension)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        tracing::debug!("Wrote attachment {} ({} bytes)", path.display(), content.len());
        Ok(path)
    }

    pub fn read_file(&self, site_name: &str, file_guid: &Uuid, extension: &str) -> TaskResult<Option<Vec<u8>>> {
        let path = self.file_path(site_name, file_guid, extension)?;
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes every stored file of the attachment, whatever its extension.
    /// Returns how many files were removed.
    pub fn delete_files(&self, site_name: &str, file_guid: &Uuid, delete_directory: bool) -> TaskResult<usize> {
        let directory = self.directory(site_name, file_guid)?;
        let prefix = file_guid.to_string();

        let entries = match fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let matches = entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(&prefix))
                .unwrap_or(false);

            if matches && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }

        if delete_directory && fs::read_dir(&directory)?.next().is_none() {
            fs::remove_dir(&directory)?;
        }

        tracing::debug!("Deleted {} file(s) of attachment {}", removed, file_guid);
        Ok(removed)
    }
}

fn validate_segment(segment: &str) -> TaskResult<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\'])
    {
        return Err(TaskError::InvalidArgument {
            task_type: "ATTACHMENT".to_string(),
            message: format!("invalid site name '{}'", segment),
        });
    }
    Ok(())
}

fn validate_extension(extension: &str) -> TaskResult<()> {
    let valid = extension.is_empty()
        || (extension.starts_with('.')
            && extension.len() > 1
            && extension[1..].chars().all(|c| c.is_ascii_alphanumeric()));
    if !valid {
        return Err(TaskError::InvalidArgument {
            task_type: "ATTACHMENT".to_string(),
            message: format!("invalid file extension '{}'", extension),
        });
    }
    Ok(())
}
