use crate::core::lustre;
use crate::core::query::lookup_query;
use crate::domain::model::{DriveFile, FileMetadata, HsmAction, LustreFid};
use crate::domain::ports::{Describer, DriveApi};
use crate::utils::error::{CopytoolError, Result};
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Archived(DriveFile),
    Restored { drive_id: String, bytes: u64 },
}

/// Archives and restores Lustre files as objects named after their FID
/// inside a single Drive folder.
pub struct Copytool<D: DriveApi, F: Describer> {
    drive: D,
    describer: F,
    gdrive_root: String,
}

impl<D: DriveApi, F: Describer> Copytool<D, F> {
    pub fn new(drive: D, describer: F, gdrive_root: impl Into<String>) -> Self {
        Self {
            drive,
            describer,
            gdrive_root: gdrive_root.into(),
        }
    }

    /// The lookup is required on every action: Drive allows several files
    /// with the same name, so only a query tells whether a FID is archived.
    async fn lookup(&self, fid: &LustreFid) -> Result<Vec<DriveFile>> {
        let files = self
            .drive
            .list_files(&lookup_query(&self.gdrive_root, fid.as_str()))
            .await?;
        if files.len() > 1 {
            let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
            tracing::warn!("multiple entries found for lustre_fid {} {:?}", fid, ids);
        }
        Ok(files)
    }

    pub async fn push(&self, fid: &LustreFid, media: &mut (dyn AsyncRead + Unpin + Send)) -> Result<DriveFile> {
        tracing::debug!("ct_gdrive_push lustre_fid {}", fid);
        let files = self.lookup(fid).await?;
        let description = self.describer.describe(fid).await;

        match files.first() {
            None => {
                tracing::debug!("drive_push_create lustre_fid {}", fid);
                let metadata = FileMetadata::for_create(fid, description, &self.gdrive_root);
                self.drive.create_file(&metadata, media).await
            }
            Some(existing) => {
                tracing::debug!("drive_push_update drive_fid {} for lustre_fid {}", existing.id, fid);
                let metadata = FileMetadata::for_update(description);
                self.drive.update_file(&existing.id, &metadata, media).await
            }
        }
    }

    pub async fn pull(&self, fid: &LustreFid, sink: &mut (dyn AsyncWrite + Unpin + Send)) -> Result<(String, u64)> {
        tracing::debug!("ct_gdrive_pull lustre_fid {}", fid);
        let files = self.lookup(fid).await?;
        let Some(entry) = files.into_iter().next() else {
            tracing::error!("ct_gdrive_pull: entry for lustre_fid {} not found!", fid);
            return Err(CopytoolError::EntryNotFound { fid: fid.to_string() });
        };

        let bytes = self.drive.download_file(&entry.id, sink).await?;
        Ok((entry.id, bytes))
    }

    /// Runs one HSM action against the descriptor inherited from lhsmtool_cmd.
    pub async fn run(&self, action: HsmAction, fid: &LustreFid, fd: i32) -> Result<ActionOutcome> {
        let mut file = lustre::inherited_fd(fd)?;
        match action {
            HsmAction::Push => {
                let drive_file = self.push(fid, &mut file).await?;
                tracing::debug!("push successfully completed for {} (drive_fid {})", fid, drive_file.id);
                Ok(ActionOutcome::Archived(drive_file))
            }
            HsmAction::Pull => {
                let (drive_id, bytes) = self.pull(fid, &mut file).await?;
                file.sync_all().await?;
                tracing::debug!("pull successfully completed for {} ({} bytes)", fid, bytes);
                Ok(ActionOutcome::Restored { drive_id, bytes })
            }
        }
    }
}
