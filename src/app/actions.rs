use std::fmt;

use anyhow::{Context, Result};
use crossbeam_channel::Sender;

use crate::bulk::CheckPatch;
use crate::model::CheckId;

/// Mutation contract of the check list. Indices for `reorder` address the full custom order.
pub trait CheckMutations {
    fn reorder(&self, from: usize, to: usize) -> Result<()>;
    fn delete(&self, id: &CheckId) -> Result<()>;
    fn bulk_delete(&self, ids: &[CheckId]) -> Result<()>;
    fn toggle_status(&self, id: &CheckId, disabled: bool) -> Result<()>;
    fn bulk_toggle_status(&self, ids: &[CheckId], disabled: bool) -> Result<()>;
    fn set_folder(&self, id: &CheckId, folder: Option<&str>) -> Result<()>;
    fn bulk_update_settings(&self, ids: &[CheckId], patch: &CheckPatch) -> Result<()>;
    fn check_now(&self, id: &CheckId) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationRequest {
    Reorder { from: usize, to: usize },
    Delete(CheckId),
    BulkDelete(Vec<CheckId>),
    ToggleStatus { id: CheckId, disabled: bool },
    BulkToggleStatus { ids: Vec<CheckId>, disabled: bool },
    SetFolder { id: CheckId, folder: Option<String> },
    BulkUpdateSettings { ids: Vec<CheckId>, patch: CheckPatch },
    CheckNow(CheckId),
}

impl MutationRequest {
    /// Ids the request touches; reorders touch rows by position only.
    pub fn ids(&self) -> Vec<CheckId> {
        match self {
            MutationRequest::Reorder { .. } => Vec::new(),
            MutationRequest::Delete(id)
            | MutationRequest::ToggleStatus { id, .. }
            | MutationRequest::SetFolder { id, .. }
            | MutationRequest::CheckNow(id) => vec![id.clone()],
            MutationRequest::BulkDelete(ids)
            | MutationRequest::BulkToggleStatus { ids, .. }
            | MutationRequest::BulkUpdateSettings { ids, .. } => ids.clone(),
        }
    }

    pub fn kind(&self) -> MutationKind {
        match self {
            MutationRequest::Reorder { .. } => MutationKind::Reorder,
            MutationRequest::Delete(_) | MutationRequest::BulkDelete(_) => MutationKind::Delete,
            MutationRequest::ToggleStatus { .. } | MutationRequest::BulkToggleStatus { .. } => {
                MutationKind::ToggleStatus
            }
            MutationRequest::SetFolder { .. } => MutationKind::Folder,
            MutationRequest::BulkUpdateSettings { .. } => MutationKind::Settings,
            MutationRequest::CheckNow(_) => MutationKind::CheckNow,
        }
    }

    /// Replays the request against a synchronous implementation.
    pub fn apply(&self, target: &dyn CheckMutations) -> Result<()> {
        match self {
            MutationRequest::Reorder { from, to } => target.reorder(*from, *to),
            MutationRequest::Delete(id) => target.delete(id),
            MutationRequest::BulkDelete(ids) => target.bulk_delete(ids),
            MutationRequest::ToggleStatus { id, disabled } => target.toggle_status(id, *disabled),
            MutationRequest::BulkToggleStatus { ids, disabled } => {
                target.bulk_toggle_status(ids, *disabled)
            }
            MutationRequest::SetFolder { id, folder } => target.set_folder(id, folder.as_deref()),
            MutationRequest::BulkUpdateSettings { ids, patch } => {
                target.bulk_update_settings(ids, patch)
            }
            MutationRequest::CheckNow(id) => target.check_now(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Reorder,
    Delete,
    ToggleStatus,
    Folder,
    Settings,
    CheckNow,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MutationKind::Reorder => "reorder",
            MutationKind::Delete => "delete",
            MutationKind::ToggleStatus => "status change",
            MutationKind::Folder => "folder change",
            MutationKind::Settings => "settings update",
            MutationKind::CheckNow => "manual check",
        };
        f.write_str(label)
    }
}

/// Fire-and-forget front of the mutation worker. Each call only enqueues.
#[derive(Debug, Clone)]
pub struct MutationQueue {
    tx: Sender<MutationRequest>,
}

impl MutationQueue {
    pub fn new(tx: Sender<MutationRequest>) -> Self {
        Self { tx }
    }

    fn enqueue(&self, request: MutationRequest) -> Result<()> {
        tracing::debug!(kind = %request.kind(), "queueing mutation");
        self.tx
            .send(request)
            .context("mutation worker has shut down")
    }
}

impl CheckMutations for MutationQueue {
    fn reorder(&self, from: usize, to: usize) -> Result<()> {
        self.enqueue(MutationRequest::Reorder { from, to })
    }

    fn delete(&self, id: &CheckId) -> Result<()> {
        self.enqueue(MutationRequest::Delete(id.clone()))
    }

    fn bulk_delete(&self, ids: &[CheckId]) -> Result<()> {
        self.enqueue(MutationRequest::BulkDelete(ids.to_vec()))
    }

    fn toggle_status(&self, id: &CheckId, disabled: bool) -> Result<()> {
        self.enqueue(MutationRequest::ToggleStatus {
            id: id.clone(),
            disabled,
        })
    }

    fn bulk_toggle_status(&self, ids: &[CheckId], disabled: bool) -> Result<()> {
        self.enqueue(MutationRequest::BulkToggleStatus {
            ids: ids.to_vec(),
            disabled,
        })
    }

    fn set_folder(&self, id: &CheckId, folder: Option<&str>) -> Result<()> {
        self.enqueue(MutationRequest::SetFolder {
            id: id.clone(),
            folder: folder.map(str::to_string),
        })
    }

    fn bulk_update_settings(&self, ids: &[CheckId], patch: &CheckPatch) -> Result<()> {
        self.enqueue(MutationRequest::BulkUpdateSettings {
            ids: ids.to_vec(),
            patch: patch.clone(),
        })
    }

    fn check_now(&self, id: &CheckId) -> Result<()> {
        self.enqueue(MutationRequest::CheckNow(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn queue_forwards_requests_in_order() -> anyhow::Result<()> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let queue = MutationQueue::new(tx);
        queue.reorder(2, 0)?;
        queue.set_folder(&CheckId::from("a"), Some("Ops"))?;
        assert_eq!(rx.try_recv()?, MutationRequest::Reorder { from: 2, to: 0 });
        assert_matches!(
            rx.try_recv()?,
            MutationRequest::SetFolder { folder: Some(ref name), .. } if name == "Ops"
        );
        Ok(())
    }

    #[test]
    fn closed_worker_surfaces_an_error() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(rx);
        let queue = MutationQueue::new(tx);
        assert!(queue.check_now(&CheckId::from("a")).is_err());
    }

    #[test]
    fn request_reports_touched_ids() {
        let ids = vec![CheckId::from("a"), CheckId::from("b")];
        let request = MutationRequest::BulkToggleStatus {
            ids: ids.clone(),
            disabled: true,
        };
        assert_eq!(request.ids(), ids);
        assert_eq!(request.kind(), MutationKind::ToggleStatus);
        assert!(MutationRequest::Reorder { from: 0, to: 1 }.ids().is_empty());
    }
}
