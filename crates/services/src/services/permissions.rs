use db::{
    ConnectionTrait,
    models::{workspace::Workspace, workspace_member::WorkspaceMember},
};
use uuid::Uuid;

use crate::services::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    View,
    Create,
    Edit,
    Delete,
}

/// Read-side capability check. The workspace owner implicitly holds every
/// capability; anyone else needs a membership row whose flag for the
/// requested capability is set. Decisions are never cached between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspacePermissions;

impl WorkspacePermissions {
    pub async fn require<C: ConnectionTrait>(
        &self,
        db: &C,
        workspace: &Workspace,
        user_id: Uuid,
        capability: Capability,
    ) -> Result<(), ServiceError> {
        if workspace.owner_user_id == user_id {
            return Ok(());
        }

        let Some(member) = WorkspaceMember::find(db, workspace.id, user_id).await? else {
            return Err(ServiceError::Forbidden("no workspace access"));
        };

        let allowed = match capability {
            Capability::View => member.can_view,
            Capability::Create => member.can_create,
            Capability::Edit => member.can_edit,
            Capability::Delete => member.can_delete,
        };
        if allowed {
            Ok(())
        } else {
            Err(match capability {
                Capability::View => ServiceError::Forbidden("no view permission"),
                Capability::Create => ServiceError::Forbidden("no create permission"),
                Capability::Edit => ServiceError::Forbidden("no edit permission"),
                Capability::Delete => ServiceError::Forbidden("no delete permission"),
            })
        }
    }
}
