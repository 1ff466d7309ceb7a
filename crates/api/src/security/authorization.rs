//! Tenant-scoped document authorization over the Uuid-based `DocumentStore`.
//! A document grants access to any user within its own tenant; there is
//! no per-user document ACL in this system.

use docint_core::db::documents::DocumentStore;
use docint_core::model::TenantId;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::utils::error::ApiError;

pub struct DocumentAuthorization {
    documents: Arc<DocumentStore>,
}

impl DocumentAuthorization {
    pub fn new(documents: Arc<DocumentStore>) -> Self {
        Self { documents }
    }

    pub async fn check_access(&self, tenant_id: TenantId, document_id: Uuid) -> Result<bool, ApiError> {
        let doc = self
            .documents
            .get(document_id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.message))?;
        Ok(doc.map(|d| d.tenant_id == tenant_id).unwrap_or(false))
    }

    /// Enforces that `document_id` belongs to `tenant_id`.
    pub async fn require_access(&self, tenant_id: TenantId, document_id: Uuid) -> Result<(), ApiError> {
        if !self.check_access(tenant_id, document_id).await? {
            warn!(%tenant_id, %document_id, "tenant denied access to document");
            return Err(ApiError::Forbidden(format!("access denied to document {document_id}")));
        }
        debug!(%tenant_id, %document_id, "tenant authorized for document");
        Ok(())
    }
}
