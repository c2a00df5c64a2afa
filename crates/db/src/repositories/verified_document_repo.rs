//! Repository for the `verified_documents` table. Rows are written only by
//! [`super::SignatureSessionRepo::complete_with_document`].

use gervis_core::types::DbId;
use sqlx::PgPool;

use crate::models::verified_document::VerifiedDocument;

const COLUMNS: &str = "id, client_id, session_id, id_front_url, id_back_url, selfie_url, \
                        document_url, token_used, verification_date, created_by, created_at";

pub struct VerifiedDocumentRepo;

impl VerifiedDocumentRepo {
    pub async fn find_by_session_id(
        pool: &PgPool,
        session_id: &str,
    ) -> Result<Option<VerifiedDocument>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM verified_documents WHERE session_id = $1");
        sqlx::query_as::<_, VerifiedDocument>(&query)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// List a client's verified documents, newest verification first.
    pub async fn list_by_client(
        pool: &PgPool,
        client_id: DbId,
    ) -> Result<Vec<VerifiedDocument>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM verified_documents
             WHERE client_id = $1
             ORDER BY verification_date DESC, id DESC"
        );
        sqlx::query_as::<_, VerifiedDocument>(&query)
            .bind(client_id)
            .fetch_all(pool)
            .await
    }
}
