//! Repository for the `signature_sessions` table.
//!
//! Every status transition is a conditional `UPDATE ... WHERE status_id = 1`.
//! The affected-row count is the only gate: callers never decide a transition
//! from a previously read row.

use gervis_core::client_log::LOG_IDENTITY_VERIFIED;
use gervis_core::signature::SessionStatus;
use gervis_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::signature_session::{CreateSignatureSession, SignatureSession};
use crate::models::verified_document::{CreateVerifiedDocument, VerifiedDocument};

const COLUMNS: &str = "id, session_id, token, client_id, created_by, document_url, status_id, \
                        expires_at, completed_at, created_at, updated_at";

const DOCUMENT_COLUMNS: &str = "id, client_id, session_id, id_front_url, id_back_url, \
                                 selfie_url, document_url, token_used, verification_date, \
                                 created_by, created_at";

/// Result of an attempt to complete a session.
#[derive(Debug)]
pub enum SessionCompletion {
    Completed {
        session: SignatureSession,
        document: VerifiedDocument,
    },
    /// The session was no longer pending (or had expired) when the update ran.
    NotPending,
}

pub struct SignatureSessionRepo;

impl SignatureSessionRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateSignatureSession,
    ) -> Result<SignatureSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO signature_sessions
                (session_id, token, client_id, created_by, document_url, status_id,
                 created_at, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SignatureSession>(&query)
            .bind(&input.session_id)
            .bind(&input.token)
            .bind(input.client_id)
            .bind(input.created_by)
            .bind(&input.document_url)
            .bind(SessionStatus::Pending.id())
            .bind(input.created_at)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find a session by its public session id.
    pub async fn find_by_session_id(
        pool: &PgPool,
        session_id: &str,
    ) -> Result<Option<SignatureSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM signature_sessions WHERE session_id = $1");
        sqlx::query_as::<_, SignatureSession>(&query)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// Persist an expiry that has been observed at `now`.
    ///
    /// Idempotent: returns `true` only for the call that actually moved the
    /// row from pending to expired. Sessions that are terminal or not yet past
    /// `expires_at` are left untouched.
    pub async fn mark_expired(
        pool: &PgPool,
        session_id: &str,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE signature_sessions SET status_id = $2
             WHERE session_id = $1 AND status_id = $3 AND expires_at < $4",
        )
        .bind(session_id)
        .bind(SessionStatus::Expired.id())
        .bind(SessionStatus::Pending.id())
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Complete a pending, unexpired session, record its verified document and
    /// append the `identity_verified` entry to the client's log.
    ///
    /// All three writes happen in one transaction. The status update is conditional
    /// on the row still being pending and unexpired at `now`; if it matches no
    /// row the transaction is rolled back and [`SessionCompletion::NotPending`]
    /// is returned, so of two racing verifications exactly one wins.
    pub async fn complete_with_document(
        pool: &PgPool,
        input: &CreateVerifiedDocument,
        now: Timestamp,
    ) -> Result<SessionCompletion, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE signature_sessions SET status_id = $2, completed_at = $4
             WHERE session_id = $1 AND status_id = $3 AND expires_at >= $4
             RETURNING {COLUMNS}"
        );
        let session = sqlx::query_as::<_, SignatureSession>(&query)
            .bind(&input.session_id)
            .bind(SessionStatus::Completed.id())
            .bind(SessionStatus::Pending.id())
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(session) = session else {
            tx.rollback().await?;
            return Ok(SessionCompletion::NotPending);
        };

        let query = format!(
            "INSERT INTO verified_documents
                (client_id, session_id, id_front_url, id_back_url, selfie_url,
                 document_url, token_used, verification_date, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {DOCUMENT_COLUMNS}"
        );
        let document = sqlx::query_as::<_, VerifiedDocument>(&query)
            .bind(input.client_id)
            .bind(&input.session_id)
            .bind(&input.id_front_url)
            .bind(&input.id_back_url)
            .bind(&input.selfie_url)
            .bind(&input.document_url)
            .bind(&input.token_used)
            .bind(input.verification_date)
            .bind(input.created_by)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO client_logs (client_id, user_id, log_type, content, details_json)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(document.client_id)
        .bind(document.created_by)
        .bind(LOG_IDENTITY_VERIFIED)
        .bind("Identity verified and document signed")
        .bind(serde_json::json!({
            "session_id": document.session_id,
            "document_url": document.document_url,
        }))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(SessionCompletion::Completed { session, document })
    }
}
