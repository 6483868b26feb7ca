//! `PostgreSQL`-backed user documents.
//!
//! Merge-writes are upserts that `COALESCE` each column with its stored
//! value, so a patch only changes the fields it carries. Change notification
//! rides on `LISTEN`/`NOTIFY`: a trigger sends the user id on
//! [`DOCUMENT_CHANNEL`] after every insert or update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use tokio::sync::mpsc;
use tracing::{debug, error, instrument, warn};

use sareine_core::{Cart, DocumentState, Email, Role, UserDocument, UserId};

use super::RepositoryError;
use crate::store::{DocumentStore, DocumentSubscription, StoreError};

/// Notification channel carrying the id of the changed user document.
pub const DOCUMENT_CHANNEL: &str = "user_document_changed";

/// Buffered states per subscription before the pump waits for the reader.
const SUBSCRIPTION_BUFFER: usize = 16;

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    user_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    role: Option<String>,
    cart: Option<Json<serde_json::Value>>,
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<DocumentRow> for UserDocument {
    type Error = RepositoryError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
            })?;
        let role = row
            .role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()
            .map_err(RepositoryError::DataCorruption)?;

        // A cart that fails validation reads as absent rather than failing
        // the whole document.
        let cart = row.cart.and_then(|Json(value)| {
            serde_json::from_value::<Cart>(value)
                .inspect_err(|e| {
                    warn!(user = %row.user_id, error = %e, "Stored cart is invalid, treating as empty");
                })
                .ok()
        });

        Ok(Self {
            uid: Some(UserId::new(row.user_id)),
            email,
            display_name: row.display_name,
            photo_url: row.photo_url,
            role,
            created_at: row.created_at,
            cart,
        })
    }
}

/// [`DocumentStore`] over `storefront.user_document`.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, user: &UserId) -> Result<DocumentState, RepositoryError> {
        fetch_document(&self.pool, user).await
    }
}

async fn fetch_document(pool: &PgPool, user: &UserId) -> Result<DocumentState, RepositoryError> {
    let row = sqlx::query_as::<_, DocumentRow>(
        r"
        SELECT user_id, email, display_name, photo_url, role, cart, created_at
        FROM storefront.user_document
        WHERE user_id = $1
        ",
    )
    .bind(user.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(UserDocument::try_from).transpose()?.into())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    #[instrument(skip(self), fields(user = %user))]
    async fn get(&self, user: &UserId) -> Result<DocumentState, StoreError> {
        Ok(self.fetch(user).await?)
    }

    #[instrument(skip(self, patch), fields(user = %user))]
    async fn set_merge(&self, user: &UserId, patch: UserDocument) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO storefront.user_document
                (user_id, email, display_name, photo_url, role, cart, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                email        = COALESCE(EXCLUDED.email, user_document.email),
                display_name = COALESCE(EXCLUDED.display_name, user_document.display_name),
                photo_url    = COALESCE(EXCLUDED.photo_url, user_document.photo_url),
                role         = COALESCE(EXCLUDED.role, user_document.role),
                cart         = COALESCE(EXCLUDED.cart, user_document.cart),
                created_at   = COALESCE(EXCLUDED.created_at, user_document.created_at),
                updated_at   = NOW()
            ",
        )
        .bind(user.as_str())
        .bind(patch.email.as_ref().map(Email::as_str))
        .bind(patch.display_name)
        .bind(patch.photo_url)
        .bind(patch.role.map(|r| r.as_str()))
        .bind(patch.cart.map(Json))
        .bind(patch.created_at)
        .execute(&self.pool)
        .await?;

        debug!("User document written");
        Ok(())
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn subscribe(&self, user: &UserId) -> Result<DocumentSubscription, StoreError> {
        // Listen before the initial read so no change is missed in between.
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(DOCUMENT_CHANNEL).await?;
        let initial = self.fetch(user).await?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let pool = self.pool.clone();
        let user = user.clone();

        let pump = tokio::spawn(async move {
            if tx.send(initial).await.is_err() {
                return;
            }
            loop {
                let reread = match listener.try_recv().await {
                    Ok(Some(notification)) => notification.payload() == user.as_str(),
                    // Connection dropped; the listener reconnects on the next
                    // call. Changes in the gap were not announced.
                    Ok(None) => {
                        warn!(user = %user, "Document listener reconnecting");
                        true
                    }
                    Err(e) => {
                        error!(user = %user, error = %e, "Document listener failed");
                        break;
                    }
                };
                if !reread {
                    continue;
                }
                match fetch_document(&pool, &user).await {
                    Ok(state) => {
                        if tx.send(state).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(user = %user, error = %e, "Failed to re-read user document"),
                }
            }
        });

        Ok(DocumentSubscription::new(rx, &pump))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row() -> DocumentRow {
        DocumentRow {
            user_id: "u1".to_string(),
            email: Some("asha@sareine.in".to_string()),
            display_name: Some("Asha".to_string()),
            photo_url: None,
            role: Some("customer".to_string()),
            cart: None,
            created_at: None,
        }
    }

    #[test]
    fn test_row_without_cart() {
        let doc = UserDocument::try_from(row()).unwrap();
        assert_eq!(doc.uid, Some(UserId::new("u1")));
        assert_eq!(doc.role, Some(Role::Customer));
        assert!(doc.cart.is_none());
    }

    #[test]
    fn test_row_with_cart() {
        let doc = UserDocument::try_from(DocumentRow {
            cart: Some(Json(serde_json::json!([
                {"id": "rose", "name": "Rose", "price": 599, "image": "", "quantity": 2, "slug": "rose"}
            ]))),
            ..row()
        })
        .unwrap();
        assert_eq!(doc.cart.unwrap().count(), 2);
    }

    #[test]
    fn test_invalid_cart_reads_as_absent() {
        let doc = UserDocument::try_from(DocumentRow {
            cart: Some(Json(serde_json::json!([
                {"id": "rose", "name": "Rose", "price": 599, "image": "", "quantity": 0, "slug": "rose"}
            ]))),
            ..row()
        })
        .unwrap();
        assert!(doc.cart.is_none());
    }

    #[test]
    fn test_invalid_role_is_corruption() {
        let result = UserDocument::try_from(DocumentRow {
            role: Some("owner".to_string()),
            ..row()
        });
        assert!(matches!(result, Err(RepositoryError::DataCorruption(_))));
    }
}
