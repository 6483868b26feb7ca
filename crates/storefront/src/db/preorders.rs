//! Preorder repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::{Decimal, Json};
use tracing::instrument;

use sareine_core::{
    Email, NewPreorder, Preorder, PreorderId, PreorderItem, PreorderStatus, Price,
    ShippingAddress, UserId,
};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct PreorderRow {
    id: i64,
    preorder_id: String,
    user_id: String,
    items: Json<serde_json::Value>,
    amount: Decimal,
    currency: String,
    shipping_address: Json<serde_json::Value>,
    customer_name: String,
    customer_email: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PreorderRow> for Preorder {
    type Error = RepositoryError;

    fn try_from(row: PreorderRow) -> Result<Self, Self::Error> {
        let Json(items) = row.items;
        let items: Vec<PreorderItem> = serde_json::from_value(items).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid preorder items in database: {e}"))
        })?;
        let Json(address) = row.shipping_address;
        let shipping_address: ShippingAddress = serde_json::from_value(address).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid shipping address in database: {e}"))
        })?;
        let customer_email = Email::parse(&row.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let status = row
            .status
            .parse::<PreorderStatus>()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            id: row.id,
            preorder_id: PreorderId::new(row.preorder_id),
            user_id: UserId::new(row.user_id),
            items,
            amount: Price::new(row.amount),
            currency: row.currency,
            shipping_address,
            customer_name: row.customer_name,
            customer_email,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for `storefront.preorder`.
pub struct PreorderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PreorderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a validated preorder as `pending_confirmation`.
    ///
    /// `customer_email` is the address [`NewPreorder::validate`] returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    #[instrument(skip(self, preorder, customer_email), fields(user = %preorder.user_id))]
    pub async fn create(
        &self,
        preorder: &NewPreorder,
        customer_email: &Email,
    ) -> Result<Preorder, RepositoryError> {
        let reference = PreorderId::generate(Utc::now());

        let row = sqlx::query_as::<_, PreorderRow>(
            r"
            INSERT INTO storefront.preorder (
                preorder_id, user_id, items, amount, shipping_address,
                customer_name, customer_email
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, preorder_id, user_id, items, amount, currency,
                      shipping_address, customer_name, customer_email, status,
                      created_at, updated_at
            ",
        )
        .bind(reference.as_str())
        .bind(preorder.user_id.as_str())
        .bind(Json(&preorder.items))
        .bind(preorder.amount.amount())
        .bind(Json(&preorder.shipping_address))
        .bind(preorder.customer_name.trim())
        .bind(customer_email.as_str())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Every preorder, newest first, optionally only those in `status`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if a stored row is invalid.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<PreorderStatus>,
    ) -> Result<Vec<Preorder>, RepositoryError> {
        let rows = sqlx::query_as::<_, PreorderRow>(
            r"
            SELECT id, preorder_id, user_id, items, amount, currency,
                   shipping_address, customer_name, customer_email, status,
                   created_at, updated_at
            FROM storefront.preorder
            WHERE $1::TEXT IS NULL OR status = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Preorder::try_from).collect()
    }

    /// Move a preorder to `status`. `None` if no preorder has that id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: i64,
        status: PreorderStatus,
    ) -> Result<Option<Preorder>, RepositoryError> {
        let row = sqlx::query_as::<_, PreorderRow>(
            r"
            UPDATE storefront.preorder
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, preorder_id, user_id, items, amount, currency,
                      shipping_address, customer_name, customer_email, status,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Preorder::try_from).transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row() -> PreorderRow {
        PreorderRow {
            id: 7,
            preorder_id: "PRE-M0X1Y2Z3".to_string(),
            user_id: "u1".to_string(),
            items: Json(json!([
                {"id": "rose", "name": "Rose Lip Balm", "price": 599.99, "quantity": 2, "slug": "rose-lip-balm"}
            ])),
            amount: Decimal::new(119_998, 2),
            currency: "INR".to_string(),
            shipping_address: Json(json!({
                "name": "Asha Rao", "phone": "1", "street": "12 MG Road",
                "city": "Bengaluru", "state": "Karnataka", "zip": "560001"
            })),
            customer_name: "Asha Rao".to_string(),
            customer_email: "asha@sareine.in".to_string(),
            status: "payment_link_sent".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_converts_to_preorder() {
        let preorder = Preorder::try_from(row()).unwrap();

        assert_eq!(preorder.preorder_id.as_str(), "PRE-M0X1Y2Z3");
        assert_eq!(preorder.status, PreorderStatus::PaymentLinkSent);
        assert_eq!(preorder.units(), 2);
        assert_eq!(preorder.amount.to_string(), "₹1199.98");
        assert_eq!(preorder.items[0].price.amount(), Decimal::new(59_999, 2));
        assert!(preorder.shipping_address.email.is_empty());
    }

    #[test]
    fn test_unknown_status_is_corruption() {
        let mut bad = row();
        bad.status = "shipped".to_string();

        assert!(matches!(
            Preorder::try_from(bad),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_malformed_items_are_corruption() {
        let mut bad = row();
        bad.items = Json(json!([{"id": "rose", "quantity": 0}]));

        let err = Preorder::try_from(bad).unwrap_err();
        assert!(err.to_string().contains("invalid preorder items"));
    }

    #[test]
    fn test_invalid_email_is_corruption() {
        let mut bad = row();
        bad.customer_email = "not-an-email".to_string();

        assert!(matches!(
            Preorder::try_from(bad),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
