//! Preorder management commands.
//!
//! # Usage
//!
//! ```bash
//! # Every preorder, newest first
//! sareine preorders list
//! sareine preorders list --status paid
//!
//! # Record progress on a preorder
//! sareine preorders set-status --id 42 dispatched
//! ```

use std::fmt::Write as _;

use sareine_core::{Preorder, PreorderStatus};
use sareine_storefront::db::PreorderRepository;

use super::{CommandError, connect};

/// Print preorders, optionally only those in `status`.
pub async fn list(status: Option<&str>) -> Result<(), CommandError> {
    let status = status.map(str::parse::<PreorderStatus>).transpose()?;
    let pool = connect().await?;

    let preorders = PreorderRepository::new(&pool).list(status).await?;

    #[allow(clippy::print_stdout)]
    {
        print!("{}", render(&preorders));
    }
    Ok(())
}

/// Move preorder `id` to `status`.
pub async fn set_status(id: i64, status: &str) -> Result<(), CommandError> {
    let status: PreorderStatus = status.parse()?;
    let pool = connect().await?;

    let preorder = PreorderRepository::new(&pool)
        .update_status(id, status)
        .await?
        .ok_or(CommandError::PreorderNotFound(id))?;

    tracing::info!(
        id,
        preorder_id = %preorder.preorder_id,
        status = %status,
        "Preorder status changed"
    );
    Ok(())
}

/// One line per preorder.
fn render(preorders: &[Preorder]) -> String {
    if preorders.is_empty() {
        return "No preorders\n".to_string();
    }

    let mut out = String::new();
    for preorder in preorders {
        let _ = writeln!(
            out,
            "#{:<5} {}  {}  {:<20}  {} <{}>  {} units  {}",
            preorder.id,
            preorder.preorder_id,
            preorder.created_at.format("%Y-%m-%d %H:%M"),
            preorder.status,
            preorder.customer_name,
            preorder.customer_email,
            preorder.units(),
            preorder.amount,
        );
    }
    out
}
