//! Batch mutation engines, one per entity

pub mod deal;

pub use deal::DealMutations;

use crm_core::models::BatchKind;
use crm_core::AppError;
use crm_db::DealUnitOfWork;

/// Commit `uow` if staging succeeded, otherwise roll it back and return the
/// staging error. A batch is never partially applied.
pub(crate) async fn finish_batch<T>(
    uow: Box<dyn DealUnitOfWork>,
    kind: BatchKind,
    staged: Result<T, AppError>,
) -> Result<T, AppError> {
    match staged {
        Ok(value) => {
            uow.commit().await.map_err(|e| {
                tracing::warn!(batch.kind = %kind, error = %e, "Batch commit failed");
                e
            })?;
            Ok(value)
        }
        Err(e) => {
            tracing::warn!(batch.kind = %kind, error = %e, "Batch aborted, rolling back");
            if let Err(rollback_err) = uow.rollback().await {
                tracing::error!(
                    batch.kind = %kind,
                    error = %rollback_err,
                    "Rollback failed"
                );
            }
            Err(e)
        }
    }
}
