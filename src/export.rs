use std::io::Write;

use crate::derive::Snapshot;
use crate::error::Result;
use crate::timeline::TimelineModel;

/// Write one CSV row per batch with its progress in `snapshot`
///
/// Columns: batch_id, priority, manufacturer, model, quantity, completed,
/// in_progress, waiting, percent. Batches are written in schedule order.
pub fn write_batch_progress<W: Write>(model: &TimelineModel, snapshot: &Snapshot, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "batch_id",
        "priority",
        "manufacturer",
        "model",
        "quantity",
        "completed",
        "in_progress",
        "waiting",
        "percent",
    ])?;

    for batch in model.batches() {
        let progress = snapshot.batches.get(&batch.batch_id).copied().unwrap_or_default();
        wtr.write_record([
            batch.batch_id.clone(),
            batch.priority.as_str().to_string(),
            batch.manufacturer.clone(),
            batch.model.clone(),
            batch.quantity.to_string(),
            progress.completed.to_string(),
            progress.in_progress.to_string(),
            progress.waiting.to_string(),
            progress.percent.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
