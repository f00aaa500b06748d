use std::path::Path;

use paralumi_core::ChangeSummary;

use crate::types::EngineEvent;
use crate::{PulumiError, Result};

/// Read the change counts from a JSON-lines engine event log. `stack` names
/// the run in the error when the log holds no summary.
///
/// The last `summaryEvent` wins. Blank lines are skipped; any other line
/// that is not valid JSON is a parse error.
pub(crate) async fn read_change_summary(path: &Path, stack: &str) -> Result<ChangeSummary> {
    let data = tokio::fs::read_to_string(path).await?;
    parse_change_summary(&data)?.ok_or_else(|| PulumiError::MissingSummary(stack.to_owned()))
}

pub(crate) fn parse_change_summary(data: &str) -> Result<Option<ChangeSummary>> {
    let mut summary = None;
    for line in data.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event: EngineEvent =
            serde_json::from_str(trimmed).map_err(|source| PulumiError::Parse {
                line: trimmed.to_owned(),
                source,
            })?;
        if let Some(s) = event.summary_event {
            if s.maybe_corrupt {
                tracing::warn!(sequence = event.sequence, "engine reported a possibly corrupt summary");
            }
            summary = Some(ChangeSummary::from(s.resource_changes));
        }
    }
    Ok(summary)
}
