use serde::Deserialize;
use std::collections::BTreeMap;

/// One element of `pulumi stack ls --json`. Only the name is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackListEntry {
    pub name: String,
}

/// One line of the engine event log. Every event kind other than the
/// summary is ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineEvent {
    #[serde(default)]
    pub sequence: u64,
    #[serde(default)]
    pub summary_event: Option<SummaryEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEvent {
    #[serde(default)]
    pub maybe_corrupt: bool,
    #[serde(default)]
    pub resource_changes: BTreeMap<String, u64>,
}
