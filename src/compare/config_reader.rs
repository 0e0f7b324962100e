use crate::compare::*;

use log::debug;
use snafu::prelude::*;
use std::collections::BTreeMap;
use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(rename = "restrictCandidatesToElection")]
    pub restrict_candidates_to_election: Option<bool>,
    #[serde(rename = "minimumParticipants")]
    pub minimum_participants: Option<JSValue>,
    #[serde(rename = "proposalPreviewLimit")]
    pub proposal_preview_limit: Option<JSValue>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompareConfig {
    #[serde(rename = "dataSources", default)]
    pub data_sources: Vec<FileSource>,
    #[serde(rename = "electionId")]
    pub election_id: Option<String>,
    pub topic: Option<String>,
    #[serde(rename = "candidateIds")]
    pub candidate_ids: Option<Vec<String>>,
    #[serde(default)]
    pub decisions: BTreeMap<String, String>,
    pub mode: Option<String>,
    #[serde(default)]
    pub rules: RulesConfig,
}

/// The settings echoed at the top of every summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "electionId")]
    pub election_id: String,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

pub fn read_config(path: &str) -> VcResult<CompareConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let config: CompareConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read config {:?}: {:?}", path, config);
    Ok(config)
}

pub fn read_summary(path: &str) -> VcResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

pub fn read_js_int(x: &JSValue) -> Option<usize> {
    match x {
        JSValue::Number(n) => n.as_u64().map(|x| x as usize),
        JSValue::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    }
}
