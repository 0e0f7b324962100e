use crate::compare::*;

use log::info;
use snafu::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::compare::config_reader::FileSource;
use compare_engine::Dataset;

/// Reads one JSON snapshot of the topics, candidates and proposals.
pub fn read_json_dataset(path: &str) -> VcResult<Dataset> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let dataset: Dataset =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    info!(
        "read_json_dataset: {:?}: {} topic registries, {} candidates, {} proposals",
        path,
        dataset.topics.len(),
        dataset.candidates.len(),
        dataset.proposals.len()
    );
    Ok(dataset)
}

/// Reads and merges all the data sources. Paths are relative to `root_path`.
pub fn read_data_sources(root_path: &Path, sources: &[FileSource]) -> VcResult<Dataset> {
    ensure!(!sources.is_empty(), MissingDataSourceSnafu {});
    let mut dataset = Dataset::default();
    for source in sources.iter() {
        let p: PathBuf = root_path.join(&source.file_path);
        let p2 = p.as_path().display().to_string();
        info!("Attempting to read data file {:?}", p2);
        let file_data = match source.provider.as_str() {
            "json" => read_json_dataset(&p2)?,
            x => {
                return UnsupportedProviderSnafu {
                    provider: x.to_string(),
                }
                .fail()
            }
        };
        dataset.merge(file_data);
    }
    Ok(dataset)
}
