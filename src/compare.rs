use log::{debug, info, warn};

use compare_engine::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::compare::config_reader::*;
use crate::compare::io_json::*;

pub mod config_reader;
pub mod io_json;

#[derive(Debug, Snafu)]
pub enum VcError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the summary"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("No data source: pass --input or list dataSources in the configuration"))]
    MissingDataSource {},
    #[snafu(display("Provider not implemented {provider:?}"))]
    UnsupportedProvider { provider: String },
    #[snafu(display("Missing parent directory for {path}"))]
    MissingParentDir { path: String },
    #[snafu(display("Unknown mode {value:?}: expected topics, compare or tournament"))]
    UnknownMode { value: String },
    #[snafu(display("Invalid decision {value:?}: expected <round>-<match>=<candidate>"))]
    InvalidDecision { value: String },
    #[snafu(display("{source}"))]
    Engine { source: EngineError },
    #[snafu(display("Difference detected between calculated summary and reference summary"))]
    ReferenceMismatch {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type VcResult<T> = Result<T, VcError>;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum Mode {
    Topics,
    Compare,
    Tournament,
}

impl Mode {
    fn parse(value: &str) -> VcResult<Mode> {
        match value.trim().to_lowercase().as_str() {
            "topics" => Ok(Mode::Topics),
            "compare" => Ok(Mode::Compare),
            "tournament" => Ok(Mode::Tournament),
            _ => UnknownModeSnafu { value }.fail(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Mode::Topics => "topics",
            Mode::Compare => "compare",
            Mode::Tournament => "tournament",
        }
    }
}

fn validate_rules(rules: &RulesConfig) -> VcResult<EngineRules> {
    let defaults = EngineRules::DEFAULT_RULES;
    let res = EngineRules {
        restrict_candidates_to_election: rules
            .restrict_candidates_to_election
            .unwrap_or(defaults.restrict_candidates_to_election),
        minimum_participants: match &rules.minimum_participants {
            None => defaults.minimum_participants,
            Some(x) => match read_js_int(x) {
                Some(n) if n >= 2 => n,
                _ => {
                    whatever!(
                        "Failed to understand minimumParticipants option: {:?}: expected at least 2",
                        x
                    )
                }
            },
        },
        proposal_preview_limit: match &rules.proposal_preview_limit {
            None => defaults.proposal_preview_limit,
            Some(x) => match read_js_int(x) {
                Some(n) => n,
                None => {
                    whatever!("Failed to understand proposalPreviewLimit option: {:?}", x)
                }
            },
        },
    };
    Ok(res)
}

/// Splits `<round>-<match>=<candidate>`.
fn parse_decision(value: &str) -> VcResult<(String, String)> {
    let (key, candidate_id) = value
        .split_once('=')
        .context(InvalidDecisionSnafu { value })?;
    let (key, candidate_id) = (key.trim(), candidate_id.trim());
    ensure!(
        decision_coordinates(key).is_some() && !candidate_id.is_empty(),
        InvalidDecisionSnafu { value }
    );
    Ok((key.to_string(), candidate_id.to_string()))
}

fn decision_coordinates(key: &str) -> Option<(usize, usize)> {
    let (r, m) = key.split_once('-')?;
    Some((r.trim().parse().ok()?, m.trim().parse().ok()?))
}

/// Applies the command line options on top of the configuration file.
fn merge_args(mut config: CompareConfig, args: &Args) -> VcResult<CompareConfig> {
    if let Some(input) = &args.input {
        config.data_sources = vec![FileSource {
            provider: "json".to_string(),
            file_path: input.clone(),
        }];
    }
    if let Some(election_id) = &args.election {
        config.election_id = Some(election_id.clone());
    }
    if let Some(topic) = &args.topic {
        config.topic = Some(topic.clone());
    }
    if let Some(candidates) = &args.candidates {
        config.candidate_ids = Some(
            candidates
                .iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
        );
    }
    for d in args.decision.iter() {
        let (key, candidate_id) = parse_decision(d)?;
        config.decisions.insert(key, candidate_id);
    }
    if let Some(mode) = &args.mode {
        config.mode = Some(mode.clone());
    }
    Ok(config)
}

async fn run_tournament(
    engine: &CompareEngine,
    election_id: &str,
    topic: &str,
    candidate_ids: Vec<String>,
    decisions: &BTreeMap<String, String>,
) -> VcResult<JSValue> {
    let mut session = TournamentSession::new(election_id, engine.rules());
    let ticket = session.begin_election_fetch();
    let topics = engine.resolve_topics(election_id).await.context(EngineSnafu {})?;
    session.accept_topics(&ticket, topics);
    session.accept_candidates(&ticket, candidate_ids);
    session.set_topic(topic);

    let request = session.start_tournament().context(EngineSnafu {})?;
    let comparison = engine.run_request(&request).await.context(EngineSnafu {})?;
    session.accept_comparison(&request.ticket, comparison);

    for (key, candidate_id) in decisions.iter() {
        let (round_index, match_index) =
            decision_coordinates(key).context(InvalidDecisionSnafu { value: key })?;
        session.choose_winner(round_index, match_index, candidate_id);
    }

    let topic_label = session
        .current_topic()
        .map(|t| t.display_label().to_string())
        .unwrap_or_else(|| topic.to_string());
    let champion = session.champion();
    info!("run_tournament: champion: {:?}", champion);
    Ok(json!({
        "topic": topic,
        "topicLabel": topic_label,
        "participants": session.participants(),
        "decisions": session.decisions(),
        "rounds": session.rounds(),
        "bracket": session.bracket_view(),
        "champion": champion,
    }))
}

/// Runs the configured computation and returns the summary.
async fn run_config(config: &CompareConfig, root_path: &Path) -> VcResult<JSValue> {
    let mode = Mode::parse(config.mode.as_deref().unwrap_or("compare"))?;
    let rules = validate_rules(&config.rules)?;
    let election_id = config.election_id.clone().unwrap_or_default();
    let topic = config.topic.clone().unwrap_or_default();

    let dataset = read_data_sources(root_path, &config.data_sources)?;
    let store = MemoryStore::new(dataset);
    let candidate_ids: Vec<String> = match &config.candidate_ids {
        Some(ids) => ids.clone(),
        None => store
            .candidates_of(&election_id)
            .into_iter()
            .map(|c| c.id)
            .collect(),
    };
    debug!("run_config: candidates: {:?}", candidate_ids);
    let engine = CompareEngine::new(store, &rules);

    let results = match mode {
        Mode::Topics => {
            let topics = engine
                .resolve_topics(&election_id)
                .await
                .context(EngineSnafu {})?;
            json!({ "topics": topics })
        }
        Mode::Compare => {
            let res = engine
                .compare(&topic, &election_id, &candidate_ids)
                .await
                .context(EngineSnafu {})?;
            json!(res)
        }
        Mode::Tournament => {
            run_tournament(&engine, &election_id, &topic, candidate_ids, &config.decisions).await?
        }
    };

    let c = OutputConfig {
        election_id,
        mode: mode.name().to_string(),
        topic: match mode {
            Mode::Topics => None,
            _ => Some(topic),
        },
    };
    Ok(json!({
        "config": c,
        "results": results }))
}

fn check_reference(pretty_js_stats: &str, summary_path: &str) -> VcResult<()> {
    let summary_ref = read_summary(summary_path)?;
    debug!("summary: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(WritingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        return ReferenceMismatchSnafu {}.fail();
    }
    Ok(())
}

pub async fn run_command(args: &Args) -> VcResult<()> {
    let (config, mut root_path) = match &args.config {
        Some(path) => {
            let config = read_config(path)?;
            let root_p = Path::new(path)
                .parent()
                .context(MissingParentDirSnafu { path })?;
            (config, root_p.to_path_buf())
        }
        None => (CompareConfig::default(), PathBuf::new()),
    };
    // An input given on the command line is relative to the working directory.
    if args.input.is_some() {
        root_path = PathBuf::new();
    }
    let config = merge_args(config, args)?;
    info!("config: {:?}", config);

    let summary = run_config(&config, &root_path).await?;
    let pretty_js_stats = serde_json::to_string_pretty(&summary).context(WritingJsonSnafu {})?;

    match args.out.as_deref() {
        None | Some("") | Some("stdout") => println!("{}", pretty_js_stats),
        Some(path) => {
            info!("Writing the summary to {:?}", path);
            fs::write(path, &pretty_js_stats).context(WritingFileSnafu { path })?;
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        check_reference(&pretty_js_stats, summary_p)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir() -> PathBuf {
        [env!("CARGO_MANIFEST_DIR"), "tests", "data"].iter().collect()
    }

    fn empty_args() -> Args {
        Args {
            config: None,
            reference: None,
            out: None,
            input: None,
            election: None,
            topic: None,
            candidates: None,
            decision: Vec::new(),
            mode: None,
            verbose: false,
        }
    }

    async fn test_wrapper(test_name: &str) {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = test_dir().join(test_name);
        let out = tempfile::NamedTempFile::new().unwrap();
        let args = Args {
            config: Some(
                dir.join(format!("{}_config.json", test_name))
                    .display()
                    .to_string(),
            ),
            reference: Some(
                dir.join(format!("{}_expected_summary.json", test_name))
                    .display()
                    .to_string(),
            ),
            out: Some(out.path().display().to_string()),
            ..empty_args()
        };
        if let Err(e) = run_command(&args).await {
            panic!("An error occured {}", e);
        }
    }

    #[tokio::test]
    async fn salud_topics() {
        test_wrapper("salud_topics").await;
    }

    #[tokio::test]
    async fn salud_compare() {
        test_wrapper("salud_compare").await;
    }

    async fn tournament_summary(decisions: &[&str]) -> JSValue {
        let args = Args {
            input: Some(
                test_dir()
                    .join("salud_data.json")
                    .display()
                    .to_string(),
            ),
            election: Some("E1".to_string()),
            topic: Some("Salud y Bienestar".to_string()),
            decision: decisions.iter().map(|s| s.to_string()).collect(),
            mode: Some("tournament".to_string()),
            ..empty_args()
        };
        let config = merge_args(CompareConfig::default(), &args).unwrap();
        run_config(&config, Path::new("")).await.unwrap()
    }

    #[tokio::test]
    async fn tournament_with_decisions() {
        let js = tournament_summary(&["0-0=c2", "1-0 = c3"]).await;
        let results = &js["results"];
        assert_eq!(js["config"]["mode"], json!("tournament"));
        assert_eq!(results["participants"], json!(["c1", "c2", "c3"]));
        assert_eq!(results["topicLabel"], json!("Salud y Bienestar"));
        // c3 has a bye in the first round.
        assert_eq!(results["rounds"][0][1]["winner"], json!("c3"));
        assert_eq!(results["champion"], json!("c3"));
        assert_eq!(results["bracket"][1]["label"], json!("Final"));
        assert_eq!(
            results["bracket"][0]["matches"][0]["slots"][0]["headlines"],
            json!(["Clinicas"])
        );
    }

    #[tokio::test]
    async fn tournament_undecided() {
        let js = tournament_summary(&[]).await;
        let results = &js["results"];
        assert_eq!(results["decisions"], json!({}));
        // 0-0 is undecided and leaves an empty slot: c3 reaches the final alone.
        assert_eq!(results["rounds"][0][0]["winner"], json!(null));
        assert_eq!(results["rounds"][1][0]["a"], json!(null));
        assert_eq!(results["champion"], json!("c3"));

        let js = tournament_summary(&["0-0=c1"]).await;
        assert_eq!(js["results"]["champion"], json!(null));
    }

    #[tokio::test]
    async fn compare_requires_topic() {
        let args = Args {
            input: Some(
                test_dir()
                    .join("salud_data.json")
                    .display()
                    .to_string(),
            ),
            election: Some("E1".to_string()),
            ..empty_args()
        };
        let res = run_command(&args).await;
        match res {
            Err(VcError::Engine { source }) => assert_eq!(source.field(), Some("topic")),
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn decisions() {
        assert_eq!(
            parse_decision("0-1=c3").unwrap(),
            ("0-1".to_string(), "c3".to_string())
        );
        assert!(parse_decision("0-1").is_err());
        assert!(parse_decision("final=c3").is_err());
        assert!(parse_decision("0-1=").is_err());
    }

    #[test]
    fn modes() {
        assert_eq!(Mode::parse(" Tournament").unwrap(), Mode::Tournament);
        assert!(matches!(
            Mode::parse("bracket"),
            Err(VcError::UnknownMode { .. })
        ));
    }

    #[test]
    fn rules() {
        assert_eq!(
            validate_rules(&RulesConfig::default()).unwrap(),
            EngineRules::DEFAULT_RULES
        );
        let rules = RulesConfig {
            restrict_candidates_to_election: Some(false),
            minimum_participants: Some(json!("4")),
            proposal_preview_limit: Some(json!(0)),
        };
        let res = validate_rules(&rules).unwrap();
        assert!(!res.restrict_candidates_to_election);
        assert_eq!(res.minimum_participants, 4);
        assert_eq!(res.proposal_preview_limit, 0);

        let bad = RulesConfig {
            minimum_participants: Some(json!(1)),
            ..RulesConfig::default()
        };
        assert!(validate_rules(&bad).is_err());
    }

    #[test]
    fn command_line_overrides() {
        let mut config = CompareConfig {
            election_id: Some("E1".to_string()),
            topic: Some("salud".to_string()),
            ..CompareConfig::default()
        };
        config
            .decisions
            .insert("0-0".to_string(), "c1".to_string());
        let args = Args {
            topic: Some("empleo".to_string()),
            candidates: Some(vec!["c1".to_string(), " c2 ".to_string(), "".to_string()]),
            decision: vec!["0-0=c2".to_string()],
            ..empty_args()
        };
        let merged = merge_args(config, &args).unwrap();
        assert_eq!(merged.election_id.as_deref(), Some("E1"));
        assert_eq!(merged.topic.as_deref(), Some("empleo"));
        assert_eq!(
            merged.candidate_ids,
            Some(vec!["c1".to_string(), "c2".to_string()])
        );
        assert_eq!(merged.decisions.get("0-0").map(|s| s.as_str()), Some("c2"));
    }
}
