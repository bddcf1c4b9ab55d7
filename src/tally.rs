use log::{debug, info, warn};

use rank_tally::builder::Builder;
use rank_tally::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::tally::config_reader::*;
use crate::tally::io_common::simplify_file_name;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_json;
mod io_xlsx;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RunError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No worksheet found in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("Unexpected cell at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: usize, content: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Expected a positive index or a column name, got {value}"))]
    ParsingJsonNumber { value: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Line {lineno} is too short, missing column {column}"))]
    LineTooShort { lineno: usize, column: usize },
    #[snafu(display("Invalid vote at line {lineno}"))]
    InvalidRecord { source: TallyError, lineno: usize },
    #[snafu(display("Invalid votes in {path}"))]
    InvalidVotes { source: TallyError, path: String },
    #[snafu(display("Invalid rules"))]
    InvalidRules { source: TallyError },
    #[snafu(display("Error serializing the summary"))]
    SerializingSummary { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RunResult<T> = Result<T, RunError>;

fn counting_method_name(method: CountingMethod) -> &'static str {
    match method {
        CountingMethod::Baldwin => "baldwin",
        CountingMethod::InstantRunoff => "instantRunoff",
    }
}

fn tiebreak_mode_name(mode: TieBreakMode) -> &'static str {
    match mode {
        TieBreakMode::Lexicographic => "lexicographic",
        TieBreakMode::Random(_) => "random",
    }
}

fn validate_rules(config_rules: &ConfigRules) -> RunResult<TallyRules> {
    let counting_method = match config_rules.counting_method.as_deref() {
        None | Some("baldwin") => CountingMethod::Baldwin,
        Some("instantRunoff") => CountingMethod::InstantRunoff,
        Some(x) => {
            whatever!("Unknown counting method {:?}", x)
        }
    };
    let tiebreak_mode = match config_rules.tiebreak_mode.as_deref() {
        None | Some("lexicographic") => TieBreakMode::Lexicographic,
        Some("random") => {
            let seed = match config_rules.random_seed.as_ref().map(|s| s.parse::<u32>()) {
                Some(Result::Ok(x)) => x,
                x => {
                    whatever!(
                        "Tiebreak mode random requires a numeric randomSeed, got {:?}",
                        x
                    )
                }
            };
            TieBreakMode::Random(seed)
        }
        Some(x) => {
            whatever!("Unknown tiebreak mode {:?}", x)
        }
    };
    let rules = TallyRules {
        counting_method,
        tiebreak_mode,
        max_winners: config_rules.max_winners.unwrap_or(MAX_WINNERS),
        parallel: config_rules.parallel.unwrap_or(false),
    };
    rules.validate().context(InvalidRulesSnafu)?;
    Ok(rules)
}

fn guess_provider(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("csv") => "csv",
        Some("xlsx") => "xlsx",
        _ => "json",
    }
}

fn source_from_args(args: &Args, input: &str) -> VoteSource {
    let provider = args
        .input_type
        .clone()
        .unwrap_or_else(|| guess_provider(input).to_string());
    VoteSource::new(&provider, input)
}

/// The configuration used when no configuration file is given.
fn default_config(args: &Args) -> RunResult<TallyConfig> {
    let input = match args.input.as_ref() {
        Some(input) => input,
        None => {
            whatever!("No input was given: use --config or --input")
        }
    };
    Ok(TallyConfig {
        output_settings: OutputSettings {
            tally_name: simplify_file_name(input),
            output_path: None,
        },
        vote_sources: vec![source_from_args(args, input)],
        rules: ConfigRules::default(),
    })
}

/// The configuration, and the directory that relative paths start from.
fn load_config(args: &Args) -> RunResult<(TallyConfig, PathBuf)> {
    let (mut config, root) = match args.config.as_ref() {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default();
            (config, root)
        }
        None => (default_config(args)?, PathBuf::new()),
    };
    if let Some(method) = args.counting_method.as_ref() {
        config.rules.counting_method = Some(method.clone());
    }
    info!("config: {:?}", config);
    Ok((config, root))
}

/// The sources to read, with their resolved paths.
fn vote_sources(args: &Args, config: &TallyConfig, root: &Path) -> Vec<(String, VoteSource)> {
    let mut sources: Vec<(String, VoteSource)> = match args.input.as_ref() {
        Some(input) => {
            // Positions and worksheet come from the configured source of the same kind.
            let from_args = source_from_args(args, input);
            let source = match config
                .vote_sources
                .iter()
                .find(|vs| vs.provider == from_args.provider)
            {
                Some(vs) => VoteSource {
                    file_path: input.clone(),
                    ..vs.clone()
                },
                None => from_args,
            };
            vec![(input.clone(), source)]
        }
        None => config
            .vote_sources
            .iter()
            .map(|vs| (root.join(&vs.file_path).display().to_string(), vs.clone()))
            .collect(),
    };
    if let Some(name) = args.excel_worksheet_name.as_ref() {
        for (_, vs) in sources.iter_mut() {
            vs.excel_worksheet_name = Some(name.clone());
        }
    }
    sources
}

fn read_vote_data(path: &str, source: &VoteSource, builder: &mut Builder) -> RunResult<usize> {
    info!("Attempting to read vote file {:?}", path);
    match source.provider.as_str() {
        "json" => io_json::read_json_votes(path, builder),
        "csv" => io_csv::read_csv_votes(path, source, builder),
        "xlsx" => io_xlsx::read_excel_votes(path, source, builder),
        x => {
            whatever!("Provider not implemented {:?}", x)
        }
    }
}

fn rounds_to_json(rounds: &[SelectionRound]) -> Vec<JSValue> {
    rounds
        .iter()
        .map(|round| {
            let mut tally: JSMap<String, JSValue> = JSMap::new();
            for (name, count) in round.tally.iter() {
                tally.insert(name.clone(), json!(count));
            }
            json!({
                "position": round.position,
                "threshold": round.threshold,
                "tally": tally,
                "eliminated": round.eliminated,
                "winner": round.winner,
            })
        })
        .collect()
}

fn build_summary_js(config: &TallyConfig, rules: &TallyRules, outcome: &TallyOutcome) -> JSValue {
    let c = OutputConfig {
        tally_name: config.output_settings.tally_name.clone(),
        counting_method: counting_method_name(rules.counting_method).to_string(),
        tiebreak_mode: tiebreak_mode_name(rules.tiebreak_mode).to_string(),
        random_seed: match rules.tiebreak_mode {
            TieBreakMode::Random(seed) => Some(seed.to_string()),
            TieBreakMode::Lexicographic => None,
        },
    };

    let mut results: JSMap<String, JSValue> = JSMap::new();
    for (task, res) in outcome.results.iter() {
        if let Ok(task_result) = res {
            results.insert(
                task.clone(),
                json!({
                    "winners": task_result.winners,
                    "rounds": rounds_to_json(&task_result.rounds),
                }),
            );
        }
    }
    let mut errors: JSMap<String, JSValue> = JSMap::new();
    for (task, err) in outcome.failures() {
        errors.insert(task, json!(err.to_string()));
    }

    json!({
        "config": c,
        "results": results,
        "errors": errors,
    })
}

/// Reads all the vote sources and counts every task.
fn tally_summary(args: &Args, config: &TallyConfig, root: &Path) -> RunResult<JSValue> {
    let rules = validate_rules(&config.rules)?;

    let sources = vote_sources(args, config, root);
    if sources.is_empty() {
        whatever!("No vote source found in the configuration");
    }

    let mut builder = Builder::new(&rules).context(InvalidRulesSnafu)?;
    for (path, source) in sources.iter() {
        let count = read_vote_data(path, source, &mut builder)?;
        info!("Read {} votes from {:?}", count, path);
    }

    let outcome = builder.count().context(InvalidRulesSnafu)?;
    debug!("outcome: {:?}", outcome.winners());

    Ok(build_summary_js(config, &rules, &outcome))
}

fn check_reference(reference_path: &str, pretty_js_stats: &str) -> RunResult<()> {
    let summary_ref = read_summary(reference_path)?;
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(SerializingSummarySnafu)?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference summary");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        whatever!("Difference detected between calculated summary and reference summary")
    }
    Ok(())
}

pub fn run_tally(args: &Args) -> RunResult<()> {
    let (config, root) = load_config(args)?;

    let summary = tally_summary(args, &config, &root)?;
    let pretty_js_stats = serde_json::to_string_pretty(&summary).context(SerializingSummarySnafu)?;

    let out = args.out.clone().or_else(|| {
        config
            .output_settings
            .output_path
            .as_ref()
            .map(|p| root.join(p).display().to_string())
    });
    match out.as_deref() {
        None | Some("stdout") => println!("{}", pretty_js_stats),
        Some(path) => {
            fs::write(path, &pretty_js_stats).context(WritingOutputSnafu { path })?;
            info!("Summary written to {:?}", path);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(reference_path) = args.reference.as_ref() {
        check_reference(reference_path, &pretty_js_stats)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_path(name: &str) -> String {
        format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn tmp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("ranktally-{}-{}", std::process::id(), name))
            .display()
            .to_string()
    }

    fn rules(method: Option<&str>, tiebreak: Option<&str>, seed: Option<&str>) -> ConfigRules {
        ConfigRules {
            counting_method: method.map(|s| s.to_string()),
            tiebreak_mode: tiebreak.map(|s| s.to_string()),
            random_seed: seed.map(|s| s.to_string()),
            ..ConfigRules::default()
        }
    }

    #[test]
    fn default_rules() {
        let r = validate_rules(&ConfigRules::default()).unwrap();
        assert_eq!(r, TallyRules::DEFAULT_RULES);
    }

    #[test]
    fn random_rules_need_a_seed() {
        let r = validate_rules(&rules(Some("instantRunoff"), Some("random"), Some("42"))).unwrap();
        assert_eq!(r.counting_method, CountingMethod::InstantRunoff);
        assert_eq!(r.tiebreak_mode, TieBreakMode::Random(42));
        assert!(validate_rules(&rules(None, Some("random"), None)).is_err());
        assert!(validate_rules(&rules(None, Some("random"), Some("abc"))).is_err());
    }

    #[test]
    fn unknown_rules() {
        assert!(validate_rules(&rules(Some("borda"), None, None)).is_err());
        assert!(validate_rules(&rules(None, Some("coinFlip"), None)).is_err());
        let too_many = ConfigRules {
            max_winners: Some(10),
            ..ConfigRules::default()
        };
        assert!(matches!(
            validate_rules(&too_many),
            Err(RunError::InvalidRules { .. })
        ));
    }

    #[test]
    fn providers_from_extensions() {
        assert_eq!(guess_provider("votes.csv"), "csv");
        assert_eq!(guess_provider("/data/votes.xlsx"), "xlsx");
        assert_eq!(guess_provider("votes.json"), "json");
        assert_eq!(guess_provider("votes"), "json");
    }

    #[test]
    fn config_with_reference() {
        let out = tmp_path("leader.json");
        let args = Args {
            config: Some(data_path("leader_config.json")),
            reference: Some(data_path("leader_expected_summary.json")),
            out: Some(out.clone()),
            ..Args::default()
        };
        run_tally(&args).unwrap();
        let written: JSValue = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["results"]["Leader"]["winners"], json!(["X", "Y"]));
        let _ = fs::remove_file(out);
    }

    #[test]
    fn reference_mismatch_fails() {
        let args = Args {
            input: Some(data_path("leader_votes.csv")),
            reference: Some(data_path("leader_expected_summary.json")),
            out: Some(tmp_path("mismatch.json")),
            ..Args::default()
        };
        let err = run_tally(&args).unwrap_err();
        assert!(matches!(err, RunError::Whatever { .. }));
        let _ = fs::remove_file(tmp_path("mismatch.json"));
    }

    #[test]
    fn csv_input_without_config() {
        let args = Args {
            input: Some(data_path("leader_votes.csv")),
            counting_method: Some("instantRunoff".to_string()),
            ..Args::default()
        };
        let (config, root) = load_config(&args).unwrap();
        assert_eq!(config.output_settings.tally_name, "leader_votes");
        let summary = tally_summary(&args, &config, &root).unwrap();
        assert_eq!(summary["config"]["countingMethod"], json!("instantRunoff"));
        assert_eq!(summary["results"]["Leader"]["winners"], json!(["X", "Y"]));
        assert_eq!(summary["errors"], json!({}));
    }

    #[test]
    fn xlsx_input_with_worksheet() {
        let args = Args {
            input: Some(data_path("leader_votes.xlsx")),
            ..Args::default()
        };
        let (config, root) = load_config(&args).unwrap();
        let summary = tally_summary(&args, &config, &root).unwrap();
        assert_eq!(summary["results"]["Leader"]["winners"], json!(["X", "Y"]));

        let args = Args {
            input: Some(data_path("leader_votes.xlsx")),
            input_type: Some("xlsx".to_string()),
            excel_worksheet_name: Some("Poll".to_string()),
            ..Args::default()
        };
        let (config, root) = load_config(&args).unwrap();
        let summary = tally_summary(&args, &config, &root).unwrap();
        assert_eq!(summary["results"]["Poll"]["winners"], json!(["Z"]));
        assert!(summary["results"].get("Leader").is_none());
    }

    #[test]
    fn input_keeps_configured_positions() {
        let mut configured = VoteSource::new("csv", "old.csv");
        configured._first_vote_row_index = Some(json!(1));
        configured._vote_column_index = Some(json!("D"));
        let config = TallyConfig {
            output_settings: OutputSettings {
                tally_name: "Weekly".to_string(),
                output_path: None,
            },
            vote_sources: vec![VoteSource::new("json", "votes.json"), configured],
            rules: ConfigRules::default(),
        };
        let args = Args {
            input: Some("new.csv".to_string()),
            ..Args::default()
        };
        let sources = vote_sources(&args, &config, Path::new("/data"));
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].0, "new.csv");
        assert_eq!(sources[0].1.file_path, "new.csv");
        assert_eq!(sources[0].1.first_vote_row_index().unwrap(), 1);
        assert_eq!(sources[0].1.vote_column_index().unwrap(), 4);

        // No configured source of that kind: default positions.
        let args = Args {
            input: Some("new.xlsx".to_string()),
            ..Args::default()
        };
        let sources = vote_sources(&args, &config, Path::new("/data"));
        assert_eq!(sources[0].1, VoteSource::new("xlsx", "new.xlsx"));
    }

    #[test]
    fn missing_input() {
        let err = run_tally(&Args::default()).unwrap_err();
        assert!(matches!(err, RunError::Whatever { .. }));
    }

    #[test]
    fn unknown_provider() {
        let args = Args {
            input: Some(data_path("leader_votes.csv")),
            input_type: Some("ods".to_string()),
            ..Args::default()
        };
        let (config, root) = load_config(&args).unwrap();
        assert!(tally_summary(&args, &config, &root).is_err());
    }
}
