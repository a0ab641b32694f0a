use std::path::PathBuf;

use compintel_core::{AnalysisConfig, SourceId};

use super::*;
use crate::analyze::disable_unreachable_sources;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).expect("expected valid cli args")
}

#[test]
fn parses_analyze_with_defaults() {
    let cli = parse(&["compintel", "analyze", "--name", "Acme S.r.l."]);
    let Commands::Analyze(args) = cli.command else {
        panic!("expected analyze command");
    };
    assert_eq!(args.name, "Acme S.r.l.");
    assert_eq!(args.competitors, 5);
    assert!(args.fiscal_id.is_none());
    assert!(args.candidates.is_none());
    assert!(args.output.is_none());
}

#[test]
fn parses_analyze_with_all_options() {
    let cli = parse(&[
        "compintel",
        "analyze",
        "--name",
        "Acme",
        "--fiscal-id",
        "00743110157",
        "--domain",
        "acme.it",
        "--competitors",
        "3",
        "--candidates",
        "config/candidates.yaml",
        "--output",
        "report.json",
    ]);
    let Commands::Analyze(args) = cli.command else {
        panic!("expected analyze command");
    };
    assert_eq!(args.competitors, 3);
    assert_eq!(
        args.candidates,
        Some(PathBuf::from("config/candidates.yaml"))
    );
    let entity = args.entity_ref();
    assert_eq!(entity.fiscal_id.as_deref(), Some("00743110157"));
    assert_eq!(entity.web_domain(), "acme.it");
}

#[test]
fn analyze_requires_a_name() {
    assert!(Cli::try_parse_from(["compintel", "analyze"]).is_err());
}

#[test]
fn parses_config_command() {
    assert!(matches!(
        parse(&["compintel", "config"]).command,
        Commands::Config
    ));
}

#[test]
fn sources_without_url_are_disabled() {
    let mut config = AnalysisConfig::default();
    config.sources.registry.base_url = Some("http://registry.local".to_string());
    disable_unreachable_sources(&mut config, false);
    assert!(config.sources.registry.enabled);
    for source in [
        SourceId::Financial,
        SourceId::Seo,
        SourceId::Social,
        SourceId::Search,
    ] {
        assert!(!config.sources.get(source).enabled, "{source} still enabled");
    }
}

#[test]
fn static_candidates_keep_search_enabled() {
    let mut config = AnalysisConfig::default();
    disable_unreachable_sources(&mut config, true);
    assert!(config.sources.search.enabled);
    assert!(!config.sources.seo.enabled);
}
