use std::fs;
use std::path::PathBuf;

use serde_json::json;

use pe::assertion::{check_all, Assertion, AssertionKind};
use pe::benchmark::{format_benchmark, Benchmark, BenchmarkFormat};
use pe::config::{config_dir, load_config, save_config, Format, Settings};
use pe::error::PeError;
use pe::eval::{format_report, read_report, write_report, Evaluator, ReportFormat};
use pe::format::format_file;
use pe::lint::{collect_config_files, vet_file};
use pe::template::{Template, Variables};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn vars(pairs: &[(&str, &str)]) -> Variables {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect()
}

#[test]
fn test_load_yaml_and_json_configs() {
    let yaml = load_config(&fixture_path("capitals/config.yaml")).unwrap();
    assert_eq!(yaml.description.as_deref(), Some("Capital cities"));
    assert_eq!(yaml.prompts.len(), 2);
    assert_eq!(yaml.tests.len(), 2);
    assert!(yaml.validate().is_ok());

    let json = load_config(&fixture_path("capitals/config.json")).unwrap();
    assert_eq!(json.providers, vec!["mock"]);
    assert_eq!(
        json.tests[0].parse_assertions().unwrap()[0].kind,
        AssertionKind::StartsWith
    );
}

#[test]
fn test_render_template_with_include_escape_and_conditional() {
    let dir = fixture_path("templates");
    let source = fs::read_to_string(dir.join("greeting.txt")).unwrap();

    let vip = vars(&[("name", "Ada"), ("team", "Core"), ("vip", "yes")]);
    let out = Template::new(source.as_str(), &vip)
        .with_base_dir(&dir)
        .process()
        .unwrap();
    assert_eq!(
        out,
        "-- Core team\n\nHello Ada! Use {{placeholders}} for variables.\nYou get early access. \n"
    );

    let regular = vars(&[("name", "Bo"), ("team", "Core"), ("vip", "no")]);
    let out = Template::new(source.as_str(), &regular)
        .with_base_dir(&dir)
        .process()
        .unwrap();
    assert!(out.ends_with("for variables.\n\n"));
}

#[test]
fn test_validate_template_reports_missing_pieces() {
    let dir = fixture_path("templates");
    let empty = Variables::new();
    let problems = Template::new("{{who}} #include \"nope.txt\" {{file \"signature.txt\"}}", &empty)
        .with_base_dir(&dir)
        .validate();
    assert_eq!(problems, vec!["missing variable: who", "missing file: nope.txt"]);
}

#[test]
fn test_inclusion_cycle_hits_depth_limit() {
    let dir = fixture_path("templates");
    let empty = Variables::new();
    let err = Template::new("{{file \"loop_a.txt\"}}", &empty)
        .with_base_dir(&dir)
        .with_max_depth(4)
        .process()
        .unwrap_err();
    assert!(matches!(err, PeError::MaxDepthExceeded { limit: 4 }));
}

#[test]
fn test_eval_capitals_end_to_end() {
    let path = fixture_path("capitals/config.yaml");
    let config = load_config(&path).unwrap();
    let registry = pe::build_registry(&Settings::default());

    let report = Evaluator::new(&registry)
        .with_base_dir(config_dir(&path))
        .run(&config)
        .unwrap();

    assert_eq!(report.results.len(), 4);
    assert!(report.all_passed(), "{report:#?}");

    let from_file = &report.results[2];
    assert_eq!(from_file.prompt.label, "file://prompts/capital.txt");
    assert_eq!(
        from_file.prompt.raw,
        "You are a geography tutor.\n\nName the capital of France.\n"
    );
    assert_eq!(from_file.output(), "The capital of France is Paris.");

    let text = format_report(&report, ReportFormat::Text).unwrap();
    assert!(text.contains("Pass Rate: 100.0%"));
    assert!(text.contains("Total Tests: 4"));
}

#[test]
fn test_eval_report_round_trip_through_yaml() {
    let path = fixture_path("capitals/config.json");
    let config = load_config(&path).unwrap();
    let registry = pe::build_registry(&Settings::default());
    let report = Evaluator::new(&registry).run(&config).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results.yaml");
    write_report(&report, Some(&out), ReportFormat::Yaml).unwrap();

    let loaded = read_report(&out).unwrap();
    assert_eq!(loaded.eval_id, report.eval_id);
    assert_eq!(loaded.results[0].id, report.results[0].id);
    assert_eq!(loaded.stats.successes, 1);
}

#[test]
fn test_settings_alias_reaches_provider() {
    let path = fixture_path("capitals/config.json");
    let mut config = load_config(&path).unwrap();
    config.providers = vec!["tutor".into()];

    let mut settings = Settings::default();
    settings.providers.insert("tutor".into(), "echo".into());
    let registry = pe::build_registry(&settings);

    let report = Evaluator::new(&registry).run(&config).unwrap();
    assert_eq!(report.results[0].output(), "What is the capital of France?");
    assert_eq!(report.results[0].provider, "tutor");
}

#[test]
fn test_vet_fixtures() {
    let files = collect_config_files(&[fixture_path("invalid")], &[]).unwrap();
    assert_eq!(files.len(), 2);

    let messages: Vec<String> = files
        .iter()
        .map(|f| vet_file(f).unwrap_err().to_string())
        .collect();
    assert_eq!(
        messages,
        vec![
            "Invalid config: test 0: invalid assertion 0: missing 'type' field",
            "Invalid config: no tests specified",
        ]
    );

    assert!(vet_file(&fixture_path("capitals/config.yaml")).is_ok());
}

#[test]
fn test_checked_in_json_fixture_is_formatted() {
    let formatted = format_file(&fixture_path("capitals/config.json"), None).unwrap();
    assert!(!formatted.is_changed(), "{}", formatted.formatted);
}

#[test]
fn test_save_config_converts_between_formats() {
    let config = load_config(&fixture_path("capitals/config.yaml")).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let json_path = dir.path().join("capitals.json");
    save_config(&config, &json_path, Some(Format::Json)).unwrap();
    assert_eq!(load_config(&json_path).unwrap(), config);
}

#[test]
fn test_benchmark_capitals() {
    let path = fixture_path("capitals/config.yaml");
    let config = load_config(&path).unwrap();
    let registry = pe::build_registry(&Settings::default());

    let report = Benchmark::new(&registry)
        .with_base_dir(config_dir(&path))
        .with_iterations(3)
        .with_concurrency(2)
        .run(&config)
        .unwrap();
    assert_eq!(report.results.len(), 6);
    assert_eq!(report.summaries.len(), 2);
    assert!(report.summaries.iter().all(|s| s.runs == 3 && s.errors == 0));

    let csv = format_benchmark(&report, BenchmarkFormat::Csv).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.starts_with("Prompt,Provider,AvgLatencyMs"));
}

#[test]
fn test_assertions_against_provider_style_output() {
    let output = r#"{"country": "France", "capital": "Paris", "population": 2102650}"#;
    let assertions = vec![
        Assertion::new("json", true),
        Assertion::new("json", "Paris").with_path("capital"),
        Assertion::new(
            "json",
            json!({"type": "object", "required": ["country", "capital"]}),
        ),
        Assertion::new("regex", r#""capital":\s*"P\w+""#),
        Assertion::new("length", ">=20,<=100"),
        Assertion::new("similar", "Paris"),
    ];

    let results = check_all(output, &assertions);
    let passed: Vec<bool> = results.iter().map(|r| r.success).collect();
    assert_eq!(passed, vec![true, true, true, true, true, false]);
    assert!(results[5].reason.contains("similar"));
}
