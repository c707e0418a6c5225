//! Fixture-driven integration tests
//!
//! Parses the fixture corpus, renders it and validates the rendered text
//! against the same model. The `D2_OUTPUT_*` tests validate output produced
//! by `k8sdd` against a cluster the fixtures were applied to; they skip when
//! the variables are unset.

use std::env;
use std::path::PathBuf;
use topology_lib::validate::D2Validator;
use topology_lib::{
    load_fixture_files, render_to_string, Cluster, FixtureParser, RenderOptions, TopologyLogger,
    WorkloadKind,
};

const NAMESPACE: &str = "k8s-d2-test";

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn parse_fixtures(dirs: &[&str]) -> Cluster {
    let paths: Vec<PathBuf> = dirs.iter().map(|dir| fixtures_dir().join(dir)).collect();
    let files = load_fixture_files(&paths).expect("Failed to read fixtures");
    FixtureParser::new(NAMESPACE).parse(&files, &TopologyLogger::disabled())
}

fn base_cluster() -> Cluster {
    parse_fixtures(&["base"])
}

fn full_cluster() -> Cluster {
    parse_fixtures(&["base", "storage"])
}

#[test]
fn test_base_fixtures_model() {
    let cluster = base_cluster();
    let ns = cluster.namespace(NAMESPACE).expect("namespace should exist");

    let deployments: Vec<_> = ns.deployments.iter().map(|w| (w.name.as_str(), w.replicas)).collect();
    assert_eq!(deployments, vec![("web-frontend", 3), ("api-backend", 2)]);

    assert_eq!(ns.stateful_sets.len(), 1);
    assert_eq!(ns.stateful_sets[0].kind, WorkloadKind::StatefulSet);
    assert_eq!(ns.daemon_sets[0].name, "log-collector");

    let services: Vec<_> = ns.services.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(services, vec!["web-service", "api-service", "database-service"]);

    assert_eq!(ns.config_maps, 2);
    assert_eq!(ns.secrets, 2);
    assert!(ns.pvcs.is_empty());
}

#[test]
fn test_stateful_set_claims_are_synthesized() {
    let cluster = base_cluster();
    let database = &cluster.namespaces[0].stateful_sets[0];

    let claims: Vec<_> = database
        .volume_mounts
        .iter()
        .map(|m| (m.claim_name.as_str(), m.mount_path.as_str(), m.read_only))
        .collect();
    assert_eq!(
        claims,
        vec![
            ("data-database-0", "/var/lib/postgresql/data", false),
            ("data-database-1", "/var/lib/postgresql/data", false),
        ]
    );
}

#[test]
fn test_base_round_trip() {
    let cluster = base_cluster();
    let output = render_to_string(&cluster, &RenderOptions::default());

    let report = D2Validator::new(&cluster, &output).report();
    assert!(report.passed(), "Validation failed: {:#?}", report);

    assert!(output.contains("svc_web_service -> web_frontend"));
    assert!(output.contains("svc_api_service -> api_backend"));
    assert!(output.contains("svc_database_service -> database"));
    assert!(output.contains("● web-frontend (3)"));
    assert!(output.contains("◉ database (2)"));
    assert!(output.contains("\"◈ log-collector\""));
    assert!(output.contains("CM: 2 | Sec: 2"));
    assert!(output.contains("database -> pvc_data_database_0: \"/var/lib/postgresql/data (rw)\""));
    assert!(output.contains("log_collector -> pvc_logs_volume: \"/logs (rw)\""));
    // hostPath and configMap mounts carry no storage edge
    assert!(!output.contains("/var/log (ro)"));
    assert!(!output.contains("/etc/nginx/conf.d"));
}

#[test]
fn test_storage_round_trip() {
    let cluster = full_cluster();
    let ns = &cluster.namespaces[0];

    let pvcs: Vec<_> = ns
        .pvcs
        .iter()
        .map(|p| (p.name.as_str(), p.storage_class.as_str(), p.capacity.as_str()))
        .collect();
    assert_eq!(
        pvcs,
        vec![
            ("data-volume", "k8s-d2-test-standard", "1Gi"),
            ("logs-volume", "k8s-d2-test-standard", "500Mi"),
        ]
    );

    let output = render_to_string(&cluster, &RenderOptions::default());
    let validator = D2Validator::new(&cluster, &output);

    assert!(validator.validate_resources().is_ok());
    assert!(validator.validate_volume_connections().is_ok());
    assert!(validator.report().passed());
    // declared PVCs are not declared a second time as edge targets
    assert_eq!(output.matches("pvc_logs_volume: {").count(), 1);
}

#[test]
fn test_render_is_idempotent() {
    let cluster = full_cluster();
    let options = RenderOptions { grid_columns: 2 };

    assert_eq!(
        render_to_string(&cluster, &options),
        render_to_string(&cluster, &options)
    );
}

#[test]
fn test_validator_catches_tampered_output() {
    let cluster = base_cluster();
    let output = render_to_string(&cluster, &RenderOptions::default())
        .replace("svc_api_service -> api_backend\n", "")
        .replace("● web-frontend (3)", "● web-frontend (1)");

    let report = D2Validator::new(&cluster, &output).report();

    assert!(!report.passed());
    assert!(!report.check("service_connections").unwrap().passed());
    assert!(!report.check("workload_labels").unwrap().passed());
    assert!(report.check("syntax").unwrap().passed());
    assert_eq!(report.failure_count(), 2);
}

/// Validates D2 output of a live run against the base fixtures
#[test]
fn test_d2_output_basic_from_env() {
    let Ok(output) = env::var("D2_OUTPUT_BASIC") else {
        eprintln!("D2_OUTPUT_BASIC not set, skipping");
        return;
    };

    let cluster = base_cluster();
    let validator = D2Validator::new(&cluster, &output);

    let checks = [
        ("syntax", validator.validate_syntax()),
        ("resources", validator.validate_resources()),
        ("workload labels", validator.validate_workload_labels()),
        ("service connections", validator.validate_service_connections()),
        ("config info", validator.validate_config_info()),
    ];
    let failures: Vec<String> = checks
        .iter()
        .filter_map(|(name, result)| result.as_ref().err().map(|e| format!("{}: {}", name, e)))
        .collect();

    assert!(failures.is_empty(), "Validation failed:\n{}", failures.join("\n"));
}

/// Validates D2 output of a live `--include-storage` run
#[test]
fn test_d2_output_storage_from_env() {
    let Ok(output) = env::var("D2_OUTPUT_STORAGE") else {
        eprintln!("D2_OUTPUT_STORAGE not set, skipping");
        return;
    };

    let cluster = full_cluster();
    let validator = D2Validator::new(&cluster, &output);

    validator.validate_syntax().expect("Syntax validation failed");
    validator.validate_resources().expect("Resource validation failed");
    validator
        .validate_volume_connections()
        .expect("PVC connection validation failed");
}

/// `--quiet` must not change the diagram
#[test]
fn test_d2_output_quiet_mode() {
    let (Ok(basic), Ok(quiet)) = (env::var("D2_OUTPUT_BASIC"), env::var("D2_OUTPUT_QUIET")) else {
        eprintln!("D2_OUTPUT_BASIC or D2_OUTPUT_QUIET not set, skipping");
        return;
    };

    assert_eq!(
        basic.len(),
        quiet.len(),
        "Quiet mode output length differs from normal mode"
    );
    assert_eq!(basic, quiet, "Quiet mode output differs from normal mode");
}
