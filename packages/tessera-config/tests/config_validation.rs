use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use tessera_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(section: &str, key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let mut table = root.as_table_mut().expect("Template config must be a table.");

	for part in section.split('.') {
		table = table
			.get_mut(part)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{section}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("tessera_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> tessera_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = tessera_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn base_config() -> Config {
	load_payload(SAMPLE_CONFIG_TEMPLATE_TOML.to_string()).expect("Template config must be valid.")
}

fn validation_message(err: Error) -> String {
	match err {
		Error::Validation { message } => message,
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[test]
fn template_config_loads_and_normalizes() {
	let cfg = base_config();

	assert_eq!(cfg.storage.qdrant.inference_model, None);
	assert_eq!(cfg.storage.qdrant.vector_dim, 256);
	assert_eq!(cfg.fusion.method, "rrf");
	assert_eq!(cfg.search.top_k, 10);
	assert!(cfg.sharding.wait_for_ready);
}

#[test]
fn enum_strings_are_case_insensitive() {
	let cfg = load_payload(sample_toml_with("fusion", "method", Value::String(" MIN_MAX ".into())))
		.expect("Expected mixed-case fusion method to load.");

	assert_eq!(cfg.fusion.method, "min_max");
}

#[test]
fn vector_dim_must_be_positive() {
	let err = load_payload(sample_toml_with("storage.qdrant", "vector_dim", Value::Integer(0)))
		.expect_err("Expected vector_dim validation error.");

	assert!(validation_message(err).contains("storage.qdrant.vector_dim"));
}

#[test]
fn unknown_distance_is_rejected() {
	let err =
		load_payload(sample_toml_with("storage.qdrant", "distance", Value::String("manhattan".into())))
			.expect_err("Expected distance validation error.");

	assert!(validation_message(err).contains("storage.qdrant.distance"));
}

#[test]
fn bm25_b_must_be_a_fraction() {
	let err = load_payload(sample_toml_with("bm25", "b", Value::Float(1.5)))
		.expect_err("Expected bm25.b validation error.");

	assert!(validation_message(err).contains("bm25.b"));
}

#[test]
fn rebuild_ratio_must_exceed_one() {
	let mut cfg = base_config();

	cfg.bm25.rebuild_document_ratio = 1.0;

	let err = tessera_config::validate(&cfg).expect_err("Expected ratio validation error.");

	assert!(validation_message(err).contains("bm25.rebuild_document_ratio"));
}

#[test]
fn provider_mode_requires_api_key() {
	let err = load_payload(sample_toml_with("providers.embedding", "api_key", Value::String(" ".into())))
		.expect_err("Expected api_key validation error.");

	assert!(validation_message(err).contains("providers.embedding.api_key"));
}

#[test]
fn server_mode_requires_inference_model() {
	let mut cfg = base_config();

	cfg.semantic.mode = "server".to_string();

	let err = tessera_config::validate(&cfg).expect_err("Expected inference_model error.");

	assert!(validation_message(err).contains("storage.qdrant.inference_model"));

	cfg.storage.qdrant.inference_model = Some("sentence-transformers/all-minilm-l6-v2".to_string());

	tessera_config::validate(&cfg).expect("Expected server mode with a model to validate.");
}

#[test]
fn top_k_and_rrf_k_must_be_positive() {
	let mut cfg = base_config();

	cfg.search.top_k = 0;

	assert!(validation_message(tessera_config::validate(&cfg).expect_err("top_k")).contains("top_k"));

	cfg.search.top_k = 5;
	cfg.fusion.rrf_k = 0.0;

	assert!(validation_message(tessera_config::validate(&cfg).expect_err("rrf_k")).contains("rrf_k"));
}

#[test]
fn missing_file_reports_read_error() {
	let path = env::temp_dir().join("tessera_config_test_missing.toml");
	let err = tessera_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}
