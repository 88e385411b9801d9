use fauna_domain::config::{ApiConfig, DatabaseConfig, LoggingConfig, ServerConfig, SpawnsConfig};
use serde_json::json;

#[test]
fn config_defaults_are_sane() {
    let server = ServerConfig::default();
    assert_eq!(server.port, 4583);
    assert!(server.ssl.is_none());

    let db = DatabaseConfig::default();
    assert_eq!(db.url, "sqlite::memory:");
    assert!(db.max_connections > 0);

    let spawns = SpawnsConfig::default();
    assert_eq!(spawns.min_ttl_ms, 3_600_000);
    assert_eq!(spawns.max_ttl_ms, 36_000_000);
    assert!((spawns.default_max_distance_m - 1_000.0).abs() < f64::EPSILON);
    assert_eq!(spawns.replenish_attempts, 3);
    assert!(spawns.seed_file.is_none());

    let logging = LoggingConfig::default();
    assert_eq!(logging.level, "info");
    assert!(logging.directory.is_none());
}

#[test]
fn api_config_deserializes_partial_sections() {
    let raw = json!({
        "server": { "address": "::", "port": 8080 },
        "database": { "url": "sqlite://fauna.db" },
        "spawns": { "min_ttl_ms": 1000, "max_ttl_ms": 2000, "seed_file": "seed.json" }
    });

    let cfg: ApiConfig = serde_json::from_value(raw).expect("config deserialize");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.database.url, "sqlite://fauna.db");
    assert_eq!(cfg.database.busy_timeout_ms, 5_000);
    assert_eq!(cfg.spawns.max_ttl_ms, 2000);
    assert_eq!(cfg.spawns.replenish_attempts, 3);
    assert_eq!(cfg.spawns.seed_file, Some(std::path::PathBuf::from("seed.json")));
    assert_eq!(cfg.logging.max_files, 7);
}

#[test]
fn api_config_clones_share_until_mutated() {
    let base = ApiConfig::default();
    let mut tweaked = base.clone();
    tweaked.server.port = 9000;

    assert_eq!(base.server.port, 4583);
    assert_eq!(tweaked.server.port, 9000);
}
