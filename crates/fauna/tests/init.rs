use fauna::database::Database;
use fauna::domain::config::ApiConfig;

#[tokio::test]
async fn every_slice_initializes_on_a_migrated_database() {
    let db = Database::builder().url("sqlite::memory:").migrations(fauna::migrations()).init().await.unwrap();

    let slices = fauna::init(&ApiConfig::default(), &db).await.expect("init");
    let mut names: Vec<_> = slices.iter().map(|s| s.name()).collect();
    names.sort_unstable();
    assert_eq!(names, ["Players", "Spawns"]);
}

#[test]
fn migrations_are_ordered_and_unique() {
    let keys: Vec<_> = fauna::migrations().iter().map(|m| format!("{}/{}", m.slice, m.version)).collect();
    assert_eq!(keys, ["spawns/0001", "players/0001"]);
    assert!(fauna::features::is_enabled("spawns"));
}
