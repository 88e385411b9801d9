mod common;

use common::{branch, memory_service, reference};
use fauna_spawns::NearbyQuery;
use fauna_spawns::geo::haversine_distance;
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().build().expect("runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn results_are_sorted_and_within_range(
        origin in (-60.0f64..60.0, -170.0f64..170.0),
        offsets in prop::collection::vec((-0.05f64..0.05, -0.05f64..0.05), 0..40),
        max_distance in 0.0f64..8_000.0,
    ) {
        let (lat, lng) = origin;
        let branches = offsets
            .iter()
            .enumerate()
            .map(|(i, (dlat, dlng))| branch(&format!("b{i:02}"), lat + dlat, lng + dlng, 1))
            .collect();
        let (_store, service) = memory_service(&reference(branches, &[]));

        let query = NearbyQuery { latitude: Some(lat), longitude: Some(lng), max_distance: Some(max_distance) };
        let found = runtime().block_on(service.nearby(query)).expect("nearby");

        for pair in found.windows(2) {
            prop_assert!(pair[0].distance <= pair[1].distance);
        }
        for hit in &found {
            prop_assert!(hit.distance <= max_distance);
        }

        // Nothing inside the radius is missed by the prefilter.
        let expected = offsets
            .iter()
            .filter(|(dlat, dlng)| haversine_distance(lat, lng, lat + dlat, lng + dlng) <= max_distance)
            .count();
        prop_assert_eq!(found.len(), expected);
    }
}

#[tokio::test]
async fn ties_break_on_id_and_far_branches_are_excluded() {
    let data = reference(
        vec![
            branch("west", 0.0, -0.001, 1),
            branch("east", 0.0, 0.001, 1),
            branch("here", 0.0, 0.0, 1),
            branch("far", 1.0, 1.0, 1),
        ],
        &[],
    );
    let (_store, service) = memory_service(&data);

    let found = service
        .nearby(NearbyQuery { latitude: Some(0.0), longitude: Some(0.0), max_distance: Some(500.0) })
        .await
        .unwrap();

    let ids: Vec<_> = found.iter().map(|b| b.branch.id.as_str()).collect();
    assert_eq!(ids, ["here", "east", "west"]);
    assert!(found[0].distance.abs() < f64::EPSILON);
}

#[tokio::test]
async fn empty_result_is_fine() {
    let (_store, service) = memory_service(&reference(vec![branch("b1", 10.0, 10.0, 1)], &[]));
    let found = service
        .nearby(NearbyQuery { latitude: Some(-10.0), longitude: Some(-10.0), max_distance: None })
        .await
        .unwrap();
    assert!(found.is_empty());
}
