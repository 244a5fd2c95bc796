//! Recommendation and discovery tests for hearth-engine

use std::sync::{Arc, Mutex};

use hearth_domain::{ConnectionType, Location, LocationFilter, PageRequest, Resident, UserId};
use hearth_engine::{
    ConnectionEngine, DiscoverOrder, DiscoverQuery, EngineConfig, EngineError, PendingDirection,
    ReasonTag,
};
use hearth_store::{ResidentRegistry, SqliteStore};

type Engine = ConnectionEngine<SqliteStore, ResidentRegistry>;

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn resident(id: &str, name: &str, neighborhood: Option<&str>, joined_at: u64) -> Resident {
    let r = Resident::new(user(id), name, joined_at);
    match neighborhood {
        Some(n) => r.with_location(Location::new(n).with_district("Mainland")),
        None => r,
    }
}

/// ada and obi share mutuals m1 and m2; everyone but zara lives in Yaba
fn neighborhood() -> Vec<Resident> {
    vec![
        resident("ada", "Ada", Some("Yaba"), 100).with_interests(["gardening", "chess"]),
        resident("m1", "Mide", Some("Yaba"), 110),
        resident("m2", "Musa", Some("Yaba"), 120),
        resident("obi", "Obi", Some("Yaba"), 130),
        resident("ngozi", "Ngozi", Some("Yaba"), 140).with_interests(["Gardening"]),
        resident("uche", "Uche", Some("Yaba"), 150),
        resident("zara", "Zara", Some("Surulere"), 160),
    ]
}

fn create_engine(residents: Vec<Resident>, config: EngineConfig) -> Engine {
    let store = Arc::new(Mutex::new(SqliteStore::new(":memory:").unwrap()));
    let registry = Arc::new(ResidentRegistry::from_residents(residents));
    ConnectionEngine::new(store, registry, config).unwrap()
}

fn connect(engine: &Engine, a: &str, b: &str) {
    let edge = engine
        .request_connection(&user(a), &user(b), ConnectionType::Connect)
        .unwrap();
    engine.accept_connection(&user(b), edge.id).unwrap();
}

fn seeded_engine(config: EngineConfig) -> Engine {
    let engine = create_engine(neighborhood(), config);
    for (a, b) in [("ada", "m1"), ("ada", "m2"), ("m1", "obi"), ("obi", "m2")] {
        connect(&engine, a, b);
    }
    engine
}

fn ids(items: &[hearth_engine::Recommendation]) -> Vec<&str> {
    items.iter().map(|r| r.resident.id.as_str()).collect()
}

#[test]
fn test_recommendations_ranked_by_score() {
    let engine = seeded_engine(EngineConfig::default());
    let result = engine.recommend(&user("ada"), None).unwrap();

    assert!(!result.truncated);
    assert_eq!(result.candidates_considered, 3);
    assert_eq!(ids(&result.items), vec!["obi", "ngozi", "uche"]);

    let obi = &result.items[0];
    assert_eq!(obi.score, 90);
    assert_eq!(obi.mutual_count, 2);
    assert_eq!(obi.reasons[0].tag, ReasonTag::Proximity);
    assert_eq!(obi.reasons[1].tag, ReasonTag::MutualConnections);

    assert_eq!(result.items[1].score, 82);
    assert_eq!(result.items[2].score, 80);
}

#[test]
fn test_recommendations_are_deterministic() {
    let engine = seeded_engine(EngineConfig::default());
    let first = engine.recommend(&user("ada"), Some(10)).unwrap();
    let second = engine.recommend(&user("ada"), Some(10)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_ties_break_on_user_id() {
    let engine = create_engine(
        vec![
            resident("ada", "Ada", Some("Yaba"), 0),
            resident("zed", "Zed", Some("Yaba"), 0),
            resident("bea", "Bea", Some("Yaba"), 0),
            resident("kay", "Kay", Some("Yaba"), 0),
        ],
        EngineConfig::default(),
    );

    let result = engine.recommend(&user("ada"), Some(2)).unwrap();
    assert_eq!(ids(&result.items), vec!["bea", "kay"]);
}

#[test]
fn test_connected_and_self_excluded() {
    let engine = seeded_engine(EngineConfig::default());
    let result = engine.recommend(&user("ada"), None).unwrap();
    let found = ids(&result.items);
    assert!(!found.contains(&"ada"));
    assert!(!found.contains(&"m1"));
    assert!(!found.contains(&"m2"));
    assert!(!found.contains(&"zara"), "other neighborhoods are not suggested");
}

#[test]
fn test_blocked_never_recommended() {
    let engine = seeded_engine(EngineConfig::default());
    let edge = engine
        .request_connection(&user("obi"), &user("ada"), ConnectionType::Connect)
        .unwrap();
    engine.block_connection(&user("ada"), edge.id).unwrap();

    for viewer in ["ada", "obi"] {
        let result = engine.recommend(&user(viewer), None).unwrap();
        let other = if viewer == "ada" { "obi" } else { "ada" };
        assert!(!ids(&result.items).contains(&other));
    }
}

#[test]
fn test_no_location_considers_everyone() {
    let mut residents = neighborhood();
    residents.push(resident("nomad", "Nomad", None, 170));
    let engine = create_engine(residents, EngineConfig::default());

    let result = engine.recommend(&user("nomad"), Some(100)).unwrap();
    assert_eq!(result.candidates_considered, 7);
    assert!(result.items.iter().all(|r| r.score == 50));
}

#[test]
fn test_pool_cap_truncates() {
    let engine = seeded_engine(EngineConfig {
        candidate_pool_cap: 2,
        ..Default::default()
    });

    let result = engine.recommend(&user("ada"), None).unwrap();
    assert!(result.truncated);
    assert_eq!(result.candidates_considered, 2);
    // Only the first candidates in id order were scored
    assert_eq!(ids(&result.items), vec!["obi", "ngozi"]);
}

#[test]
fn test_score_order_discovery_respects_pool_cap() {
    let mut residents = vec![resident("host", "Host", Some("Yaba"), 0)];
    residents.extend((0..50).map(|i| {
        let id = format!("r{:02}", i);
        resident(&id, &id, Some("Yaba"), i + 1)
    }));
    let engine = create_engine(
        residents,
        EngineConfig {
            candidate_pool_cap: 5,
            ..Default::default()
        },
    );

    let query = DiscoverQuery::new(PageRequest::new(1, 100).unwrap()).with_order(DiscoverOrder::Score);
    let page = engine.discover(&user("host"), &query).unwrap();

    assert_eq!(page.total, 5);
    let ids: Vec<&str> = page.items.iter().map(|i| i.resident.id.as_str()).collect();
    assert_eq!(ids, vec!["r00", "r01", "r02", "r03", "r04"]);

    // Other orders still page through the whole pool
    let query = DiscoverQuery::new(PageRequest::new(1, 100).unwrap());
    assert_eq!(engine.discover(&user("host"), &query).unwrap().total, 50);
}

#[test]
fn test_limit_bounds() {
    let engine = seeded_engine(EngineConfig::default());
    assert!(matches!(
        engine.recommend(&user("ada"), Some(0)),
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        engine.recommend(&user("ada"), Some(101)),
        Err(EngineError::Validation(_))
    ));
    assert_eq!(engine.recommend(&user("ada"), Some(1)).unwrap().items.len(), 1);
}

#[test]
fn test_mutual_connections_are_symmetric() {
    let engine = seeded_engine(EngineConfig::default());

    let ab = engine.mutual_connections(&user("ada"), &user("obi")).unwrap();
    let ba = engine.mutual_connections(&user("obi"), &user("ada")).unwrap();
    assert_eq!(ab, ba);
    assert_eq!(ab.into_iter().collect::<Vec<_>>(), vec![user("m1"), user("m2")]);
    assert_eq!(engine.mutual_count(&user("obi"), &user("ada")).unwrap(), 2);

    let profiles = engine.mutual_residents(&user("ada"), &user("obi")).unwrap();
    let names: Vec<&str> = profiles.iter().map(|r| r.display_name.as_str()).collect();
    assert_eq!(names, vec!["Mide", "Musa"]);

    assert!(matches!(
        engine.mutual_residents(&user("ada"), &user("ghost")),
        Err(EngineError::ResidentNotFound(_))
    ));
}

#[test]
fn test_mutual_residents_with_self_is_rejected() {
    let engine = seeded_engine(EngineConfig::default());

    let result = engine.mutual_residents(&user("ada"), &user("ada"));
    assert!(matches!(result, Err(EngineError::SelfConnection)));
}

#[test]
fn test_discover_newest_first_with_pending() {
    let engine = seeded_engine(EngineConfig::default());
    engine
        .request_connection(&user("ada"), &user("uche"), ConnectionType::Connect)
        .unwrap();
    engine
        .request_connection(&user("ngozi"), &user("ada"), ConnectionType::Connect)
        .unwrap();

    let page = engine
        .discover(&user("ada"), &DiscoverQuery::new(PageRequest::new(1, 2).unwrap()))
        .unwrap();
    assert_eq!(page.total, 3);
    assert!(page.has_next);

    let found: Vec<&str> = page.items.iter().map(|i| i.resident.id.as_str()).collect();
    assert_eq!(found, vec!["uche", "ngozi"]);
    assert_eq!(page.items[0].pending, Some(PendingDirection::Outgoing));
    assert_eq!(page.items[1].pending, Some(PendingDirection::Incoming));

    let rest = engine
        .discover(&user("ada"), &DiscoverQuery::new(PageRequest::new(2, 2).unwrap()))
        .unwrap();
    assert_eq!(rest.items.len(), 1);
    assert_eq!(rest.items[0].resident.id, user("obi"));
    assert_eq!(rest.items[0].mutual_count, 2);
    assert_eq!(rest.items[0].pending, None);
    assert!(rest.has_prev && !rest.has_next);
}

#[test]
fn test_discover_by_score_and_name() {
    let engine = seeded_engine(EngineConfig::default());

    let by_score = engine
        .discover(
            &user("ada"),
            &DiscoverQuery::new(PageRequest::new(1, 10).unwrap()).with_order(DiscoverOrder::Score),
        )
        .unwrap();
    let scores: Vec<u8> = by_score.items.iter().map(|i| i.score).collect();
    assert_eq!(scores, vec![90, 82, 80]);

    let named = engine
        .discover(
            &user("ada"),
            &DiscoverQuery::new(PageRequest::new(1, 10).unwrap())
                .with_order(DiscoverOrder::Name)
                .with_name("  U"),
        )
        .unwrap();
    let names: Vec<&str> = named.items.iter().map(|i| i.resident.display_name.as_str()).collect();
    assert_eq!(names, vec!["Uche"]);
}

#[test]
fn test_discover_elsewhere() {
    let engine = seeded_engine(EngineConfig::default());

    let elsewhere = engine
        .discover(
            &user("ada"),
            &DiscoverQuery::new(PageRequest::new(1, 10).unwrap())
                .with_location(LocationFilter::Neighborhood("Surulere".into())),
        )
        .unwrap();
    assert_eq!(elsewhere.total, 1);
    assert_eq!(elsewhere.items[0].resident.id, user("zara"));
    assert_eq!(elsewhere.items[0].score, 50);

    let district = engine
        .discover(
            &user("ada"),
            &DiscoverQuery::new(PageRequest::new(1, 10).unwrap())
                .with_location(LocationFilter::District("mainland".into())),
        )
        .unwrap();
    assert_eq!(district.total, 4);
}
