use album_reconcile::config::Settings;
use album_reconcile::report::{AlbumInput, AlbumReport};
use album_reconcile::selector::{pick_best, StrategySummary};
use album_reconcile::{
    confidence, similarity, CatalogPatterns, ConfidenceLevel, Direction, KeepSeed, LocalTrack,
    ManualOverride, MatchStrategy, Pair, Reconciler, RemoteTrack, ScriptedRefiner,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

fn ids(pairs: &[Pair]) -> Vec<(Option<String>, Option<String>)> {
    pairs
        .iter()
        .map(|p| (p.local.map(|t| t.file_path.clone()), p.remote.map(|t| t.id.clone())))
        .collect()
}

const WORDS: &[&str] = &[
    "prelude", "fugue", "aria", "gigue", "allemande", "courante", "sarabande", "minuet",
];

fn random_album(seed: u64) -> (Vec<LocalTrack>, Vec<RemoteTrack>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let local_len = rng.gen_range(0..7usize);
    let remote_len = rng.gen_range(0..7usize);

    let local = (0..local_len)
        .map(|i| {
            let title = format!(
                "{} {}",
                WORDS[rng.gen_range(0..WORDS.len())],
                WORDS[rng.gen_range(0..WORDS.len())]
            );
            LocalTrack::new(format!("/music/{:02} {}.flac", rng.gen_range(0..10u32), title), title)
                .with_track(rng.gen_range(0..5))
                .with_duration(rng.gen_range(0..4u64) * 60_000)
                .with_disc(1 + (i % 2) as u32)
        })
        .collect();
    let remote = (0..remote_len)
        .map(|i| {
            RemoteTrack::new(format!("r{}", i), WORDS[rng.gen_range(0..WORDS.len())])
                .with_track(rng.gen_range(1..5))
                .with_disc(rng.gen_range(1..3))
                .with_duration(rng.gen_range(0..4u64) * 60_000)
        })
        .collect();
    (local, remote)
}

#[test]
fn test_aria_pairs_with_high_confidence() {
    let local = vec![LocalTrack::new("/a/01 Aria.flac", "Aria").with_track(1).with_duration(120_000)];
    let remote = vec![RemoteTrack::new("r1", "Aria").with_track(1).with_duration(121_000)];

    let pairs = Reconciler::default()
        .run(MatchStrategy::Title, &local, &remote, Direction::Forward)
        .unwrap();

    assert_eq!(pairs.len(), 1);
    assert!(pairs[0].is_complete());
    assert!(pairs[0].confidence >= 65.0);
    assert_eq!(pairs[0].level, ConfidenceLevel::High);
}

#[test]
fn test_shared_catalog_number_rescues_title_match() {
    let local = vec![LocalTrack::new("/a/allegro.flac", "Allegro BWV 846")];
    let remote = vec![RemoteTrack::new("r1", "Prelude BWV 846")];

    assert!((similarity("Allegro BWV 846", "Prelude BWV 846") - 1.0 / 3.0).abs() < 1e-9);

    let pairs = Reconciler::default()
        .run(MatchStrategy::Title, &local, &remote, Direction::Forward)
        .unwrap();
    assert_eq!(pairs.len(), 1);
    assert!(pairs[0].is_complete());
    assert_ne!(pairs[0].level, ConfidenceLevel::Low);
}

#[test]
fn test_selector_prefers_higher_average() {
    let a = StrategySummary {
        strategy: MatchStrategy::Hybrid,
        average_confidence: 80.0,
        matched: 5,
        high: 5,
        medium: 0,
        low: 0,
        unmatched_local: 0,
        unmatched_remote: 0,
    };
    let b = StrategySummary {
        strategy: MatchStrategy::Order,
        average_confidence: 60.0,
        matched: 5,
        high: 2,
        medium: 3,
        low: 0,
        ..a.clone()
    };
    assert_eq!(pick_best(&[b.clone(), a.clone()]), Some(1));
    assert_eq!(pick_best(&[a, b]), Some(0));
}

#[test]
fn test_track_number_without_numbers_equals_filesystem() {
    let local = vec![
        LocalTrack::new("/x/03 Gigue.flac", "Gigue"),
        LocalTrack::new("/x/01 Prelude.flac", "Prelude"),
        LocalTrack::new("/x/02 Courante.flac", "Courante"),
    ];
    let remote = vec![
        RemoteTrack::new("r1", "Prelude").with_track(1),
        RemoteTrack::new("r2", "Courante").with_track(2),
        RemoteTrack::new("r3", "Gigue").with_track(3),
    ];
    let reconciler = Reconciler::default();

    for direction in [Direction::Forward, Direction::Reverse] {
        let by_number = reconciler
            .run(MatchStrategy::TrackNumber, &local, &remote, direction)
            .unwrap();
        let by_files = reconciler
            .run(MatchStrategy::Filesystem, &local, &remote, direction)
            .unwrap();
        assert_eq!(ids(&by_number), ids(&by_files));
    }
}

#[test]
fn test_every_strategy_keeps_pairs_unique_and_complete() {
    let reconciler = Reconciler::default();

    for seed in 0..40 {
        let (local, remote) = random_album(seed);
        for strategy in MatchStrategy::AUTOMATIC {
            for direction in [Direction::Forward, Direction::Reverse] {
                let pairs = reconciler.run(strategy, &local, &remote, direction).unwrap();

                let mut seen_local = HashSet::new();
                let mut seen_remote = HashSet::new();
                let mut matched = 0;
                for p in &pairs {
                    assert!(p.local.is_some() || p.remote.is_some());
                    if let Some(l) = p.local {
                        assert!(seen_local.insert(l as *const LocalTrack), "{strategy} reused a local file");
                    }
                    if let Some(r) = p.remote {
                        assert!(seen_remote.insert(r as *const RemoteTrack), "{strategy} reused a remote track");
                    }
                    if p.is_complete() {
                        matched += 1;
                    }
                }

                assert!(matched <= local.len().min(remote.len()));
                assert_eq!(pairs.len(), local.len() + remote.len() - matched);
                assert_eq!(seen_local.len(), local.len());
                assert_eq!(seen_remote.len(), remote.len());
            }
        }
    }
}

#[test]
fn test_similarity_properties() {
    for s in ["", "Aria", "Prelude in C major, BWV 846", "Für Elise"] {
        assert_eq!(similarity(s, s), 1.0);
    }
    assert_eq!(similarity("", ""), 1.0);
    assert_eq!(similarity("abc", ""), 0.0);
    assert_eq!(similarity("", "abc"), 0.0);
    assert_eq!(
        similarity("prelude and fugue", "fugue in g"),
        similarity("fugue in g", "prelude and fugue")
    );
}

#[test]
fn test_confidence_grows_with_title_overlap() {
    let catalog = CatalogPatterns::builtin();
    let remote = RemoteTrack::new("r1", "one two three four").with_duration(100_000);
    let titles = ["five six", "one five", "one two five", "one two three five", "one two three four"];

    let scores: Vec<f64> = titles
        .iter()
        .map(|t| {
            let local = LocalTrack::new("/x.flac", *t).with_duration(100_000);
            confidence(&remote, &local, &catalog).score
        })
        .collect();
    assert!(scores.windows(2).all(|w| w[0] <= w[1]), "{:?}", scores);
}

#[test]
fn test_selector_on_shuffled_album() {
    let local = vec![
        LocalTrack::new("/x/track_b.flac", "Sarabande").with_duration(240_000),
        LocalTrack::new("/x/track_a.flac", "Allemande").with_duration(300_000),
        LocalTrack::new("/x/track_c.flac", "Gigue").with_duration(180_000),
    ];
    let remote = vec![
        RemoteTrack::new("r1", "Allemande").with_track(1).with_duration(301_000),
        RemoteTrack::new("r2", "Gigue").with_track(2).with_duration(181_000),
        RemoteTrack::new("r3", "Sarabande").with_track(3).with_duration(239_000),
    ];
    let selection = Reconciler::default().select_best(&local, &remote, Direction::Forward, true);

    assert_ne!(selection.winner, MatchStrategy::Order);
    assert!(selection.pairs.iter().all(|p| p.is_complete()));
    for p in &selection.pairs {
        assert_eq!(p.local.map(|t| t.title.as_str()), p.remote.map(|t| t.name.as_str()));
    }
}

#[test]
fn test_custom_catalog_scheme_from_settings() {
    let settings = Settings::from_toml(
        r#"
        [catalog]
        patterns = [{ label = "D", regex = '\bD\.?\s*(\d+)\b' }]
        "#,
    )
    .unwrap();
    let reconciler = Reconciler::new(settings.catalog_patterns().unwrap());

    let local = vec![LocalTrack::new("/s/impromptu.flac", "Impromptu D 899")];
    let remote = vec![RemoteTrack::new("r1", "Four Impromptus D. 899")];
    let pairs = reconciler
        .run(MatchStrategy::Title, &local, &remote, Direction::Forward)
        .unwrap();

    assert!(pairs[0].is_complete());
    let plain = Reconciler::default()
        .run(MatchStrategy::Title, &local, &remote, Direction::Forward)
        .unwrap();
    assert!(pairs[0].confidence > plain.iter().map(|p| p.confidence).fold(0.0, f64::max));
}

#[test]
fn test_manual_refinement_round_trip() {
    let album: AlbumInput = serde_json::from_str(
        r#"{
            "local": [
                {"file_path": "/m/a.flac", "title": "Aria"},
                {"file_path": "/m/b.flac", "title": "Bourree"}
            ],
            "remote": [
                {"id": "r1", "name": "Aria"},
                {"id": "r2", "name": "Bourree"}
            ]
        }"#,
    )
    .unwrap();
    let reconciler = Reconciler::default();
    let seed = reconciler
        .select_best(&album.local, &album.remote, Direction::Forward, false)
        .pairs;

    let kept = reconciler
        .refine(&mut KeepSeed, &album.local, &album.remote, seed.clone(), Direction::Forward)
        .unwrap();
    assert_eq!(ids(&kept), ids(&seed));

    let mut refiner = ScriptedRefiner::new(vec![
        ManualOverride { file_path: "/m/a.flac".into(), remote_id: Some("r2".into()) },
        ManualOverride { file_path: "/m/b.flac".into(), remote_id: Some("r1".into()) },
    ]);
    let pairs = reconciler
        .refine(&mut refiner, &album.local, &album.remote, seed, Direction::Forward)
        .unwrap();
    let report = AlbumReport::new(MatchStrategy::Manual, Direction::Forward, &pairs, Vec::new());

    assert_eq!(report.matched, 2);
    assert_eq!(report.unmatched_local + report.unmatched_remote, 0);
    assert!(report.pairs.iter().all(|p| p.level == Some(ConfidenceLevel::Low)));
}

#[test]
fn test_unknown_strategy_fails_fast() {
    let settings = Settings::from_toml("[matching]\nstrategy = \"fuzzy\"\n").unwrap();
    let err = settings.strategy().unwrap_err();
    assert!(err.to_string().contains("fuzzy"));
}
