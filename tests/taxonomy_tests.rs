//! Library-level scenarios against file-backed databases

use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;
use taxon::application::{ApprovalTarget, NewTagOptions, Taxonomy};
use taxon::domain::{NormalizationSubmission, RelationshipType, ReviewStatus, TagId};
use taxon::error::TaxonError;
use taxon::infrastructure::{Config, SqliteStore, Workspace};
use tempfile::TempDir;

fn workspace() -> (TempDir, Workspace) {
    let temp = TempDir::new().unwrap();
    let workspace = Workspace::new(temp.path().to_path_buf());
    workspace.initialize().unwrap();
    (temp, workspace)
}

fn open(workspace: &Workspace) -> Taxonomy {
    Taxonomy::open(workspace).unwrap()
}

#[test]
fn test_cycle_is_rejected_with_path() {
    let (_temp, workspace) = workspace();
    let taxonomy = open(&workspace);
    let registry = taxonomy.registry();
    let graph = taxonomy.hierarchy();

    let a = registry.resolve_or_create("A").unwrap().id;
    let b = registry.resolve_or_create("B").unwrap().id;
    let c = registry.resolve_or_create("C").unwrap().id;
    graph.add_edge(a, b, RelationshipType::ParentChild).unwrap();
    graph.add_edge(b, c, RelationshipType::ParentChild).unwrap();

    match graph.add_edge(c, a, RelationshipType::ParentChild) {
        Err(TaxonError::Cycle { path }) => assert_eq!(path, vec![a, b, c, a]),
        other => panic!("expected cycle error, got {:?}", other),
    }
    assert!(graph.get_parents(a).unwrap().is_empty());
}

#[test]
fn test_edge_sequence_never_creates_cycle() {
    let (_temp, workspace) = workspace();
    let taxonomy = open(&workspace);
    let registry = taxonomy.registry();
    let graph = taxonomy.hierarchy();

    let ids: Vec<TagId> = (0..6)
        .map(|i| registry.resolve_or_create(&format!("node {}", i)).unwrap().id)
        .collect();

    // every ordered pair, in a fixed scrambled order
    for step in 0..36usize {
        let parent = ids[(step * 7) % 6];
        let child = ids[(step * 5 + 1) % 6];
        let _ = graph.add_edge(parent, child, RelationshipType::ParentChild);
    }

    for id in &ids {
        assert!(
            !graph.get_all_ancestors(*id).unwrap().contains(id),
            "tag {} is its own ancestor",
            id
        );
    }
}

#[test]
fn test_diamond_ancestors_are_listed_once() {
    let (_temp, workspace) = workspace();
    let taxonomy = open(&workspace);
    let registry = taxonomy.registry();
    let graph = taxonomy.hierarchy();

    let a = registry.resolve_or_create("Programming").unwrap().id;
    let b = registry.resolve_or_create("Web Development").unwrap().id;
    let c = registry.resolve_or_create("JavaScript").unwrap().id;
    let d = registry.resolve_or_create("React").unwrap().id;
    for (parent, child) in [(a, b), (a, c), (b, d), (c, d)] {
        graph
            .add_edge(parent, child, RelationshipType::ParentChild)
            .unwrap();
    }

    assert_eq!(
        graph.get_all_ancestors(d).unwrap(),
        BTreeSet::from([a, b, c])
    );
}

#[test]
fn test_javascript_variants_resolve_to_one_tag() {
    let (_temp, workspace) = workspace();
    let registry = open(&workspace).registry();

    let ids: BTreeSet<TagId> = ["javascript", "JavaScript", "  JAVASCRIPT  "]
        .iter()
        .map(|raw| registry.resolve_or_create(raw).unwrap().id)
        .collect();

    assert_eq!(ids.len(), 1);
    let tags = registry.list().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "JavaScript");
}

#[test]
fn test_concurrent_resolution_creates_one_row() {
    let (_temp, workspace) = workspace();
    let config = workspace.load_config().unwrap();
    let path = workspace.database_path(&config);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = ["javascript", "JavaScript", "JAVASCRIPT", " javascript "]
        .iter()
        .cycle()
        .take(8)
        .map(|raw| {
            let path = path.clone();
            let config = config.clone();
            let barrier = barrier.clone();
            let raw = raw.to_string();
            thread::spawn(move || {
                let store = SqliteStore::open(&path, config.store.busy_timeout()).unwrap();
                let registry = Taxonomy::new(store, config).registry();
                barrier.wait();
                registry.resolve_or_create(&raw).unwrap().id
            })
        })
        .collect();

    let ids: BTreeSet<TagId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(open(&workspace).registry().list().unwrap().len(), 1);
}

#[test]
fn test_concurrent_opposite_edges_keep_graph_acyclic() {
    let (_temp, workspace) = workspace();
    let taxonomy = open(&workspace);
    let registry = taxonomy.registry();
    let a = registry.resolve_or_create("Alpha").unwrap().id;
    let b = registry.resolve_or_create("Beta").unwrap().id;

    let config = workspace.load_config().unwrap();
    let path = workspace.database_path(&config);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [(a, b), (b, a)]
        .into_iter()
        .map(|(parent, child)| {
            let path = path.clone();
            let config = config.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let store = SqliteStore::open(&path, config.store.busy_timeout()).unwrap();
                let graph = Taxonomy::new(store, config).hierarchy();
                barrier.wait();
                graph.add_edge(parent, child, RelationshipType::ParentChild)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let added = results.iter().filter(|r| matches!(r, Ok(true))).count();
    let cycles = results
        .iter()
        .filter(|r| matches!(r, Err(TaxonError::Cycle { .. })))
        .count();
    assert_eq!((added, cycles), (1, 1));

    let graph = taxonomy.hierarchy();
    let edges = graph.get_children(a).unwrap().len() + graph.get_children(b).unwrap().len();
    assert_eq!(edges, 1);
}

#[test]
fn test_shared_store_across_threads() {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let taxonomy = Taxonomy::with_shared_store(store, Config::new());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = taxonomy.registry();
            thread::spawn(move || {
                (0..10)
                    .map(|i| registry.resolve_or_create(&format!("topic {}", i)).unwrap().id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let all: Vec<Vec<TagId>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(all.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(taxonomy.registry().list().unwrap().len(), 10);
}

#[test]
fn test_delete_is_blocked_by_children() {
    let (_temp, workspace) = workspace();
    let taxonomy = open(&workspace);
    let registry = taxonomy.registry();
    let graph = taxonomy.hierarchy();
    let x = registry.resolve_or_create("X").unwrap().id;
    let y = registry.resolve_or_create("Y").unwrap().id;
    graph.add_edge(x, y, RelationshipType::ParentChild).unwrap();

    assert!(matches!(
        graph.delete_tag(x),
        Err(TaxonError::HasChildren { children: 1, .. })
    ));
    assert!(registry.get(x).is_ok());

    graph.remove_edge(x, y).unwrap();
    graph.delete_tag(x).unwrap();
    assert!(registry.find("X").unwrap().is_none());
}

#[test]
fn test_merge_moves_parents_and_content() {
    let (_temp, workspace) = workspace();
    let taxonomy = open(&workspace);
    let registry = taxonomy.registry();
    let graph = taxonomy.hierarchy();

    let programming = registry.resolve_or_create("Programming").unwrap().id;
    let web = registry.resolve_or_create("Web").unwrap().id;
    let languages = registry.resolve_or_create("Languages").unwrap().id;
    let loser_options = NewTagOptions {
        parents: vec![programming, languages],
        ..Default::default()
    };
    let winner_options = NewTagOptions {
        parents: vec![web, languages],
        ..Default::default()
    };
    let loser = registry
        .resolve_or_create_with("ecmascript", &loser_options)
        .unwrap()
        .tag
        .id;
    let winner = registry
        .resolve_or_create_with("JavaScript", &winner_options)
        .unwrap()
        .tag
        .id;

    let event_loop = taxonomy.add_content("Event loop", None, None).unwrap();
    taxonomy.tag_content(event_loop.id, loser).unwrap();
    let closures = taxonomy.add_content("Closures", None, None).unwrap();
    taxonomy.tag_content(closures.id, loser).unwrap();
    taxonomy.tag_content(closures.id, winner).unwrap();

    let report = registry.merge(loser, winner).unwrap();
    assert_eq!(report.tag.id, winner);
    assert_eq!(report.edges_repointed, 1);
    assert_eq!(report.edges_dropped, 1);
    assert_eq!(report.content_moved, 1);

    assert_eq!(
        graph.get_parents(winner).unwrap(),
        BTreeSet::from([programming, web, languages])
    );
    assert_eq!(graph.get_children(languages).unwrap(), BTreeSet::from([winner]));
    assert_eq!(taxonomy.content_tags(event_loop.id).unwrap(), BTreeSet::from([winner]));
    assert_eq!(taxonomy.content_tags(closures.id).unwrap(), BTreeSet::from([winner]));
    assert!(matches!(registry.get(loser), Err(TaxonError::NotFound { .. })));
}

#[test]
fn test_sweep_twice_changes_nothing_the_second_time() {
    let (_temp, workspace) = workspace();
    let taxonomy = open(&workspace);
    let registry = taxonomy.registry();
    registry.resolve_or_create("Node.js").unwrap();
    registry.resolve_or_create("web-dev").unwrap();
    registry.resolve_or_create("Web Dev").unwrap();

    let first = registry.sweep_duplicates().unwrap();
    assert_eq!(first.sets, 1);
    assert_eq!(first.merged, 1);

    let before = registry.list().unwrap();
    let second = registry.sweep_duplicates().unwrap();
    assert_eq!((second.sets, second.merged), (0, 0));
    assert_eq!(registry.list().unwrap(), before);
}

#[test]
fn test_normalization_review_round_trip() {
    let (_temp, workspace) = workspace();
    let taxonomy = open(&workspace);
    let review = taxonomy.review();

    let record = review
        .submit(NormalizationSubmission::new("reactjs", 0.4))
        .unwrap();
    assert_eq!(record.review_status, ReviewStatus::Pending);

    let approved = review
        .approve(record.id, "admin", ApprovalTarget::Candidate)
        .unwrap();
    let again = review
        .approve(record.id, "admin", ApprovalTarget::Candidate)
        .unwrap();
    assert_eq!(approved, again);
    assert_eq!(taxonomy.registry().list().unwrap().len(), 1);

    // reopening sees the same state
    let reopened = open(&workspace).review().get(record.id).unwrap();
    assert_eq!(reopened.review_status, ReviewStatus::Approved);
}
