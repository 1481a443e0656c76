//! Property tests for label filtering over generated snapshots.

use convenient_content::entity::{Env, Label, Repo, View, Workload};
use convenient_content::{EntityKind, EntityStore, LabelSelection, close};
use proptest::prelude::*;
use std::collections::BTreeSet;

const LABELS: [&str; 4] = ["a", "b", "c", "d"];

fn label_set() -> impl Strategy<Value = BTreeSet<String>> {
    proptest::sample::subsequence(LABELS.to_vec(), 0..=LABELS.len())
        .prop_map(|labels| labels.into_iter().map(String::from).collect())
}

/// Entity shapes: labels per repo, env (repo index, labels), workload (env
/// index, labels) and view (repo index, workload indices, labels).
type Shape = (
    Vec<BTreeSet<String>>,
    Vec<(usize, BTreeSet<String>)>,
    Vec<(usize, BTreeSet<String>)>,
    Vec<(usize, Vec<usize>, BTreeSet<String>)>,
);

fn shape() -> impl Strategy<Value = Shape> {
    (
        prop::collection::vec(label_set(), 1..4),
        prop::collection::vec((any::<usize>(), label_set()), 1..5),
        prop::collection::vec((any::<usize>(), label_set()), 0..8),
        prop::collection::vec(
            (any::<usize>(), prop::collection::vec(any::<usize>(), 0..4), label_set()),
            0..4,
        ),
    )
}

/// Build a snapshot without dangling references: indices wrap around.
fn build_store((repos, envs, workloads, views): Shape) -> EntityStore {
    let mut builder = EntityStore::builder();
    for label in LABELS {
        builder = builder.label(Label::new(label));
    }

    for (index, labels) in repos.iter().enumerate() {
        let mut repo = Repo::new(format!("repo-{index}"));
        repo.labels = labels.clone();
        builder = builder.repo(repo);
    }
    for (index, (repo, labels)) in envs.iter().enumerate() {
        let mut env = Env::new(format!("env-{index}"));
        env.repositories = vec![format!("repo-{}", repo % repos.len())];
        env.labels = labels.clone();
        builder = builder.env(env);
    }
    for (index, (env, labels)) in workloads.iter().enumerate() {
        let mut workload = Workload::new(format!("wl-{index}"));
        workload.envs = vec![format!("env-{}", env % envs.len())];
        workload.labels = labels.clone();
        builder = builder.workload(workload);
    }
    for (index, (repo, members, labels)) in views.iter().enumerate() {
        let mut view = View::compose(format!("view-{index}"), format!("repo-{}", repo % repos.len()));
        if !workloads.is_empty() {
            view.workloads = members
                .iter()
                .map(|member| format!("wl-{}", member % workloads.len()))
                .collect();
        }
        view.labels = labels.clone();
        builder = builder.view(view);
    }
    builder.build()
}

proptest! {
    #[test]
    fn more_labels_never_retain_less(
        entities in shape(),
        small in label_set(),
        extra in label_set(),
    ) {
        let store = build_store(entities);
        let large: BTreeSet<String> = small.union(&extra).cloned().collect();

        let small = close(&store, &LabelSelection::Only(small)).unwrap();
        let large = close(&store, &LabelSelection::Only(large)).unwrap();
        let all = close(&store, &LabelSelection::All).unwrap();

        prop_assert!(small.is_subset(&large));
        prop_assert!(large.is_subset(&all));
    }

    #[test]
    fn retained_references_are_retained(entities in shape(), labels in label_set()) {
        let store = build_store(entities);
        let retained = close(&store, &LabelSelection::Only(labels)).unwrap();

        for id in retained.ids(EntityKind::View) {
            let view = &store.views()[id];
            for workload in &view.workloads {
                prop_assert!(retained.ids(EntityKind::Workload).contains(workload));
            }
            if let Some(repo) = &view.repository {
                prop_assert!(retained.ids(EntityKind::Repo).contains(repo));
            }
        }
        for id in retained.ids(EntityKind::Workload) {
            for env in &store.workloads()[id].envs {
                prop_assert!(retained.ids(EntityKind::Env).contains(env));
            }
        }
        for id in retained.ids(EntityKind::Env) {
            for repo in &store.envs()[id].repositories {
                prop_assert!(retained.ids(EntityKind::Repo).contains(repo));
            }
        }
    }

    #[test]
    fn directly_labelled_entities_are_retained(entities in shape(), labels in label_set()) {
        let store = build_store(entities);
        let retained = close(&store, &LabelSelection::Only(labels.clone())).unwrap();

        for (id, workload) in store.workloads() {
            if !workload.labels.is_disjoint(&labels) {
                prop_assert!(retained.ids(EntityKind::Workload).contains(id));
            }
        }
        for (id, repo) in store.repos() {
            if !repo.labels.is_disjoint(&labels) {
                prop_assert!(retained.ids(EntityKind::Repo).contains(id));
            }
        }
    }

    #[test]
    fn resolution_is_deterministic(entities in shape(), labels in label_set()) {
        let store = build_store(entities);
        let selection = LabelSelection::Only(labels);
        prop_assert_eq!(close(&store, &selection).unwrap(), close(&store, &selection).unwrap());
    }

    #[test]
    fn padding_and_empty_items_are_ignored(
        labels in label_set(),
        pad in "[ \t]{0,3}",
        empties in 0usize..3,
    ) {
        let mut items: Vec<String> = labels.iter().map(|label| format!("{pad}{label}{pad}")).collect();
        items.extend(std::iter::repeat_n(pad.clone(), empties));
        let parsed = LabelSelection::parse(Some(&items.join(",")));
        prop_assert_eq!(parsed, LabelSelection::Only(labels));
    }
}
