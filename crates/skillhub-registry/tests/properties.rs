//! Property tests for registry validation, expansion and budgeted loading

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;
use proptest::sample::Index;
use skillhub_registry::{
    parser, DependencyResolver, DisclosureLoader, LoaderConfig, Registry, ValidationError,
};
use skillhub_types::{ContextCost, Document, DocumentKind};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const TRIGGERS: &[&str] = &[
    "docker",
    "kubernetes pods",
    "python testing",
    "mock",
    "api design",
    "redis cache",
];

const QUERIES: &[&str] = &[
    "docker",
    "mock python testing",
    "api design for redis cache",
    "kubernetes",
    "nothing relevant",
];

fn node(index: usize, requires: Vec<String>) -> Document {
    let id = format!("doc-{index}");
    Document {
        id: id.clone(),
        kind: DocumentKind::Skill,
        name: id.clone(),
        description: format!("{id} description"),
        summary: Vec::new(),
        context_cost: ContextCost::Medium,
        load_when: Vec::new(),
        requires,
        enhances: Vec::new(),
        tags: Vec::new(),
        body: String::new(),
        extended_files: Vec::new(),
        source_path: PathBuf::from(format!("skills/{id}/SKILL.md")),
        extra: Default::default(),
    }
}

/// Edges only point from a lower index to a higher one, so the graph is acyclic
fn dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2usize..10).prop_flat_map(|n| {
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();
        let len = pairs.len();
        (
            Just(n),
            prop::collection::vec(any::<bool>(), len).prop_map(move |keep| {
                pairs
                    .iter()
                    .zip(keep)
                    .filter_map(|(pair, keep)| keep.then_some(*pair))
                    .collect::<Vec<_>>()
            }),
        )
    })
}

fn documents(n: usize, edges: &[(usize, usize)]) -> Vec<Document> {
    (0..n)
        .map(|i| {
            let requires = edges
                .iter()
                .filter(|(from, _)| *from == i)
                .map(|(_, to)| format!("doc-{to}"))
                .collect();
            node(i, requires)
        })
        .collect()
}

/// Registry of documents with random triggers, sizes and a `requires` DAG
fn corpus() -> impl Strategy<Value = Registry> {
    dag().prop_flat_map(|(n, edges)| {
        let shape = (
            prop::collection::vec(0..TRIGGERS.len(), 0..3),
            0usize..3,
            0usize..4_000,
            0usize..3,
        );
        prop::collection::vec(shape, n).prop_map(move |shapes| {
            let mut docs = documents(n, &edges);
            for (doc, (triggers, lines, body_chars, cost)) in docs.iter_mut().zip(shapes) {
                doc.load_when = triggers
                    .into_iter()
                    .map(|t| TRIGGERS[t].to_string())
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .collect();
                doc.load_when.sort();
                doc.summary = (0..lines).map(|l| format!("point {l}")).collect();
                doc.body = "b".repeat(body_chars);
                doc.context_cost = [ContextCost::Low, ContextCost::Medium, ContextCost::High][cost];
            }
            Registry::build(docs).unwrap_or_default()
        })
    })
}

proptest! {
    #[test]
    fn prop_parse_keeps_fields_and_trims_summary(
        name in "[a-z][a-z0-9-]{0,20}",
        description in "[A-Za-z][A-Za-z ]{0,40}",
        lines in prop::collection::vec("[a-z][a-z ]{0,20}", 0..5),
        body in "[a-z \n]{0,200}",
    ) {
        let summary: String = lines.iter().map(|l| format!("  - \"{l}\"\n")).collect();
        let raw = format!(
            "---\nname: {name}\ndescription: {description}\nsummary:\n{summary}---\n{body}"
        );
        let doc = parser::parse(&raw, Path::new("skills/x/SKILL.md")).unwrap();

        prop_assert_eq!(&doc.id, &name);
        prop_assert_eq!(doc.description.as_str(), description.trim());
        prop_assert_eq!(doc.body.as_str(), body.trim());
        let expected: Vec<&str> = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
        prop_assert_eq!(doc.summary.iter().map(String::as_str).collect::<Vec<_>>(), expected);
        prop_assert_eq!(parser::parse(&raw, Path::new("skills/x/SKILL.md")).unwrap(), doc);
    }

    #[test]
    fn prop_acyclic_requires_builds((n, edges) in dag()) {
        let registry = Registry::build(documents(n, &edges));
        prop_assert!(registry.is_ok());
    }

    #[test]
    fn prop_back_edge_is_rejected((n, edges) in dag(), pick in any::<Index>()) {
        let mut edges = edges;
        if edges.is_empty() {
            edges.push((0, 1));
        }
        let (from, to) = edges[pick.index(edges.len())];
        edges.push((to, from));

        match Registry::build(documents(n, &edges)) {
            Err(ValidationError::CyclicRequires { cycle }) => {
                prop_assert!(cycle.len() >= 3);
                prop_assert_eq!(cycle.first(), cycle.last());
            }
            other => prop_assert!(false, "expected CyclicRequires, got {:?}", other),
        }
    }

    #[test]
    fn prop_expand_orders_dependencies_first((n, edges) in dag(), seed in 0usize..10) {
        let registry = Registry::build(documents(n, &edges)).unwrap();
        let seed = format!("doc-{}", seed % n);
        let order = DependencyResolver::new(&registry).expand(&[seed.as_str()], false).unwrap();

        prop_assert_eq!(order.last(), Some(&seed));
        let unique: HashSet<&String> = order.iter().collect();
        prop_assert_eq!(unique.len(), order.len());
        for (position, id) in order.iter().enumerate() {
            for dep in &registry.get(id).unwrap().requires {
                let dep_position = order.iter().position(|x| x == dep);
                prop_assert!(dep_position.is_some_and(|p| p < position));
            }
        }
    }

    #[test]
    fn prop_non_positive_budget_is_one_summary(
        registry in corpus(),
        query in 0..QUERIES.len(),
        budget in -100i64..=0,
    ) {
        let loader = DisclosureLoader::new(&registry, &LoaderConfig::default());
        let plan = loader.load(QUERIES[query], budget).unwrap();
        prop_assert!(plan.len() <= 1);
        prop_assert!(plan.entries.iter().all(|e| e.tier.level() == 1));
    }

    #[test]
    fn prop_budget_is_monotone(
        registry in corpus(),
        query in 0..QUERIES.len(),
        smaller in 1i64..3_000,
        extra in 0i64..3_000,
    ) {
        let loader = DisclosureLoader::new(&registry, &LoaderConfig::default());
        let small = loader.load(QUERIES[query], smaller).unwrap();
        let large = loader.load(QUERIES[query], smaller + extra).unwrap();

        prop_assert!(small.over_budget || small.total_estimated_tokens as i64 <= smaller);
        prop_assert!(large.over_budget || large.total_estimated_tokens as i64 <= smaller + extra);
        for id in small.ids() {
            prop_assert!(large.contains(id), "'{}' dropped at a larger budget", id);
        }
    }
}
