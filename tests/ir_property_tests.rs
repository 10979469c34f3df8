//! Property-based IR tests (proptest).
//!
//! Pins the structural invariants of atoms, substitution, and derivation
//! trees: free/round-trip, substitution identity and sort preservation,
//! groundness, postorder shape, and path-based replacement.

use proptest::prelude::*;
use std::collections::BTreeSet;

use protoplan::{Atom, Relation, Sort, SortKind, Term, Tree};

// ============================================================================
// Strategies
// ============================================================================

fn sort_strategy() -> impl Strategy<Value = Sort> {
    prop_oneof![
        Just(Sort::number("time")),
        Just(Sort::symbol("condition")),
    ]
}

/// A relation named `R` with 1..=4 keys of mixed sorts.
fn relation_strategy() -> impl Strategy<Value = Relation> {
    prop::collection::vec(sort_strategy(), 1..=4).prop_map(|sorts| {
        let args: Vec<(String, Sort)> = sorts
            .into_iter()
            .enumerate()
            .map(|(i, s)| (format!("k{i}"), s))
            .collect();
        let borrowed: Vec<(&str, Sort)> =
            args.iter().map(|(k, s)| (k.as_str(), s.clone())).collect();
        Relation::new("R", borrowed).expect("distinct keys")
    })
}

fn ident_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

/// Variable names are prefixed per sort so one name never spans two
/// sorts within an atom (substitution would rightly reject that).
fn term_of(sort: &Sort) -> BoxedStrategy<Term> {
    let sort = sort.clone();
    match sort.kind() {
        SortKind::Number => prop_oneof![
            (0i64..100).prop_map({
                let sort = sort.clone();
                move |n| Term::number(sort.clone(), n)
            }),
            ident_strategy().prop_map(move |name| sort.var(&format!("n_{name}"))),
        ]
        .boxed(),
        SortKind::Symbol => prop_oneof![
            "[a-z]{1,4}".prop_map({
                let sort = sort.clone();
                move |s| Term::symbol(sort.clone(), &s)
            }),
            ident_strategy().prop_map(move |name| sort.var(&format!("s_{name}"))),
        ]
        .boxed(),
    }
}

/// An atom of a random relation with a random variable/literal mix.
fn atom_strategy() -> impl Strategy<Value = Atom> {
    relation_strategy().prop_flat_map(|relation| {
        let terms: Vec<BoxedStrategy<Term>> = relation
            .args()
            .iter()
            .map(|(_, sort)| term_of(sort))
            .collect();
        terms.prop_map(move |terms| {
            let named: Vec<(&str, Term)> = relation
                .args()
                .iter()
                .map(|(k, _)| k.as_str())
                .zip(terms)
                .collect();
            Atom::new(relation.clone(), named).expect("sorts agree by construction")
        })
    })
}

fn ground_atom_strategy() -> impl Strategy<Value = Atom> {
    atom_strategy().prop_filter("ground atoms only", Atom::is_ground)
}

/// Random derivation trees; steps carry 1..=3 keyed children.
fn tree_strategy() -> impl Strategy<Value = Tree> {
    let leaf = prop_oneof![
        ground_atom_strategy().prop_map(Tree::leaf),
        atom_strategy().prop_map(Tree::goal),
    ];
    leaf.prop_recursive(3, 12, 3, |inner| {
        (atom_strategy(), prop::collection::vec(inner, 1..=3)).prop_map(
            |(consequent, children)| {
                let antecedents = children
                    .into_iter()
                    .enumerate()
                    .map(|(i, child)| (format!("d{i}"), child))
                    .collect();
                Tree::step("step", consequent, antecedents)
            },
        )
    })
}

fn variable_names(atom: &Atom) -> BTreeSet<String> {
    atom.free_variables()
        .into_iter()
        .filter_map(|t| match t {
            Term::Variable { name, .. } => Some(name),
            Term::Literal { .. } => None,
        })
        .collect()
}

// ============================================================================
// Atom invariants
// ============================================================================

proptest! {
    /// `free(R, p)` has R's keys and sorts and is never ground.
    #[test]
    fn free_round_trip(relation in relation_strategy(), prefix in ident_strategy()) {
        let atom = relation.free(&prefix);
        prop_assert!(!atom.is_ground());
        prop_assert_eq!(atom.relation(), &relation);
        for (key, sort) in relation.args() {
            let term = atom.arg(key).expect("key exists");
            prop_assert_eq!(term.sort(), sort);
            prop_assert_eq!(term.to_string(), format!("{prefix}{key}"));
        }
    }

    /// Substituting a name that does not occur returns an equal atom.
    #[test]
    fn substitution_identity(atom in atom_strategy(), n in 0i64..50) {
        let time = Sort::number("time");
        let replaced = atom
            .substitute("name_that_never_occurs", &Term::number(time, n))
            .expect("sort check cannot fire for an absent name");
        prop_assert_eq!(atom, replaced);
    }

    /// Substitution can only shrink the free variables by the bound name
    /// and add the replacement's own variables.
    #[test]
    fn substitution_bounds_free_variables(atom in atom_strategy()) {
        let free = atom.free_variables();
        for var in free {
            let Term::Variable { name, sort } = var else { continue };
            let replacement = ground_of(&sort);
            let after = atom.substitute(&name, &replacement).expect("same sort");

            let mut allowed = variable_names(&atom);
            allowed.remove(&name);
            prop_assert!(variable_names(&after).is_subset(&allowed));
        }
    }

    /// An atom is ground iff it has no free variables.
    #[test]
    fn groundness_matches_free_variables(atom in atom_strategy()) {
        prop_assert_eq!(atom.is_ground(), atom.free_variables().is_empty());
    }
}

/// A ground term of the sort, for substitution tests.
fn ground_of(sort: &Sort) -> Term {
    match sort.kind() {
        SortKind::Number => Term::number(sort.clone(), 7),
        SortKind::Symbol => Term::symbol(sort.clone(), "g"),
    }
}

// ============================================================================
// Tree invariants
// ============================================================================

fn count_nodes(tree: &Tree) -> usize {
    1 + tree
        .children()
        .iter()
        .map(|(_, child)| count_nodes(child))
        .sum::<usize>()
}

proptest! {
    /// Postorder contains each node exactly once and ends with the root.
    #[test]
    fn postorder_is_complete_and_root_last(tree in tree_strategy()) {
        let order = tree.postorder();
        prop_assert_eq!(order.len(), count_nodes(&tree));

        let (last, crumbs) = order.last().expect("non-empty");
        prop_assert!(crumbs.is_empty());
        prop_assert_eq!(*last, &tree);

        let paths: BTreeSet<Vec<String>> =
            order.iter().map(|(_, crumbs)| crumbs.clone()).collect();
        prop_assert_eq!(paths.len(), order.len());
    }

    /// `goals` returns exactly the open-goal leaves, addressable by their
    /// breadcrumbs.
    #[test]
    fn goals_are_open_leaves(tree in tree_strategy()) {
        let goals = tree.goals();
        let open_in_postorder = tree
            .postorder()
            .iter()
            .filter(|(node, _)| matches!(node, Tree::Goal { .. }))
            .count();
        prop_assert_eq!(goals.len(), open_in_postorder);

        for (atom, crumbs) in &goals {
            let mut node = &tree;
            for key in crumbs {
                let child = node
                    .children()
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, c)| c);
                prop_assert!(child.is_some());
                node = child.expect("checked above");
            }
            prop_assert_eq!(node.consequent(), atom);
        }
    }

    /// Replacing at a goal's path grafts the subtree's goals at that
    /// prefix and leaves every other goal unchanged.
    #[test]
    fn replacement_reflects_subtree_goals(
        tree in tree_strategy(),
        subtree in tree_strategy(),
        pick in 0usize..8,
    ) {
        let goals = tree.goals();
        prop_assume!(!goals.is_empty());
        let (_, path) = &goals[pick % goals.len()];

        let replaced = tree.replace(path, subtree.clone()).expect("valid path");
        let expected: Vec<(protoplan::Atom, Vec<String>)> = goals
            .iter()
            .flat_map(|(atom, crumbs)| {
                if crumbs == path {
                    subtree
                        .goals()
                        .into_iter()
                        .map(|(a, sub_crumbs)| {
                            let mut full = path.clone();
                            full.extend(sub_crumbs);
                            (a, full)
                        })
                        .collect::<Vec<_>>()
                } else {
                    vec![(atom.clone(), crumbs.clone())]
                }
            })
            .collect();

        let got = replaced.goals();
        let got_set: BTreeSet<String> =
            got.iter().map(|(a, c)| format!("{c:?} {a}")).collect();
        let expected_set: BTreeSet<String> =
            expected.iter().map(|(a, c)| format!("{c:?} {a}")).collect();
        prop_assert_eq!(got_set, expected_set);
    }
}
