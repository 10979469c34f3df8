//! # Rule Synthesis
//!
//! Turns a typed [`Procedure`] plus a [`Precondition`] builder into an
//! inference rule. The procedure declares ordered, named inputs and a
//! return, each referring to an event or analysis kind; the precondition
//! re-declares the same parameter shape and supplies a function from
//! freshly-lifted metadata atoms to check atoms. Any mismatch in arity,
//! name, or type between the two declarations is a registration-time
//! error.
//!
//! Lifted atoms use `parameter_name + "__"` as the variable prefix (and
//! `ret__` for the return), so rules drawing several dependencies from
//! the same kind keep their variables distinct.

use std::collections::HashSet;
use std::fmt;

use tracing::debug;

use super::{AnalysisKind, EventKind, RegistryError};
use crate::ir::{sanitize_ident, Atom, Check, IrError, Relation, Rule, Term};

/// A reference to a registered kind, usable as a procedure input or
/// return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindRef {
    name: String,
    metadata: Relation,
}

impl KindRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &Relation {
        &self.metadata
    }
}

impl From<&EventKind> for KindRef {
    fn from(kind: &EventKind) -> KindRef {
        KindRef {
            name: kind.name().to_string(),
            metadata: kind.metadata().clone(),
        }
    }
}

impl From<&AnalysisKind> for KindRef {
    fn from(kind: &AnalysisKind) -> KindRef {
        KindRef {
            name: kind.name().to_string(),
            metadata: kind.metadata().clone(),
        }
    }
}

/// A domain computation with typed inputs and a typed output.
#[derive(Debug, Clone)]
pub struct Procedure {
    name: String,
    params: Vec<(String, KindRef)>,
    returns: KindRef,
}

impl Procedure {
    pub fn new(name: &str, params: Vec<(&str, KindRef)>, returns: KindRef) -> Procedure {
        Procedure {
            name: sanitize_ident(name),
            params: params
                .into_iter()
                .map(|(n, k)| (sanitize_ident(n), k))
                .collect(),
            returns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[(String, KindRef)] {
        &self.params
    }

    pub fn returns(&self) -> &KindRef {
        &self.returns
    }
}

/// The builder function: one lifted metadata atom per procedure input,
/// plus the lifted `ret` atom, to a list of checks.
pub type CheckBuilder = Box<dyn Fn(&[Atom], &Atom) -> Result<Vec<Check>, IrError>>;

/// A precondition: the declared parameter shape plus the check builder.
///
/// The declared parameters must match the procedure's inputs positionally
/// by name and metadata relation, and end with a parameter named `ret`
/// typed over the return kind's metadata relation.
pub struct Precondition {
    params: Vec<(String, Relation)>,
    builder: CheckBuilder,
}

impl Precondition {
    pub fn new(
        params: Vec<(&str, Relation)>,
        builder: impl Fn(&[Atom], &Atom) -> Result<Vec<Check>, IrError> + 'static,
    ) -> Precondition {
        Precondition {
            params: params
                .into_iter()
                .map(|(n, r)| (sanitize_ident(n), r))
                .collect(),
            builder: Box::new(builder),
        }
    }

    pub fn params(&self) -> &[(String, Relation)] {
        &self.params
    }
}

impl fmt::Debug for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Precondition")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Synthesise a rule from a procedure and its precondition.
///
/// Head = the lifted `ret` atom; dependencies = the lifted input atoms
/// keyed by parameter name; checks = whatever the builder returns; label
/// = the procedure's name.
pub fn synthesize(
    procedure: &Procedure,
    precondition: &Precondition,
) -> Result<Rule, RegistryError> {
    let expected = procedure.params.len() + 1;
    if precondition.params.len() != expected {
        return Err(RegistryError::PreconditionArity {
            procedure: procedure.name.clone(),
            expected,
            found: precondition.params.len(),
        });
    }

    for (index, ((proc_name, kind), (pc_name, pc_relation))) in procedure
        .params
        .iter()
        .zip(&precondition.params)
        .enumerate()
    {
        if proc_name != pc_name {
            return Err(RegistryError::ParamName {
                procedure: procedure.name.clone(),
                index,
                expected: proc_name.clone(),
                found: pc_name.clone(),
            });
        }
        if kind.metadata() != pc_relation {
            return Err(RegistryError::ParamType {
                procedure: procedure.name.clone(),
                param: proc_name.clone(),
                expected: kind.metadata().name().to_string(),
                found: pc_relation.name().to_string(),
            });
        }
    }

    let (ret_name, ret_relation) = &precondition.params[precondition.params.len() - 1];
    if ret_name != "ret" {
        return Err(RegistryError::RetName {
            procedure: procedure.name.clone(),
            found: ret_name.clone(),
        });
    }
    if procedure.returns.metadata() != ret_relation {
        return Err(RegistryError::RetType {
            procedure: procedure.name.clone(),
            expected: procedure.returns.metadata().name().to_string(),
            found: ret_relation.name().to_string(),
        });
    }

    let dependencies: Vec<(String, Atom)> = procedure
        .params
        .iter()
        .map(|(name, kind)| (name.clone(), kind.metadata().free(&format!("{name}__"))))
        .collect();
    let head = procedure.returns.metadata().free("ret__");

    let atoms: Vec<Atom> = dependencies.iter().map(|(_, a)| a.clone()).collect();
    let checks = (precondition.builder)(&atoms, &head)?;

    validate_negation(procedure, &dependencies, &checks)?;

    debug!(
        procedure = procedure.name,
        dependencies = dependencies.len(),
        checks = checks.len(),
        "synthesised rule"
    );
    Ok(Rule::new(&procedure.name, head, dependencies, checks))
}

/// Every variable under a negated check must have a binding occurrence in
/// a dependency or a positive check.
fn validate_negation(
    procedure: &Procedure,
    dependencies: &[(String, Atom)],
    checks: &[Check],
) -> Result<(), RegistryError> {
    let mut bound: HashSet<String> = HashSet::new();
    for (_, atom) in dependencies {
        for v in atom.free_variables() {
            if let Term::Variable { name, .. } = v {
                bound.insert(name);
            }
        }
    }
    for check in checks.iter().filter(|c| !c.is_negated()) {
        for v in check.atom().free_variables() {
            if let Term::Variable { name, .. } = v {
                bound.insert(name);
            }
        }
    }
    for check in checks.iter().filter(|c| c.is_negated()) {
        for v in check.atom().free_variables() {
            if let Term::Variable { name, .. } = v {
                if !bound.contains(&name) {
                    return Err(RegistryError::UnboundNegation {
                        procedure: procedure.name.clone(),
                        variable: name,
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Sort;

    fn time() -> Sort {
        Sort::number("time")
    }

    fn condition() -> Sort {
        Sort::symbol("condition")
    }

    fn seq_kind() -> EventKind {
        let metadata =
            Relation::new("Seq", vec![("t", time()), ("c", condition())]).unwrap();
        EventKind::new(metadata, vec!["path"])
    }

    fn score_kind() -> AnalysisKind {
        let metadata = Relation::new(
            "PhenotypeScore",
            vec![("ti", time()), ("tf", time()), ("c", condition())],
        )
        .unwrap();
        AnalysisKind::new(metadata)
    }

    fn lt(a: &Term, b: &Term) -> Check {
        let rel = Relation::infix("TimeLt", "<", time()).unwrap();
        Check::positive(
            Atom::new(rel, vec![("lhs", a.clone()), ("rhs", b.clone())]).unwrap(),
        )
    }

    fn score_procedure() -> Procedure {
        let seq = seq_kind();
        let score = score_kind();
        Procedure::new(
            "ttest_enrichment",
            vec![("seq1", KindRef::from(&seq)), ("seq2", KindRef::from(&seq))],
            KindRef::from(&score),
        )
    }

    fn matching_params() -> Vec<(&'static str, Relation)> {
        vec![
            ("seq1", seq_kind().metadata().clone()),
            ("seq2", seq_kind().metadata().clone()),
            ("ret", score_kind().metadata().clone()),
        ]
    }

    #[test]
    fn lifts_dependencies_with_prefixed_variables() {
        let pc = Precondition::new(matching_params(), |params, _ret| {
            Ok(vec![lt(
                params[0].arg("t")?,
                params[1].arg("t")?,
            )])
        });
        let rule = synthesize(&score_procedure(), &pc).unwrap();

        assert_eq!(rule.label(), "ttest_enrichment");
        assert_eq!(rule.head().to_string(), "PhenotypeScore(ret__ti, ret__tf, ret__c)");
        assert_eq!(rule.dependencies()[0].1.to_string(), "Seq(seq1__t, seq1__c)");
        assert_eq!(rule.dependencies()[1].1.to_string(), "Seq(seq2__t, seq2__c)");
        assert_eq!(rule.checks()[0].to_string(), "seq1__t < seq2__t");
    }

    #[test]
    fn arity_mismatch_is_fatal() {
        let pc = Precondition::new(
            vec![("seq1", seq_kind().metadata().clone())],
            |_, _| Ok(vec![]),
        );
        assert!(matches!(
            synthesize(&score_procedure(), &pc),
            Err(RegistryError::PreconditionArity { .. })
        ));
    }

    #[test]
    fn name_mismatch_is_fatal() {
        let pc = Precondition::new(
            vec![
                ("seq1", seq_kind().metadata().clone()),
                ("other", seq_kind().metadata().clone()),
                ("ret", score_kind().metadata().clone()),
            ],
            |_, _| Ok(vec![]),
        );
        assert!(matches!(
            synthesize(&score_procedure(), &pc),
            Err(RegistryError::ParamName { .. })
        ));
    }

    #[test]
    fn type_mismatch_is_fatal() {
        let pc = Precondition::new(
            vec![
                ("seq1", seq_kind().metadata().clone()),
                ("seq2", score_kind().metadata().clone()),
                ("ret", score_kind().metadata().clone()),
            ],
            |_, _| Ok(vec![]),
        );
        assert!(matches!(
            synthesize(&score_procedure(), &pc),
            Err(RegistryError::ParamType { .. })
        ));
    }

    #[test]
    fn missing_ret_is_fatal() {
        let pc = Precondition::new(
            vec![
                ("seq1", seq_kind().metadata().clone()),
                ("seq2", seq_kind().metadata().clone()),
                ("out", score_kind().metadata().clone()),
            ],
            |_, _| Ok(vec![]),
        );
        assert!(matches!(
            synthesize(&score_procedure(), &pc),
            Err(RegistryError::RetName { .. })
        ));
    }

    #[test]
    fn ret_type_mismatch_is_fatal() {
        let pc = Precondition::new(
            vec![
                ("seq1", seq_kind().metadata().clone()),
                ("seq2", seq_kind().metadata().clone()),
                ("ret", seq_kind().metadata().clone()),
            ],
            |_, _| Ok(vec![]),
        );
        assert!(matches!(
            synthesize(&score_procedure(), &pc),
            Err(RegistryError::RetType { .. })
        ));
    }

    #[test]
    fn unbound_negation_is_fatal() {
        let aux = Relation::new("Flagged", vec![("c", condition())]).unwrap();
        let pc = Precondition::new(matching_params(), move |_, _| {
            Ok(vec![Check::negative(aux.free("stray__"))])
        });
        assert!(matches!(
            synthesize(&score_procedure(), &pc),
            Err(RegistryError::UnboundNegation { .. })
        ));
    }
}
