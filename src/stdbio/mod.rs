//! # Standard Biology Library
//!
//! The bundled domain library for pooled CRISPR-screen planning: time and
//! condition sorts, infection and sequencing events, and the analysis
//! chain from raw sequencing through read-count quantification to
//! phenotype scores and volcano plots.
//!
//! Everything here goes through the ordinary registration surface; domain
//! libraries outside this crate are built the same way.

use crate::ir::{Atom, Check, IrError, Relation, Rule, Sort, Term};
use crate::library::{AnalysisKind, EventKind, KindRef, Library, Precondition, Procedure, RegistryError};

/// A positive infix check `lhs SYMBOL rhs`.
fn infix(relation: &Relation, lhs: &Term, rhs: &Term) -> Result<Check, IrError> {
    Ok(Check::positive(Atom::new(
        relation.clone(),
        vec![("lhs", lhs.clone()), ("rhs", rhs.clone())],
    )?))
}

/// Sorts, relations, and kinds of the standard library, plus helpers for
/// building terms and checks over them.
#[derive(Debug, Clone)]
pub struct StdBio {
    pub time: Sort,
    pub condition: Sort,

    pub time_eq: Relation,
    pub time_lt: Relation,
    pub time_gt: Relation,
    pub cond_eq: Relation,
    pub duplicate_infection: Relation,

    pub infect: EventKind,
    pub seq: EventKind,
    pub read_count_matrix: AnalysisKind,
    pub phenotype_score: AnalysisKind,
    pub volcano_plot: AnalysisKind,
}

impl StdBio {
    pub fn new() -> Result<StdBio, IrError> {
        let time = Sort::number("time");
        let condition = Sort::symbol("condition");

        let time_eq = Relation::infix("TimeEq", "=", time.clone())?;
        let time_lt = Relation::infix("TimeLt", "<", time.clone())?;
        let time_gt = Relation::infix("TimeGt", ">", time.clone())?;
        let cond_eq = Relation::infix("CondEq", "=", condition.clone())?;
        let duplicate_infection =
            Relation::new("DuplicateInfection", vec![("c", condition.clone())])?;

        let infect = EventKind::new(
            Relation::new("Infect", vec![("t", time.clone()), ("c", condition.clone())])?,
            vec!["library"],
        );
        let seq = EventKind::new(
            Relation::new("Seq", vec![("t", time.clone()), ("c", condition.clone())])?,
            vec!["path"],
        );
        let read_count_matrix = AnalysisKind::new(Relation::new(
            "ReadCountMatrix",
            vec![
                ("ti", time.clone()),
                ("tf", time.clone()),
                ("c", condition.clone()),
            ],
        )?);
        let phenotype_score = AnalysisKind::new(Relation::new(
            "PhenotypeScore",
            vec![
                ("ti", time.clone()),
                ("tf", time.clone()),
                ("c", condition.clone()),
            ],
        )?);
        let volcano_plot = AnalysisKind::new(Relation::new(
            "VolcanoPlot",
            vec![
                ("ti", time.clone()),
                ("tf", time.clone()),
                ("c", condition.clone()),
            ],
        )?);

        Ok(StdBio {
            time,
            condition,
            time_eq,
            time_lt,
            time_gt,
            cond_eq,
            duplicate_infection,
            infect,
            seq,
            read_count_matrix,
            phenotype_score,
            volcano_plot,
        })
    }

    /// The fully-populated library.
    pub fn library(&self) -> Result<Library, RegistryError> {
        let mut lib = Library::new();

        lib.register_sort(self.time.clone())?;
        lib.register_sort(self.condition.clone())?;

        lib.register_check_relation(self.time_eq.clone())?;
        lib.register_check_relation(self.time_lt.clone())?;
        lib.register_check_relation(self.time_gt.clone())?;
        lib.register_check_relation(self.cond_eq.clone())?;
        lib.register_check_relation(self.duplicate_infection.clone())?;

        lib.register_event(self.infect.clone())?;
        lib.register_event(self.seq.clone())?;
        lib.register_analysis(self.read_count_matrix.clone())?;
        lib.register_analysis(self.phenotype_score.clone())?;
        lib.register_analysis(self.volcano_plot.clone())?;

        lib.declare_rule(
            &self.enrichment_procedure("ttest_enrichment", &self.phenotype_score),
            &self.enrichment_precondition(&self.phenotype_score),
        )?;
        lib.declare_rule(
            &self.enrichment_procedure("mageck_enrichment", &self.phenotype_score),
            &self.enrichment_precondition(&self.phenotype_score),
        )?;
        lib.declare_rule(
            &self.enrichment_procedure("quantify", &self.read_count_matrix),
            &self.enrichment_precondition(&self.read_count_matrix),
        )?;
        lib.declare_rule(&self.score_procedure(), &self.score_precondition())?;
        lib.declare_rule(&self.volcano_procedure(), &self.volcano_precondition())?;

        lib.register_rule(self.duplicate_infection_rule()?);

        Ok(lib)
    }

    /// A day-numbered time literal.
    pub fn day(&self, day: i64) -> Term {
        Term::number(self.time.clone(), day)
    }

    /// A named condition literal.
    pub fn cond(&self, name: &str) -> Term {
        Term::symbol(self.condition.clone(), name)
    }

    pub fn t_eq(&self, lhs: &Term, rhs: &Term) -> Result<Check, IrError> {
        infix(&self.time_eq, lhs, rhs)
    }

    pub fn t_lt(&self, lhs: &Term, rhs: &Term) -> Result<Check, IrError> {
        infix(&self.time_lt, lhs, rhs)
    }

    pub fn t_gt(&self, lhs: &Term, rhs: &Term) -> Result<Check, IrError> {
        infix(&self.time_gt, lhs, rhs)
    }

    pub fn c_eq(&self, lhs: &Term, rhs: &Term) -> Result<Check, IrError> {
        infix(&self.cond_eq, lhs, rhs)
    }

    /// The check that a condition has a single recorded infection time:
    /// `!DuplicateInfection(c)`.
    pub fn unique_infection(&self, c: &Term) -> Result<Check, IrError> {
        Ok(Check::negative(Atom::new(
            self.duplicate_infection.clone(),
            vec![("c", c.clone())],
        )?))
    }

    /// Shared shape of the enrichment procedures: an infection and two
    /// sequencing runs in, a time-bracketed analysis out.
    fn enrichment_procedure(&self, name: &str, returns: &AnalysisKind) -> Procedure {
        Procedure::new(
            name,
            vec![
                ("infection", KindRef::from(&self.infect)),
                ("seq1", KindRef::from(&self.seq)),
                ("seq2", KindRef::from(&self.seq)),
            ],
            KindRef::from(returns),
        )
    }

    /// Infection strictly precedes both sequencing runs, the runs are
    /// ordered, and everything happens under one condition.
    fn enrichment_precondition(&self, returns: &AnalysisKind) -> Precondition {
        let time_eq = self.time_eq.clone();
        let time_lt = self.time_lt.clone();
        let cond_eq = self.cond_eq.clone();
        Precondition::new(
            vec![
                ("infection", self.infect.metadata().clone()),
                ("seq1", self.seq.metadata().clone()),
                ("seq2", self.seq.metadata().clone()),
                ("ret", returns.metadata().clone()),
            ],
            move |deps, ret| {
                let infection = &deps[0];
                let seq1 = &deps[1];
                let seq2 = &deps[2];
                Ok(vec![
                    infix(&time_lt, infection.arg("t")?, seq1.arg("t")?)?,
                    infix(&time_lt, seq1.arg("t")?, seq2.arg("t")?)?,
                    infix(&time_eq, ret.arg("ti")?, seq1.arg("t")?)?,
                    infix(&time_eq, ret.arg("tf")?, seq2.arg("t")?)?,
                    infix(&cond_eq, infection.arg("c")?, seq1.arg("c")?)?,
                    infix(&cond_eq, infection.arg("c")?, seq2.arg("c")?)?,
                    infix(&cond_eq, infection.arg("c")?, ret.arg("c")?)?,
                ])
            },
        )
    }

    fn score_procedure(&self) -> Procedure {
        Procedure::new(
            "score_from_counts",
            vec![("counts", KindRef::from(&self.read_count_matrix))],
            KindRef::from(&self.phenotype_score),
        )
    }

    fn score_precondition(&self) -> Precondition {
        let time_eq = self.time_eq.clone();
        let time_lt = self.time_lt.clone();
        let cond_eq = self.cond_eq.clone();
        Precondition::new(
            vec![
                ("counts", self.read_count_matrix.metadata().clone()),
                ("ret", self.phenotype_score.metadata().clone()),
            ],
            move |deps, ret| {
                let counts = &deps[0];
                Ok(vec![
                    infix(&time_lt, counts.arg("ti")?, counts.arg("tf")?)?,
                    infix(&time_eq, ret.arg("ti")?, counts.arg("ti")?)?,
                    infix(&time_eq, ret.arg("tf")?, counts.arg("tf")?)?,
                    infix(&cond_eq, ret.arg("c")?, counts.arg("c")?)?,
                ])
            },
        )
    }

    fn volcano_procedure(&self) -> Procedure {
        Procedure::new(
            "volcano_plot",
            vec![("score", KindRef::from(&self.phenotype_score))],
            KindRef::from(&self.volcano_plot),
        )
    }

    fn volcano_precondition(&self) -> Precondition {
        let time_eq = self.time_eq.clone();
        let cond_eq = self.cond_eq.clone();
        Precondition::new(
            vec![
                ("score", self.phenotype_score.metadata().clone()),
                ("ret", self.volcano_plot.metadata().clone()),
            ],
            move |deps, ret| {
                let score = &deps[0];
                Ok(vec![
                    infix(&time_eq, ret.arg("ti")?, score.arg("ti")?)?,
                    infix(&time_eq, ret.arg("tf")?, score.arg("tf")?)?,
                    infix(&cond_eq, ret.arg("c")?, score.arg("c")?)?,
                ])
            },
        )
    }

    /// `DuplicateInfection(c)` holds when a condition was infected at two
    /// distinct times.
    fn duplicate_infection_rule(&self) -> Result<Rule, IrError> {
        let c = self.condition.var("c");
        let first = Atom::new(
            self.infect.metadata().clone(),
            vec![("t", self.time.var("first__t")), ("c", c.clone())],
        )?;
        let second = Atom::new(
            self.infect.metadata().clone(),
            vec![("t", self.time.var("second__t")), ("c", c.clone())],
        )?;
        let head = Atom::new(self.duplicate_infection.clone(), vec![("c", c)])?;
        let ordered = infix(
            &self.time_lt,
            first.arg("t")?,
            second.arg("t")?,
        )?;
        Ok(Rule::new(
            "duplicate_infection",
            head,
            vec![("first".to_string(), first), ("second".to_string(), second)],
            vec![ordered],
        ))
    }
}
