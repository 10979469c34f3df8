//! # Interaction Surface
//!
//! The derivation engine delegates its three choice points - pick a goal,
//! pick a rule, pick an assignment - to an [`Interact`] implementation,
//! and shows it the whole tree between iterations.
//!
//! Two implementations are provided: [`CliInteractor`] presents numbered
//! menus over any reader/writer pair, and [`PolicyInteractor`] drives the
//! goal and rule hooks by [`Mode`], falling back to an inner interactor
//! when a mode demands a human.

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::derivation::{Breadcrumbs, Tree};
use crate::ir::{Assignment, Atom, Rule};

/// Errors raised while obtaining a selection.
#[derive(Debug, Error)]
pub enum InteractError {
    #[error("I/O error during selection: {0}")]
    Io(#[from] io::Error),

    /// Input ended before a selection was made.
    #[error("input closed before a selection was made")]
    Closed,

    /// A selection was demanded from a non-interactive surface.
    #[error("no interactive surface available for this selection")]
    NoInteraction,
}

/// Selection behaviour for a single hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Always ask.
    Manual,
    /// Ask only when more than one choice is available.
    FastForward,
    /// Always take the first choice.
    Auto,
}

/// An open goal paired with its breadcrumb path.
pub type PathedGoal = (Atom, Breadcrumbs);

/// A candidate rule for the selected goal, with its satisfying
/// assignments. An empty option list means the rule does not apply.
#[derive(Debug)]
pub struct RuleChoice<'a> {
    pub rule: &'a Rule,
    pub options: Vec<Assignment>,
}

/// The selection hooks the derivation engine calls.
///
/// All `select_*` methods return an index into the given slice.
/// `select_rule` must pick a choice with a non-empty option list; the
/// engine never calls it without at least one.
pub trait Interact {
    /// Observe the tree between iterations. Display only.
    fn observe_tree(&mut self, tree: &Tree);

    fn select_goal(&mut self, goals: &[PathedGoal]) -> Result<usize, InteractError>;

    fn select_rule(&mut self, choices: &[RuleChoice<'_>]) -> Result<usize, InteractError>;

    fn select_assignment(&mut self, options: &[Assignment]) -> Result<usize, InteractError>;
}

/// `{k -> v, ...}` rendering for selection menus.
fn assignment_text(assignment: &Assignment) -> String {
    let bindings = assignment
        .iter()
        .map(|(name, term)| format!("{name} -> {term}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{bindings}}}")
}

/// Numbered-menu interactor over a reader/writer pair.
pub struct CliInteractor<R, W> {
    input: R,
    output: W,
}

impl CliInteractor<BufReader<Stdin>, Stdout> {
    /// An interactor over the process's stdin/stdout.
    pub fn stdio() -> Self {
        CliInteractor::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> CliInteractor<R, W> {
    pub fn new(input: R, output: W) -> Self {
        CliInteractor { input, output }
    }

    /// Prompt until a number below `limit` is read.
    fn choose(&mut self, limit: usize) -> Result<usize, InteractError> {
        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(InteractError::Closed);
            }
            match line.trim().parse::<usize>() {
                Ok(n) if n < limit => return Ok(n),
                _ => writeln!(self.output, "Invalid selection, try again.")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> Interact for CliInteractor<R, W> {
    fn observe_tree(&mut self, tree: &Tree) {
        let _ = writeln!(self.output, "\n===== Derivation tree =====");
        let _ = writeln!(self.output, "{tree}");
        let _ = writeln!(self.output, "===========================");
    }

    fn select_goal(&mut self, goals: &[PathedGoal]) -> Result<usize, InteractError> {
        writeln!(self.output, "\nSelect a goal to work on:")?;
        for (i, (goal, _)) in goals.iter().enumerate() {
            writeln!(self.output, "{i}. {goal}")?;
        }
        self.choose(goals.len())
    }

    fn select_rule(&mut self, choices: &[RuleChoice<'_>]) -> Result<usize, InteractError> {
        // Only rules that actually apply are offered.
        let viable: Vec<usize> = (0..choices.len())
            .filter(|&i| !choices[i].options.is_empty())
            .collect();

        writeln!(self.output, "\nSelect a rule to use:")?;
        for (menu_index, &choice_index) in viable.iter().enumerate() {
            writeln!(
                self.output,
                "{menu_index}. {}",
                choices[choice_index].rule.label()
            )?;
        }
        let picked = self.choose(viable.len())?;
        Ok(viable[picked])
    }

    fn select_assignment(&mut self, options: &[Assignment]) -> Result<usize, InteractError> {
        if options.len() == 1 {
            return Ok(0);
        }
        writeln!(self.output, "\nSelect an assignment to use:")?;
        for (i, assignment) in options.iter().enumerate() {
            writeln!(self.output, "{i}. {}", assignment_text(assignment))?;
        }
        self.choose(options.len())
    }
}

/// A surface with nobody behind it: observes silently, cannot select.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Interact for Silent {
    fn observe_tree(&mut self, _tree: &Tree) {}

    fn select_goal(&mut self, _goals: &[PathedGoal]) -> Result<usize, InteractError> {
        Err(InteractError::NoInteraction)
    }

    fn select_rule(&mut self, _choices: &[RuleChoice<'_>]) -> Result<usize, InteractError> {
        Err(InteractError::NoInteraction)
    }

    fn select_assignment(&mut self, _options: &[Assignment]) -> Result<usize, InteractError> {
        Err(InteractError::NoInteraction)
    }
}

/// Mode-driven selection, deferring to an inner interactor when a mode
/// requires a human choice.
///
/// Assignments follow the rule mode, with single options always
/// fast-forwarded.
pub struct PolicyInteractor<I> {
    inner: I,
    goal_mode: Mode,
    rule_mode: Mode,
}

impl PolicyInteractor<Silent> {
    /// Fully automatic: first goal, first viable rule, first assignment.
    pub fn automatic() -> Self {
        PolicyInteractor::new(Silent, Mode::Auto, Mode::Auto)
    }
}

impl<I: Interact> PolicyInteractor<I> {
    pub fn new(inner: I, goal_mode: Mode, rule_mode: Mode) -> Self {
        PolicyInteractor {
            inner,
            goal_mode,
            rule_mode,
        }
    }
}

impl<I: Interact> Interact for PolicyInteractor<I> {
    fn observe_tree(&mut self, tree: &Tree) {
        self.inner.observe_tree(tree);
    }

    fn select_goal(&mut self, goals: &[PathedGoal]) -> Result<usize, InteractError> {
        match self.goal_mode {
            Mode::Auto => Ok(0),
            Mode::FastForward if goals.len() == 1 => Ok(0),
            _ => self.inner.select_goal(goals),
        }
    }

    fn select_rule(&mut self, choices: &[RuleChoice<'_>]) -> Result<usize, InteractError> {
        let viable: Vec<usize> = (0..choices.len())
            .filter(|&i| !choices[i].options.is_empty())
            .collect();
        match self.rule_mode {
            Mode::Auto => viable.first().copied().ok_or(InteractError::NoInteraction),
            Mode::FastForward if viable.len() == 1 => Ok(viable[0]),
            _ => self.inner.select_rule(choices),
        }
    }

    fn select_assignment(&mut self, options: &[Assignment]) -> Result<usize, InteractError> {
        if options.len() == 1 {
            return Ok(0);
        }
        match self.rule_mode {
            Mode::Auto => Ok(0),
            _ => self.inner.select_assignment(options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Relation, Sort, Term};

    fn goal_pair() -> PathedGoal {
        let time = Sort::number("time");
        let rel = Relation::new("Event", vec![("t", time)]).unwrap();
        (rel.free("g__"), Vec::new())
    }

    fn rule_fixture() -> Rule {
        let time = Sort::number("time");
        let rel = Relation::new("Event", vec![("t", time)]).unwrap();
        Rule::new("fixture", rel.free("ret__"), vec![], vec![])
    }

    fn one_assignment() -> Assignment {
        let time = Sort::number("time");
        let mut a = Assignment::new();
        a.insert("t".to_string(), Term::number(time, 1));
        a
    }

    #[test]
    fn cli_reads_numbered_selection() {
        let input = io::Cursor::new(b"wat\n1\n".to_vec());
        let mut out = Vec::new();
        let mut cli = CliInteractor::new(input, &mut out);
        let goals = vec![goal_pair(), goal_pair()];
        assert_eq!(cli.select_goal(&goals).unwrap(), 1);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Select a goal"));
        assert!(text.contains("Invalid selection"));
    }

    #[test]
    fn cli_errors_on_closed_input() {
        let input = io::Cursor::new(Vec::new());
        let mut cli = CliInteractor::new(input, Vec::new());
        let goals = vec![goal_pair()];
        assert!(matches!(
            cli.select_goal(&goals),
            Err(InteractError::Closed)
        ));
    }

    #[test]
    fn cli_skips_menu_for_single_assignment() {
        let input = io::Cursor::new(Vec::new());
        let mut cli = CliInteractor::new(input, Vec::new());
        assert_eq!(cli.select_assignment(&[one_assignment()]).unwrap(), 0);
    }

    #[test]
    fn cli_rule_menu_hides_inapplicable_rules() {
        let rule = rule_fixture();
        let choices = vec![
            RuleChoice {
                rule: &rule,
                options: vec![],
            },
            RuleChoice {
                rule: &rule,
                options: vec![one_assignment()],
            },
        ];
        let input = io::Cursor::new(b"0\n".to_vec());
        let mut out = Vec::new();
        let mut cli = CliInteractor::new(input, &mut out);
        // Menu entry 0 maps back to the second (viable) choice.
        assert_eq!(cli.select_rule(&choices).unwrap(), 1);
    }

    #[test]
    fn auto_policy_picks_first_viable() {
        let rule = rule_fixture();
        let choices = vec![
            RuleChoice {
                rule: &rule,
                options: vec![],
            },
            RuleChoice {
                rule: &rule,
                options: vec![one_assignment()],
            },
        ];
        let mut policy = PolicyInteractor::automatic();
        assert_eq!(policy.select_rule(&choices).unwrap(), 1);
        assert_eq!(policy.select_goal(&[goal_pair()]).unwrap(), 0);
    }

    #[test]
    fn fast_forward_defers_on_ambiguity() {
        let mut policy = PolicyInteractor::new(Silent, Mode::FastForward, Mode::FastForward);
        assert_eq!(policy.select_goal(&[goal_pair()]).unwrap(), 0);
        assert!(matches!(
            policy.select_goal(&[goal_pair(), goal_pair()]),
            Err(InteractError::NoInteraction)
        ));
    }

    #[test]
    fn assignment_text_renders_bindings() {
        assert_eq!(assignment_text(&one_assignment()), "{t -> 1}");
    }
}
