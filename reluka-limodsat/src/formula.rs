//! Łukasiewicz formulas stored in an append-only arena.
use std::fmt;

/// A propositional variable, 1-based as in the trace format.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Var {
    number: u32,
}

impl Var {
    /// Creates a variable from its 1-based number.
    ///
    /// The parameter must be positive.
    #[inline]
    pub fn from_number(number: usize) -> Var {
        debug_assert!(number > 0 && number <= u32::max_value() as usize);
        Var {
            number: number as u32,
        }
    }

    /// The 1-based number of this variable.
    #[inline]
    pub fn number(self) -> usize {
        self.number as usize
    }

    /// Creates a literal from this var and a `bool` that is `true` when the literal is positive.
    #[inline]
    pub fn lit(self, polarity: bool) -> Lit {
        Lit {
            var: self,
            negated: !polarity,
        }
    }
}

/// Uses the SMT symbol name.
impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "X{}", self.number)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A variable or its Łukasiewicz negation.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lit {
    var: Var,
    negated: bool,
}

impl Lit {
    /// Creates a literal from a non-zero integer.
    ///
    /// The absolute value is the 1-based variable number, the sign is the sign of the literal.
    #[inline]
    pub fn from_signed(number: i64) -> Lit {
        debug_assert!(number != 0);
        Var::from_number(number.abs() as usize).lit(number > 0)
    }

    /// Signed integer representation, opposite of `from_signed`.
    #[inline]
    pub fn to_signed(self) -> i64 {
        let number = self.var.number() as i64;
        if self.negated {
            -number
        } else {
            number
        }
    }

    #[inline]
    pub fn var(self) -> Var {
        self.var
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.negated
    }
}

impl fmt::Debug for Lit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_signed())
    }
}

/// Binary connectives and the SMT macro implementing each of them.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum Connective {
    /// Strong disjunction `min(1, x + y)`.
    Disjunction,
    /// Strong conjunction `max(0, x + y - 1)`.
    Conjunction,
    Implication,
    Equivalence,
    Minimum,
    Maximum,
}

impl Connective {
    /// Name of the macro defined in the script preamble.
    pub fn smt_name(self) -> &'static str {
        match self {
            Connective::Disjunction => "sdis",
            Connective::Conjunction => "scon",
            Connective::Implication => "impl",
            Connective::Equivalence => "equiv",
            Connective::Minimum => "min",
            Connective::Maximum => "max",
        }
    }
}

/// Index of a formula in a [`FormulaArena`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FormulaId(u32);

impl FormulaId {
    pub(crate) fn from_index(index: usize) -> FormulaId {
        FormulaId(index as u32)
    }

    /// The 0-based position in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A formula node, referring to its operands by id.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Formula {
    /// Left nested strong disjunction of the literals.
    Clause(Vec<Lit>),
    Negation(FormulaId),
    Binary(Connective, FormulaId, FormulaId),
}

/// Append-only storage of formulas.
///
/// Operands always refer to formulas added earlier, so the stored graph is acyclic.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct FormulaArena {
    formulas: Vec<Formula>,
}

impl FormulaArena {
    pub fn new() -> FormulaArena {
        FormulaArena::default()
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    /// Looks up a formula by its 1-based position, as used for back-references in traces.
    pub fn resolve(&self, position: usize) -> Option<FormulaId> {
        if position >= 1 && position <= self.formulas.len() {
            Some(FormulaId((position - 1) as u32))
        } else {
            None
        }
    }

    /// Appends a formula whose operands are already present.
    pub fn push(&mut self, formula: Formula) -> FormulaId {
        let id = FormulaId(self.formulas.len() as u32);
        debug_assert!(match &formula {
            Formula::Clause(lits) => !lits.is_empty(),
            Formula::Negation(a) => *a < id,
            Formula::Binary(_, a, b) => *a < id && *b < id,
        });
        self.formulas.push(formula);
        id
    }

    pub fn get(&self, id: FormulaId) -> &Formula {
        &self.formulas[id.index()]
    }

    /// Writes the formula as an SMT-LIB2 term using the preamble's macros.
    pub fn render(&self, id: FormulaId, target: &mut String) {
        match self.get(id) {
            Formula::Clause(lits) => {
                for _ in 1..lits.len() {
                    target.push_str("(sdis ");
                }
                for (position, &lit) in lits.iter().enumerate() {
                    if position > 0 {
                        target.push(' ');
                    }
                    render_lit(lit, target);
                    if position > 0 {
                        target.push(')');
                    }
                }
            }
            &Formula::Negation(a) => {
                target.push_str("(neg ");
                self.render(a, target);
                target.push(')');
            }
            &Formula::Binary(connective, a, b) => {
                target.push('(');
                target.push_str(connective.smt_name());
                target.push(' ');
                self.render(a, target);
                target.push(' ');
                self.render(b, target);
                target.push(')');
            }
        }
    }

    /// Returns the SMT-LIB2 term for a formula.
    pub fn to_smt(&self, id: FormulaId) -> String {
        let mut term = String::new();
        self.render(id, &mut term);
        term
    }
}

fn render_lit(lit: Lit, target: &mut String) {
    use std::fmt::Write;

    // Writing into a String cannot fail.
    let _ = if lit.is_negative() {
        write!(target, "(neg {})", lit.var())
    } else {
        write!(target, "{}", lit.var())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(lits: &[i64]) -> Formula {
        Formula::Clause(lits.iter().map(|&lit| Lit::from_signed(lit)).collect())
    }

    #[test]
    fn literals() {
        let lit = Lit::from_signed(-7);
        assert!(lit.is_negative());
        assert_eq!(lit.var().number(), 7);
        assert_eq!(lit.to_signed(), -7);
        assert_eq!(format!("{:?}", lit), "-7");
        assert_eq!(lit.var().to_string(), "X7");
    }

    #[test]
    fn clause_is_left_nested() {
        let mut arena = FormulaArena::new();
        let single = arena.push(clause(&[3]));
        let pair = arena.push(clause(&[1, -2]));
        let triple = arena.push(clause(&[1, -2, 4]));

        assert_eq!(arena.to_smt(single), "X3");
        assert_eq!(arena.to_smt(pair), "(sdis X1 (neg X2))");
        assert_eq!(arena.to_smt(triple), "(sdis (sdis X1 (neg X2)) X4)");
    }

    #[test]
    fn shared_operands() {
        let mut arena = FormulaArena::new();
        let a = arena.push(clause(&[1]));
        let b = arena.push(clause(&[-2]));
        let min = arena.push(Formula::Binary(Connective::Minimum, a, b));
        let both = arena.push(Formula::Binary(Connective::Equivalence, min, min));

        assert_eq!(
            arena.to_smt(both),
            "(equiv (min X1 (neg X2)) (min X1 (neg X2)))"
        );
    }

    #[test]
    fn resolve_is_one_based() {
        let mut arena = FormulaArena::new();
        assert_eq!(arena.resolve(1), None);
        let first = arena.push(clause(&[1]));
        assert_eq!(arena.resolve(0), None);
        assert_eq!(arena.resolve(1), Some(first));
        assert_eq!(arena.resolve(2), None);
    }
}
