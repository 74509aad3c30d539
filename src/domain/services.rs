//! Formula evaluation services.
//!
//! This module walks parsed formulas against the live [`Sheet`], resolving
//! cell references by recursively evaluating the referenced cell, and turns
//! the outcome of a top-level evaluation into the string a cell displays.
//!
//! Every top-level [`Evaluator::evaluate`] call starts from a fresh
//! [`EvaluationContext`]: the memoized results and the in-progress markers
//! used for cycle detection never outlive one evaluation pass.

use std::collections::{HashMap, HashSet};

use super::config::SheetConfig;
use super::errors::{EvalError, EvalResult};
use super::models::{CellId, Sheet};
use super::parser::{parse_formula, BinaryOp, Expr, Function, UnaryOp};

/// Error code shown for circular references.
pub const CYCLE_ERROR: &str = "#CYCERROR";
/// Error code shown for references to cells that do not exist.
pub const REF_ERROR: &str = "#REF_ERROR";
/// Error code shown for text that looks like a broken formula.
pub const SYNTAX_ERROR: &str = "#SYNERROR";

/// Prefixes that mark text as an attempted formula.
const FORMULA_PREFIXES: [&str; 4] = ["=", "not", "inc", "dec"];

/// Numeric result of an evaluation.
///
/// `logical` reflects the outermost operation: comparisons and `not` produce
/// logical results, every arithmetic, literal or reference production does not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluated {
    pub value: f64,
    pub logical: bool,
}

impl Evaluated {
    fn number(value: f64) -> Self {
        Self { value, logical: false }
    }

    fn logical(holds: bool) -> Self {
        Self {
            value: if holds { 1.0 } else { 0.0 },
            logical: true,
        }
    }
}

/// State scoped to one evaluation pass.
#[derive(Debug, Default)]
pub struct EvaluationContext {
    in_progress: HashSet<CellId>,
    memo: HashMap<CellId, EvalResult<f64>>,
    evaluations: HashMap<CellId, usize>,
}

impl EvaluationContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything recorded by a previous pass.
    pub fn reset(&mut self) {
        self.in_progress.clear();
        self.memo.clear();
        self.evaluations.clear();
    }

    /// Whether `id` is being evaluated further up the current call chain.
    pub fn is_in_progress(&self, id: CellId) -> bool {
        self.in_progress.contains(&id)
    }

    /// The result recorded for `id` during this pass. Failed cells keep
    /// their error so later references see them as invalid.
    pub fn cached(&self, id: CellId) -> Option<&EvalResult<f64>> {
        self.memo.get(&id)
    }

    /// How many times the expression of `id` was evaluated in this pass.
    pub fn evaluation_count(&self, id: CellId) -> usize {
        self.evaluations.get(&id).copied().unwrap_or(0)
    }
}

/// Evaluates cell formulas against a sheet.
///
/// References register the referencing cell as a dependent of the
/// referenced one as a side effect, which is how the propagation graph
/// is built.
///
/// # Examples
///
/// ```
/// use cellsheet::domain::{Evaluator, Sheet};
///
/// let mut sheet = Sheet::new(1, 2);
/// let a1 = sheet.lookup("A1").unwrap();
/// let b1 = sheet.lookup("B1").unwrap();
/// sheet.set_expression(a1, "5").unwrap();
/// sheet.set_expression(b1, "A1 + 1").unwrap();
///
/// let result = Evaluator::new(&mut sheet).evaluate(b1).unwrap();
/// assert_eq!(result.value, 6.0);
/// assert_eq!(sheet.get(a1).unwrap().dependents, vec![b1]);
/// ```
pub struct Evaluator<'a> {
    sheet: &'a mut Sheet,
    context: EvaluationContext,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator over `sheet` with a fresh context.
    pub fn new(sheet: &'a mut Sheet) -> Self {
        Self {
            sheet,
            context: EvaluationContext::new(),
        }
    }

    /// State left behind by the most recent pass.
    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    /// Evaluates the expression of `id` as a new pass.
    pub fn evaluate(&mut self, id: CellId) -> EvalResult<Evaluated> {
        self.context.reset();

        self.context.in_progress.insert(id);
        let result = self.evaluate_cell(id);
        self.context.in_progress.remove(&id);

        let recorded = match &result {
            Ok(evaluated) => Ok(evaluated.value),
            Err(err) => Err(err.clone()),
        };
        self.context.memo.insert(id, recorded);
        result
    }

    fn evaluate_cell(&mut self, id: CellId) -> EvalResult<Evaluated> {
        let expression = match self.sheet.get(id) {
            Some(cell) => cell.expression.clone(),
            None => return Err(EvalError::CellNotFound(id.to_string())),
        };
        *self.context.evaluations.entry(id).or_insert(0) += 1;

        let expr = parse_formula(&expression)?;
        self.evaluate_expr(id, &expr)
    }

    fn evaluate_expr(&mut self, current: CellId, expr: &Expr) -> EvalResult<Evaluated> {
        match expr {
            Expr::Number(text) => parse_literal(text).map(Evaluated::number),

            Expr::CellRef(name) => self.resolve_reference(current, name).map(Evaluated::number),

            Expr::Formula(inner) => self.evaluate_expr(current, inner),

            Expr::Unary { operator, operand } => {
                let value = self.evaluate_expr(current, operand)?.value;
                Ok(Evaluated::number(match operator {
                    UnaryOp::Plus => value,
                    UnaryOp::Minus => -value,
                }))
            }

            Expr::Binary { left, operator, right } => {
                let left = self.evaluate_expr(current, left)?.value;
                let right = self.evaluate_expr(current, right)?.value;

                Ok(match operator {
                    BinaryOp::Add => Evaluated::number(left + right),
                    BinaryOp::Subtract => Evaluated::number(left - right),
                    BinaryOp::Multiply => Evaluated::number(left * right),
                    BinaryOp::Divide => Evaluated::number(left / right),
                    BinaryOp::Power => Evaluated::number(left.powf(right)),
                    BinaryOp::Equal => Evaluated::logical(left == right),
                    BinaryOp::Less => Evaluated::logical(left < right),
                    BinaryOp::Greater => Evaluated::logical(left > right),
                })
            }

            Expr::Call { function, argument } => {
                let value = self.evaluate_expr(current, argument)?.value;
                Ok(match function {
                    Function::Inc => Evaluated::number(value + 1.0),
                    Function::Dec => Evaluated::number(value - 1.0),
                    Function::Not => Evaluated::logical(value == 0.0),
                })
            }
        }
    }

    fn resolve_reference(&mut self, current: CellId, name: &str) -> EvalResult<f64> {
        let Some(target) = self.sheet.lookup(name) else {
            log::trace!("reference to missing cell {}", name);
            return Err(EvalError::CellNotFound(name.to_string()));
        };

        // Registered before anything can fail so the graph sees every reference.
        self.sheet.add_dependent(target, current);

        if let Some(cached) = self.context.memo.get(&target) {
            return cached.clone();
        }

        if self.context.in_progress.contains(&target) {
            return Err(EvalError::Cycle(name.to_string()));
        }

        log::trace!("resolving {} for {}", name, self.sheet.name_of(current));
        self.context.in_progress.insert(target);
        let result = match self.evaluate_cell(target) {
            Ok(evaluated) => Ok(evaluated.value),
            Err(err) if err.is_recoverable() => self.scalar_fallback(target).ok_or(err),
            Err(err) => Err(err),
        };
        self.context.in_progress.remove(&target);

        self.context.memo.insert(target, result.clone());
        result
    }

    /// Empty cells read as zero; plain numeric text reads as its value.
    fn scalar_fallback(&self, id: CellId) -> Option<f64> {
        let expression = &self.sheet.get(id)?.expression;
        if expression.is_empty() {
            Some(0.0)
        } else {
            let text = expression.trim();
            is_numeric_text(text).then(|| text.parse::<f64>().ok()).flatten()
        }
    }
}

/// Matches `[+-]digits[.digits][(e|E)[+-]digits]` with at least one mantissa
/// digit. Spellings such as `inf` or `NaN` are not numbers here.
fn is_numeric_text(text: &str) -> bool {
    fn digits(bytes: &[u8], mut i: usize) -> usize {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    }

    let bytes = text.as_bytes();
    let mut i = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    let int_end = digits(bytes, i);
    let mut mantissa_digits = int_end - i;
    i = int_end;

    if bytes.get(i) == Some(&b'.') {
        let frac_end = digits(bytes, i + 1);
        mantissa_digits += frac_end - (i + 1);
        i = frac_end;
    }
    if mantissa_digits == 0 {
        return false;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let exp_end = digits(bytes, i);
        if exp_end == i {
            return false;
        }
        i = exp_end;
    }

    i == bytes.len()
}

/// Parses a literal the grammar accepted, normalizing `,` to `.`.
fn parse_literal(text: &str) -> EvalResult<f64> {
    text.replace(',', ".").parse::<f64>().map_err(|_| {
        log::warn!("numeric token {:?} failed to parse", text);
        EvalError::InvalidLiteral(text.to_string())
    })
}

/// Evaluates `id` in a fresh pass.
pub fn evaluate(sheet: &mut Sheet, id: CellId) -> EvalResult<Evaluated> {
    Evaluator::new(sheet).evaluate(id)
}

/// Formats a number with locale-independent, shortest round-trip digits.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "∞".to_string() } else { "-∞".to_string() }
    } else {
        value.to_string()
    }
}

/// What a cell shows after a top-level evaluation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CellOutcome {
    /// No formula.
    Empty,
    Logical(bool),
    Number(f64),
    Cycle { message: String },
    MissingReference { message: String },
    /// Text that is one bare reference; shows the referenced cell's value.
    Passthrough { source: String, value: String },
    SyntaxError,
    /// Not a formula; shown as typed.
    Literal(String),
}

impl CellOutcome {
    /// The display string, using `config` for logical tokens.
    pub fn render(&self, config: &SheetConfig) -> String {
        match self {
            CellOutcome::Empty => String::new(),
            CellOutcome::Logical(holds) => config.logical_token(*holds).to_string(),
            CellOutcome::Number(value) => format_number(*value),
            CellOutcome::Cycle { .. } => CYCLE_ERROR.to_string(),
            CellOutcome::MissingReference { .. } => REF_ERROR.to_string(),
            CellOutcome::Passthrough { value, .. } => value.clone(),
            CellOutcome::SyntaxError => SYNTAX_ERROR.to_string(),
            CellOutcome::Literal(text) => text.clone(),
        }
    }

    /// User-facing message for failures that are surfaced to the user.
    pub fn message(&self) -> Option<&str> {
        match self {
            CellOutcome::Cycle { message } | CellOutcome::MissingReference { message } => {
                Some(message)
            }
            _ => None,
        }
    }
}

/// Evaluates `id` and classifies the result for display.
pub fn classify(sheet: &mut Sheet, id: CellId) -> CellOutcome {
    let expression = match sheet.get(id) {
        Some(cell) if cell.has_expression() => cell.expression.clone(),
        _ => return CellOutcome::Empty,
    };

    match evaluate(sheet, id) {
        Ok(Evaluated { value, logical: true }) => CellOutcome::Logical(value != 0.0),
        Ok(Evaluated { value, .. }) => CellOutcome::Number(value),
        Err(err @ EvalError::Cycle(_)) => CellOutcome::Cycle {
            message: err.to_string(),
        },
        Err(err @ EvalError::CellNotFound(_)) => CellOutcome::MissingReference {
            message: err.to_string(),
        },
        Err(err) => {
            log::debug!("recovering {} after: {}", sheet.name_of(id), err);
            recover(sheet, &expression)
        }
    }
}

/// Best-effort display for text that failed to evaluate.
fn recover(sheet: &Sheet, expression: &str) -> CellOutcome {
    let tree = parse_formula(expression).ok();

    if let Some(source) = tree.as_ref().and_then(|tree| tree.as_single_reference()) {
        if let Some(cell) = sheet.cell_by_name(source) {
            return CellOutcome::Passthrough {
                source: cell.name.clone(),
                value: cell.value.clone(),
            };
        }
    }

    let normalized = expression.trim().to_lowercase();
    let looks_like_formula = FORMULA_PREFIXES
        .iter()
        .any(|prefix| normalized.starts_with(prefix));
    let is_complex = tree.as_ref().is_some_and(|tree| !tree.is_primitive());

    if looks_like_formula || is_complex {
        CellOutcome::SyntaxError
    } else {
        CellOutcome::Literal(expression.to_string())
    }
}

/// Classifies `id` and stores the rendered value on the cell.
pub fn process_cell(sheet: &mut Sheet, id: CellId, config: &SheetConfig) -> CellOutcome {
    let outcome = classify(sheet, id);
    sheet.set_value(id, outcome.render(config));
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_sheet(entries: &[(&str, &str)]) -> Sheet {
        let mut sheet = Sheet::new(5, 5);
        for (name, expression) in entries {
            let id = sheet.lookup(name).unwrap();
            sheet.set_expression(id, expression).unwrap();
        }
        sheet
    }

    fn eval(sheet: &mut Sheet, name: &str) -> EvalResult<Evaluated> {
        let id = sheet.lookup(name).unwrap();
        evaluate(sheet, id)
    }

    fn value_of(sheet: &mut Sheet, name: &str) -> f64 {
        eval(sheet, name).unwrap().value
    }

    fn shown(sheet: &mut Sheet, name: &str) -> String {
        let id = sheet.lookup(name).unwrap();
        process_cell(sheet, id, &SheetConfig::default());
        sheet.get(id).unwrap().value.clone()
    }

    #[test]
    fn test_simple_arithmetic() {
        let mut sheet = create_test_sheet(&[
            ("A1", "2+3"),
            ("A2", "10-3"),
            ("A3", "4*5"),
            ("A4", "15/3"),
            ("A5", "2^3"),
        ]);
        assert_eq!(value_of(&mut sheet, "A1"), 5.0);
        assert_eq!(value_of(&mut sheet, "A2"), 7.0);
        assert_eq!(value_of(&mut sheet, "A3"), 20.0);
        assert_eq!(value_of(&mut sheet, "A4"), 5.0);
        assert_eq!(value_of(&mut sheet, "A5"), 8.0);
    }

    #[test]
    fn test_order_of_operations() {
        let mut sheet = create_test_sheet(&[
            ("A1", "3 + 2 * 4"),
            ("A2", "3 + 2 * 4 - 5 / (1 + 1) ^ 2"),
            ("A3", "(3 + 2) * 4"),
        ]);
        assert_eq!(value_of(&mut sheet, "A1"), 11.0);
        assert_eq!(value_of(&mut sheet, "A2"), 9.75);
        assert_eq!(value_of(&mut sheet, "A3"), 20.0);
    }

    #[test]
    fn test_leading_equals_is_cosmetic() {
        let mut sheet = create_test_sheet(&[("A1", "4"), ("B1", "=A1+1"), ("C1", "A1+1")]);
        assert_eq!(value_of(&mut sheet, "B1"), value_of(&mut sheet, "C1"));
        assert!(!eval(&mut sheet, "B1").unwrap().logical);
    }

    #[test]
    fn test_decimal_separators() {
        let mut sheet = create_test_sheet(&[("A1", "2,5 + 0.5"), ("A2", "1,25 * 2")]);
        assert_eq!(value_of(&mut sheet, "A1"), 3.0);
        assert_eq!(value_of(&mut sheet, "A2"), 2.5);
    }

    #[test]
    fn test_unary_and_functions() {
        let mut sheet = create_test_sheet(&[
            ("A1", "-5 + 10"),
            ("A2", "inc(4)"),
            ("A3", "dec(-4)"),
            ("A4", "+-3"),
            ("A5", "inc(dec(7)) * 2"),
        ]);
        assert_eq!(value_of(&mut sheet, "A1"), 5.0);
        assert_eq!(value_of(&mut sheet, "A2"), 5.0);
        assert_eq!(value_of(&mut sheet, "A3"), -5.0);
        assert_eq!(value_of(&mut sheet, "A4"), -3.0);
        assert_eq!(value_of(&mut sheet, "A5"), 14.0);
    }

    #[test]
    fn test_comparisons_are_logical() {
        let mut sheet = create_test_sheet(&[
            ("A1", "5<10"),
            ("A2", "5>10"),
            ("A3", "2 = 2"),
            ("A4", "=2=3"),
        ]);
        assert_eq!(eval(&mut sheet, "A1").unwrap(), Evaluated { value: 1.0, logical: true });
        assert_eq!(eval(&mut sheet, "A2").unwrap(), Evaluated { value: 0.0, logical: true });
        assert_eq!(eval(&mut sheet, "A3").unwrap(), Evaluated { value: 1.0, logical: true });
        assert_eq!(eval(&mut sheet, "A4").unwrap(), Evaluated { value: 0.0, logical: true });
    }

    #[test]
    fn test_not() {
        let mut sheet = create_test_sheet(&[("A1", "not(0)"), ("A2", "not(1)"), ("A3", "not(-2)")]);
        assert_eq!(eval(&mut sheet, "A1").unwrap(), Evaluated { value: 1.0, logical: true });
        assert_eq!(eval(&mut sheet, "A2").unwrap(), Evaluated { value: 0.0, logical: true });
        assert_eq!(eval(&mut sheet, "A3").unwrap(), Evaluated { value: 0.0, logical: true });
    }

    #[test]
    fn test_outermost_operation_decides_logical() {
        let mut sheet = create_test_sheet(&[
            ("A1", "(1 < 2) + 1"),
            ("A2", "-(1 < 2)"),
            ("A3", "(1 < 2)"),
            ("A4", "not(0) * 3"),
            ("B1", "1 < 2"),
            ("B2", "B1"),
        ]);
        assert_eq!(eval(&mut sheet, "A1").unwrap(), Evaluated { value: 2.0, logical: false });
        assert!(!eval(&mut sheet, "A2").unwrap().logical);
        assert!(eval(&mut sheet, "A3").unwrap().logical);
        assert_eq!(eval(&mut sheet, "A4").unwrap(), Evaluated { value: 3.0, logical: false });
        assert_eq!(eval(&mut sheet, "B2").unwrap(), Evaluated { value: 1.0, logical: false });
    }

    #[test]
    fn test_cell_references() {
        let mut sheet = create_test_sheet(&[("A1", "10"), ("B1", "20"), ("C1", "A1 + B1 * 2")]);
        assert_eq!(value_of(&mut sheet, "C1"), 50.0);
    }

    #[test]
    fn test_lowercase_reference() {
        let mut sheet = create_test_sheet(&[("A1", "10"), ("B1", "a1 * 2")]);
        assert_eq!(value_of(&mut sheet, "B1"), 20.0);
    }

    #[test]
    fn test_empty_reference_reads_as_zero() {
        let mut sheet = create_test_sheet(&[("B1", "A1 + 3")]);
        assert_eq!(value_of(&mut sheet, "B1"), 3.0);
    }

    #[test]
    fn test_numeric_text_fallback() {
        let mut sheet = create_test_sheet(&[("A1", "1e3"), ("B1", "A1 + 1")]);
        assert_eq!(value_of(&mut sheet, "B1"), 1001.0);
    }

    #[test]
    fn test_non_finite_spellings_are_not_numbers() {
        for text in ["inf", "infinity", "NaN", "-inf"] {
            let mut sheet = create_test_sheet(&[("A1", text), ("B1", "A1 + 1")]);
            assert!(matches!(eval(&mut sheet, "B1"), Err(EvalError::Syntax(_))), "{}", text);
            assert_eq!(shown(&mut sheet, "B1"), SYNTAX_ERROR);
        }
    }

    #[test]
    fn test_numeric_text_shape() {
        for text in ["1", "-2.5", "+.5", "3.", "1e3", "2.5E-2"] {
            assert!(is_numeric_text(text), "{}", text);
        }
        for text in ["", ".", "-", "1e", "e3", "1.2.3", "inf", "nan", "0x10", "1 2"] {
            assert!(!is_numeric_text(text), "{}", text);
        }
    }

    #[test]
    fn test_text_reference_propagates_failure() {
        let mut sheet = create_test_sheet(&[("A1", "hello"), ("B1", "A1 + 1")]);
        assert!(matches!(eval(&mut sheet, "B1"), Err(EvalError::Syntax(_))));
    }

    #[test]
    fn test_missing_cell() {
        let mut sheet = create_test_sheet(&[("A1", "Z9 + 1")]);
        assert_eq!(eval(&mut sheet, "A1"), Err(EvalError::CellNotFound("Z9".to_string())));
    }

    #[test]
    fn test_direct_cycle() {
        let mut sheet = create_test_sheet(&[("A1", "B1 + 1"), ("B1", "A1 + 1")]);
        assert!(matches!(eval(&mut sheet, "A1"), Err(EvalError::Cycle(_))));
        assert!(matches!(eval(&mut sheet, "B1"), Err(EvalError::Cycle(_))));
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let mut sheet = create_test_sheet(&[("A1", "A1 + 1")]);
        assert_eq!(eval(&mut sheet, "A1"), Err(EvalError::Cycle("A1".to_string())));
    }

    #[test]
    fn test_transitive_cycle_leaves_no_valid_results() {
        let mut sheet = create_test_sheet(&[("A1", "B1"), ("B1", "C1 * 2"), ("C1", "A1 - 1")]);
        let a1 = sheet.lookup("A1").unwrap();
        let b1 = sheet.lookup("B1").unwrap();
        let c1 = sheet.lookup("C1").unwrap();

        let mut evaluator = Evaluator::new(&mut sheet);
        assert!(matches!(evaluator.evaluate(a1), Err(EvalError::Cycle(_))));

        let context = evaluator.context();
        for id in [a1, b1, c1] {
            assert!(matches!(context.cached(id), Some(Err(EvalError::Cycle(_)))));
            assert!(!context.is_in_progress(id));
        }
    }

    #[test]
    fn test_cycle_is_not_recovered_by_fallback() {
        let mut sheet = create_test_sheet(&[("A1", "B1"), ("B1", "A1")]);
        assert!(matches!(eval(&mut sheet, "A1"), Err(EvalError::Cycle(_))));
    }

    #[test]
    fn test_memoization_within_pass() {
        let mut sheet = create_test_sheet(&[
            ("A1", "5"),
            ("B1", "A1 + 1"),
            ("C1", "A1 * 2"),
            ("D1", "B1 + C1 + A1"),
        ]);
        let a1 = sheet.lookup("A1").unwrap();
        let d1 = sheet.lookup("D1").unwrap();

        let mut evaluator = Evaluator::new(&mut sheet);
        assert_eq!(evaluator.evaluate(d1).unwrap().value, 21.0);
        assert_eq!(evaluator.context().evaluation_count(a1), 1);
        assert_eq!(evaluator.context().cached(a1), Some(&Ok(5.0)));
    }

    #[test]
    fn test_context_is_fresh_per_pass() {
        let mut sheet = create_test_sheet(&[("A1", "5"), ("B1", "A1 + 1")]);
        let a1 = sheet.lookup("A1").unwrap();
        let b1 = sheet.lookup("B1").unwrap();

        let mut evaluator = Evaluator::new(&mut sheet);
        evaluator.evaluate(b1).unwrap();
        evaluator.evaluate(b1).unwrap();
        assert_eq!(evaluator.context().evaluation_count(a1), 1);
        assert_eq!(evaluator.context().evaluation_count(b1), 1);
    }

    #[test]
    fn test_references_register_dependents() {
        let mut sheet = create_test_sheet(&[("A1", "1"), ("B1", "A1 + A1"), ("C1", "B1 + A1")]);
        let a1 = sheet.lookup("A1").unwrap();
        let b1 = sheet.lookup("B1").unwrap();
        let c1 = sheet.lookup("C1").unwrap();

        evaluate(&mut sheet, c1).unwrap();

        assert_eq!(sheet.get(a1).unwrap().dependents, vec![b1, c1]);
        assert_eq!(sheet.get(b1).unwrap().dependents, vec![c1]);
    }

    #[test]
    fn test_reference_registered_even_on_failure() {
        let mut sheet = create_test_sheet(&[("A1", "hello"), ("B1", "A1 + 1")]);
        let a1 = sheet.lookup("A1").unwrap();
        let b1 = sheet.lookup("B1").unwrap();

        assert!(evaluate(&mut sheet, b1).is_err());
        assert_eq!(sheet.get(a1).unwrap().dependents, vec![b1]);
    }

    #[test]
    fn test_division_by_zero_is_infinite() {
        let mut sheet = create_test_sheet(&[("A1", "1/0"), ("A2", "0/0")]);
        assert!(value_of(&mut sheet, "A1").is_infinite());
        assert!(value_of(&mut sheet, "A2").is_nan());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(6.0), "6");
        assert_eq!(format_number(9.75), "9.75");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.3333333333333333");
        assert_eq!(format_number(f64::INFINITY), "∞");
        assert_eq!(format_number(f64::NEG_INFINITY), "-∞");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn test_classify_numbers_and_logicals() {
        let mut sheet = create_test_sheet(&[("A1", "5"), ("B1", "A1 + 1"), ("C1", "not(0)"), ("D1", "not(1)")]);
        assert_eq!(shown(&mut sheet, "B1"), "6");
        assert_eq!(shown(&mut sheet, "C1"), "TRUE");
        assert_eq!(shown(&mut sheet, "D1"), "FALSE");
    }

    #[test]
    fn test_classify_localized_tokens() {
        let mut sheet = create_test_sheet(&[("A1", "1 < 2")]);
        let a1 = sheet.lookup("A1").unwrap();
        process_cell(&mut sheet, a1, &SheetConfig::ukrainian());
        assert_eq!(sheet.get(a1).unwrap().value, "ІСТИНА");
    }

    #[test]
    fn test_classify_errors() {
        let mut sheet = create_test_sheet(&[("A1", "B1 + 1"), ("B1", "A1 + 1"), ("C1", "Z9")]);
        let a1 = sheet.lookup("A1").unwrap();
        let c1 = sheet.lookup("C1").unwrap();

        let outcome = classify(&mut sheet, a1);
        assert_eq!(outcome.message(), Some("circular reference to A1"));
        assert_eq!(outcome.render(&SheetConfig::default()), CYCLE_ERROR);

        let outcome = classify(&mut sheet, c1);
        assert_eq!(outcome.message(), Some("cell Z9 not found"));
        assert_eq!(outcome.render(&SheetConfig::default()), REF_ERROR);
    }

    #[test]
    fn test_classify_literal_text() {
        let mut sheet = create_test_sheet(&[("A1", "hello"), ("A2", "hello world"), ("A3", "")]);
        assert_eq!(shown(&mut sheet, "A1"), "hello");
        assert_eq!(shown(&mut sheet, "A2"), "hello world");
        let a3 = sheet.lookup("A3").unwrap();
        assert_eq!(classify(&mut sheet, a3), CellOutcome::Empty);
    }

    #[test]
    fn test_classify_syntax_errors() {
        let mut sheet = create_test_sheet(&[
            ("A1", "=hello"),
            ("A2", "inc 5"),
            ("A3", "NOT(1)"),
            ("A4", "3 +"),
            ("A5", "not sure"),
        ]);
        assert_eq!(shown(&mut sheet, "A1"), SYNTAX_ERROR);
        assert_eq!(shown(&mut sheet, "A2"), SYNTAX_ERROR);
        assert_eq!(shown(&mut sheet, "A3"), SYNTAX_ERROR);
        // Fails to parse and has no formula prefix, so it is plain text.
        assert_eq!(shown(&mut sheet, "A4"), "3 +");
        assert_eq!(shown(&mut sheet, "A5"), SYNTAX_ERROR);
    }

    #[test]
    fn test_complex_expression_over_text_is_syntax_error() {
        let mut sheet = create_test_sheet(&[("A1", "hello"), ("B1", "A1 + 1")]);
        shown(&mut sheet, "A1");
        assert_eq!(shown(&mut sheet, "B1"), SYNTAX_ERROR);
    }

    #[test]
    fn test_reference_passthrough() {
        let mut sheet = create_test_sheet(&[("A1", "hello"), ("B1", "A1"), ("C1", "==a1")]);
        shown(&mut sheet, "A1");

        let b1 = sheet.lookup("B1").unwrap();
        assert_eq!(
            classify(&mut sheet, b1),
            CellOutcome::Passthrough {
                source: "A1".to_string(),
                value: "hello".to_string(),
            }
        );
        assert_eq!(shown(&mut sheet, "C1"), "hello");
    }

    #[test]
    fn test_classify_does_not_leak_between_calls() {
        let mut sheet = create_test_sheet(&[("A1", "B1 + 1"), ("B1", "A1 + 1")]);
        assert_eq!(shown(&mut sheet, "A1"), CYCLE_ERROR);

        let b1 = sheet.lookup("B1").unwrap();
        sheet.set_expression(b1, "2").unwrap();
        assert_eq!(shown(&mut sheet, "A1"), "3");
    }
}
