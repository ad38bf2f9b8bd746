// Formula evaluator - evaluates a parsed expression against one row

use crate::column::Column;
use crate::row::Row;
use crate::value::{format_number, parse_number, CellValue};

use super::parser::{parse, Aggregate, Expr, Op};

/// Shown in place of any formula that fails to parse or evaluate.
pub const ERROR_DISPLAY: &str = "#ERROR";

#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    Number(f64),
    Text(String),
    Error(String),
}

impl EvalResult {
    pub fn to_display(&self) -> String {
        match self {
            EvalResult::Number(n) => format_number(*n),
            EvalResult::Text(s) => s.clone(),
            EvalResult::Error(_) => ERROR_DISPLAY.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EvalResult::Error(_))
    }
}

/// Evaluate `raw` (a formula including the leading `=`) for `row`.
///
/// Aggregate functions are rejected here; use `evaluate_with_rows`.
pub fn evaluate(raw: &str, row: &Row, columns: &[Column]) -> EvalResult {
    run(raw, &Scope { row, columns, rows: None })
}

/// Evaluate `raw` with access to every row of the table, enabling
/// SUM/AVG/AVERAGE/MIN/MAX/COUNT over a column.
pub fn evaluate_with_rows(raw: &str, row: &Row, columns: &[Column], rows: &[Row]) -> EvalResult {
    run(raw, &Scope { row, columns, rows: Some(rows) })
}

/// What the grid shows for `value` in `row`: formulas are evaluated,
/// everything else is shown as its raw text.
pub fn display_value(value: &CellValue, row: &Row, columns: &[Column]) -> String {
    match value {
        CellValue::Text(s) if value.is_formula() => evaluate(s, row, columns).to_display(),
        other => other.raw(),
    }
}

fn run(raw: &str, scope: &Scope<'_>) -> EvalResult {
    let result = parse(raw).and_then(|expr| eval(&expr, scope));
    match result {
        Ok(Operand::Number(n)) if n.is_finite() => EvalResult::Number(n),
        Ok(Operand::Number(_)) => EvalResult::Error("Result is not a finite number".to_string()),
        Ok(Operand::Text(s)) => EvalResult::Text(s),
        Err(e) => EvalResult::Error(e),
    }
}

struct Scope<'a> {
    row: &'a Row,
    columns: &'a [Column],
    rows: Option<&'a [Row]>,
}

impl Scope<'_> {
    fn column(&self, title: &str) -> Option<&Column> {
        // First match wins when titles collide
        self.columns.iter().find(|c| c.title == title)
    }

    fn resolve(&self, title: &str) -> Operand {
        match self.column(title).and_then(|c| self.row.get(&c.id)) {
            Some(value) => Operand::from_cell(value),
            None => Operand::Number(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Number(f64),
    Text(String),
}

impl Operand {
    fn from_cell(value: &CellValue) -> Self {
        if value.is_empty() {
            return Operand::Number(0.0);
        }
        match value {
            CellValue::Number(n) => Operand::Number(*n),
            CellValue::Text(s) => match parse_number(s) {
                Some(n) => Operand::Number(n),
                None => Operand::Text(s.clone()),
            },
            other => Operand::Text(other.raw()),
        }
    }

    fn into_text(self) -> String {
        match self {
            Operand::Number(n) => format_number(n),
            Operand::Text(s) => s,
        }
    }

    fn number(&self) -> Result<f64, String> {
        match self {
            Operand::Number(n) => Ok(*n),
            Operand::Text(s) => Err(format!("Expected a number, got \"{}\"", s)),
        }
    }
}

fn eval(expr: &Expr, scope: &Scope<'_>) -> Result<Operand, String> {
    match expr {
        Expr::Number(n) => Ok(Operand::Number(*n)),
        Expr::Text(s) => Ok(Operand::Text(s.clone())),
        Expr::ColumnRef(title) => Ok(scope.resolve(title)),
        Expr::Neg(inner) => Ok(Operand::Number(-eval(inner, scope)?.number()?)),
        Expr::BinaryOp { op, left, right } => {
            let l = eval(left, scope)?;
            let r = eval(right, scope)?;
            binary(*op, l, r)
        }
        Expr::Aggregate { func, column } => {
            let rows = scope
                .rows
                .ok_or_else(|| "Functions need the table's rows".to_string())?;
            Ok(Operand::Number(aggregate(*func, scope.column(column), rows)))
        }
    }
}

fn binary(op: Op, l: Operand, r: Operand) -> Result<Operand, String> {
    if op == Op::Add {
        if let (Operand::Number(a), Operand::Number(b)) = (&l, &r) {
            return Ok(Operand::Number(a + b));
        }
        return Ok(Operand::Text(l.into_text() + &r.into_text()));
    }

    let a = l.number()?;
    let b = r.number()?;
    let n = match op {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div => {
            if b == 0.0 {
                return Err("Division by zero".to_string());
            }
            a / b
        }
    };
    Ok(Operand::Number(n))
}

fn aggregate(func: Aggregate, column: Option<&Column>, rows: &[Row]) -> f64 {
    let Some(column) = column else {
        return 0.0;
    };
    let values = rows.iter().filter_map(|r| r.get(&column.id));

    if func == Aggregate::Count {
        return values.filter(|v| !v.is_empty()).count() as f64;
    }

    let numbers: Vec<f64> = values
        .filter_map(|v| match Operand::from_cell(v) {
            Operand::Number(n) if !v.is_empty() => Some(n),
            _ => None,
        })
        .collect();

    if numbers.is_empty() {
        return 0.0;
    }
    match func {
        Aggregate::Sum => numbers.iter().sum(),
        Aggregate::Avg => numbers.iter().sum::<f64>() / numbers.len() as f64,
        Aggregate::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregate::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Aggregate::Count => numbers.len() as f64,
    }
}
