use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

static CONSTRAINT_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(>=|<=|==|=|!=|>|<)\s*([0-9A-Za-z_.-]+)").expect("valid regex"));

/// Comparable representation of an R (or R package) version string.
///
/// Tokens are split on `.`, `_`, and `-`; each token contributes a numeric
/// value and an alphabetic tail. `1.0-1`, `1.98-1.16`, and `0.99a` are all
/// real CRAN versions, so parsing never fails.
#[derive(Debug, Clone)]
pub struct RVersion {
    raw: String,
    components: Vec<(u64, String)>,
}

impl RVersion {
    pub fn parse(raw: &str) -> Self {
        let mut components = Vec::new();
        for token in raw.trim().split(['.', '_', '-']) {
            if token.is_empty() {
                continue;
            }
            components.push(component(token));
        }
        if components.is_empty() {
            components.push((0, String::new()));
        }
        Self {
            raw: raw.to_string(),
            components,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

fn component(token: &str) -> (u64, String) {
    if token.bytes().all(|b| b.is_ascii_digit()) {
        return (token.parse().unwrap_or(u64::MAX), String::new());
    }
    let digits_end = token
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(token.len());
    let (digits, tail) = token.split_at(digits_end);
    if !digits.is_empty() && tail.starts_with(|c: char| c.is_ascii_alphabetic()) {
        (digits.parse().unwrap_or(u64::MAX), tail.to_string())
    } else {
        (0, token.to_string())
    }
}

impl Ord for RVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for index in 0..len {
            let (left_num, left_suffix) = padded(&self.components, index);
            let (right_num, right_suffix) = padded(&other.components, index);
            match left_num.cmp(&right_num) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
            match left_suffix.cmp(right_suffix) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

fn padded(components: &[(u64, String)], index: usize) -> (u64, &str) {
    components
        .get(index)
        .map(|(num, suffix)| (*num, suffix.as_str()))
        .unwrap_or((0, ""))
}

impl PartialOrd for RVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RVersion {}

impl fmt::Display for RVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Compare two version strings under the R ordering.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    RVersion::parse(a).cmp(&RVersion::parse(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    Greater,
    GreaterOrEqual,
    Lower,
    LowerOrEqual,
    Equal,
    NotEqual,
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Greater => ">",
            Self::GreaterOrEqual => ">=",
            Self::Lower => "<",
            Self::LowerOrEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        };
        write!(f, "{text}")
    }
}

impl FromStr for ConstraintOp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(Self::Greater),
            ">=" => Ok(Self::GreaterOrEqual),
            "<" => Ok(Self::Lower),
            "<=" => Ok(Self::LowerOrEqual),
            "==" | "=" => Ok(Self::Equal),
            "!=" => Ok(Self::NotEqual),
            _ => Err(()),
        }
    }
}

/// A single comparator-based version constraint, e.g. `>= 1.2.3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub op: ConstraintOp,
    pub version: String,
}

impl Constraint {
    pub fn new(op: ConstraintOp, version: impl Into<String>) -> Self {
        Self {
            op,
            version: version.into(),
        }
    }

    pub fn is_satisfied_by(&self, candidate: &str) -> bool {
        let cmp = compare_versions(candidate, &self.version);
        match self.op {
            ConstraintOp::Greater => cmp == Ordering::Greater,
            ConstraintOp::GreaterOrEqual => cmp != Ordering::Less,
            ConstraintOp::Lower => cmp == Ordering::Less,
            ConstraintOp::LowerOrEqual => cmp != Ordering::Greater,
            ConstraintOp::Equal => cmp == Ordering::Equal,
            ConstraintOp::NotEqual => cmp != Ordering::Equal,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

/// Parse a comma-separated constraint expression.
///
/// DESCRIPTION files carry free-form text inside the parentheses (line
/// breaks, author notes), so fragments without a recognizable comparator
/// token are dropped rather than rejected.
pub fn parse_constraint_list(expr: &str) -> Vec<Constraint> {
    let mut constraints = Vec::new();
    for fragment in expr.split(',') {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        let Some(caps) = CONSTRAINT_TOKEN_RE.captures(fragment) else {
            continue;
        };
        let op = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<ConstraintOp>().ok());
        let version = caps.get(2).map(|m| m.as_str().to_string());
        if let (Some(op), Some(version)) = (op, version) {
            constraints.push(Constraint { op, version });
        }
    }
    constraints
}

pub fn satisfies_all(candidate: &str, constraints: &[Constraint]) -> bool {
    constraints
        .iter()
        .all(|constraint| constraint.is_satisfied_by(candidate))
}

/// Return the highest candidate that satisfies every constraint.
pub fn highest_satisfying<'a>(
    candidates: impl IntoIterator<Item = &'a str>,
    constraints: &[Constraint],
) -> Option<&'a str> {
    candidates
        .into_iter()
        .filter(|candidate| satisfies_all(candidate, constraints))
        .max_by(|a, b| compare_versions(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_zero_components_compare_equal() {
        assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn numeric_components_compare_numerically() {
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("4041.111", "999.0"), Ordering::Greater);
    }

    #[test]
    fn dash_separated_components_extend_the_tuple() {
        assert_eq!(compare_versions("1.0-1", "1.0"), Ordering::Greater);
        assert_eq!(compare_versions("2.0.0", "2.0.0-1"), Ordering::Less);
        assert_eq!(compare_versions("1.98-1.16", "1.98-1.2"), Ordering::Greater);
    }

    #[test]
    fn alphabetic_tails_break_ties() {
        assert_eq!(compare_versions("1.0a", "1.0b"), Ordering::Less);
        assert_eq!(compare_versions("1.0rc1", "1.0rc1"), Ordering::Equal);
    }

    #[test]
    fn empty_input_parses_to_zero() {
        assert_eq!(compare_versions("", "0"), Ordering::Equal);
        assert_eq!(compare_versions("   ", "0.0"), Ordering::Equal);
    }

    #[test]
    fn constraint_list_parses_comparators() {
        let constraints = parse_constraint_list(">= 1.2.3, < 2.0");
        assert_eq!(constraints.len(), 2);
        assert_eq!(
            constraints[0],
            Constraint::new(ConstraintOp::GreaterOrEqual, "1.2.3")
        );
        assert_eq!(constraints[1], Constraint::new(ConstraintOp::Lower, "2.0"));
    }

    #[test]
    fn single_equals_is_accepted() {
        let constraints = parse_constraint_list("= 1.0");
        assert_eq!(constraints, vec![Constraint::new(ConstraintOp::Equal, "1.0")]);
    }

    #[test]
    fn garbage_fragments_are_dropped() {
        assert!(parse_constraint_list("see NEWS, also docs").is_empty());
        let constraints = parse_constraint_list("tested upstream, >= 2.1");
        assert_eq!(
            constraints,
            vec![Constraint::new(ConstraintOp::GreaterOrEqual, "2.1")]
        );
    }

    #[test]
    fn satisfies_all_ands_constraints() {
        let constraints = parse_constraint_list(">= 1.2.3, < 2.0");
        assert!(satisfies_all("1.5.0", &constraints));
        assert!(!satisfies_all("2.0", &constraints));
        assert!(!satisfies_all("1.2.2", &constraints));
    }

    #[test]
    fn highest_satisfying_filters_then_maximizes() {
        let constraints = parse_constraint_list("< 2.0");
        let versions = ["1.0", "1.9", "2.1", "1.10"];
        assert_eq!(highest_satisfying(versions, &constraints), Some("1.10"));
        let impossible = parse_constraint_list(">= 9.9");
        assert_eq!(highest_satisfying(versions, &impossible), None);
    }
}
