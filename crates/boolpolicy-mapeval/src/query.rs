//! Map query grammar tokens and constraint-string builders.
//!
//! The markers are persisted inside policy values, so they must never change.
//! Each is a punctuation character followed by a tab, which does not occur in
//! ordinary label text.

/// Separates alternative constraint groups.
pub const DISJUNCTION_MARKER: &str = ";\t";

/// Separates constraints within one group.
pub const CONJUNCTION_MARKER: &str = ",\t";

/// Prefixes a constraint that must not be satisfied by any entry.
pub const SHOULD_NOT_MATCH_MARKER: &str = "!\t";

/// Some entry must match `key=value`.
pub fn should_contain(key: &str, value: &str) -> String {
    format!("{}={}", key, value)
}

/// No entry may match `key=value`.
pub fn should_not_contain(key: &str, value: &str) -> String {
    format!("{}{}={}", SHOULD_NOT_MATCH_MARKER, key, value)
}

/// Join constraints into a group that holds only if all of them hold.
pub fn conjunction<I, S>(constraints: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    join(constraints, CONJUNCTION_MARKER)
}

/// Join groups into a query that holds if any of them holds.
pub fn disjunction<I, S>(groups: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    join(groups, DISJUNCTION_MARKER)
}

fn join<I, S>(parts: I, sep: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        out.push_str(part.as_ref());
    }
    out
}
