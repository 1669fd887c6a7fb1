use std::fmt;

use super::Domain;

/// A three-way filter on whether a relation is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TripleFlag {
    /// Only records where the relation is set.
    Yes,
    /// Only records where the relation is unset.
    No,
    /// No filtering.
    #[default]
    Both,
}

impl TripleFlag {
    /// Builds a flag from a pair of mutually exclusive switches.
    ///
    /// `yes` takes precedence if both are set.
    #[must_use]
    pub const fn from_switches(yes: bool, no: bool) -> Self {
        if yes {
            Self::Yes
        } else if no {
            Self::No
        } else {
            Self::Both
        }
    }

    /// The condition that enforces this flag on `field`, if any.
    #[must_use]
    pub fn presence_filter(self, field: &str) -> Option<Domain> {
        match self {
            Self::Yes => Some(Domain::leaf(field, "!=", false)),
            Self::No => Some(Domain::leaf(field, "=", false)),
            Self::Both => None,
        }
    }
}

impl fmt::Display for TripleFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::Both => "BOTH",
        })
    }
}

/// Renders a truth value as `YES` or `NO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YesNo(pub bool);

impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0 { "YES" } else { "NO" })
    }
}

impl From<bool> for YesNo {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switches_map_to_flags() {
        assert_eq!(TripleFlag::from_switches(true, false), TripleFlag::Yes);
        assert_eq!(TripleFlag::from_switches(false, true), TripleFlag::No);
        assert_eq!(TripleFlag::from_switches(false, false), TripleFlag::Both);
    }

    #[test]
    fn presence_filters() {
        assert_eq!(
            TripleFlag::Yes.presence_filter("parent_id").unwrap().to_string(),
            r#"[["parent_id","!=",false]]"#
        );
        assert_eq!(
            TripleFlag::No.presence_filter("parent_id").unwrap().to_string(),
            r#"[["parent_id","=",false]]"#
        );
        assert!(TripleFlag::Both.presence_filter("parent_id").is_none());
    }

    #[test]
    fn yes_no_display() {
        assert_eq!(YesNo(true).to_string(), "YES");
        assert_eq!(YesNo::from(false).to_string(), "NO");
    }
}
