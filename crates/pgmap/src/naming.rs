//! Naming convention applied to exposed column, parameter and table names.

use std::borrow::Cow;

/// How member names are exposed in generated SQL.
///
/// The same convention is used on both sides of a round trip: it shapes the
/// column and `@parameter` names of an insert, and row columns are always
/// matched case-insensitively on the read side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Naming {
    /// Use member names as declared.
    Verbatim,
    /// Fold member names to lowercase.
    #[default]
    Lowercase,
}

impl Naming {
    /// Build a convention from the `use lowercase` flag.
    pub const fn lowercase(enabled: bool) -> Self {
        if enabled {
            Self::Lowercase
        } else {
            Self::Verbatim
        }
    }

    pub fn apply<'a>(&self, name: &'a str) -> Cow<'a, str> {
        match self {
            Self::Verbatim => Cow::Borrowed(name),
            Self::Lowercase if name.chars().any(char::is_uppercase) => {
                Cow::Owned(name.to_lowercase())
            }
            Self::Lowercase => Cow::Borrowed(name),
        }
    }
}
