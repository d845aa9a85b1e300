use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an ID from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map($name::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

define_id!(
    /// Unique identifier for a card type (category)
    CardTypeId
);
define_id!(
    /// Unique identifier for a card
    CardId
);
define_id!(
    /// Unique identifier for a multiple-choice option
    OptionId
);
define_id!(
    /// Unique identifier for an ordered item
    ItemId
);
define_id!(
    /// Unique identifier for a quiz instance of either kind
    QuizId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_formats() {
        let id = CardId::new(7);
        assert_eq!(format!("{id:?}"), "CardId(7)");
        assert_eq!(id.to_string(), "7");
        assert_eq!(format!("{:?}", QuizId::new(3)), "QuizId(3)");
    }

    #[test]
    fn parses_from_str() {
        assert_eq!("42".parse::<OptionId>().unwrap(), OptionId::new(42));
        assert_eq!(" 9 ".parse::<ItemId>().unwrap(), ItemId::new(9));
    }

    #[test]
    fn parse_error_names_the_kind() {
        let err = "nope".parse::<QuizId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse QuizId from string");
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&CardTypeId::new(5)).unwrap();
        assert_eq!(json, "5");
    }
}
