//! Transition tables shared by every entity status enum.

use crate::error::DomainError;

/// A status enum whose legal moves are listed in an explicit table.
///
/// Implementors only provide [`Status::allowed_next`]; every mutation goes
/// through [`Status::transition`] so the table is consulted before any field
/// is touched.
pub trait Status: Copy + Eq + std::fmt::Debug + 'static {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    /// States reachable from `self` in one step.
    fn allowed_next(&self) -> &'static [Self];

    /// Upper-case name as persisted.
    fn as_str(&self) -> &'static str;

    /// Returns true if `next` is a legal successor of `self`.
    fn can_transition_to(&self, next: Self) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Returns true if no transition leaves this state.
    fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Validates `self -> next`, naming `action` in the error.
    fn transition(&self, next: Self, action: &'static str) -> Result<Self, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                entity: Self::ENTITY,
                from: self.as_str(),
                action,
            })
        }
    }
}

/// Error returned when parsing a persisted status string fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {entity} status: {value}")]
pub struct ParseStatusError {
    pub entity: &'static str,
    pub value: String,
}

/// Implements `Display` and `FromStr` for a [`Status`] enum from its variant list.
macro_rules! status_strings {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            fn name(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::status::ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err($crate::status::ParseStatusError {
                        entity: <$ty as $crate::status::Status>::ENTITY,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use status_strings;
