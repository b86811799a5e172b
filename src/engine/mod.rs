//! Reconciliation engine
//!
//! The engine runs in three stages:
//! 1. Expanding - Build the desired entities and users from a template
//! 2. Walking - Flatten the live tree into current entities
//! 3. Reconciling - Converge current state onto desired state, one call at a time

use regex::Regex;

pub mod differ;
pub mod expander;
pub mod permissions;
pub mod reconciler;
pub mod users;
pub mod walker;

pub use expander::{Desired, Expander};
pub use reconciler::{Outcome, Reconciler};
pub use walker::{CurrentTree, Walker};

/// Compile `pattern` so that it must match a whole name
pub(crate) fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchored_matches_whole_name() {
        let re = anchored("kali-\\d").unwrap();
        assert!(re.is_match("kali-1"));
        assert!(!re.is_match("kali-10"));
        assert!(!re.is_match("old-kali-1"));

        let alternation = anchored("a|b").unwrap();
        assert!(alternation.is_match("b"));
        assert!(!alternation.is_match("ab"));
    }
}
