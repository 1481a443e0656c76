//! Label filter parsing and seed selection.

use crate::graph::NodeId;
use crate::store::EntityStore;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Requested labels: either no filtering at all or an explicit label set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LabelSelection {
    /// Keep everything
    #[default]
    All,
    /// Keep entities selected by any of these labels and their closure
    Only(BTreeSet<String>),
}

impl LabelSelection {
    /// Parse an optional comma-separated label list.
    ///
    /// Items are trimmed and empty items dropped, so `" eln , eln-extras "`
    /// selects the same labels as `"eln,eln-extras"`. `None` means no
    /// filtering. A present string without any usable label selects nothing.
    #[must_use]
    pub fn parse(input: Option<&str>) -> Self {
        match input {
            None => Self::All,
            Some(input) => Self::from_labels(input.split(',')),
        }
    }

    /// Build a selection from individual labels.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Only(
            labels
                .into_iter()
                .map(|label| label.as_ref().trim().to_string())
                .filter(|label| !label.is_empty())
                .collect(),
        )
    }

    /// Whether this selection filters at all.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        matches!(self, Self::Only(_))
    }

    /// The requested labels, if filtering.
    #[must_use]
    pub fn labels(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::All => None,
            Self::Only(labels) => Some(labels),
        }
    }
}

impl FromStr for LabelSelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(Some(s)))
    }
}

impl fmt::Display for LabelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "<all>"),
            Self::Only(labels) => {
                let joined: Vec<&str> = labels.iter().map(String::as_str).collect();
                write!(f, "{}", joined.join(","))
            }
        }
    }
}

/// Directly selected entities: every repo, env, workload and view carrying
/// at least one of the labels.
#[must_use]
pub fn select(store: &EntityStore, labels: &BTreeSet<String>) -> BTreeSet<NodeId> {
    labels
        .iter()
        .flat_map(|label| store.labelled(label))
        .collect()
}
