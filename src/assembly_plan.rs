use crate::design_document::SO_CIRCULAR;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PartId = String;
pub type ConstructId = String;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    #[default]
    Linear,
    Circular,
}

impl Topology {
    /// Circular only when the circular-DNA type tag is present.
    pub fn from_type_tags<S: AsRef<str>>(types: &[S]) -> Self {
        if types.iter().any(|t| t.as_ref() == SO_CIRCULAR) {
            Topology::Circular
        } else {
            Topology::Linear
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Topology::Linear => "linear",
            Topology::Circular => "circular",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a planning run. All construct-keyed maps follow document order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyPlan {
    pub part_sequences: IndexMap<PartId, String>,
    pub construct_parts: IndexMap<ConstructId, Vec<PartId>>,
    pub construct_sequences: IndexMap<ConstructId, String>,
    pub construct_topologies: IndexMap<ConstructId, Topology>,
}

impl AssemblyPlan {
    pub fn is_empty(&self) -> bool {
        self.construct_parts.is_empty()
    }

    pub fn construct_ids(&self) -> impl Iterator<Item = &str> {
        self.construct_parts.keys().map(String::as_str)
    }

    /// Part ids referenced by a construct that have no sequence entry.
    pub fn parts_without_sequence(&self) -> Vec<(&str, &str)> {
        self.construct_parts
            .iter()
            .flat_map(|(construct, parts)| {
                parts
                    .iter()
                    .filter(|part| !self.part_sequences.contains_key(*part))
                    .map(move |part| (construct.as_str(), part.as_str()))
            })
            .collect()
    }

    pub fn into_parts(
        self,
    ) -> (
        IndexMap<PartId, String>,
        IndexMap<ConstructId, Vec<PartId>>,
        IndexMap<ConstructId, String>,
        IndexMap<ConstructId, Topology>,
    ) {
        (
            self.part_sequences,
            self.construct_parts,
            self.construct_sequences,
            self.construct_topologies,
        )
    }
}
