//! Greedy regrouping of construct part lists into synthesizable composites.
//!
//! Each construct's parts are scanned left to right into a running group. A
//! group is closed when the next part would push it past the maximum length,
//! or when it already holds the maximum number of sub-parts and is longer
//! than the minimum viable length. Closed groups become composite parts named
//! by joining their sub-part ids with `_`.

use crate::{
    assembly_plan::{ConstructId, PartId},
    error::PlanError,
};
use indexmap::IndexMap;
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefactorParameters {
    pub min_part_length: usize,
    pub max_part_length: usize,
    pub max_sub_parts: usize,
}

impl Default for RefactorParameters {
    fn default() -> Self {
        Self {
            min_part_length: 179,
            max_part_length: 1760,
            max_sub_parts: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositePart {
    pub id: PartId,
    pub sequence: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RefactoredParts {
    pub constructs: Vec<(ConstructId, Vec<PartId>)>,
    /// Every composite referenced by `constructs`; the first sequence
    /// computed for an id is kept.
    pub part_sequences: IndexMap<PartId, String>,
}

impl RefactoredParts {
    fn from_packed(packed: Vec<(ConstructId, Vec<CompositePart>)>) -> Self {
        let mut ret = Self::default();
        for (construct, composites) in packed {
            let mut ids = Vec::with_capacity(composites.len());
            for composite in composites {
                ret.part_sequences
                    .entry(composite.id.clone())
                    .or_insert(composite.sequence);
                ids.push(composite.id);
            }
            ret.constructs.push((construct, ids));
        }
        ret
    }
}

#[derive(Default)]
struct PartGroup<'a> {
    ids: Vec<&'a str>,
    sequences: Vec<&'a str>,
    length: usize,
}

impl<'a> PartGroup<'a> {
    fn must_close_before(&self, next_length: usize, params: &RefactorParameters) -> bool {
        // Never close an empty group: an over-long first part stays whole.
        if self.ids.is_empty() {
            return false;
        }
        self.length + next_length > params.max_part_length
            || (self.ids.len() >= params.max_sub_parts && self.length > params.min_part_length)
    }

    fn push(&mut self, id: &'a str, sequence: &'a str) {
        self.ids.push(id);
        self.sequences.push(sequence);
        self.length += sequence.len();
    }

    fn take(&mut self) -> CompositePart {
        let group = std::mem::take(self);
        CompositePart {
            id: group.ids.iter().join("_"),
            sequence: group.sequences.concat(),
        }
    }
}

/// Packs one construct's ordered parts into composites.
pub fn pack_construct_parts(
    construct: &str,
    parts: &[PartId],
    part_sequences: &IndexMap<PartId, String>,
    params: &RefactorParameters,
) -> Result<Vec<CompositePart>, PlanError> {
    let mut composites = vec![];
    let mut group = PartGroup::default();
    for part in parts {
        let sequence = part_sequences
            .get(part)
            .ok_or_else(|| PlanError::MissingPartSequence {
                construct: construct.to_string(),
                part: part.clone(),
            })?;
        if group.must_close_before(sequence.len(), params) {
            composites.push(group.take());
        }
        group.push(part, sequence);
    }
    if !group.ids.is_empty() {
        composites.push(group.take());
    }
    Ok(composites)
}

pub fn refactor_construct_parts(
    constructs: &[(ConstructId, Vec<PartId>)],
    part_sequences: &IndexMap<PartId, String>,
    params: &RefactorParameters,
) -> Result<RefactoredParts, PlanError> {
    let packed = constructs
        .iter()
        .map(|(construct, parts)| {
            pack_construct_parts(construct, parts, part_sequences, params)
                .map(|composites| (construct.clone(), composites))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RefactoredParts::from_packed(packed))
}

/// Same result as [`refactor_construct_parts`], packing constructs on the
/// rayon pool. Composites are merged in construct order afterwards.
pub fn refactor_construct_parts_parallel(
    constructs: &[(ConstructId, Vec<PartId>)],
    part_sequences: &IndexMap<PartId, String>,
    params: &RefactorParameters,
) -> Result<RefactoredParts, PlanError> {
    let packed = constructs
        .par_iter()
        .map(|(construct, parts)| {
            pack_construct_parts(construct, parts, part_sequences, params)
                .map(|composites| (construct.clone(), composites))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RefactoredParts::from_packed(packed))
}
