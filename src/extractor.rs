//! Extraction of an assembly plan from a design document.
//!
//! Components with a resolvable primary structure are construct candidates.
//! Candidates that are themselves used as a child of another candidate are
//! sub-assemblies, not top-level constructs, and are dropped. The children
//! of the remaining constructs are the parts whose sequences are resolved
//! and handed to the refactorer.

use crate::{
    assembly_plan::{AssemblyPlan, ConstructId, PartId, Topology},
    design_document::{ComponentInfo, DesignDocument, PrimaryStructure},
    error::PlanError,
    refactor::{RefactorParameters, refactor_construct_parts, refactor_construct_parts_parallel},
    sbol_xml::SbolDocument,
};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub refactor: RefactorParameters,
    pub parallel_refactor: bool,
}

impl PlannerConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| PlanError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| PlanError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

pub enum DesignSource<'a> {
    Document(&'a dyn DesignDocument),
    Path(&'a Path),
}

pub fn assembly_plan_from_source(
    source: DesignSource<'_>,
    config: &PlannerConfig,
) -> Result<AssemblyPlan, PlanError> {
    match source {
        DesignSource::Document(doc) => get_assembly_plan(doc, config),
        DesignSource::Path(path) => get_assembly_plan_from_path(path, config),
    }
}

pub fn get_assembly_plan_from_path<P: AsRef<Path>>(
    path: P,
    config: &PlannerConfig,
) -> Result<AssemblyPlan, PlanError> {
    let doc = SbolDocument::from_file(path)?;
    get_assembly_plan(&doc, config)
}

/// Sequence of the first linked record with IUPAC DNA encoding, uppercased.
pub fn resolve_sequence(doc: &dyn DesignDocument, component: &ComponentInfo) -> Option<String> {
    component
        .sequences
        .iter()
        .find_map(|uri| match doc.sequence(uri) {
            Ok(record) if record.is_iupac_dna() => Some(record.normalized_elements()),
            Ok(_) => None,
            Err(e) if e.is_lookup_failure() => {
                debug!(component = %component.display_id, error = %e, "sequence lookup failed");
                None
            }
            Err(e) => {
                warn!(component = %component.display_id, error = %e, "sequence unreadable");
                None
            }
        })
}

struct ConstructCandidates {
    constructs: Vec<(ConstructId, Vec<PartId>)>,
    direct_sequences: IndexMap<ConstructId, String>,
    topologies: IndexMap<ConstructId, Topology>,
}

impl ConstructCandidates {
    fn collect(doc: &dyn DesignDocument) -> Self {
        let mut ret = Self {
            constructs: vec![],
            direct_sequences: IndexMap::new(),
            topologies: IndexMap::new(),
        };
        for component in doc.components() {
            // By URI: versions of one design share a display id.
            let children = match doc.primary_structure(&component.uri) {
                PrimaryStructure::Chain(children) if !children.is_empty() => children,
                _ => continue,
            };
            let id = component.display_id.clone();
            if let Some(sequence) = resolve_sequence(doc, &component).filter(|s| !s.is_empty()) {
                ret.direct_sequences.insert(id.clone(), sequence);
            }
            ret.topologies
                .insert(id.clone(), Topology::from_type_tags(&component.types));
            ret.constructs.push((id, children));
        }
        ret
    }

    fn child_ids(&self) -> HashSet<PartId> {
        self.constructs
            .iter()
            .flat_map(|(_, parts)| parts.iter().cloned())
            .collect()
    }

    /// Drops every candidate that is used as a part of another candidate.
    fn retain_top_level(&mut self) {
        let used_as_part = self.child_ids();
        self.constructs
            .retain(|(construct, _)| !used_as_part.contains(construct));
        self.direct_sequences
            .retain(|construct, _| !used_as_part.contains(construct));
        self.topologies
            .retain(|construct, _| !used_as_part.contains(construct));
    }
}

/// Every part referenced by `constructs`, in first-appearance order.
/// Parts that cannot be resolved map to an empty sequence.
fn resolve_part_sequences(
    doc: &dyn DesignDocument,
    constructs: &[(ConstructId, Vec<PartId>)],
) -> IndexMap<PartId, String> {
    let parts: IndexSet<&PartId> = constructs.iter().flat_map(|(_, parts)| parts).collect();
    parts
        .into_iter()
        .map(|part| {
            let sequence = match doc.component(part) {
                Ok(component) => resolve_sequence(doc, &component).unwrap_or_default(),
                Err(e) if e.is_lookup_failure() => {
                    debug!(part = %part, error = %e, "part lookup failed");
                    String::new()
                }
                Err(e) => {
                    warn!(part = %part, error = %e, "part unreadable");
                    String::new()
                }
            };
            (part.clone(), sequence)
        })
        .collect()
}

fn concatenate_part_sequences(
    construct: &str,
    parts: &[PartId],
    part_sequences: &IndexMap<PartId, String>,
) -> Result<String, PlanError> {
    parts
        .iter()
        .map(|part| {
            part_sequences
                .get(part)
                .map(String::as_str)
                .ok_or_else(|| PlanError::MissingPartSequence {
                    construct: construct.to_string(),
                    part: part.clone(),
                })
        })
        .collect()
}

pub fn get_assembly_plan(
    doc: &dyn DesignDocument,
    config: &PlannerConfig,
) -> Result<AssemblyPlan, PlanError> {
    let mut candidates = ConstructCandidates::collect(doc);
    let candidate_count = candidates.constructs.len();
    candidates.retain_top_level();

    let part_sequences = resolve_part_sequences(doc, &candidates.constructs);
    info!(
        candidates = candidate_count,
        constructs = candidates.constructs.len(),
        parts = part_sequences.len(),
        "extracted constructs from design"
    );

    let refactored = if config.parallel_refactor {
        refactor_construct_parts_parallel(&candidates.constructs, &part_sequences, &config.refactor)?
    } else {
        refactor_construct_parts(&candidates.constructs, &part_sequences, &config.refactor)?
    };

    let mut plan = AssemblyPlan {
        part_sequences: refactored.part_sequences,
        ..Default::default()
    };
    for (construct, parts) in refactored.constructs {
        let sequence = match candidates.direct_sequences.swap_remove(&construct) {
            Some(sequence) => sequence,
            None => concatenate_part_sequences(&construct, &parts, &plan.part_sequences)?,
        };
        let topology = candidates
            .topologies
            .get(&construct)
            .copied()
            .unwrap_or_default();
        plan.construct_sequences.insert(construct.clone(), sequence);
        plan.construct_topologies.insert(construct.clone(), topology);
        plan.construct_parts.insert(construct, parts);
    }
    debug_assert!(plan.parts_without_sequence().is_empty());
    info!(
        constructs = plan.construct_parts.len(),
        refactored_parts = plan.part_sequences.len(),
        "assembly plan ready"
    );
    Ok(plan)
}
