//! Capability surface the planner needs from a hierarchical design document.
//!
//! Implementations hand out owned copies of identifiers and strings, so the
//! planner never keeps references into a document's object graph.

use crate::error::PlanError;

/// IUPAC nucleotide encoding, the only encoding the planner resolves.
pub const SBOL_ENCODING_IUPAC: &str = "http://www.chem.qmul.ac.uk/iubmb/misc/naseq.html";

/// Sequence Ontology term for circular DNA.
pub const SO_CIRCULAR: &str = "http://identifiers.org/so/SO:0000988";

/// Sequence Ontology term for linear DNA.
pub const SO_LINEAR: &str = "http://identifiers.org/so/SO:0000987";

/// `restriction` value of an ordering constraint between two sub-components.
pub const SBOL_RESTRICTION_PRECEDES: &str = "http://sbols.org/v2#precedes";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentInfo {
    pub uri: String,
    pub display_id: String,
    /// Type tags, e.g. the DNA region type and topology terms.
    pub types: Vec<String>,
    /// URIs of the linked sequence records.
    pub sequences: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceRecord {
    pub uri: String,
    pub display_id: String,
    pub encoding: String,
    pub elements: String,
}

impl SequenceRecord {
    pub fn is_iupac_dna(&self) -> bool {
        self.encoding == SBOL_ENCODING_IUPAC
    }

    /// Elements uppercased, keeping only ASCII letters.
    pub fn normalized_elements(&self) -> String {
        self.elements
            .chars()
            .filter(|ch| ch.is_ascii_alphabetic())
            .map(|ch| ch.to_ascii_uppercase())
            .collect()
    }
}

/// Ordered immediate sub-parts of a component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrimaryStructure {
    /// No sub-parts, or no simple linear chain could be determined.
    Leaf,
    /// Child identifiers in assembly order.
    Chain(Vec<String>),
}

impl PrimaryStructure {
    pub fn children(&self) -> &[String] {
        match self {
            PrimaryStructure::Leaf => &[],
            PrimaryStructure::Chain(children) => children,
        }
    }
}

pub trait DesignDocument {
    /// All component definitions in stable document order.
    fn components(&self) -> Vec<ComponentInfo>;

    /// Looks up a component definition by display id or URI.
    fn component(&self, id: &str) -> Result<ComponentInfo, PlanError>;

    /// Looks up a linked sequence record by URI.
    fn sequence(&self, uri: &str) -> Result<SequenceRecord, PlanError>;

    /// Resolves the component by display id or URI.
    fn primary_structure(&self, id: &str) -> PrimaryStructure;
}
