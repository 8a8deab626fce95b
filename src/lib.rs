pub mod assembly_plan;
pub mod design_document;
pub mod error;
pub mod extractor;
pub mod refactor;
pub mod sbol_xml;

pub use assembly_plan::{AssemblyPlan, Topology};
pub use design_document::{DesignDocument, PrimaryStructure};
pub use error::PlanError;
pub use extractor::{
    DesignSource, PlannerConfig, assembly_plan_from_source, get_assembly_plan,
    get_assembly_plan_from_path,
};
pub use refactor::{RefactorParameters, refactor_construct_parts};
pub use sbol_xml::SbolDocument;
