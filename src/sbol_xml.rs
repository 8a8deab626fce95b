//! SBOL 2 RDF/XML reader.
//!
//! Only the parts of SBOL the planner consumes are read: top-level
//! `ComponentDefinition`s (display id, types, linked sequences, sub-components
//! and their ordering constraints) and top-level `Sequence`s. Every other
//! top-level object (module definitions, collections, annotations) is skipped.

use crate::{
    design_document::{
        ComponentInfo, DesignDocument, PrimaryStructure, SBOL_RESTRICTION_PRECEDES,
        SequenceRecord,
    },
    error::PlanError,
};
use anyhow::{Result, anyhow, bail};
use indexmap::IndexMap;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::{
    collections::{HashMap, HashSet},
    path::Path,
};
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubComponent {
    pub uri: String,
    pub display_id: String,
    /// URI of the component definition this sub-component instantiates.
    pub definition: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequenceConstraint {
    pub restriction: String,
    pub subject: String,
    pub object: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentDefinition {
    pub info: ComponentInfo,
    pub components: Vec<SubComponent>,
    pub constraints: Vec<SequenceConstraint>,
}

impl ComponentDefinition {
    /// Sub-components ordered along the `precedes` chain.
    ///
    /// The chain must start at exactly one sub-component without a
    /// predecessor and reach every sub-component once. A lone sub-component
    /// needs no constraint.
    pub fn ordered_components(&self) -> Result<Vec<&SubComponent>, String> {
        if self.components.is_empty() {
            return Err("no sub-components".to_string());
        }
        if let Some(component) = self.components.iter().find(|c| c.definition.is_empty()) {
            return Err(format!("sub-component '{}' has no definition", component.uri));
        }

        let by_uri: HashMap<&str, &SubComponent> = self
            .components
            .iter()
            .map(|component| (component.uri.as_str(), component))
            .collect();
        let mut next: HashMap<&str, &str> = HashMap::new();
        let mut has_predecessor: HashSet<&str> = HashSet::new();
        for constraint in self
            .constraints
            .iter()
            .filter(|c| c.restriction == SBOL_RESTRICTION_PRECEDES)
        {
            let subject = constraint.subject.as_str();
            let object = constraint.object.as_str();
            if !by_uri.contains_key(subject) || !by_uri.contains_key(object) {
                return Err(format!(
                    "constraint '{subject}' precedes '{object}' references an unknown sub-component"
                ));
            }
            if next.insert(subject, object).is_some() {
                return Err(format!("'{subject}' precedes more than one sub-component"));
            }
            if !has_predecessor.insert(object) {
                return Err(format!("'{object}' follows more than one sub-component"));
            }
        }

        let heads: Vec<&SubComponent> = self
            .components
            .iter()
            .filter(|component| !has_predecessor.contains(component.uri.as_str()))
            .collect();
        let [head] = heads.as_slice() else {
            return Err(format!(
                "expected one leading sub-component, found {}",
                heads.len()
            ));
        };

        // Every sub-component has at most one predecessor and the head has
        // none, so the walk cannot revisit a node.
        let mut ordered = vec![*head];
        let mut current = head.uri.as_str();
        while let Some(&following) = next.get(current) {
            ordered.push(by_uri[following]);
            current = following;
        }
        if ordered.len() != self.components.len() {
            return Err(format!(
                "chain covers {} of {} sub-components",
                ordered.len(),
                self.components.len()
            ));
        }
        Ok(ordered)
    }
}

/// In-memory SBOL document, read-only once loaded.
#[derive(Clone, Debug, Default)]
pub struct SbolDocument {
    definitions: IndexMap<String, ComponentDefinition>,
    definition_uris: HashMap<String, String>,
    sequences: IndexMap<String, SequenceRecord>,
    sequence_uris: HashMap<String, String>,
}

impl SbolDocument {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PlanError::DocumentLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        parse_sbol_xml_text(&text).map_err(|e| PlanError::DocumentLoad {
            path: path.to_path_buf(),
            message: format!("{e:#}"),
        })
    }

    pub fn insert_component(&mut self, mut definition: ComponentDefinition) {
        let info = &mut definition.info;
        if info.display_id.is_empty() {
            info.display_id = display_id_from_uri(&info.uri);
        }
        if info.uri.is_empty() {
            info.uri = info.display_id.clone();
        }
        for component in definition.components.iter_mut() {
            if component.display_id.is_empty() {
                component.display_id = display_id_from_uri(&component.uri);
            }
        }
        self.definition_uris
            .entry(definition.info.display_id.clone())
            .or_insert_with(|| definition.info.uri.clone());
        self.definitions
            .insert(definition.info.uri.clone(), definition);
    }

    pub fn insert_sequence(&mut self, mut record: SequenceRecord) {
        if record.display_id.is_empty() {
            record.display_id = display_id_from_uri(&record.uri);
        }
        if record.uri.is_empty() {
            record.uri = record.display_id.clone();
        }
        self.sequence_uris
            .entry(record.display_id.clone())
            .or_insert_with(|| record.uri.clone());
        self.sequences.insert(record.uri.clone(), record);
    }

    pub fn definition(&self, id: &str) -> Option<&ComponentDefinition> {
        self.definitions.get(id).or_else(|| {
            self.definition_uris
                .get(id)
                .and_then(|uri| self.definitions.get(uri))
        })
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    fn child_display_id(&self, component: &SubComponent) -> String {
        self.definitions
            .get(&component.definition)
            .map(|definition| definition.info.display_id.clone())
            .unwrap_or_else(|| display_id_from_uri(&component.definition))
    }
}

impl DesignDocument for SbolDocument {
    fn components(&self) -> Vec<ComponentInfo> {
        self.definitions
            .values()
            .map(|definition| definition.info.clone())
            .collect()
    }

    fn component(&self, id: &str) -> Result<ComponentInfo, PlanError> {
        self.definition(id)
            .map(|definition| definition.info.clone())
            .ok_or_else(|| PlanError::ComponentNotFound { id: id.to_string() })
    }

    fn sequence(&self, uri: &str) -> Result<SequenceRecord, PlanError> {
        self.sequences
            .get(uri)
            .or_else(|| {
                self.sequence_uris
                    .get(uri)
                    .and_then(|full| self.sequences.get(full))
            })
            .cloned()
            .ok_or_else(|| PlanError::SequenceNotFound {
                uri: uri.to_string(),
            })
    }

    fn primary_structure(&self, id: &str) -> PrimaryStructure {
        let Some(definition) = self.definition(id) else {
            debug!(component = id, "no definition, treating as leaf");
            return PrimaryStructure::Leaf;
        };
        match definition.ordered_components() {
            Ok(components) => PrimaryStructure::Chain(
                components
                    .into_iter()
                    .map(|component| self.child_display_id(component))
                    .collect(),
            ),
            Err(reason) => {
                if !definition.components.is_empty() {
                    debug!(component = id, %reason, "primary structure unresolvable, treating as leaf");
                }
                PrimaryStructure::Leaf
            }
        }
    }
}

/// Last path or fragment segment of a URI, skipping a trailing version.
///
/// `http://example.org/pTet/1` gives `pTet`, `http://example.org#gfp` gives `gfp`.
pub fn display_id_from_uri(uri: &str) -> String {
    let mut segments = uri.rsplit(['/', '#']).filter(|s| !s.is_empty());
    let last = segments.next().unwrap_or_default();
    let is_version = !last.is_empty() && last.chars().all(|c| c.is_ascii_digit() || c == '.');
    if is_version {
        if let Some(previous) = segments.next() {
            return previous.to_string();
        }
    }
    last.to_string()
}

pub fn parse_sbol_xml_text(xml: &str) -> Result<SbolDocument> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut builder = SbolXmlBuilder::default();
    let mut path: Vec<String> = vec![];
    loop {
        let event = reader
            .read_event()
            .map_err(|e| anyhow!("Malformed SBOL XML: {e}"))?;
        match event {
            Event::Start(e) => {
                let name = local_name(&e)?;
                builder.open(&path, &name, &e)?;
                builder.text.clear();
                path.push(name);
            }
            Event::Empty(e) => {
                let name = local_name(&e)?;
                builder.open(&path, &name, &e)?;
                builder.text.clear();
                path.push(name);
                builder.close(&path);
                path.pop();
            }
            Event::End(_) => {
                builder.close(&path);
                path.pop();
            }
            Event::Text(text) => builder.text.push_str(&text.unescape()?),
            Event::CData(data) => builder.text.push_str(&String::from_utf8_lossy(&data)),
            Event::Eof => break,
            _ => {}
        }
    }
    if !path.is_empty() {
        bail!("Malformed SBOL XML: unexpected end of document inside '{}'", path.join("/"));
    }
    if !builder.saw_root {
        bail!("Malformed SBOL XML: no rdf:RDF root element");
    }
    Ok(builder.document)
}

fn local_name(e: &BytesStart) -> Result<String> {
    Ok(std::str::from_utf8(e.local_name().as_ref())?.to_string())
}

fn attribute(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn about(e: &BytesStart, element: &str) -> Result<String> {
    attribute(e, b"about")?.ok_or_else(|| anyhow!("{element} element without rdf:about"))
}

fn resource(e: &BytesStart) -> Result<String> {
    Ok(attribute(e, b"resource")?.unwrap_or_default())
}

#[derive(Default)]
struct SbolXmlBuilder {
    document: SbolDocument,
    saw_root: bool,
    text: String,
    definition: Option<ComponentDefinition>,
    component: Option<SubComponent>,
    constraint: Option<SequenceConstraint>,
    sequence: Option<SequenceRecord>,
}

impl SbolXmlBuilder {
    fn open(&mut self, parents: &[String], name: &str, e: &BytesStart) -> Result<()> {
        let parents: Vec<&str> = parents.iter().map(String::as_str).collect();
        match (parents.as_slice(), name) {
            ([], "RDF") => self.saw_root = true,
            ([], other) => bail!("expected rdf:RDF root element, found '{other}'"),
            (["RDF"], "ComponentDefinition") => {
                self.definition = Some(ComponentDefinition {
                    info: ComponentInfo {
                        uri: about(e, name)?,
                        ..Default::default()
                    },
                    ..Default::default()
                });
            }
            (["RDF"], "Sequence") => {
                self.sequence = Some(SequenceRecord {
                    uri: about(e, name)?,
                    ..Default::default()
                });
            }
            (["RDF", "ComponentDefinition"], "type") => {
                let value = resource(e)?;
                if let Some(definition) = self.definition.as_mut() {
                    definition.info.types.push(value);
                }
            }
            (["RDF", "ComponentDefinition"], "sequence") => {
                let value = resource(e)?;
                if let Some(definition) = self.definition.as_mut() {
                    definition.info.sequences.push(value);
                }
            }
            (["RDF", "ComponentDefinition", "component"], "Component") => {
                self.component = Some(SubComponent {
                    uri: about(e, name)?,
                    ..Default::default()
                });
            }
            (["RDF", "ComponentDefinition", "component", "Component"], "definition") => {
                let value = resource(e)?;
                if let Some(component) = self.component.as_mut() {
                    component.definition = value;
                }
            }
            (["RDF", "ComponentDefinition", "sequenceConstraint"], "SequenceConstraint") => {
                self.constraint = Some(SequenceConstraint::default());
            }
            (
                ["RDF", "ComponentDefinition", "sequenceConstraint", "SequenceConstraint"],
                "restriction" | "subject" | "object",
            ) => {
                let value = resource(e)?;
                if let Some(constraint) = self.constraint.as_mut() {
                    match name {
                        "restriction" => constraint.restriction = value,
                        "subject" => constraint.subject = value,
                        _ => constraint.object = value,
                    }
                }
            }
            (["RDF", "Sequence"], "encoding") => {
                let value = resource(e)?;
                if let Some(sequence) = self.sequence.as_mut() {
                    sequence.encoding = value;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// `path` ends with the element being closed.
    fn close(&mut self, path: &[String]) {
        let text = std::mem::take(&mut self.text);
        let path: Vec<&str> = path.iter().map(String::as_str).collect();
        match path.as_slice() {
            ["RDF", "ComponentDefinition"] => {
                if let Some(definition) = self.definition.take() {
                    self.document.insert_component(definition);
                }
            }
            ["RDF", "ComponentDefinition", "displayId"] => {
                if let Some(definition) = self.definition.as_mut() {
                    definition.info.display_id = text.trim().to_string();
                }
            }
            ["RDF", "ComponentDefinition", "component", "Component"] => {
                if let (Some(definition), Some(component)) =
                    (self.definition.as_mut(), self.component.take())
                {
                    definition.components.push(component);
                }
            }
            ["RDF", "ComponentDefinition", "component", "Component", "displayId"] => {
                if let Some(component) = self.component.as_mut() {
                    component.display_id = text.trim().to_string();
                }
            }
            ["RDF", "ComponentDefinition", "sequenceConstraint", "SequenceConstraint"] => {
                if let (Some(definition), Some(constraint)) =
                    (self.definition.as_mut(), self.constraint.take())
                {
                    definition.constraints.push(constraint);
                }
            }
            ["RDF", "Sequence"] => {
                if let Some(sequence) = self.sequence.take() {
                    self.document.insert_sequence(sequence);
                }
            }
            ["RDF", "Sequence", "displayId"] => {
                if let Some(sequence) = self.sequence.as_mut() {
                    sequence.display_id = text.trim().to_string();
                }
            }
            ["RDF", "Sequence", "elements"] => {
                if let Some(sequence) = self.sequence.as_mut() {
                    sequence.elements = text;
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design_document::{SBOL_ENCODING_IUPAC, SO_CIRCULAR};

    const FIXTURE: &str = "test_files/fixtures/sbol/hierarchical_design.xml";

    fn load_fixture() -> SbolDocument {
        let text = std::fs::read_to_string(FIXTURE).expect("read SBOL fixture");
        parse_sbol_xml_text(&text).expect("parse SBOL fixture")
    }

    fn sub(uri: &str, definition: &str) -> SubComponent {
        SubComponent {
            uri: uri.to_string(),
            display_id: String::new(),
            definition: definition.to_string(),
        }
    }

    fn precedes(subject: &str, object: &str) -> SequenceConstraint {
        SequenceConstraint {
            restriction: SBOL_RESTRICTION_PRECEDES.to_string(),
            subject: subject.to_string(),
            object: object.to_string(),
        }
    }

    #[test]
    fn test_display_id_from_uri() {
        assert_eq!(display_id_from_uri("http://example.org/pTet/1"), "pTet");
        assert_eq!(display_id_from_uri("http://example.org/pTet"), "pTet");
        assert_eq!(display_id_from_uri("http://example.org#gfp"), "gfp");
        assert_eq!(display_id_from_uri("http://example.org/a/b/1.0/"), "b");
        assert_eq!(display_id_from_uri("gfp"), "gfp");
        assert_eq!(display_id_from_uri(""), "");
    }

    #[test]
    fn test_ordered_components_follows_precedes_chain() {
        let definition = ComponentDefinition {
            components: vec![sub("c", "C"), sub("a", "A"), sub("b", "B")],
            constraints: vec![precedes("b", "c"), precedes("a", "b")],
            ..Default::default()
        };
        let ordered: Vec<&str> = definition
            .ordered_components()
            .unwrap()
            .iter()
            .map(|c| c.uri.as_str())
            .collect();
        assert_eq!(ordered, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ordered_components_single_component_without_constraints() {
        let definition = ComponentDefinition {
            components: vec![sub("only", "Only")],
            ..Default::default()
        };
        assert_eq!(definition.ordered_components().unwrap().len(), 1);
    }

    #[test]
    fn test_ordered_components_rejects_ambiguous_structures() {
        let unordered = ComponentDefinition {
            components: vec![sub("a", "A"), sub("b", "B")],
            ..Default::default()
        };
        assert!(unordered.ordered_components().is_err());

        let branching = ComponentDefinition {
            components: vec![sub("a", "A"), sub("b", "B"), sub("c", "C")],
            constraints: vec![precedes("a", "b"), precedes("a", "c")],
            ..Default::default()
        };
        assert!(branching.ordered_components().is_err());

        let cyclic = ComponentDefinition {
            components: vec![sub("a", "A"), sub("b", "B"), sub("c", "C")],
            constraints: vec![precedes("a", "b"), precedes("b", "c"), precedes("c", "b")],
            ..Default::default()
        };
        assert!(cyclic.ordered_components().is_err());

        let dangling = ComponentDefinition {
            components: vec![sub("a", "A"), sub("b", "B")],
            constraints: vec![precedes("a", "z")],
            ..Default::default()
        };
        assert!(dangling.ordered_components().is_err());

        let empty = ComponentDefinition::default();
        assert!(empty.ordered_components().is_err());
    }

    #[test]
    fn test_parse_fixture_definitions_and_sequences() {
        let doc = load_fixture();
        let ids: Vec<String> = doc
            .components()
            .into_iter()
            .map(|info| info.display_id)
            .collect();
        assert_eq!(
            ids,
            vec![
                "circuit", "tu1", "pTet", "B0034", "gfp", "B0015", "backbone", "reporter",
                "ambiguous"
            ]
        );

        let circuit = doc.component("circuit").unwrap();
        assert!(circuit.types.iter().any(|t| t == SO_CIRCULAR));
        assert_eq!(circuit.uri, "http://example.org/circuit/1");

        let gfp = doc.component("gfp").unwrap();
        assert_eq!(gfp.sequences.len(), 2);
        let protein = doc.sequence(&gfp.sequences[0]).unwrap();
        assert!(!protein.is_iupac_dna());
        let dna = doc.sequence(&gfp.sequences[1]).unwrap();
        assert_eq!(dna.encoding, SBOL_ENCODING_IUPAC);
        assert!(dna.elements.starts_with("atg"));
    }

    #[test]
    fn test_parse_fixture_primary_structures() {
        let doc = load_fixture();
        assert_eq!(
            doc.primary_structure("tu1"),
            PrimaryStructure::Chain(vec![
                "pTet".to_string(),
                "B0034".to_string(),
                "gfp".to_string(),
                "B0015".to_string()
            ])
        );
        assert_eq!(
            doc.primary_structure("http://example.org/circuit/1"),
            PrimaryStructure::Chain(vec!["tu1".to_string(), "backbone".to_string()])
        );
        // Definition not in the document: id derived from the URI.
        assert_eq!(
            doc.primary_structure("reporter").children().last().map(String::as_str),
            Some("ghost")
        );
        assert_eq!(doc.primary_structure("ambiguous"), PrimaryStructure::Leaf);
        assert_eq!(doc.primary_structure("gfp"), PrimaryStructure::Leaf);
        assert_eq!(doc.primary_structure("nope"), PrimaryStructure::Leaf);
    }

    #[test]
    fn test_lookup_failures() {
        let doc = load_fixture();
        assert!(matches!(
            doc.component("ghost"),
            Err(PlanError::ComponentNotFound { .. })
        ));
        let backbone = doc.component("backbone").unwrap();
        assert!(matches!(
            doc.sequence(&backbone.sequences[0]),
            Err(PlanError::SequenceNotFound { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_xml() {
        assert!(parse_sbol_xml_text("not xml at all").is_err());
        assert!(parse_sbol_xml_text("<GBSet><GBSeq/></GBSet>").is_err());
        let err = parse_sbol_xml_text(
            r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><x>"#,
        )
        .expect_err("truncated document should be rejected");
        assert!(err.to_string().contains("Malformed SBOL XML"), "got: {err}");
    }

    #[test]
    fn test_parse_empty_rdf_document() {
        let doc = parse_sbol_xml_text(
            r#"<?xml version="1.0"?><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"/>"#,
        )
        .expect("empty document");
        assert_eq!(doc.definition_count(), 0);
        assert_eq!(doc.sequence_count(), 0);
    }

    #[test]
    fn test_from_file_reports_load_failure() {
        let err = SbolDocument::from_file("test_files/fixtures/sbol/does_not_exist.xml")
            .expect_err("missing file");
        assert!(matches!(err, PlanError::DocumentLoad { .. }));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xml");
        std::fs::write(&path, "<rdf:RDF><sbol:ComponentDefinition>").unwrap();
        let err = SbolDocument::from_file(&path).expect_err("truncated file");
        assert!(matches!(err, PlanError::DocumentLoad { .. }));
    }

    #[test]
    fn test_insert_component_derives_ids() {
        let mut doc = SbolDocument::default();
        doc.insert_component(ComponentDefinition {
            info: ComponentInfo {
                uri: "http://example.org/part_a/1".to_string(),
                ..Default::default()
            },
            ..Default::default()
        });
        assert_eq!(doc.component("part_a").unwrap().uri, "http://example.org/part_a/1");
        assert_eq!(
            doc.component("http://example.org/part_a/1").unwrap().display_id,
            "part_a"
        );
    }
}
