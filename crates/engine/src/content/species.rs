use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;

use super::database::{SpeciesDatabase, SpeciesDef, SpeciesId};
use super::hashing::{collect_xml_files_sorted, XmlSource};

/// Level characters with a fixed tile meaning; species may not claim them.
pub const RESERVED_LEVEL_MARKERS: [char; 6] = ['.', '#', 'T', '0', '1', 'X'];

const DEFAULT_BOUNDS_WIDTH: f32 = 22.0;
const DEFAULT_BOUNDS_HEIGHT: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ", line={}, column={}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDef,
    DuplicateMarker,
}

/// A species content failure, pinned to the file and, when known, the XML position.
#[derive(Debug, Clone, Error)]
#[error("{code:?}: {message} (file={}{})", .file_path.display(), DisplayLocation(.location))]
pub struct ContentError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

struct DisplayLocation<'a>(&'a Option<SourceLocation>);

impl fmt::Display for DisplayLocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(location) => location.fmt(f),
            None => Ok(()),
        }
    }
}

/// Compiles every `*.xml` under `content_dir` (sorted by relative path) into one database.
pub fn compile_species_database(content_dir: &Path) -> Result<SpeciesDatabase, ContentError> {
    let xml_files = collect_xml_files_sorted(content_dir).map_err(|error| ContentError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to list content directory: {}", error.source),
        file_path: error.path,
        location: None,
    })?;

    let mut defs = Vec::<SpeciesDef>::new();
    let mut seen_names = HashSet::<String>::new();
    let mut seen_markers = HashSet::<char>::new();

    for XmlSource { path: xml_file, .. } in xml_files {
        let raw = fs::read_to_string(&xml_file).map_err(|source| ContentError {
            code: ContentErrorCode::ReadFile,
            message: format!("failed to read XML file: {source}"),
            file_path: xml_file.clone(),
            location: None,
        })?;
        for def in parse_species_document(&xml_file, &raw)? {
            if !seen_names.insert(def.def_name.clone()) {
                return Err(ContentError {
                    code: ContentErrorCode::DuplicateDef,
                    message: format!("duplicate SpeciesDef '{}'", def.def_name),
                    file_path: xml_file.clone(),
                    location: None,
                });
            }
            if !seen_markers.insert(def.marker) {
                return Err(ContentError {
                    code: ContentErrorCode::DuplicateMarker,
                    message: format!(
                        "marker '{}' of SpeciesDef '{}' is already used by another species",
                        def.marker, def.def_name
                    ),
                    file_path: xml_file.clone(),
                    location: None,
                });
            }
            defs.push(def);
        }
    }

    Ok(SpeciesDatabase::from_defs(defs))
}

pub(crate) fn parse_species_document(file_path: &Path, raw: &str) -> Result<Vec<SpeciesDef>, ContentError> {
    let doc = Document::parse(raw).map_err(|error| ContentError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let reader = DefReader {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(reader.error(root, ContentErrorCode::InvalidRoot, "root element must be <Defs>"));
    }

    root.children()
        .filter(Node::is_element)
        .map(|child| match child.tag_name().name() {
            "SpeciesDef" => reader.species_def(child),
            other => Err(reader.error(
                child,
                ContentErrorCode::UnknownDefType,
                format!("unsupported def type <{other}>; expected <SpeciesDef>"),
            )),
        })
        .collect()
}

/// Field values collected from one `<SpeciesDef>` before required fields are checked.
#[derive(Default)]
struct SpeciesFields {
    def_name: Option<String>,
    label: Option<String>,
    marker: Option<char>,
    max_hit_points: Option<i32>,
    strength: Option<i32>,
    dexterity: Option<i32>,
    vitality: Option<i32>,
    move_speed: Option<f32>,
    bounds_width: Option<f32>,
    bounds_height: Option<f32>,
}

/// Parses def fields against one document so every error can point at its source line.
struct DefReader<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl DefReader<'_, '_> {
    fn species_def(&self, node: Node<'_, '_>) -> Result<SpeciesDef, ContentError> {
        let mut seen = HashSet::<&str>::new();
        let mut fields = SpeciesFields::default();

        for field in node.children().filter(Node::is_element) {
            let name = field.tag_name().name();
            if !seen.insert(name) {
                return Err(self.error(
                    field,
                    ContentErrorCode::DuplicateField,
                    format!("duplicate field <{name}> in <SpeciesDef>"),
                ));
            }
            let text = self.text(field, name)?;
            match name {
                "defName" => fields.def_name = Some(text),
                "label" => fields.label = Some(text),
                "marker" => fields.marker = Some(self.marker(field, &text)?),
                "maxHitPoints" => fields.max_hit_points = Some(self.stat(field, name, &text, 1)?),
                "str" => fields.strength = Some(self.stat(field, name, &text, 0)?),
                "dex" => fields.dexterity = Some(self.stat(field, name, &text, 0)?),
                "vit" => fields.vitality = Some(self.stat(field, name, &text, 0)?),
                "moveSpeed" => fields.move_speed = Some(self.measure(field, name, &text, false)?),
                "boundsWidth" => fields.bounds_width = Some(self.measure(field, name, &text, true)?),
                "boundsHeight" => fields.bounds_height = Some(self.measure(field, name, &text, true)?),
                _ => {
                    return Err(self.error(
                        field,
                        ContentErrorCode::UnknownField,
                        format!("unknown field <{name}> in <SpeciesDef>"),
                    ))
                }
            }
        }

        let missing = |name: &str| {
            self.error(
                node,
                ContentErrorCode::MissingField,
                format!("missing required field <{name}> in <SpeciesDef>"),
            )
        };
        let def_name = fields.def_name.ok_or_else(|| missing("defName"))?;
        Ok(SpeciesDef {
            id: SpeciesId(0),
            label: fields.label.unwrap_or_else(|| def_name.clone()),
            def_name,
            marker: fields.marker.ok_or_else(|| missing("marker"))?,
            max_hit_points: fields.max_hit_points.ok_or_else(|| missing("maxHitPoints"))?,
            strength: fields.strength.ok_or_else(|| missing("str"))?,
            dexterity: fields.dexterity.unwrap_or(0),
            vitality: fields.vitality.ok_or_else(|| missing("vit"))?,
            move_speed: fields.move_speed.ok_or_else(|| missing("moveSpeed"))?,
            bounds_width: fields.bounds_width.unwrap_or(DEFAULT_BOUNDS_WIDTH),
            bounds_height: fields.bounds_height.unwrap_or(DEFAULT_BOUNDS_HEIGHT),
        })
    }

    fn text(&self, field: Node<'_, '_>, name: &str) -> Result<String, ContentError> {
        match field.text().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(self.error(
                field,
                ContentErrorCode::MissingField,
                format!("field <{name}> must not be empty"),
            )),
        }
    }

    /// One printable ASCII character that does not collide with a tile marker.
    fn marker(&self, field: Node<'_, '_>, text: &str) -> Result<char, ContentError> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(marker), None)
                if marker.is_ascii_graphic() && !RESERVED_LEVEL_MARKERS.contains(&marker) =>
            {
                Ok(marker)
            }
            (Some(_), None) => Err(self.error(
                field,
                ContentErrorCode::InvalidValue,
                format!("marker '{text}' is reserved or not a printable ASCII character"),
            )),
            _ => Err(self.error(
                field,
                ContentErrorCode::InvalidValue,
                format!("marker '{text}' must be exactly one character"),
            )),
        }
    }

    fn stat(&self, field: Node<'_, '_>, name: &str, text: &str, min: i32) -> Result<i32, ContentError> {
        match text.parse::<i32>() {
            Ok(value) if value >= min => Ok(value),
            _ => Err(self.error(
                field,
                ContentErrorCode::InvalidValue,
                format!("{name} '{text}' must be an integer >= {min}"),
            )),
        }
    }

    fn measure(
        &self,
        field: Node<'_, '_>,
        name: &str,
        text: &str,
        strictly_positive: bool,
    ) -> Result<f32, ContentError> {
        let valid = |value: f32| value.is_finite() && (value > 0.0 || (!strictly_positive && value == 0.0));
        match text.parse::<f32>() {
            Ok(value) if valid(value) => Ok(value),
            _ => {
                let bound = if strictly_positive { "> 0" } else { ">= 0" };
                Err(self.error(
                    field,
                    ContentErrorCode::InvalidValue,
                    format!("{name} '{text}' must be finite and {bound}"),
                ))
            }
        }
    }

    fn error(&self, node: Node<'_, '_>, code: ContentErrorCode, message: impl Into<String>) -> ContentError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentError {
            code,
            message: message.into(),
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}
