//! Block parser
//!
//! A dump is a sequence of blocks. Each block opens with an unindented
//! header line `0x<id>: TAG_<kind>` (or `NULL` for a chain terminator)
//! followed by indented attribute lines.

use crate::attributes::{self as attr, LineContext};
use crate::error::{LoadError, ParseWarning};
use crate::file::DumpFile;
use dwarf1_types::{Language, Modifier, Tag, TagKind, TagStore};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

/* Compile unit as announced by its header block */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitHeader {
    pub tag_id: u32,
    pub name: String,
    pub language: Language,
}

/* Everything the loader produced from one dump */
#[derive(Debug, Default)]
pub struct ParsedDump {
    pub store: TagStore,
    pub units: Vec<UnitHeader>,
    pub warnings: Vec<ParseWarning>,
}

fn header_pattern() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"^0x([0-9A-Fa-f]+):\s*(?:<\d+>\s*)?(\w+)\s*$").expect("header pattern is valid")
    })
}

/* Map the header's kind token onto a tag kind */
pub fn kind_from_header(token: &str) -> TagKind {
    match token {
        "NULL" => TagKind::End,
        "TAG_compile_unit" => TagKind::CompileUnit,
        "TAG_array_type" => TagKind::ArrayType,
        "TAG_class_type" => TagKind::Class,
        "TAG_structure_type" => TagKind::Struct,
        "TAG_union_type" => TagKind::Union,
        "TAG_enumeration_type" => TagKind::Enum,
        "TAG_subroutine_type" => TagKind::FunctionPointer,
        "TAG_ptr_to_member_type" => TagKind::PtrToMemberFunc,
        "TAG_global_subroutine" => TagKind::GlobalFunc,
        "TAG_subroutine" => TagKind::CULocalFunc,
        "TAG_member_function" => TagKind::MemberFunc,
        "TAG_global_variable" => TagKind::GlobalVar,
        "TAG_local_variable" => TagKind::LocalVar,
        "TAG_member" => TagKind::Member,
        "TAG_formal_parameter" => TagKind::Param,
        "TAG_unspecified_parameters" => TagKind::VariadicParam,
        "TAG_inheritance" => TagKind::Inheritance,
        "TAG_typedef" => TagKind::TypeDef,
        "TAG_padding" => TagKind::Padding,
        _ => TagKind::Tag,
    }
}

/* Parse a header line into (id, kind); None for anything that is not one */
pub fn parse_header(line: &str, line_number: usize) -> Result<Option<(u32, TagKind)>, LoadError> {
    let Some(caps) = header_pattern().captures(line) else {
        return Ok(None);
    };
    let id = u32::from_str_radix(&caps[1], 16).map_err(|_| LoadError::InvalidNumber {
        line: line_number,
        text: line.to_string(),
    })?;
    Ok(Some((id, kind_from_header(&caps[2]))))
}

/* Route one attribute line to the parsers the tag's kind understands.
   Returns false when none of them recognised it. */
fn apply_attribute(line: &str, tag: &mut Tag, ctx: &LineContext<'_>) -> Result<bool, LoadError> {
    if attr::parse_sibling(line, tag, ctx)? {
        return Ok(true);
    }
    if tag.kind == TagKind::Padding && attr::is_code_range(line) {
        /* only functions carry a code range */
        tag.is_function = true;
        return Ok(true);
    }
    if attr::is_ignorable(line) {
        return Ok(true);
    }

    let recognised = match tag.kind {
        TagKind::Tag | TagKind::End => true,
        TagKind::CompileUnit => attr::parse_name(line, tag) || attr::parse_language(line, tag),
        TagKind::Class | TagKind::Struct | TagKind::Union => {
            attr::parse_name(line, tag) || attr::parse_byte_size(line, tag, ctx)?
        }
        TagKind::Enum => {
            attr::parse_name(line, tag)
                || attr::parse_byte_size(line, tag, ctx)?
                || attr::parse_element_list(line, tag)
        }
        TagKind::ArrayType => attr::parse_subscript_data(line, tag, ctx)?,
        TagKind::Inheritance => {
            attr::parse_types(line, tag, ctx)?
                || attr::parse_location(line, tag, ctx)?
                || attr::parse_name(line, tag)
                || attr::parse_access_level(line, tag)
        }
        TagKind::GlobalFunc | TagKind::CULocalFunc | TagKind::MemberFunc => {
            attr::parse_name(line, tag)
                || attr::parse_types(line, tag, ctx)?
                || attr::parse_lo_user(line, tag)
                || attr::parse_access_level(line, tag)
                || attr::parse_member_of(line, tag, ctx)?
                || attr::parse_reference(line, tag, ctx)?
        }
        TagKind::Param | TagKind::VariadicParam | TagKind::LocalVar => {
            attr::parse_name(line, tag)
                || attr::parse_types(line, tag, ctx)?
                || attr::parse_location(line, tag, ctx)?
        }
        TagKind::TypeDef => attr::parse_name(line, tag) || attr::parse_types(line, tag, ctx)?,
        TagKind::Member => {
            attr::parse_name(line, tag)
                || attr::parse_access_level(line, tag)
                || attr::parse_types(line, tag, ctx)?
                || attr::parse_location(line, tag, ctx)?
                || attr::parse_bit_field(line, tag, ctx)?
        }
        TagKind::GlobalVar => {
            attr::parse_name(line, tag)
                || attr::parse_types(line, tag, ctx)?
                || attr::parse_lo_user(line, tag)
                || attr::parse_location(line, tag, ctx)?
                || attr::parse_member_of(line, tag, ctx)?
        }
        TagKind::FunctionPointer => attr::parse_types(line, tag, ctx)?,
        TagKind::PtrToMemberFunc => {
            attr::parse_containing_type(line, tag, ctx)? || attr::parse_types(line, tag, ctx)?
        }
        TagKind::Padding => {
            attr::parse_name(line, tag)
                || attr::parse_types(line, tag, ctx)?
                || attr::parse_lo_user(line, tag)
                || attr::parse_member_of(line, tag, ctx)?
                || attr::parse_location(line, tag, ctx)?
                || attr::parse_access_level(line, tag)
                || attr::parse_bit_field(line, tag, ctx)?
        }
    };

    Ok(recognised)
}

/* Per-kind fields derived once the whole block has been read */
fn finish_tag(tag: &mut Tag) {
    match tag.kind {
        TagKind::Class | TagKind::Struct | TagKind::Union => {
            tag.comment = Some(format!("size: 0x{:X}", tag.size));
            if tag.name.is_none() {
                tag.name = Some(tag.anonymous_name());
            }
        }
        TagKind::Enum => {
            tag.comment = Some(format!("size: 0x{:X}", tag.size));
        }
        TagKind::Member => {
            if let Some(location) = tag.location {
                tag.comment = Some(format!("0x{location:X}"));
            }
        }
        TagKind::TypeDef => {
            /* typedef entries stand for static data members */
            tag.is_static = true;
        }
        TagKind::PtrToMemberFunc => {
            tag.modifiers.push(Modifier::Pointer);
            tag.is_pointer = true;
            tag.size = 12;
            tag.is_dirty = false;
        }
        _ => {}
    }
}

fn is_attribute_line(line: &str) -> bool {
    line.starts_with(char::is_whitespace) && !line.trim().is_empty()
}

/* Parse a whole dump into a populated tag store */
pub fn parse(file: &DumpFile) -> Result<ParsedDump, LoadError> {
    let lines = file.lines();
    let mut current = file.body_start()?;
    let mut dump = ParsedDump::default();

    while current < lines.len() {
        let Some((id, kind)) = parse_header(&lines[current], current + 1)? else {
            current += 1;
            continue;
        };

        let mut tag = Tag::new(id, kind);
        current += 1;

        while current < lines.len() && is_attribute_line(&lines[current]) {
            let text = lines[current].trim();
            let ctx = LineContext {
                line: current + 1,
                store: &dump.store,
            };
            if !apply_attribute(text, &mut tag, &ctx)? {
                let warning = ParseWarning {
                    line: current + 1,
                    tag_id: id,
                    text: text.to_string(),
                };
                warn!("{}", warning);
                dump.warnings.push(warning);
            }
            current += 1;
        }

        finish_tag(&mut tag);

        if kind == TagKind::CompileUnit {
            debug!("compile unit 0x{:X}: {}", id, tag.name_str());
            dump.units.push(UnitHeader {
                tag_id: id,
                name: tag.name.clone().unwrap_or_default(),
                language: tag.language.unwrap_or_default(),
            });
        }

        dump.store.push(tag)?;
    }

    debug!(
        "parsed {} tags in {} compile units ({} warnings)",
        dump.store.len(),
        dump.units.len(),
        dump.warnings.len()
    );

    Ok(dump)
}
