//! Attribute line parsers
//!
//! Each parser inspects one trimmed attribute line and, when it recognises
//! the attribute, writes the corresponding field of the tag and returns
//! `Ok(true)`. `Ok(false)` means "not mine"; errors are reserved for lines
//! that were recognised but are malformed.

use crate::error::LoadError;
use dwarf1_types::{AccessLevel, BuiltinType, Language, Modifier, Tag, TagStore, TypeRef};
use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    hex_call: Regex,
    quoted_call: Regex,
    location: Regex,
    modified_type: Regex,
    element: Regex,
    subscript: Regex,
    subscript_layout: Regex,
}

impl Patterns {
    fn compile() -> Self {
        let build = |pattern: &str| Regex::new(pattern).expect("attribute pattern is valid");
        Self {
            hex_call: build(r"^(AT_\w+)\(0x([0-9A-Fa-f]+)\)$"),
            quoted_call: build(r#"^(AT_\w+)\("(.*)"\)$"#),
            location: build(r"^AT_location\(.*?0x([0-9A-Fa-f]+)"),
            modified_type: build(r"^AT_mod_(fund_type|u_d_type)\(<\d+>((?:MOD_\w+\s*)*)(.*)\)$"),
            element: build(r#"\((-?\d+)="([^"]*)"\)"#),
            subscript: build(r"FT_(\w+)\[0:(\d+)\]"),
            subscript_layout: build(r"^AT_subscr_data\(<\d+>((?:FT_\w+\[0:\d+\],\s*)+)FMT_ET:\s*(.*)\)$"),
        }
    }
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(Patterns::compile)
}

/* Where the parser currently is, for error reporting and type lookups */
pub struct LineContext<'a> {
    /* 1-based line number */
    pub line: usize,
    /* Tags parsed so far, used to size user-defined type references */
    pub store: &'a TagStore,
}

impl LineContext<'_> {
    fn invalid(&self, text: &str) -> LoadError {
        LoadError::InvalidNumber {
            line: self.line,
            text: text.to_string(),
        }
    }
}

fn parse_hex(text: &str, ctx: &LineContext<'_>) -> Result<u32, LoadError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).map_err(|_| ctx.invalid(text))
}

/* `AT_xxx(0x...)` with the given attribute name */
fn hex_attribute(line: &str, name: &str, ctx: &LineContext<'_>) -> Result<Option<u32>, LoadError> {
    let Some(caps) = patterns().hex_call.captures(line) else {
        return Ok(None);
    };
    if &caps[1] != name {
        return Ok(None);
    }
    parse_hex(&caps[2], ctx).map(Some)
}

fn quoted_attribute<'l>(line: &'l str, name: &str) -> Option<&'l str> {
    let caps = patterns().quoted_call.captures(line)?;
    if &caps[1] != name {
        return None;
    }
    caps.get(2).map(|m| m.as_str())
}

/* ===== Linkage ===== */

pub fn parse_sibling(line: &str, tag: &mut Tag, ctx: &LineContext<'_>) -> Result<bool, LoadError> {
    Ok(match hex_attribute(line, "AT_sibling", ctx)? {
        Some(id) => {
            tag.sibling_id = Some(id);
            true
        }
        None => false,
    })
}

pub fn parse_member_of(line: &str, tag: &mut Tag, ctx: &LineContext<'_>) -> Result<bool, LoadError> {
    Ok(match hex_attribute(line, "AT_member", ctx)? {
        Some(id) => {
            tag.member_of_id = Some(id);
            true
        }
        None => false,
    })
}

pub fn parse_containing_type(
    line: &str,
    tag: &mut Tag,
    ctx: &LineContext<'_>,
) -> Result<bool, LoadError> {
    Ok(match hex_attribute(line, "AT_containing_type", ctx)? {
        Some(id) => {
            tag.member_of_id = Some(id);
            true
        }
        None => false,
    })
}

pub fn parse_reference(line: &str, tag: &mut Tag, ctx: &LineContext<'_>) -> Result<bool, LoadError> {
    Ok(match hex_attribute(line, "AT_reference", ctx)? {
        Some(id) => {
            tag.references.push(id);
            true
        }
        None => false,
    })
}

/* ===== Plain fields ===== */

pub fn parse_name(line: &str, tag: &mut Tag) -> bool {
    match quoted_attribute(line, "AT_name") {
        Some(name) => {
            tag.name = Some(name.to_string());
            true
        }
        None => false,
    }
}

pub fn parse_byte_size(line: &str, tag: &mut Tag, ctx: &LineContext<'_>) -> Result<bool, LoadError> {
    Ok(match hex_attribute(line, "AT_byte_size", ctx)? {
        Some(size) => {
            tag.size = size as i32;
            true
        }
        None => false,
    })
}

pub fn parse_access_level(line: &str, tag: &mut Tag) -> bool {
    let level = match line {
        l if l.starts_with("AT_public") => AccessLevel::Public,
        l if l.starts_with("AT_private") => AccessLevel::Private,
        l if l.starts_with("AT_protected") => AccessLevel::Protected,
        _ => return false,
    };
    tag.access_level = level;
    true
}

pub fn parse_location(line: &str, tag: &mut Tag, ctx: &LineContext<'_>) -> Result<bool, LoadError> {
    if !line.starts_with("AT_location") {
        return Ok(false);
    }
    let Some(caps) = patterns().location.captures(line) else {
        /* location expressions without a constant carry nothing we use */
        return Ok(true);
    };
    tag.location = Some(parse_hex(&caps[1], ctx)? as i32);
    Ok(true)
}

pub fn parse_bit_field(line: &str, tag: &mut Tag, ctx: &LineContext<'_>) -> Result<bool, LoadError> {
    if let Some(offset) = hex_attribute(line, "AT_bit_offset", ctx)? {
        tag.bit_offset = Some(offset as i32);
        return Ok(true);
    }
    if let Some(size) = hex_attribute(line, "AT_bit_size", ctx)? {
        tag.bit_size = Some(size as i32);
        return Ok(true);
    }
    Ok(false)
}

/* `AT_lo_user` marks a static member, a unit-local static, or a member
   function; fixup tells them apart. */
pub fn parse_lo_user(line: &str, tag: &mut Tag) -> bool {
    match quoted_attribute(line, "AT_lo_user") {
        Some(comment) => {
            tag.is_static = true;
            tag.comment = Some(comment.to_string());
            true
        }
        None => false,
    }
}

pub fn parse_language(line: &str, tag: &mut Tag) -> bool {
    let Some(lang) = line
        .strip_prefix("AT_language(")
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return false;
    };
    tag.language = Some(match lang {
        "LANG_C_PLUS_PLUS" => Language::Cpp,
        _ => Language::C,
    });
    true
}

/* ===== Types ===== */

fn builtin_from_token(token: &str, ctx: &LineContext<'_>) -> Result<BuiltinType, LoadError> {
    BuiltinType::from_fundamental(token).ok_or_else(|| LoadError::UnknownFundamentalType {
        line: ctx.line,
        token: token.to_string(),
    })
}

fn apply_builtin(tag: &mut Tag, builtin: BuiltinType) {
    tag.type_ref = TypeRef::Builtin(builtin);
    tag.size = tag.size_from_target(builtin.size());
}

/* Size a user type reference now, or mark the tag dirty when the target has
   not been parsed or is still unsized itself. */
fn apply_user(tag: &mut Tag, id: u32, ctx: &LineContext<'_>) {
    tag.type_ref = TypeRef::User(id);
    match ctx.store.by_id(id).filter(|target| !target.is_dirty) {
        Some(target) => tag.size = tag.size_from_target(target.size),
        None => {
            tag.is_dirty = true;
            tag.size = -1;
        }
    }
}

pub fn parse_fund_type(line: &str, tag: &mut Tag, ctx: &LineContext<'_>) -> Result<bool, LoadError> {
    let Some(token) = line
        .strip_prefix("AT_fund_type(")
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return Ok(false);
    };

    if token.trim().is_empty() {
        tag.type_ref = TypeRef::Builtin(BuiltinType::Unknown);
        tag.size = -1;
        tag.comment = Some("Size unknown...".to_string());
        return Ok(true);
    }

    let builtin = builtin_from_token(token.trim(), ctx)?;
    apply_builtin(tag, builtin);
    Ok(true)
}

pub fn parse_user_def_type(
    line: &str,
    tag: &mut Tag,
    ctx: &LineContext<'_>,
) -> Result<bool, LoadError> {
    Ok(match hex_attribute(line, "AT_user_def_type", ctx)? {
        Some(id) => {
            apply_user(tag, id, ctx);
            true
        }
        None => false,
    })
}

/* `AT_mod_fund_type(<n>MOD_... FT_x)` and `AT_mod_u_d_type(<n>MOD_... 0x..)` */
pub fn parse_modified_type(
    line: &str,
    tag: &mut Tag,
    ctx: &LineContext<'_>,
) -> Result<bool, LoadError> {
    let Some(caps) = patterns().modified_type.captures(line) else {
        return Ok(false);
    };

    tag.modifiers
        .extend(caps[2].split_whitespace().filter_map(Modifier::from_token));
    tag.derive_indirection();

    let target = caps[3].trim();
    match &caps[1] {
        "fund_type" if target.is_empty() => {
            /* the encoder dropped the pointee; these are pointers or references */
            tag.type_ref = TypeRef::Builtin(BuiltinType::Unknown);
            tag.size = 4;
        }
        "fund_type" => {
            let builtin = builtin_from_token(target, ctx)?;
            apply_builtin(tag, builtin);
        }
        _ => {
            let id = parse_hex(target, ctx)?;
            apply_user(tag, id, ctx);
        }
    }
    Ok(true)
}

/* Any of the four type attribute forms */
pub fn parse_types(line: &str, tag: &mut Tag, ctx: &LineContext<'_>) -> Result<bool, LoadError> {
    Ok(parse_fund_type(line, tag, ctx)?
        || parse_modified_type(line, tag, ctx)?
        || parse_user_def_type(line, tag, ctx)?)
}

/* ===== Enums and arrays ===== */

pub fn parse_element_list(line: &str, tag: &mut Tag) -> bool {
    if !line.starts_with("AT_element_list") {
        return false;
    }
    for caps in patterns().element.captures_iter(line) {
        tag.elements.push(format!("{} = {},", &caps[2], &caps[1]));
    }
    true
}

/* `AT_subscr_data(<n>FT_long[0:9], FMT_ET: AT_fund_type(FT_char))` */
pub fn parse_subscript_data(
    line: &str,
    tag: &mut Tag,
    ctx: &LineContext<'_>,
) -> Result<bool, LoadError> {
    if !line.starts_with("AT_subscr_data") {
        return Ok(false);
    }

    let p = patterns();
    let Some(layout) = p.subscript_layout.captures(line) else {
        if p.subscript.captures_iter(line).any(|c| !is_supported_index(&c[1])) {
            return Err(unsupported_subscript(line, tag, ctx));
        }
        return Err(LoadError::UnknownArrayFormat {
            line: ctx.line,
            tag_id: tag.id,
            text: line.to_string(),
        });
    };

    let mut dims = Vec::new();
    for caps in p.subscript.captures_iter(&layout[1]) {
        if !is_supported_index(&caps[1]) {
            return Err(unsupported_subscript(line, tag, ctx));
        }
        let upper: u32 = caps[2].parse().map_err(|_| ctx.invalid(&caps[2]))?;
        /* 0xFFFFFFFF encodes an unknown bound */
        dims.push(upper as i32);
    }

    if dims.len() > 1 {
        tag.is_multidim_array = true;
        tag.dim_lengths = dims;
    } else if let Some(&length) = dims.first() {
        tag.length = length;
    }

    let element_type = layout[2].trim().to_string();
    if !parse_types(&element_type, tag, ctx)? {
        return Err(LoadError::UnknownArrayFormat {
            line: ctx.line,
            tag_id: tag.id,
            text: line.to_string(),
        });
    }
    Ok(true)
}

fn is_supported_index(index_type: &str) -> bool {
    matches!(index_type, "long" | "integer")
}

fn unsupported_subscript(line: &str, tag: &Tag, ctx: &LineContext<'_>) -> LoadError {
    LoadError::UnsupportedSubscript {
        line: ctx.line,
        tag_id: tag.id,
        text: line.to_string(),
    }
}

/* ===== Lines every kind tolerates ===== */

/* Code ranges, line tables and producer strings carry nothing we emit */
pub fn is_ignorable(line: &str) -> bool {
    line.starts_with('(')
        || line.starts_with("AT_low_pc")
        || line.starts_with("AT_high_pc")
        || line.starts_with("AT_stmt_list")
        || line.starts_with("AT_producer")
        || line.starts_with("AT_comp_dir")
}

pub fn is_code_range(line: &str) -> bool {
    line.starts_with("AT_low_pc") || line.starts_with("AT_high_pc")
}
