use crate::builtin::BuiltinType;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/* Entity kind carried by a tag */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TagKind {
    /* Unclassified `TAG_*` entry */
    #[default]
    Tag,
    CompileUnit,
    /* Null entry terminating a sibling chain */
    End,
    ArrayType,
    Class,
    Struct,
    Union,
    Enum,
    FunctionPointer,
    PtrToMemberFunc,
    GlobalFunc,
    CULocalFunc,
    MemberFunc,
    GlobalVar,
    LocalVar,
    Member,
    Param,
    VariadicParam,
    Inheritance,
    TypeDef,
    /* Stands in for a global variable, a member or a function until fixup */
    Padding,
}

impl TagKind {
    /* Kinds whose tag may be followed in store order by its first child */
    pub fn can_have_children(self) -> bool {
        matches!(
            self,
            TagKind::CompileUnit
                | TagKind::Class
                | TagKind::Struct
                | TagKind::Union
                | TagKind::GlobalFunc
                | TagKind::CULocalFunc
                | TagKind::MemberFunc
                | TagKind::FunctionPointer
                | TagKind::Padding
        )
    }

    pub fn is_aggregate(self) -> bool {
        matches!(self, TagKind::Class | TagKind::Struct | TagKind::Union)
    }

    pub fn is_function(self) -> bool {
        matches!(
            self,
            TagKind::GlobalFunc | TagKind::CULocalFunc | TagKind::MemberFunc
        )
    }

    /* Kinds that declare a symbol at compilation unit scope */
    pub fn is_top_level_symbol(self) -> bool {
        matches!(
            self,
            TagKind::CULocalFunc
                | TagKind::Class
                | TagKind::Struct
                | TagKind::Union
                | TagKind::Enum
                | TagKind::GlobalVar
                | TagKind::GlobalFunc
                | TagKind::LocalVar
        )
    }
}

/* Type modifier, in the order stored on the tag */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Modifier {
    Const,
    Volatile,
    Pointer,
    Reference,
}

impl Modifier {
    pub fn from_token(token: &str) -> Option<Modifier> {
        match token {
            "MOD_pointer_to" => Some(Modifier::Pointer),
            "MOD_reference_to" => Some(Modifier::Reference),
            "MOD_const" => Some(Modifier::Const),
            "MOD_volatile" => Some(Modifier::Volatile),
            _ => None,
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Pointer => f.write_str("*"),
            Modifier::Reference => f.write_str("&"),
            Modifier::Const => f.write_str("const "),
            Modifier::Volatile => f.write_str("volatile "),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    #[default]
    None,
    Public,
    Private,
    Protected,
}

impl AccessLevel {
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            AccessLevel::None => None,
            AccessLevel::Public => Some("public"),
            AccessLevel::Private => Some("private"),
            AccessLevel::Protected => Some("protected"),
        }
    }
}

/* Source language recorded on a compile unit */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    #[default]
    C,
    Cpp,
}

/* What a tag's type is: nothing yet, a builtin, or another tag by ID */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TypeRef {
    #[default]
    Unset,
    Builtin(BuiltinType),
    User(u32),
}

impl TypeRef {
    /* Decode the signed encoding: negative builtin code, positive tag ID, zero unset */
    pub fn from_code(code: i64) -> Option<TypeRef> {
        match code {
            0 => Some(TypeRef::Unset),
            c if c < 0 => {
                let c = i32::try_from(c).ok()?;
                BuiltinType::from_code(c).map(TypeRef::Builtin)
            }
            c => u32::try_from(c).ok().map(TypeRef::User),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            TypeRef::Unset => 0,
            TypeRef::Builtin(b) => b.code() as i64,
            TypeRef::User(id) => id as i64,
        }
    }

    pub fn user_id(self) -> Option<u32> {
        match self {
            TypeRef::User(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_unset(self) -> bool {
        matches!(self, TypeRef::Unset)
    }
}

/* One debug-info record */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Tag {
    pub id: u32,
    pub kind: TagKind,

    /* Next tag at the same nesting level */
    pub sibling_id: Option<u32>,
    /* Tag immediately following this one in store order, when it is a child */
    pub first_child_id: Option<u32>,

    pub name: Option<String>,
    pub comment: Option<String>,

    pub type_ref: TypeRef,
    /* -1 while unresolved */
    pub size: i32,
    /* Highest array subscript; negative when unknown */
    pub length: i32,
    pub is_multidim_array: bool,
    pub dim_lengths: Vec<i32>,

    /* Innermost-first until the store reverses them */
    pub modifiers: Vec<Modifier>,
    pub is_pointer: bool,
    pub is_reference: bool,

    /* Byte offset inside the owning aggregate */
    pub location: Option<i32>,
    pub bit_offset: Option<i32>,
    pub bit_size: Option<i32>,

    pub access_level: AccessLevel,
    pub is_static: bool,
    pub member_of_id: Option<u32>,

    /* Rendered enum constants, e.g. `FOO = 0,` */
    pub elements: Vec<String>,
    /* Tags referenced from a function body */
    pub references: Vec<u32>,

    pub language: Option<Language>,

    pub is_anon_union_member: bool,
    pub is_dirty: bool,
    /* Padding only: the entry carried a code range */
    pub is_function: bool,
}

impl Tag {
    pub fn new(id: u32, kind: TagKind) -> Self {
        Self {
            id,
            kind,
            sibling_id: None,
            first_child_id: None,
            name: None,
            comment: None,
            type_ref: TypeRef::Unset,
            size: 0,
            length: 0,
            is_multidim_array: false,
            dim_lengths: Vec::new(),
            modifiers: Vec::new(),
            is_pointer: false,
            is_reference: false,
            location: None,
            bit_offset: None,
            bit_size: None,
            access_level: AccessLevel::None,
            is_static: false,
            member_of_id: None,
            elements: Vec::new(),
            references: Vec::new(),
            language: None,
            is_anon_union_member: false,
            is_dirty: false,
            is_function: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_sibling(mut self, sibling_id: u32) -> Self {
        self.sibling_id = Some(sibling_id);
        self
    }

    pub fn with_type(mut self, type_ref: TypeRef) -> Self {
        self.type_ref = type_ref;
        self
    }

    pub fn with_location(mut self, location: i32) -> Self {
        self.location = Some(location);
        self
    }

    pub fn is_end(&self) -> bool {
        self.kind == TagKind::End
    }

    pub fn is_bitfield(&self) -> bool {
        self.bit_size.is_some_and(|bits| bits > 0)
    }

    pub fn name_str(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /* Synthesized name for entities the encoder left unnamed */
    pub fn anonymous_name(&self) -> String {
        format!("__anon_0x{:X}", self.id)
    }

    /* Total element count of an array tag, None when any dimension is unknown */
    pub fn element_count(&self) -> Option<i64> {
        if self.is_multidim_array {
            self.dim_lengths.iter().try_fold(1i64, |acc, &len| {
                (len >= 0).then(|| acc * (len as i64 + 1))
            })
        } else if self.length < 0 {
            None
        } else {
            Some(self.length as i64 + 1)
        }
    }

    /* Byte size of this tag given the size of the type it refers to.
       Pointers (and references to pointers) are 4 bytes; arrays multiply by
       their element count and fall back to 4 when flexible. */
    pub fn size_from_target(&self, target_size: i32) -> i32 {
        let element = if self.is_pointer { 4 } else { target_size };
        if self.kind != TagKind::ArrayType {
            return element;
        }
        match self.element_count() {
            Some(count) => i32::try_from(element as i64 * count).unwrap_or(i32::MAX),
            None => 4,
        }
    }

    /* Rendered modifier glyphs, in stored order */
    pub fn modifier_text(&self) -> String {
        self.modifiers.iter().map(|m| m.to_string()).collect()
    }

    /* Derive the pointer/reference sizing flags from the modifier list. A
       reference to a pointer sizes as a pointer. */
    pub fn derive_indirection(&mut self) {
        self.is_pointer = self.modifiers.contains(&Modifier::Pointer);
        self.is_reference = !self.is_pointer && self.modifiers.contains(&Modifier::Reference);
    }
}
