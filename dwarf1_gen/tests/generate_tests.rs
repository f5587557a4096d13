/* Declaration Generation Tests
 *
 * These tests run whole dumps through parsing, repair, fixup and emission
 * and check the rendered declarations and the files written for them.
 */

use dwarf1_gen::dwarf1_loader::{parse, DumpFile};
use dwarf1_gen::dwarf1_types::TagKind;
use dwarf1_gen::output::delimiter;
use dwarf1_gen::{analyze, generate, Analysis, GenConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const POINT: &str = r#"DWARF v1 dump - .debug section of game.elf

0x00000010: TAG_compile_unit
            AT_sibling(0x00001000)
            AT_name("C:\build\src\point.cpp")
            AT_language(LANG_C_PLUS_PLUS)

0x00000040: TAG_structure_type
            AT_sibling(0x00000100)
            AT_name("Point")
            AT_byte_size(0x8)

0x00000060: TAG_member
            AT_sibling(0x00000080)
            AT_name("x")
            AT_fund_type(FT_integer)
            AT_location(<6>OP_CONST(0x0) OP_ADD)

0x00000080: TAG_member
            AT_sibling(0x000000a0)
            AT_name("y")
            AT_fund_type(FT_float)
            AT_location(<6>OP_CONST(0x4) OP_ADD)

0x000000a0: TAG_member_function
            AT_sibling(0x000000c0)
            AT_name("Length")
            AT_fund_type(FT_float)

0x000000c0: NULL

0x00000100: TAG_global_variable
            AT_sibling(0x00000120)
            AT_name("counter")
            AT_fund_type(FT_integer)
            AT_location(<5>OP_ADDR(0x80400000))

0x00000120: TAG_global_variable
            AT_sibling(0x00000140)
            AT_name("counter")
            AT_fund_type(FT_integer)
            AT_location(<5>OP_ADDR(0x80400004))

0x00000140: NULL
"#;

fn analysis(text: &str) -> Analysis {
    let file = DumpFile::from_text("test.dump", text);
    analyze(parse(&file).unwrap()).unwrap()
}

fn config(output_dir: impl Into<PathBuf>) -> GenConfig {
    GenConfig {
        output_dir: output_dir.into(),
        strip_prefix: "C:\\build".into(),
        annotate_params: false,
    }
}

fn rendered(text: &str) -> Vec<String> {
    let analysis = analysis(text);
    let generation = generate(&analysis, &config("out"));
    assert!(generation.failures.is_empty());
    let path = generation.plan.paths().next().unwrap().clone();
    generation.plan.lines(&path).unwrap().to_vec()
}

#[test]
fn test_struct_members_then_public_functions() {
    let lines = rendered(POINT);
    assert_eq!(
        lines[..10],
        [
            "// size: 0x8",
            "struct Point",
            "{",
            "\tint x; // 0x0",
            "\tfloat y; // 0x4",
            "",
            "public:",
            "\tfloat Length();",
            "};",
            "",
        ]
    );
}

#[test]
fn test_duplicate_globals_are_disambiguated() {
    let lines = rendered(POINT);
    assert_eq!(
        lines[10..],
        [
            "// Location: 0x80400000",
            "int counter;",
            "",
            "// Location: 0x80400004",
            "int counter_0x120;",
            "",
        ]
    );
}

#[test]
fn test_anonymous_union_and_bitfields() {
    let text = r#"DWARF v1 dump - test

0x00000010: TAG_compile_unit
            AT_name("layout.c")

0x00000020: TAG_structure_type
            AT_sibling(0x00000100)
            AT_name("Value")
            AT_byte_size(0x8)

0x00000030: TAG_member
            AT_sibling(0x00000040)
            AT_name("i")
            AT_fund_type(FT_integer)
            AT_location(<6>OP_CONST(0x0) OP_ADD)

0x00000040: TAG_member
            AT_sibling(0x00000050)
            AT_name("f")
            AT_fund_type(FT_float)
            AT_location(<6>OP_CONST(0x0) OP_ADD)

0x00000050: TAG_member
            AT_sibling(0x00000060)
            AT_name("lo")
            AT_fund_type(FT_unsigned_integer)
            AT_location(<6>OP_CONST(0x4) OP_ADD)
            AT_bit_offset(0x0)
            AT_bit_size(0x4)

0x00000060: TAG_member
            AT_sibling(0x00000070)
            AT_name("hi")
            AT_fund_type(FT_unsigned_integer)
            AT_location(<6>OP_CONST(0x4) OP_ADD)
            AT_bit_offset(0x4)
            AT_bit_size(0x4)

0x00000070: NULL

0x00000100: NULL
"#;

    let lines = rendered(text);
    assert_eq!(
        lines,
        vec![
            "// size: 0x8",
            "struct Value",
            "{",
            "",
            "\tunion",
            "\t{",
            "\t\tint i; // 0x0",
            "\t\tfloat f; // 0x0",
            "\t};",
            "",
            "\tunsigned int lo: 4; // 0x4",
            "\tunsigned int hi: 4; // 0x4",
            "};",
            "",
        ]
    );
}

#[test]
fn test_padding_is_resolved_by_position() {
    let text = r#"DWARF v1 dump - test

0x00000010: TAG_compile_unit
            AT_name("widget.cpp")
            AT_language(LANG_C_PLUS_PLUS)

0x00000020: TAG_class_type
            AT_sibling(0x00000080)
            AT_name("Widget")
            AT_byte_size(0x4)

0x00000030: TAG_padding
            AT_sibling(0x00000040)
            AT_name("mId")
            AT_fund_type(FT_integer)
            AT_location(<6>OP_CONST(0x0) OP_ADD)

0x00000040: TAG_global_subroutine
            AT_sibling(0x00000070)
            AT_name("Draw")
            AT_lo_user("Draw__6WidgetFv")

0x00000050: TAG_formal_parameter
            AT_sibling(0x00000060)
            AT_name("this")
            AT_mod_u_d_type(<5>MOD_pointer_to 0x00000020)

0x00000060: NULL

0x00000070: NULL

0x00000080: TAG_padding
            AT_sibling(0x000000a0)
            AT_name("Init")
            AT_low_pc(0x80003000)
            AT_high_pc(0x80003040)

0x000000a0: TAG_padding
            AT_sibling(0x000000c0)
            AT_name("gState")
            AT_fund_type(FT_integer)

0x000000c0: NULL
"#;

    let analysis = analysis(text);
    let store = &analysis.store;
    assert!(store.iter().all(|tag| tag.kind != TagKind::Padding));
    assert_eq!(store.by_id(0x30).unwrap().kind, TagKind::Member);
    assert_eq!(store.by_id(0x40).unwrap().kind, TagKind::MemberFunc);
    assert!(!store.by_id(0x40).unwrap().is_static);
    assert_eq!(store.by_id(0x80).unwrap().kind, TagKind::GlobalFunc);
    assert_eq!(store.by_id(0xa0).unwrap().kind, TagKind::GlobalVar);

    let generation = generate(&analysis, &config("out"));
    let lines = generation.plan.lines(Path::new("out/widget.cpp")).unwrap();
    let expected = [
        "// size: 0x4",
        "class Widget",
        "{",
        "\tint mId;",
        "",
        "public:",
        "\t// Draw__6WidgetFv",
        "\tvoid Draw();",
        "};",
        "",
        "void Init();",
        "",
        "int gState;",
        "",
    ];
    assert_eq!(lines, expected);
}

#[test]
fn test_repaired_chain_visits_each_tag_once() {
    /* 0x20 and 0x40 both claim 0x50; the run 0x30..0x40 lost its link */
    let text = r#"DWARF v1 dump - test

0x00000010: TAG_compile_unit
            AT_name("stray.c")

0x00000020: TAG_global_variable
            AT_sibling(0x00000050)
            AT_name("a")
            AT_fund_type(FT_integer)

0x00000030: TAG_global_variable
            AT_sibling(0x00000040)
            AT_name("b")
            AT_fund_type(FT_integer)

0x00000040: TAG_global_variable
            AT_sibling(0x00000050)
            AT_name("c")
            AT_fund_type(FT_integer)

0x00000050: TAG_global_variable
            AT_sibling(0x00000060)
            AT_name("d")
            AT_fund_type(FT_integer)

0x00000060: NULL
"#;

    let analysis = analysis(text);
    assert_eq!(analysis.repair.relinked.len(), 1);
    assert_eq!(analysis.repair.relinked[0].left_id, 0x20);
    assert_eq!(analysis.repair.relinked[0].run_start_id, 0x30);

    let unit = &analysis.units[0];
    let mut seen = Vec::new();
    unit.root.walk(&mut |node| seen.push(analysis.store[node.index].id));
    assert_eq!(seen, vec![0x10, 0x20, 0x30, 0x40, 0x50]);
}

#[test]
fn test_forward_references_resolve_after_fixup() {
    let text = r#"DWARF v1 dump - test

0x00000010: TAG_compile_unit
            AT_name("dirty.c")

0x00000020: TAG_structure_type
            AT_sibling(0x00000080)
            AT_name("Node")
            AT_byte_size(0x14)

0x00000030: TAG_member
            AT_sibling(0x00000040)
            AT_name("owner")
            AT_mod_u_d_type(<5>MOD_pointer_to 0x00000080)
            AT_location(<6>OP_CONST(0x0) OP_ADD)

0x00000040: TAG_member
            AT_sibling(0x00000050)
            AT_name("data")
            AT_user_def_type(0x00000080)
            AT_location(<6>OP_CONST(0x4) OP_ADD)

0x00000050: NULL

0x00000080: TAG_structure_type
            AT_sibling(0x00000090)
            AT_name("Data")
            AT_byte_size(0x10)

0x00000090: NULL
"#;

    let parsed = parse(&DumpFile::from_text("test.dump", text)).unwrap();
    assert!(parsed.store.by_id(0x30).unwrap().is_dirty);
    assert!(parsed.store.by_id(0x40).unwrap().is_dirty);

    let analysis = analyze(parsed).unwrap();
    let owner = analysis.store.by_id(0x30).unwrap();
    let data = analysis.store.by_id(0x40).unwrap();
    assert_eq!(owner.size, 4);
    assert_eq!(data.size, 0x10);
    assert!(!owner.is_dirty && !data.is_dirty);
}

#[test]
fn test_pointer_to_member_function_global() {
    let text = r#"DWARF v1 dump - test

0x00000010: TAG_compile_unit
            AT_name("ptm.cpp")
            AT_language(LANG_C_PLUS_PLUS)

0x00000200: TAG_class_type
            AT_sibling(0x00000220)
            AT_name("Foo")
            AT_byte_size(0x4)

0x00000220: TAG_subroutine_type
            AT_sibling(0x00000280)
            AT_fund_type(FT_integer)

0x00000240: TAG_formal_parameter
            AT_sibling(0x00000260)
            AT_fund_type(FT_float)

0x00000260: TAG_formal_parameter
            AT_sibling(0x00000270)
            AT_fund_type(FT_char)

0x00000270: NULL

0x00000280: TAG_ptr_to_member_type
            AT_sibling(0x000002a0)
            AT_containing_type(0x00000200)
            AT_user_def_type(0x00000220)

0x000002a0: TAG_global_variable
            AT_sibling(0x000002c0)
            AT_name("Bar")
            AT_user_def_type(0x00000280)

0x000002c0: NULL
"#;

    let lines = rendered(text);
    assert!(lines.contains(&"int (Foo::*Bar)(float, char);".to_string()));
    assert!(lines.contains(&"class Foo".to_string()));
}

#[test]
fn test_units_sharing_a_path_share_a_file() {
    let text = r#"DWARF v1 dump - test

0x00000010: TAG_compile_unit
            AT_sibling(0x00000100)
            AT_name("C:\build\inc\common.h")

0x00000020: TAG_global_variable
            AT_sibling(0x00000030)
            AT_name("a")
            AT_fund_type(FT_integer)

0x00000030: NULL

0x00000100: TAG_compile_unit
            AT_sibling(0x00005000)
            AT_name("C:\build\inc\common.h")

0x00000110: TAG_global_variable
            AT_sibling(0x00000120)
            AT_name("b")
            AT_fund_type(FT_short)

0x00000120: NULL
"#;

    let dir = TempDir::new().unwrap();
    let analysis = analysis(text);
    /* the last unit's sibling points past the store yet it keeps its tags */
    assert_eq!(analysis.units.len(), 2);
    assert_eq!(analysis.units[1].root.children.len(), 1);

    let generation = generate(&analysis, &config(dir.path()));
    assert_eq!(generation.plan.len(), 1);
    assert_eq!(generation.plan.write_all().unwrap(), 1);

    let written = fs::read_to_string(dir.path().join("inc/common.h")).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines, vec!["int a;", "", delimiter().as_str(), "", "short b;", ""]);
}

#[test]
fn test_failed_unit_does_not_block_others() {
    let text = r#"DWARF v1 dump - test

0x00000010: TAG_compile_unit
            AT_sibling(0x00000100)
            AT_name("good.c")

0x00000020: TAG_global_variable
            AT_sibling(0x00000030)
            AT_name("ok")
            AT_fund_type(FT_integer)

0x00000030: NULL

0x00000100: TAG_compile_unit
            AT_name("bad.c")

0x00000110: TAG_union_type
            AT_sibling(0x00000140)
            AT_name("Mixed")
            AT_byte_size(0x4)

0x00000120: TAG_typedef
            AT_sibling(0x00000130)
            AT_name("inner")
            AT_fund_type(FT_integer)

0x00000130: NULL

0x00000140: NULL
"#;

    let analysis = analysis(text);
    let generation = generate(&analysis, &config("out"));

    assert_eq!(generation.plan.len(), 1);
    assert!(generation.plan.lines(Path::new("out/good.c")).is_some());
    assert_eq!(generation.failures.len(), 1);
    assert_eq!(generation.failures[0].name, "bad.c");
    assert_eq!(generation.failures[0].unit_id, 0x100);
}

#[test]
fn test_missing_type_aborts_analysis() {
    let text = r#"DWARF v1 dump - test

0x00000010: TAG_compile_unit
            AT_name("missing.c")

0x00000020: TAG_global_variable
            AT_sibling(0x00000030)
            AT_name("ghost")
            AT_user_def_type(0x00000999)

0x00000030: NULL
"#;

    let parsed = parse(&DumpFile::from_text("test.dump", text)).unwrap();
    let err = analyze(parsed).unwrap_err();
    assert!(matches!(
        err,
        dwarf1_gen::Error::Fixup(dwarf1_gen::FixupError::UnresolvedType {
            tag_id: 0x20,
            type_id: 0x999
        })
    ));
}

#[test]
fn test_global_of_forward_array_type_is_sized() {
    let text = r#"DWARF v1 dump - test

0x00000008: TAG_compile_unit
            AT_name("array.c")

0x00000010: TAG_array_type
            AT_sibling(0x00000020)
            AT_subscr_data(<12>FT_long[0:3], FMT_ET: AT_user_def_type(0x00000040))

0x00000020: TAG_global_variable
            AT_sibling(0x00000040)
            AT_name("table")
            AT_user_def_type(0x00000010)

0x00000040: TAG_structure_type
            AT_sibling(0x00000060)
            AT_name("Entry")
            AT_byte_size(0x8)

0x00000060: NULL
"#;

    let parsed = parse(&DumpFile::from_text("test.dump", text)).unwrap();
    assert!(parsed.store.by_id(0x20).unwrap().is_dirty);

    let analysis = analyze(parsed).unwrap();
    assert_eq!(analysis.store.by_id(0x10).unwrap().size, 32);
    assert_eq!(analysis.store.by_id(0x20).unwrap().size, 32);
    assert!(analysis.store.iter().all(|tag| !tag.is_dirty));
}
