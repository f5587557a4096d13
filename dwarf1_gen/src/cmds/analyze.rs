/* Analyze command - print the repaired unit trees of a dump */

use anyhow::{anyhow, Context};
use dwarf1_gen::dwarf1_types::{Language, TagKind, TagStore};
use dwarf1_gen::graph::{CompilationUnit, Node};
use dwarf1_gen::{pipeline, Analysis};
use serde_derive::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct NodeView {
    id: u32,
    kind: TagKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    size: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<NodeView>,
}

impl NodeView {
    fn new(store: &TagStore, node: &Node) -> Self {
        let tag = node.tag(store);
        Self {
            id: tag.id,
            kind: tag.kind,
            name: tag.name.clone(),
            size: tag.size,
            children: node.children.iter().map(|child| NodeView::new(store, child)).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct UnitView {
    name: String,
    language: Language,
    tags: usize,
    tree: NodeView,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct FailureView {
    unit_id: u32,
    name: String,
    error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct AnalysisView {
    units: Vec<UnitView>,
    relinked: usize,
    padding_reclassified: usize,
    anon_union_members: usize,
    warnings: usize,
    failures: Vec<FailureView>,
}

fn unit_view(store: &TagStore, unit: &CompilationUnit) -> UnitView {
    UnitView {
        name: unit.name.clone(),
        language: unit.language,
        tags: unit.root.count(),
        tree: NodeView::new(store, &unit.root),
    }
}

fn print_node(store: &TagStore, node: &Node, depth: usize) {
    let tag = node.tag(store);
    println!(
        "{}0x{:X} {:?} {}",
        "  ".repeat(depth),
        tag.id,
        tag.kind,
        tag.name.as_deref().unwrap_or("")
    );
    for child in &node.children {
        print_node(store, child, depth + 1);
    }
}

fn print_text(analysis: &Analysis, units: &[&CompilationUnit]) {
    for unit in units {
        println!("[~] Unit {} ({:?}, {} tags)", unit.name, unit.language, unit.root.count());
        for child in &unit.root.children {
            print_node(&analysis.store, child, 1);
        }
        println!();
    }

    println!("[~] Repair:");
    println!("    Final units terminated: {}", analysis.repair.terminated_units);
    for relink in &analysis.repair.relinked {
        println!(
            "    0x{:X} -> 0x{:X} (stray run before 0x{:X})",
            relink.left_id, relink.run_start_id, relink.target_id
        );
    }
    println!("[~] Fixup:");
    println!("    Padding reclassified: {}", analysis.fixup.padding_reclassified);
    println!("    Member functions demoted: {}", analysis.fixup.functions_demoted);
    println!("    Dirty sizes resolved: {}", analysis.fixup.dirty_resolved);
    println!(
        "    Names rewritten: {}",
        analysis.fixup.names_rewritten + analysis.fixup.names_disambiguated
    );
    println!("    Anonymous union members: {}", analysis.anon_union_members);

    for failure in &analysis.failures {
        println!("[✗] {} (0x{:X}): {}", failure.name, failure.unit_id, failure.error);
    }
}

pub fn run(dump: PathBuf, unit: Option<String>, json: bool) -> anyhow::Result<()> {
    let analysis =
        pipeline::load(&dump).with_context(|| format!("failed to analyze {}", dump.display()))?;

    let units: Vec<&CompilationUnit> = match &unit {
        Some(name) => vec![analysis
            .unit_named(name)
            .ok_or_else(|| anyhow!("no compilation unit named '{}'", name))?],
        None => analysis.units.iter().collect(),
    };

    if json {
        let view = AnalysisView {
            units: units.iter().map(|unit| unit_view(&analysis.store, unit)).collect(),
            relinked: analysis.repair.relinked.len(),
            padding_reclassified: analysis.fixup.padding_reclassified,
            anon_union_members: analysis.anon_union_members,
            warnings: analysis.warnings.len(),
            failures: analysis
                .failures
                .iter()
                .map(|failure| FailureView {
                    unit_id: failure.unit_id,
                    name: failure.name.clone(),
                    error: failure.error.to_string(),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_text(&analysis, &units);
    }

    Ok(())
}
