/* Generation pipeline
 *
 * parse -> link preparation and chain repair -> unit trees -> fixup ->
 * layout -> emission. A unit whose chains cannot be repaired, whose tree
 * cannot be built or whose declarations cannot be rendered is skipped and
 * reported; fixup problems abort the whole run because fixup works on the
 * shared store.
 */

use crate::codegen::Emitter;
use crate::config::GenConfig;
use crate::error::Error;
use crate::fixup::{self, FixupReport};
use crate::graph::{
    build_unit, link_first_children, repair_stray_chains, terminate_final_unit, unit_positions,
    CompilationUnit, NodeLookup, RepairReport,
};
use crate::layout;
use crate::output::{output_path, OutputPlan};
use dwarf1_loader::{parse, DumpFile, ParseWarning, ParsedDump};
use dwarf1_types::TagStore;
use std::path::Path;
use tracing::{error, info, warn};

/* A compilation unit left out of the output */
#[derive(Debug)]
pub struct UnitFailure {
    pub unit_id: u32,
    pub name: String,
    pub error: Error,
}

/* Repaired store and unit trees, ready for emission */
#[derive(Debug)]
pub struct Analysis {
    pub store: TagStore,
    pub units: Vec<CompilationUnit>,
    pub repair: RepairReport,
    pub fixup: FixupReport,
    pub anon_union_members: usize,
    pub warnings: Vec<ParseWarning>,
    pub failures: Vec<UnitFailure>,
}

impl Analysis {
    pub fn unit_named(&self, name: &str) -> Option<&CompilationUnit> {
        self.units.iter().find(|unit| unit.name == name)
    }
}

#[derive(Debug)]
pub struct Generation {
    pub plan: OutputPlan,
    pub failures: Vec<UnitFailure>,
}

fn unit_name(store: &TagStore, unit_id: u32) -> String {
    store
        .by_id(unit_id)
        .and_then(|tag| tag.name.clone())
        .unwrap_or_else(|| format!("0x{:X}", unit_id))
}

/// Repair, build and fix up every unit of a parsed dump.
pub fn analyze(parsed: ParsedDump) -> Result<Analysis, Error> {
    let ParsedDump {
        mut store,
        units: headers,
        warnings,
    } = parsed;
    info!("analyzing {} tags in {} units", store.len(), headers.len());

    let terminated = terminate_final_unit(&mut store);
    let mut repair = repair_stray_chains(&mut store);
    repair.terminated_units = terminated;
    repair.first_children = link_first_children(&mut store);

    let mut failures = Vec::new();
    for failure in &repair.failures {
        /* a chain outside every unit leaves no unit to skip */
        let Some(unit_id) = failure.unit_id else {
            return Err(failure.error.clone().into());
        };
        failures.push(UnitFailure {
            unit_id,
            name: unit_name(&store, unit_id),
            error: failure.error.clone().into(),
        });
    }

    let mut units = Vec::new();
    for position in unit_positions(&store) {
        let unit_id = store[position].id;
        if repair.failed_unit(unit_id).is_some() {
            warn!("skipping unit {}: chain repair failed", unit_name(&store, unit_id));
            continue;
        }
        match build_unit(&store, position) {
            Ok(unit) => units.push(unit),
            Err(err) => {
                warn!("skipping unit {}: {}", unit_name(&store, unit_id), err);
                failures.push(UnitFailure {
                    unit_id,
                    name: unit_name(&store, unit_id),
                    error: err.into(),
                });
            }
        }
    }

    let fixup = fixup::run(&mut store, &units)?;
    let anon_union_members = layout::mark_anonymous_unions(&mut store, &units);

    info!(
        "{} units built, {} chains relinked, {} units failed",
        units.len(),
        repair.relinked.len(),
        failures.len()
    );

    Ok(Analysis {
        store,
        units,
        repair,
        fixup,
        anon_union_members,
        warnings,
        failures,
    })
}

pub fn load(path: &Path) -> Result<Analysis, Error> {
    let file = DumpFile::load(path)?;
    analyze(parse(&file)?)
}

/// Render every analyzed unit and group the output by file.
pub fn generate(analysis: &Analysis, config: &GenConfig) -> Generation {
    let lookup = NodeLookup::new(&analysis.store, &analysis.units);
    let mut plan = OutputPlan::new();
    let mut failures = Vec::new();

    for (index, unit) in analysis.units.iter().enumerate() {
        let emitted = Emitter::new(&lookup, &analysis.units, index)
            .annotate_params(config.annotate_params)
            .emit_unit();
        match emitted {
            Ok(lines) => {
                let path = output_path(&config.output_dir, &config.strip_prefix, &unit.name);
                plan.add_unit(path, lines);
            }
            Err(err) => {
                error!("cannot render unit {}: {}", unit.name, err);
                failures.push(UnitFailure {
                    unit_id: unit.id(&analysis.store),
                    name: unit.name.clone(),
                    error: err.into(),
                });
            }
        }
    }

    Generation { plan, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    const DUMP: &str = r#"DWARF v1 dump - test.elf

0x00000000: TAG_compile_unit
    AT_sibling(0x00000100)
    AT_name("C:\src\a.c")
    AT_language(LANG_C89)

0x00000010: TAG_global_variable
    AT_sibling(0x00000030)
    AT_name("counter")
    AT_fund_type(FT_integer)
    AT_location(<5>OP_ADDR(0x80001000))

0x00000030: TAG_global_variable
    AT_sibling(0x00000050)
    AT_name("counter")
    AT_fund_type(FT_integer)
    AT_location(<5>OP_ADDR(0x80001004))

0x00000050: NULL
"#;

    fn analysis(text: &str) -> Analysis {
        analyze(parse(&DumpFile::from_text("test.dump", text)).unwrap()).unwrap()
    }

    #[test]
    fn test_analyze_builds_units() {
        let analysis = analysis(DUMP);
        assert_eq!(analysis.units.len(), 1);
        assert_eq!(analysis.repair.terminated_units, 1);
        assert!(analysis.failures.is_empty());
        assert_eq!(analysis.units[0].root.children.len(), 2);
        assert_eq!(analysis.store.by_id(0x30).unwrap().name_str(), "counter_0x30");
    }

    #[test]
    fn test_generate_plans_one_file() {
        let analysis = analysis(DUMP);
        let config = GenConfig {
            output_dir: "out".into(),
            strip_prefix: "C:\\src".into(),
            annotate_params: false,
        };
        let generation = generate(&analysis, &config);
        assert!(generation.failures.is_empty());

        let path = Path::new("out/a.c");
        let lines = generation.plan.lines(path).unwrap();
        assert!(lines.contains(&"int counter;".to_string()));
        assert!(lines.contains(&"int counter_0x30;".to_string()));
    }

    #[test]
    fn test_unrepairable_unit_is_skipped() {
        let text = r#"DWARF v1 dump - test.elf

0x00000000: TAG_compile_unit
    AT_sibling(0x00000100)
    AT_name("bad.c")

0x00000010: TAG_global_variable
    AT_sibling(0x00000040)
    AT_name("a")
    AT_fund_type(FT_integer)

0x00000020: TAG_global_variable
    AT_sibling(0x00000040)
    AT_name("b")
    AT_fund_type(FT_integer)

0x00000030: TAG_global_variable
    AT_sibling(0x00000040)
    AT_name("c")
    AT_fund_type(FT_integer)

0x00000040: NULL
"#;
        let analysis = analysis(text);
        assert!(analysis.units.is_empty());
        assert_eq!(analysis.failures.len(), 1);
        assert_eq!(analysis.failures[0].name, "bad.c");
        assert!(matches!(
            analysis.failures[0].error,
            Error::Graph(GraphError::MalformedChain { target_id: 0x40, predecessors: 3 })
        ));
    }
}
