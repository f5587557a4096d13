/* List command - print the compilation units of a dump */

use anyhow::Context;
use dwarf1_gen::dwarf1_loader::DumpFile;
use std::path::PathBuf;

pub fn run(dump: PathBuf) -> anyhow::Result<()> {
    let file = DumpFile::load(&dump).with_context(|| format!("failed to load {}", dump.display()))?;
    let units = file.list_compile_units()?;

    for name in &units {
        println!("{}", name);
    }
    eprintln!("[✓] {} compilation unit(s)", units.len());

    Ok(())
}
