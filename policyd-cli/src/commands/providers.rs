//! List loaded providers and their policies

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use policyd_api::PolicyKind;

use super::start_engine;
use crate::config::Overrides;

pub fn run(overrides: &Overrides) -> Result<()> {
    let engine = start_engine(overrides)?;
    let report = engine.manager.load_report();
    let policies = engine.manager.policies();

    println!(
        "Provider directory: {}",
        engine.config.provider_dir.display()
    );
    println!(
        "Loaded: {}  Failed: {}  Skipped: {}",
        report.passed, report.failed, report.skipped
    );

    if policies.is_empty() {
        println!();
        println!("No policies available.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Provider").fg(Color::Cyan),
        Cell::new("Policy").fg(Color::Cyan),
        Cell::new("Scope").fg(Color::Cyan),
        Cell::new("Initial").fg(Color::Cyan),
    ]);

    for info in policies {
        let scope = match info.kind {
            PolicyKind::Global => "global",
            PolicyKind::Domain => "domain",
        };
        table.add_row(vec![
            Cell::new(&info.provider),
            Cell::new(&info.name),
            Cell::new(scope),
            Cell::new(info.initial.dump()),
        ]);
    }

    println!("{table}");
    Ok(())
}
