//! Policy value commands

use anyhow::{Result, anyhow};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use policyd_api::{PolicyValue, Scope};

use super::start_engine;
use crate::config::Overrides;

#[derive(Args)]
pub struct SetArgs {
    /// Policy name
    pub policy: String,

    /// New value, e.g. `0`, `true` or `int:8`
    pub value: String,

    /// Administrator submitting the value
    #[arg(long)]
    pub admin: String,

    /// Domain (uid) for per-domain policies
    #[arg(long)]
    pub domain: Option<u32>,
}

#[derive(Args)]
pub struct GetArgs {
    /// Policy name
    pub policy: String,

    /// Domain (uid) for per-domain policies
    #[arg(long)]
    pub domain: Option<u32>,
}

#[derive(Args)]
pub struct GetAllArgs {
    /// List per-domain policies for this uid instead of global ones
    #[arg(long)]
    pub domain: Option<u32>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

fn scope_of(domain: Option<u32>) -> Scope {
    domain.map_or(Scope::Global, Scope::Domain)
}

pub fn set(overrides: &Overrides, args: SetArgs) -> Result<()> {
    let engine = start_engine(overrides)?;
    let model = engine
        .manager
        .model(&args.policy)
        .ok_or_else(|| anyhow!("Unknown policy: {}", args.policy))?;
    let value = PolicyValue::parse_like(model.initial(), &args.value)?;
    let scope = scope_of(args.domain);

    engine
        .manager
        .set_scoped(&args.policy, scope, value, &args.admin)?;
    let effective = engine.manager.get_scoped(&args.policy, scope)?;
    println!("{} = {} (effective)", args.policy, effective);
    Ok(())
}

pub fn get(overrides: &Overrides, args: GetArgs) -> Result<()> {
    let engine = start_engine(overrides)?;
    let value = engine
        .manager
        .get_scoped(&args.policy, scope_of(args.domain))?;
    println!("{}", value);
    Ok(())
}

pub fn get_all(overrides: &Overrides, args: GetAllArgs) -> Result<()> {
    let engine = start_engine(overrides)?;
    let values = match args.domain {
        Some(uid) => engine.manager.get_all_in(uid)?,
        None => engine.manager.get_all()?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    if values.is_empty() {
        println!("No policies available.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Policy").fg(Color::Cyan),
        Cell::new("Value").fg(Color::Cyan),
        Cell::new("Type").fg(Color::Cyan),
    ]);
    for (policy, value) in &values {
        table.add_row(vec![
            Cell::new(policy),
            Cell::new(value.to_string()),
            Cell::new(value.kind().as_str()),
        ]);
    }

    println!("{table}");
    Ok(())
}
