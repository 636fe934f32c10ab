//! Administrator management commands

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use super::start_engine;
use crate::config::Overrides;

#[derive(Args)]
pub struct AdminArgs {
    /// Administrator identity
    pub admin: String,
}

#[derive(Args)]
pub struct ActivateArgs {
    /// Administrator identity
    pub admin: String,

    /// Deactivate instead
    #[arg(long)]
    pub off: bool,
}

pub fn list(overrides: &Overrides) -> Result<()> {
    let engine = start_engine(overrides)?;
    let admins = engine.manager.admins()?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Administrator").fg(Color::Cyan),
        Cell::new("Active").fg(Color::Cyan),
        Cell::new("Enrolled").fg(Color::Cyan),
    ]);

    for admin in admins {
        let active = if admin.activated { "yes" } else { "no" };
        table.add_row(vec![
            Cell::new(&admin.name),
            Cell::new(active),
            Cell::new(format_timestamp(admin.enrolled_at)),
        ]);
    }

    println!("{table}");
    Ok(())
}

pub fn enroll(overrides: &Overrides, args: AdminArgs) -> Result<()> {
    let engine = start_engine(overrides)?;
    engine.manager.enroll(&args.admin)?;
    println!("Enrolled '{}'", args.admin);
    Ok(())
}

pub fn disenroll(overrides: &Overrides, args: AdminArgs) -> Result<()> {
    let engine = start_engine(overrides)?;
    engine.manager.disenroll(&args.admin)?;
    println!("Disenrolled '{}'", args.admin);
    Ok(())
}

pub fn activate(overrides: &Overrides, args: ActivateArgs) -> Result<()> {
    let engine = start_engine(overrides)?;
    engine.manager.activate(&args.admin, !args.off)?;
    let state = if args.off { "Deactivated" } else { "Activated" };
    println!("{} '{}'", state, args.admin);
    Ok(())
}

fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
    }
}
