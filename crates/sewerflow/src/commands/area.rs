use anyhow::{bail, Result};
use clap::Args;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use sewerflow_core::hydraulics::{compute_flow, PipeGeometry};

#[derive(Args, Debug)]
pub struct AreaArgs {
    #[arg(long)]
    pub diameter_mm: f64,

    #[arg(long)]
    pub depth_mm: f64,

    /// Mean velocity in m/s; adds the discharge to the output
    #[arg(long)]
    pub velocity: Option<f64>,
}

pub fn handle_area_command(args: &AreaArgs) -> Result<()> {
    if !args.diameter_mm.is_finite() || !args.depth_mm.is_finite() {
        bail!("diameter and depth must be finite numbers");
    }

    let geometry = PipeGeometry::circular(args.diameter_mm);
    let area = geometry.flow_area_m2(args.depth_mm);
    let full = geometry.full_area_m2();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Quantity", "Value"]);
    table.add_row(vec!["Flow area (m²)".to_string(), format!("{area:.6}")]);
    table.add_row(vec!["Full bore (m²)".to_string(), format!("{full:.6}")]);
    if full > 0.0 {
        table.add_row(vec![
            "Fill (%)".to_string(),
            format!("{:.1}", area / full * 100.0),
        ]);
    }
    if let Some(velocity) = args.velocity {
        table.add_row(vec![
            "Flow (m³/s)".to_string(),
            format!("{:.6}", compute_flow(area, velocity)),
        ]);
    }

    println!("{table}");
    Ok(())
}
