use clap::Subcommand;
use serde_json::json;

use super::{open_controller, print_json, CliResult};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's counters
    Today,
    /// The last seven days with totals
    Week,
    /// Clear today's counters and the weekly history
    Reset,
}

pub fn run(action: StatsAction) -> CliResult {
    let mut controller = open_controller();

    match action {
        StatsAction::Today => {
            print_json(&controller.today_statistics())?;
        }
        StatsAction::Week => {
            let days = controller.weekly_statistics();
            let summary = controller.weekly_summary();
            print_json(&json!({ "days": days, "summary": summary }))?;
        }
        StatsAction::Reset => {
            controller.reset_statistics();
            println!("statistics reset");
        }
    }

    controller.dispose();
    Ok(())
}
