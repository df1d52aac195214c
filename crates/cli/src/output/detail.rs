//! Summary output for a finished leverage loop.

use colored::Colorize;
use lendloop_core::{format_units, LoopReport, LoopTermination};

use super::table::format_bps;

fn format_termination(termination: LoopTermination) -> String {
    let label = termination.to_string();
    match termination {
        LoopTermination::TargetReached => label.green().bold().to_string(),
        LoopTermination::IterationsExhausted | LoopTermination::BelowDust => {
            label.yellow().bold().to_string()
        }
        LoopTermination::BorrowRejected => label.red().bold().to_string(),
    }
}

pub fn format_loop_summary(report: &LoopReport, symbol: &str, decimals: u8) -> String {
    let mut output = String::new();

    // Header
    output.push_str(&format!("{}\n", "=".repeat(60)));
    output.push_str(&format!("{}\n", format!("Leverage loop: {}", symbol).bold()));
    output.push_str(&format!("{}\n\n", "=".repeat(60)));

    output.push_str(&format!("{}\n", "Run".cyan().bold()));
    output.push_str(&format!("  Account:     {}\n", report.account));
    output.push_str(&format!("  Asset:       {}\n", report.asset));
    output.push_str(&format!("  Iterations:  {}\n", report.iterations));
    output.push_str(&format!("  Termination: {}\n\n", format_termination(report.termination)));

    output.push_str(&format!("{}\n", "Totals".cyan().bold()));
    output.push_str(&format!(
        "  Seeded:      {} {}\n",
        format_units(report.seeded, decimals),
        symbol
    ));
    output.push_str(&format!(
        "  Borrowed:    {} {}\n",
        format_units(report.total_borrowed, decimals),
        symbol
    ));
    output.push_str(&format!(
        "  Redeposited: {} {}\n\n",
        format_units(report.total_redeposited, decimals),
        symbol
    ));

    output.push_str(&format!("{}\n", "Final Position".cyan().bold()));
    output.push_str(&format!(
        "  Supplied:    {} {}\n",
        format_units(report.final_supply, decimals),
        symbol
    ));
    output.push_str(&format!(
        "  Borrowed:    {} {}\n",
        format_units(report.final_borrow, decimals),
        symbol
    ));
    output.push_str(&format!("  LTV:         {}\n", format_bps(report.final_ltv_bps())));

    output
}
