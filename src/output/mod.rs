//! Run reporting and progress output

mod progress;

pub use progress::spawn_progress_reporter;

use crate::scheduler::RunReport;

/// Prints the final run report to stdout
pub fn print_report(report: &RunReport) {
    println!("=== Crawl Report ===\n");

    if report.cancelled {
        println!("Run was cancelled; counts below are partial.\n");
    }

    println!("Totals:");
    println!("  Discovered (enqueued): {}", report.total_discovered);
    println!("  Attempted (finished):  {}", report.total_finished);
    println!("  Failed:                {}", report.total_failed);
    if report.total_duplicates > 0 {
        println!("  Duplicate discards:    {}", report.total_duplicates);
    }
    println!("  Elapsed:               {:.2?}", report.elapsed);
    println!();

    println!("Per level:");
    for level in &report.levels {
        println!(
            "  level {}: expected {}, finished {}, failed {}",
            level.level, level.expected, level.finished, level.failed
        );
    }
}
