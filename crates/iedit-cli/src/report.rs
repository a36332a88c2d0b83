use iedit_core::{BatchReport, FileReport, WriteResult};

/// Per-unit warnings are already logged as they happen; this prints the outcome
/// of each file and a closing summary.
pub fn print_batch(batch: &BatchReport) {
    for file in &batch.files {
        match &file.result {
            Ok(report) => println!("{}", describe(report)),
            Err(e) => eprintln!("{}: error: {e}", file.path.display()),
        }
    }
    println!(
        "{} file(s), {} written, {} failed, {} warning(s)",
        batch.files.len(),
        batch.written_count(),
        batch.failed_count(),
        batch.warning_count()
    );
}

fn describe(report: &FileReport) -> String {
    let path = report.path.display();
    match &report.outcome {
        WriteResult::Unchanged if report.units == 0 => format!("{path}: empty, skipped"),
        WriteResult::Unchanged => format!(
            "{path}: unchanged ({} unit(s) checked, {} proposal(s))",
            report.submitted, report.proposals
        ),
        WriteResult::Written { backup } => format!(
            "{path}: applied {} of {} proposal(s), backup at {}",
            report.approved,
            report.proposals,
            backup.display()
        ),
    }
}
