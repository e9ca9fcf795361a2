use crate::error::CliError;
use engine_config::report::StepReport;
use model::progress::ProgressToken;

pub fn reports(tokens: &[ProgressToken]) -> Vec<StepReport> {
    tokens.iter().map(StepReport::from_token).collect()
}

pub fn print_reports(reports: &[StepReport], as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(reports)?);
        return Ok(());
    }
    if reports.is_empty() {
        println!("No progress stored for this run");
        return Ok(());
    }
    for report in reports {
        println!("{report}");
    }
    Ok(())
}
