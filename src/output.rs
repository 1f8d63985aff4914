//! Drill report output.

use serde::Serialize;

use turnstile_core::error::AppError;

/// Print a report as pretty JSON on stdout.
pub fn print_report<T: Serialize>(report: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}
