use colored::Colorize;
use fhirstage_ingest::IngestReport;
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_report(report: &IngestReport) {
    println!("{}", render_report(report));

    if report.malformed > 0 {
        print_warning(&format!(
            "{} malformed record(s) skipped; see warnings in the log",
            report.malformed
        ));
    }
    print_success(&format!(
        "{} ingested into {}",
        report.kind,
        report.kind.table()
    ));
}

pub fn render_report(report: &IngestReport) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Metric", "Value"]);
    builder.push_record(["Resource", report.kind.resource_type()]);
    builder.push_record(["Pages".to_string(), report.pages.to_string()]);
    if let Some(before) = report.resumed_after {
        builder.push_record(["Resumed after page".to_string(), before.to_string()]);
    }
    builder.push_record(["Fetched".to_string(), report.fetched.to_string()]);
    builder.push_record(["Written".to_string(), report.written.to_string()]);
    builder.push_record(["Dropped".to_string(), report.dropped.to_string()]);
    builder.push_record(["Malformed".to_string(), report.malformed.to_string()]);
    builder.push_record(["Duplicates".to_string(), report.duplicates.to_string()]);
    builder.push_record([
        "Last write".to_string(),
        report
            .last_write
            .map_or_else(|| "-".to_string(), |n| n.to_string()),
    ]);
    builder.build().with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirstage_core::ResourceKind;

    #[test]
    fn test_render_report() {
        let mut report = IngestReport::new(ResourceKind::Patient);
        report.pages = 3;
        report.written = 42;
        report.last_write = Some(2);

        let table = render_report(&report);
        assert!(table.contains("Patient"));
        assert!(table.contains("42"));
        assert!(!table.contains("Resumed"));
    }
}
