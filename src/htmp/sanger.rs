//! Sanger/WTSI source adapter.

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use crate::common::io::{open_append, tsv_reader, tsv_writer};
use crate::common::{Sex, Zygosity, NOT_SPECIFIED};
use crate::htmp::HtmpRow;
use crate::report::Reporter;

/// Centers allowed in the Sanger feed.
const CENTERS: [&str; 2] = ["WTSI", "Europhenome"];

/// Sanger record as read from TSV file; already close to the HTMP shape.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct SangerRecord {
    /// Phenotyping center.
    pub phenotyping_center: String,
    /// Interpretation (annotation) center.
    pub annotation_center: String,
    /// Mutant cell line ID.
    pub mutant_id: String,
    /// MP term ID.
    pub mp_id: String,
    /// Allele MGI ID.
    pub allele_id: String,
    /// Allele state: `Hom`, `Het`, `Hemi` or blank.
    pub allele_state: String,
    /// Allele symbol.
    pub allele_symbol: String,
    /// Marker MGI ID.
    pub marker_id: String,
    /// Evidence code.
    pub evidence_code: String,
    /// Strain name from the provider; replaced by `Not Specified`.
    pub strain_name: String,
    /// Sex.
    pub sex: String,
}

/// Command line arguments for `htmp sanger` sub command.
#[derive(Parser, Debug)]
#[command(about = "Convert Sanger/WTSI export to HTMP format", long_about = None)]
pub struct Args {
    /// Path to the Sanger input file.
    #[arg(long, env = "SOURCE_COPY_INPUT_FILE")]
    pub path_input: String,
    /// Path to the HTMP output file.
    #[arg(long, env = "HTMP_INPUT_FILE")]
    pub path_htmp: PathBuf,
    /// Path to the skip file.
    #[arg(long, env = "HTMPSKIP_INPUT_FILE")]
    pub path_skip: PathBuf,
    /// Path to the error file.
    #[arg(long, env = "HTMPERROR_INPUT_FILE")]
    pub path_error: PathBuf,
    /// Path to the curation log (appended).
    #[arg(long, env = "LOG_CUR")]
    pub path_log_cur: PathBuf,
}

/// Main entry point for the `htmp sanger` command.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Starting `htmp sanger`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let path_input = shellexpand::tilde(&args.path_input);
    let mut reader = tsv_reader(path_input.as_ref())?;
    let mut htmp_writer = tsv_writer(&args.path_htmp)?;
    let mut skip_writer = tsv_writer(&args.path_skip)?;
    let mut error_writer = tsv_writer(&args.path_error)?;
    let mut reporter = Reporter::new();

    let (mut count_written, mut count_skipped) = (0, 0);
    for record in reader.deserialize() {
        let record: SangerRecord = record?;
        let line = tsv_line(&record);

        // "not yet available" alleles and rows without an MP term are
        // expected incompleteness, not errors
        if record.allele_symbol.contains("not yet available") || record.mp_id.is_empty() {
            skip_writer.serialize(&record)?;
            count_skipped += 1;
            continue;
        }

        let mut error = false;
        if !CENTERS.contains(&record.phenotyping_center.as_str()) {
            reporter.record(
                "phenoCtr",
                &format!("Unrecognized phenotyping center {}", record.phenotyping_center),
                &line,
            );
            error = true;
        }
        if !CENTERS.contains(&record.annotation_center.as_str()) {
            reporter.record(
                "annotCtr",
                &format!("Unrecognized annotation center {}", record.annotation_center),
                &line,
            );
            error = true;
        }
        if record.sex.parse::<Sex>().is_err() {
            reporter.record("gender", &format!("Unrecognized sex value {}", record.sex), &line);
            error = true;
        }
        let allele_state = match record.allele_state.parse::<Zygosity>() {
            Ok(state) => state,
            Err(_) => {
                reporter.record(
                    "alleleState",
                    &format!("Unrecognized allele state {}", record.allele_state),
                    &line,
                );
                error = true;
                Zygosity::Indeterminate
            }
        };
        if error {
            error_writer.serialize(&record)?;
            continue;
        }

        htmp_writer.serialize(HtmpRow {
            phenotyping_center: record.phenotyping_center,
            annotation_center: record.annotation_center,
            mutant_id: record.mutant_id,
            mp_id: record.mp_id,
            allele_id: record.allele_id,
            allele_state: allele_state.to_string(),
            allele_symbol: record.allele_symbol,
            marker_id: record.marker_id,
            evidence_code: record.evidence_code,
            strain_name: NOT_SPECIFIED.to_string(),
            sex: record.sex,
            colony_id: String::new(),
            resource_name: String::new(),
        })?;
        count_written += 1;
    }

    htmp_writer.flush()?;
    skip_writer.flush()?;
    error_writer.flush()?;

    let mut log_cur = open_append(&args.path_log_cur)?;
    reporter.write_curation_log("htmp sanger", &mut log_cur)?;

    tracing::info!(
        "wrote {} HTMP records, skipped {}, rejected {}",
        count_written,
        count_skipped,
        reporter.total()
    );

    Ok(())
}

fn tsv_line(record: &SangerRecord) -> String {
    [
        record.phenotyping_center.as_str(),
        record.annotation_center.as_str(),
        record.mutant_id.as_str(),
        record.mp_id.as_str(),
        record.allele_id.as_str(),
        record.allele_state.as_str(),
        record.allele_symbol.as_str(),
        record.marker_id.as_str(),
        record.evidence_code.as_str(),
        record.strain_name.as_str(),
        record.sex.as_str(),
    ]
    .join("\t")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{run, Args};

    #[test]
    fn run_routes_records_to_all_streams() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let args = Args {
            path_input: "tests/htmp/sanger.tsv".into(),
            path_htmp: tmp_dir.join("htmp.tsv"),
            path_skip: tmp_dir.join("skip.tsv"),
            path_error: tmp_dir.join("error.tsv"),
            path_log_cur: tmp_dir.join("cur.log"),
        };

        run(&crate::common::Args::default(), &args)?;

        let htmp = std::fs::read_to_string(tmp_dir.join("htmp.tsv"))?;
        let skip = std::fs::read_to_string(tmp_dir.join("skip.tsv"))?;
        let error = std::fs::read_to_string(tmp_dir.join("error.tsv"))?;
        let log = std::fs::read_to_string(tmp_dir.join("cur.log"))?;

        // fixture: one good Hom row, one good blank-state row, one missing
        // MP term, one "not yet available" symbol, one bad center
        assert_eq!(2, htmp.lines().count());
        assert_eq!(2, skip.lines().count());
        assert_eq!(1, error.lines().count());
        assert!(log.contains("Unrecognized phenotyping center"));

        // allele states are canonicalized, strain is forced
        assert!(htmp.contains("\tHomozygous\t"));
        assert!(htmp.contains("\tIndeterminate\t"));
        assert!(htmp.contains("\tNot Specified\t"));

        Ok(())
    }
}
