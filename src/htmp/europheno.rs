//! Europhenome source adapter.
//!
//! The biomart feed is pre-filtered upstream, so there is no skip or error
//! stream here; the adapter only reshapes records and maps the numeric
//! zygosity column.

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use crate::common::io::{tsv_reader, tsv_writer};
use crate::common::{Zygosity, EVIDENCE_CODE};
use crate::htmp::HtmpRow;

/// Center name stamped into every Europhenome row.
const CENTER: &str = "Europhenome";

/// Europhenome biomart record as read from TSV file.
#[derive(Debug, Deserialize)]
pub struct BiomartRecord {
    /// Mutant cell line ID.
    pub mutant_id: String,
    /// MP term ID.
    pub mp_id: String,
    /// Allele MGI ID.
    pub allele_id: String,
    /// Zygosity digit: 0 het, 1 hom, 2 hemi.
    pub zygosity: String,
    /// Allele symbol.
    pub allele_symbol: String,
    /// Marker MGI ID.
    pub marker_id: String,
    /// Strain MGI ID; not carried into the HTMP row.
    pub strain_id: String,
    /// Sex.
    pub sex: String,
}

/// Command line arguments for `htmp europheno` sub command.
#[derive(Parser, Debug)]
#[command(about = "Convert Europhenome biomart export to HTMP format", long_about = None)]
pub struct Args {
    /// Path to the biomart input file.
    #[arg(long, env = "BIOMART_INPUT_FILE")]
    pub path_input: String,
    /// Path to the HTMP output file.
    #[arg(long, env = "HTMP_INPUT_FILE")]
    pub path_htmp: PathBuf,
}

/// Main entry point for the `htmp europheno` command.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Starting `htmp europheno`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let path_input = shellexpand::tilde(&args.path_input);
    let mut reader = tsv_reader(path_input.as_ref())?;
    let mut writer = tsv_writer(&args.path_htmp)?;

    let mut count_records = 0;
    for record in reader.deserialize() {
        let record: BiomartRecord = record?;
        writer.serialize(htmp_row(&record))?;
        count_records += 1;
    }
    writer.flush()?;
    tracing::info!("wrote {} HTMP records", count_records);

    Ok(())
}

/// Map one biomart record onto the HTMP row shape.
fn htmp_row(record: &BiomartRecord) -> HtmpRow {
    let allele_state = match record.zygosity.as_str() {
        "0" => Zygosity::Heterozygous,
        "1" => Zygosity::Homozygous,
        "2" => Zygosity::Hemizygous,
        _ => Zygosity::Indeterminate,
    };

    HtmpRow {
        phenotyping_center: CENTER.to_string(),
        annotation_center: CENTER.to_string(),
        mutant_id: record.mutant_id.clone(),
        mp_id: record.mp_id.clone(),
        allele_id: record.allele_id.clone(),
        allele_state: allele_state.to_string(),
        allele_symbol: record.allele_symbol.clone(),
        marker_id: record.marker_id.clone(),
        evidence_code: EVIDENCE_CODE.to_string(),
        strain_name: String::new(),
        sex: record.sex.clone(),
        colony_id: String::new(),
        resource_name: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{htmp_row, run, Args, BiomartRecord};

    fn record(zygosity: &str) -> BiomartRecord {
        BiomartRecord {
            mutant_id: "EPD0033_1_A03".into(),
            mp_id: "MP:0001489".into(),
            allele_id: "MGI:4431684".into(),
            zygosity: zygosity.into(),
            allele_symbol: "Lrp1<tm1a(EUCOMM)Wtsi>".into(),
            marker_id: "MGI:96828".into(),
            strain_id: "MGI:3056279".into(),
            sex: "Female".into(),
        }
    }

    #[rstest::rstest]
    #[case("0", "Heterozygous")]
    #[case("1", "Homozygous")]
    #[case("2", "Hemizygous")]
    #[case("", "Indeterminate")]
    #[case("9", "Indeterminate")]
    fn zygosity_digit_mapping(#[case] digit: &str, #[case] expected: &str) {
        let row = htmp_row(&record(digit));
        assert_eq!(expected, row.allele_state);
    }

    #[test]
    fn centers_and_evidence_are_fixed() {
        let row = htmp_row(&record("1"));
        assert_eq!("Europhenome", row.phenotyping_center);
        assert_eq!("Europhenome", row.annotation_center);
        assert_eq!("EXP", row.evidence_code);
        assert_eq!("", row.strain_name);
    }

    #[test]
    fn run_smoke() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let args = Args {
            path_input: "tests/htmp/europheno.tsv".into(),
            path_htmp: tmp_dir.join("htmp.tsv"),
        };

        run(&crate::common::Args::default(), &args)?;

        let output = std::fs::read_to_string(tmp_dir.join("htmp.tsv"))?;
        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(2, lines.len());
        assert!(lines[0].starts_with("Europhenome\tEurophenome\t"));
        assert!(lines[0].contains("\tHeterozygous\t"));

        Ok(())
    }
}
