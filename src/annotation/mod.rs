//! Annotation emission.
//!
//! Joins the genotype IDs resolved by the genotype loader back to the
//! HTMP-uniq rows by order number and emits one MP annotation-load row per
//! (genotype, MP term) pair.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::common::io::{open_append, tsv_reader, tsv_writer};
use crate::common::Sex;
use crate::genotype::HtmpUniqRow;
use crate::report::Reporter;

/// One annotation-load row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationLine {
    /// MP term ID.
    pub mp_id: String,
    /// Genotype MGI ID.
    pub genotype_id: String,
    /// J-number of the load reference.
    pub jnumber: String,
    /// Evidence code.
    pub evidence_code: String,
    /// Inferred-from column.
    pub inferred_from: String,
    /// Qualifier column.
    pub qualifier: String,
    /// Creator login.
    pub created_by: String,
    /// Load date.
    pub load_date: String,
    /// Notes column.
    pub notes: String,
    /// Logical DB column; blank for MGI IDs.
    pub logical_db: String,
    /// Property string.
    pub properties: String,
}

/// Command line arguments for `annotation` sub command.
#[derive(Parser, Debug)]
#[command(about = "Emit MP annotation load rows for resolved genotypes", long_about = None)]
pub struct Args {
    /// Path to the HTMP-uniq input file.
    #[arg(long, env = "HTMPUNIQ_INPUT_FILE")]
    pub path_uniq: String,
    /// Path to the genotype-loader output (order number and genotype ID).
    #[arg(long, env = "GENOTYPELOAD_OUTPUT")]
    pub path_genotypes: String,
    /// Path to the annotation-load output file.
    #[arg(long, env = "ANNOT_INPUT_FILE")]
    pub path_annot: PathBuf,
    /// Path to the curation log (appended).
    #[arg(long, env = "LOG_CUR")]
    pub path_log_cur: PathBuf,
    /// J-number of the load reference.
    #[arg(long, env = "JNUMBER")]
    pub jnumber: String,
    /// Login of the load user.
    #[arg(long, env = "CREATEDBY", default_value = crate::common::DEFAULT_CREATED_BY)]
    pub created_by: String,
}

/// Main entry point for the `annotation` command.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Starting `annotation`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let genotype_ids = read_genotype_ids(&args.path_genotypes)?;
    tracing::debug!("loaded {} genotype IDs", genotype_ids.len());

    let path_uniq = shellexpand::tilde(&args.path_uniq);
    let mut reader = tsv_reader(path_uniq.as_ref())?;
    let mut writer = tsv_writer(&args.path_annot)?;
    let mut reporter = Reporter::new();
    let load_date = crate::common::load_date();

    let (mut count_written, mut count_skipped) = (0, 0);
    for record in reader.deserialize() {
        let row: HtmpUniqRow = record?;

        // rows without an MP annotation carry nothing to load
        if row.mp_id.is_empty() {
            count_skipped += 1;
            continue;
        }

        let Some(genotype_id) = genotype_ids.get(&row.order) else {
            reporter.record(
                "genotypeOrder",
                &format!(
                    "genotype order {} does not exist in {}",
                    row.order, args.path_genotypes
                ),
                &row.tsv_line(),
            );
            continue;
        };
        let sex = match row.sex.parse::<Sex>() {
            Ok(sex) => sex,
            Err(_) => {
                reporter.record(
                    "gender",
                    &format!("Unrecognized sex value {}", row.sex),
                    &row.tsv_line(),
                );
                continue;
            }
        };

        writer.serialize(AnnotationLine {
            mp_id: row.mp_id.clone(),
            genotype_id: genotype_id.clone(),
            jnumber: args.jnumber.clone(),
            evidence_code: row.evidence_code.clone(),
            inferred_from: String::new(),
            qualifier: String::new(),
            created_by: args.created_by.clone(),
            load_date: load_date.clone(),
            notes: String::new(),
            logical_db: String::new(),
            properties: properties(&row, sex),
        })?;
        count_written += 1;
    }
    writer.flush()?;

    let mut log_cur = open_append(&args.path_log_cur)?;
    reporter.write_curation_log("annotation", &mut log_cur)?;

    tracing::info!(
        "wrote {} annotation records, skipped {}, rejected {}",
        count_written,
        count_skipped,
        reporter.total()
    );

    Ok(())
}

/// Read the order-number-to-genotype-ID map from the genotype loader
/// output.
fn read_genotype_ids(path: &str) -> Result<HashMap<u64, String>, anyhow::Error> {
    let path = shellexpand::tilde(path);
    let mut reader = tsv_reader(path.as_ref())?;
    let mut result = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let order = record
            .get(0)
            .unwrap_or_default()
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("invalid genotype order number: {}", e))?;
        result.insert(order, record.get(1).unwrap_or_default().to_string());
    }
    Ok(result)
}

/// Build the annotation property string.
fn properties(row: &HtmpUniqRow, sex: Sex) -> String {
    format!(
        "MP-Sex-Specificity&=&{}&==&Data Interpretation Center&=&{}&==&Phenotyping Center&=&{}&==&Resource Name&=&{}",
        sex.annotation_code(),
        row.annotation_center,
        row.phenotyping_center,
        row.resource_name
    )
}
