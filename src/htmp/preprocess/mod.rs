//! Provider preprocessing: IMPC phenotype or LacZ expression documents plus
//! the GENTAR cross reference, normalized into the HTMP load format with
//! strain reconciliation.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use indexmap::{IndexMap, IndexSet};

use crate::common::io::{open_append, open_read_maybe_gz, open_write_maybe_gz, tsv_writer};
use crate::common::{LoadType, Sex, Zygosity, EVIDENCE_CODE};
use crate::db::pg::MgdDb;
use crate::db::{AlleleLookup, CenterLookup, StrainLookup};
use crate::err::ExitStatus;
use crate::htmp::HtmpRow;
use crate::report::Reporter;

use strains::{StrainInfo, StrainOutcome, StrainReconciler};

pub mod input;
pub mod strains;

/// Command line arguments for `htmp preprocess` sub command.
#[derive(Parser, Debug)]
#[command(about = "Convert provider exports to HTMP format", long_about = None)]
pub struct Args {
    /// Load type selecting the provider document flavor.
    #[arg(long, env = "LOADTYPE", value_enum)]
    pub load_type: LoadType,
    /// Path to the provider JSON input file.
    #[arg(long, env = "SOURCE_COPY_INPUT_FILE")]
    pub path_input: String,
    /// Path to the GENTAR cross-reference file.
    #[arg(long, env = "GENTAR_COPY_INPUT_FILE")]
    pub path_gentar: String,
    /// Path to the HTMP output file.
    #[arg(long, env = "HTMP_INPUT_FILE")]
    pub path_htmp: PathBuf,
    /// Path to the strain-load output file.
    #[arg(long, env = "STRAIN_INPUT_FILE")]
    pub path_strain: PathBuf,
    /// Path to the skip file.
    #[arg(long, env = "HTMPSKIP_INPUT_FILE")]
    pub path_skip: PathBuf,
    /// Path to the error file.
    #[arg(long, env = "HTMPERROR_INPUT_FILE")]
    pub path_error: PathBuf,
    /// Path to the curation log (appended).
    #[arg(long, env = "LOG_CUR")]
    pub path_log_cur: PathBuf,
    /// Reference strain configuration entries.
    #[arg(long, env = "STRAIN_INFO")]
    pub strain_info: String,
    /// Login of the load user.
    #[arg(long, env = "CREATEDBY", default_value = crate::common::DEFAULT_CREATED_BY)]
    pub created_by: String,
    /// Connection URL of the curation database.
    #[arg(long, env = "MGD_DBURL")]
    pub database_url: String,
}

/// Main entry point for the `htmp preprocess` command.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<ExitStatus, anyhow::Error> {
    tracing::info!("Starting `htmp preprocess`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let mut db = MgdDb::connect(&args.database_url)?;
    let alleles = db.load_allele_lookup()?;
    let centers = db.load_center_lookup()?;
    let strains = db.load_strain_lookup()?;
    let strain_info = StrainInfo::parse(&args.strain_info)?;

    run_with_lookups(args, &alleles, &centers, &strains, &strain_info)
}

/// Run the stage against pre-loaded lookup tables.
pub fn run_with_lookups(
    args: &Args,
    alleles: &AlleleLookup,
    centers: &CenterLookup,
    strains: &StrainLookup,
    strain_info: &StrainInfo,
) -> Result<ExitStatus, anyhow::Error> {
    let gentar = input::parse_gentar(shellexpand::tilde(&args.path_gentar).as_ref())?;

    // phase 1: parse, skip incomplete records, collapse duplicates
    let path_input = shellexpand::tilde(&args.path_input).into_owned();
    let reader = open_read_maybe_gz(&path_input)?;
    let parsed = match args.load_type {
        LoadType::Impc => input::parse_impc(reader)?,
        LoadType::Lacz => input::parse_lacz(reader)?,
    };

    let mut skip_file = open_write_maybe_gz(&args.path_skip)?;
    let mut dup_file = open_write_maybe_gz(format!("{path_input}_dup"))?;
    let mut records = IndexSet::new();
    let (mut count_skipped, mut count_dup) = (0, 0);
    for rec in parsed {
        if !rec.required_complete(args.load_type) {
            writeln!(skip_file, "{}", rec.tsv_line())?;
            count_skipped += 1;
            continue;
        }
        if !records.insert(rec.clone()) {
            writeln!(dup_file, "{}", rec.tsv_line())?;
            count_dup += 1;
        }
    }
    skip_file.flush()?;
    dup_file.flush()?;
    tracing::info!(
        "{} unique records ({} skipped, {} duplicates)",
        records.len(),
        count_skipped,
        count_dup
    );

    // phase 2: validate and reconcile
    let mut reporter = Reporter::new();
    let mut error_file = open_write_maybe_gz(&args.path_error)?;
    let mut reconciler = StrainReconciler::new(centers, strains, strain_info, &args.created_by);
    // rows keyed by (strain, colony) so conflicted pairs can be withheld
    let mut htmp_rows: IndexMap<(String, String), Vec<HtmpRow>> = IndexMap::new();

    for rec in &records {
        let line = rec.tsv_line();

        let mut error = false;
        let allele_state = match rec.allele_state.parse::<Zygosity>() {
            Ok(state) => state,
            Err(_) => {
                reporter.record(
                    "alleleState",
                    &format!("Unrecognized allele state {}", rec.allele_state),
                    &line,
                );
                error = true;
                Zygosity::Indeterminate
            }
        };
        let sex = match rec.sex.parse::<Sex>() {
            Ok(sex) => sex,
            Err(_) => {
                reporter.record("gender", &format!("Unrecognized sex value {}", rec.sex), &line);
                error = true;
                Sex::Unknown
            }
        };
        if !centers.phenotyping.contains(&rec.phenotyping_center) {
            reporter.record(
                "phenoCtr",
                &format!("Unrecognized phenotyping center {}", rec.phenotyping_center),
                &line,
            );
            error = true;
        }
        if error {
            writeln!(error_file, "{line}")?;
            continue;
        }

        // cross reference against GENTAR: colony must be registered and the
        // marker must agree; GENTAR supplies production center and cell line
        let Some(gentar_info) = gentar.get(&rec.colony_id) else {
            reporter.record(
                "colonyID",
                &format!("No GENTAR colony id for {}", rec.colony_id),
                &line,
            );
            writeln!(error_file, "{line}")?;
            continue;
        };
        if rec.marker_id != gentar_info.marker_id {
            reporter.record(
                "noMrkIdMatch",
                &format!(
                    "No Marker ID match. IMPC: {} GENTAR: {}",
                    rec.marker_id, gentar_info.marker_id
                ),
                &line,
            );
            writeln!(error_file, "{line}")?;
            continue;
        }
        let mut rec = rec.clone();
        rec.production_center = gentar_info.production_center.clone();
        rec.mutant_id = gentar_info.mutant_id.clone();

        // allele identity and consistency against the database snapshot
        match alleles.alleles.get(&rec.allele_id) {
            Some(db_allele) => {
                if rec.allele_symbol != db_allele.symbol {
                    reporter.record(
                        "alleleNotMatch",
                        &format!(
                            "Allele Symbol: {} does not match MGI symbol: {}",
                            rec.allele_symbol, db_allele.symbol
                        ),
                        &line,
                    );
                    error = true;
                }
                if rec.marker_id != db_allele.marker_id {
                    reporter.record(
                        "markerNotMatch",
                        &format!(
                            "Marker ID: {} does not match MGI marker ID: {}",
                            rec.marker_id, db_allele.marker_id
                        ),
                        &line,
                    );
                    error = true;
                }
                if !rec.mutant_id.is_empty() && !db_allele.mutant_ids.contains(&rec.mutant_id) {
                    match alleles.mcl_alleles.get(&rec.mutant_id) {
                        Some(symbols) if !symbols.contains(&rec.allele_symbol) => {
                            reporter.record(
                                "mclDiffAllele",
                                &format!(
                                    "Mutant ID: {} is associated with different allele(s) in the \
                                     database. Incoming allele: {}, DB Allele(s) {}",
                                    rec.mutant_id,
                                    rec.allele_symbol,
                                    symbols.join(", ")
                                ),
                                &line,
                            );
                            error = true;
                        }
                        _ => {
                            // unknown for this allele but unclaimed: load
                            // the genotype with a null cell line
                            reporter.record(
                                "mutIdNotAssoc",
                                &format!(
                                    "Mutant ID: {} is not associated with {} in MGI, loading data \
                                     with null MCL",
                                    rec.mutant_id, rec.allele_id
                                ),
                                &line,
                            );
                            rec.mutant_id.clear();
                        }
                    }
                }
            }
            None => {
                reporter.record(
                    "alleleNotInDb",
                    &format!("Allele not in MGI: {}", rec.allele_id),
                    &line,
                );
                error = true;
            }
        }
        if error {
            writeln!(error_file, "{line}")?;
            continue;
        }

        let strain_name = match reconciler.resolve(&rec, &line, &mut reporter) {
            StrainOutcome::Resolved(name) => name,
            StrainOutcome::Rejected => continue,
        };

        htmp_rows
            .entry((strain_name.clone(), rec.colony_id.clone()))
            .or_default()
            .push(HtmpRow {
                phenotyping_center: rec.phenotyping_center.clone(),
                annotation_center: rec.interpretation_center.clone(),
                mutant_id: rec.mutant_id.clone(),
                mp_id: rec.mp_id.clone(),
                allele_id: rec.allele_id.clone(),
                allele_state: allele_state.to_string(),
                allele_symbol: rec.allele_symbol.clone(),
                marker_id: rec.marker_id.clone(),
                evidence_code: EVIDENCE_CODE.to_string(),
                strain_name,
                sex: sex.to_string(),
                colony_id: rec.colony_id.clone(),
                resource_name: rec.resource_name.clone(),
            });
    }

    // phase 3: deferred reconciliation reports, strain and HTMP files
    let summary = reconciler.finish(&mut reporter);
    for line in &summary.error_lines {
        writeln!(error_file, "{line}")?;
    }
    error_file.flush()?;

    let mut strain_writer = tsv_writer(&args.path_strain)?;
    for strain_line in &summary.strain_lines {
        strain_writer.serialize(strain_line)?;
    }
    strain_writer.flush()?;

    let mut htmp_writer = tsv_writer(&args.path_htmp)?;
    let mut count_written = 0;
    for ((strain, colony), rows) in &htmp_rows {
        if summary.excluded.contains(&(strain.clone(), colony.clone())) {
            continue;
        }
        for row in rows {
            htmp_writer.serialize(row)?;
            count_written += 1;
        }
    }
    htmp_writer.flush()?;

    let mut log_cur = open_append(&args.path_log_cur)?;
    reporter.write_curation_log("htmp preprocess", &mut log_cur)?;

    tracing::info!(
        "wrote {} HTMP records and {} strains; {} error records",
        count_written,
        summary.strain_lines.len(),
        reporter.total()
    );

    Ok(if summary.conflict {
        ExitStatus::NewStrainConflict
    } else {
        ExitStatus::Clean
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use pretty_assertions::assert_eq;

    use crate::common::LoadType;
    use crate::db::{AlleleInfo, AlleleLookup, CenterLookup, StrainLookup};
    use crate::err::ExitStatus;

    use super::strains::StrainInfo;
    use super::{run_with_lookups, Args};

    const STRAIN_INFO: &str =
        "C57BL/6N|MGI:2159965|C57BL/6N|%s-%s/%s|coisogenic|chromosome aberration:mutant strain";

    fn args(tmp_dir: &std::path::Path, load_type: LoadType, input: &str) -> Args {
        Args {
            load_type,
            path_input: input.into(),
            path_gentar: "tests/preprocess/gentar.tsv".into(),
            path_htmp: tmp_dir.join("htmp.tsv"),
            path_strain: tmp_dir.join("strain.tsv"),
            path_skip: tmp_dir.join("skip.tsv"),
            path_error: tmp_dir.join("error.tsv"),
            path_log_cur: tmp_dir.join("cur.log"),
            strain_info: STRAIN_INFO.into(),
            created_by: "htmpload".into(),
            database_url: String::new(),
        }
    }

    fn alleles() -> AlleleLookup {
        AlleleLookup {
            alleles: HashMap::from([
                (
                    "MGI:5001".to_string(),
                    AlleleInfo {
                        symbol: "Sym<tm1a>".to_string(),
                        marker_id: "MGI:6001".to_string(),
                        mutant_ids: vec!["EPD001".to_string()],
                    },
                ),
                (
                    "MGI:5002".to_string(),
                    AlleleInfo {
                        symbol: "Two<em1>".to_string(),
                        marker_id: "MGI:6002".to_string(),
                        mutant_ids: vec!["EPD002".to_string()],
                    },
                ),
            ]),
            mcl_alleles: HashMap::from([
                ("EPD001".to_string(), vec!["Sym<tm1a>".to_string()]),
                ("EPD002".to_string(), vec!["Two<em1>".to_string()]),
            ]),
        }
    }

    fn centers() -> CenterLookup {
        CenterLookup {
            lab_codes: HashMap::from([("WTSI".to_string(), "Wtsi".to_string())]),
            phenotyping: HashSet::from(["WTSI".to_string(), "MRC Harwell".to_string()]),
        }
    }

    #[test]
    fn run_impc_end_to_end() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let args = args(&tmp_dir, LoadType::Impc, "tests/preprocess/impc.json");
        // input file is copied so the derived dup file lands in the tmp dir
        let input = tmp_dir.join("impc.json");
        std::fs::copy("tests/preprocess/impc.json", &input)?;
        let args = Args {
            path_input: input.to_str().unwrap().to_string(),
            ..args
        };

        let status = run_with_lookups(
            &args,
            &alleles(),
            &centers(),
            &StrainLookup::default(),
            &StrainInfo::parse(STRAIN_INFO)?,
        )?;
        assert_eq!(ExitStatus::Clean, status);

        let htmp = std::fs::read_to_string(tmp_dir.join("htmp.tsv"))?;
        let skip = std::fs::read_to_string(tmp_dir.join("skip.tsv"))?;
        let error = std::fs::read_to_string(tmp_dir.join("error.tsv"))?;
        let strain = std::fs::read_to_string(tmp_dir.join("strain.tsv"))?;
        let dup = std::fs::read_to_string(tmp_dir.join("impc.json_dup"))?;

        // fixture: 5 good docs (one a duplicate, one with an unregistered
        // colony, one with a zygosity typo) plus one missing its MP term
        assert_eq!(2, htmp.lines().count());
        assert_eq!(1, skip.lines().count());
        assert_eq!(1, dup.lines().count());
        // unregistered colony and bad zygosity
        assert_eq!(2, error.lines().count());
        // both good rows share one constructed strain and colony
        assert_eq!(1, strain.lines().count());
        assert!(strain.starts_with("C57BL/6N-Sym<tm1a>/Wtsi\tMGI:5001\tcoisogenic"));

        // zygosity and sex are canonicalized, GENTAR supplies the cell line
        assert!(htmp.contains("\tHomozygous\t"));
        assert!(htmp.contains("\tHeterozygous\t"));
        assert!(htmp.contains("\tEPD001\t"));

        let log = std::fs::read_to_string(tmp_dir.join("cur.log"))?;
        assert!(log.contains("No GENTAR colony id for COLX"));
        assert!(log.contains("Unrecognized allele state"));

        Ok(())
    }

    #[test]
    fn multi_colony_new_strain_exits_with_conflict() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let input = tmp_dir.join("impc.json");
        std::fs::copy("tests/preprocess/impc_multi_colony.json", &input)?;
        let args = Args {
            path_input: input.to_str().unwrap().to_string(),
            ..args(&tmp_dir, LoadType::Impc, "")
        };

        let status = run_with_lookups(
            &args,
            &alleles(),
            &centers(),
            &StrainLookup::default(),
            &StrainInfo::parse(STRAIN_INFO)?,
        )?;
        assert_eq!(ExitStatus::NewStrainConflict, status);

        // the strain is persisted once, with one arbitrary colony note
        let strain = std::fs::read_to_string(tmp_dir.join("strain.tsv"))?;
        assert_eq!(1, strain.lines().count());
        // no annotations survive for the conflicted strain
        let htmp = std::fs::read_to_string(tmp_dir.join("htmp.tsv"))?;
        assert_eq!(0, htmp.lines().count());
        let log = std::fs::read_to_string(tmp_dir.join("cur.log"))?;
        assert!(log.contains("New strain with multiple Colony IDs"));

        Ok(())
    }
}
