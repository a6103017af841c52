//! Genotype resolution and deduplication.
//!
//! Consumes validated HTMP rows, refines the zygosity into an allele pair
//! state, matches the pair against the genotypes the load itself created
//! earlier, assigns one order number per distinct genotype within the run,
//! and merges rows that differ only in sex.

use std::path::PathBuf;

use clap::Parser;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::common::io::{open_append, tsv_reader, tsv_writer, tsv_writer_append};
use crate::common::{PairState, Sex, Zygosity};
use crate::db::pg::MgdDb;
use crate::db::{GenotypeLookup, GenotypeQuery};
use crate::htmp::HtmpRow;
use crate::report::Reporter;

/// Genotypes of this load are never conditional.
const CONDITIONAL: &str = "no";
/// Every genotype exists as a mouse line.
const EXISTS_AS: &str = "Mouse Line";
/// Compound attribute of every allele pair.
const COMPOUND: &str = "Not Applicable";

/// One genotype-load row.  The genotype ID stays blank when no load-created
/// genotype matched; the downstream genotype loader creates the record then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenotypeLine {
    /// Order number correlating this row with the HTMP-uniq rows.
    pub order: u64,
    /// Existing genotype MGI ID, or blank for a new genotype.
    pub genotype_id: String,
    /// Strain MGI ID.
    pub strain_id: String,
    /// Strain name.
    pub strain_name: String,
    /// Marker MGI ID.
    pub marker_id: String,
    /// First allele MGI ID.
    pub allele_id_1: String,
    /// First mutant cell line ID.
    pub mutant_id_1: String,
    /// Second allele MGI ID.
    pub allele_id_2: String,
    /// Second mutant cell line ID.
    pub mutant_id_2: String,
    /// Conditional flag.
    pub conditional: String,
    /// Exists-as term.
    pub exists_as: String,
    /// General note.
    pub general_note: String,
    /// Private note.
    pub private_note: String,
    /// Resolved allele pair state.
    pub allele_state: String,
    /// Compound attribute.
    pub compound: String,
    /// Creator login.
    pub created_by: String,
}

/// One HTMP row with its genotype order number prepended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmpUniqRow {
    pub order: u64,
    pub phenotyping_center: String,
    pub annotation_center: String,
    pub mutant_id: String,
    pub mp_id: String,
    pub allele_id: String,
    pub allele_state: String,
    pub allele_symbol: String,
    pub marker_id: String,
    pub evidence_code: String,
    pub strain_name: String,
    pub sex: String,
    #[serde(default)]
    pub colony_id: String,
    #[serde(default)]
    pub resource_name: String,
}

impl HtmpUniqRow {
    /// The row as one tab-separated line for the curation log.
    pub fn tsv_line(&self) -> String {
        format!(
            "{}\t{}",
            self.order,
            [
                self.phenotyping_center.as_str(),
                self.annotation_center.as_str(),
                self.mutant_id.as_str(),
                self.mp_id.as_str(),
                self.allele_id.as_str(),
                self.allele_state.as_str(),
                self.allele_symbol.as_str(),
                self.marker_id.as_str(),
                self.evidence_code.as_str(),
                self.strain_name.as_str(),
                self.sex.as_str(),
                self.colony_id.as_str(),
                self.resource_name.as_str(),
            ]
            .join("\t")
        )
    }

    fn new(order: u64, row: &HtmpRow) -> Self {
        Self {
            order,
            phenotyping_center: row.phenotyping_center.clone(),
            annotation_center: row.annotation_center.clone(),
            mutant_id: row.mutant_id.clone(),
            mp_id: row.mp_id.clone(),
            allele_id: row.allele_id.clone(),
            allele_state: row.allele_state.clone(),
            allele_symbol: row.allele_symbol.clone(),
            marker_id: row.marker_id.clone(),
            evidence_code: row.evidence_code.clone(),
            strain_name: row.strain_name.clone(),
            sex: row.sex.clone(),
            colony_id: row.colony_id.clone(),
            resource_name: row.resource_name.clone(),
        }
    }
}

/// Command line arguments for `genotype` sub command.
#[derive(Parser, Debug)]
#[command(about = "Resolve and deduplicate genotypes of HTMP rows", long_about = None)]
pub struct Args {
    /// Path to the HTMP input file.
    #[arg(long, env = "HTMP_INPUT_FILE")]
    pub path_htmp: String,
    /// Path to the duplicate-row output file.
    #[arg(long, env = "HTMPDUP_INPUT_FILE")]
    pub path_dup: PathBuf,
    /// Path to the error file (appended; the preprocess stage owns it).
    #[arg(long, env = "HTMPERROR_INPUT_FILE")]
    pub path_error: PathBuf,
    /// Path to the HTMP-uniq output file.
    #[arg(long, env = "HTMPUNIQ_INPUT_FILE")]
    pub path_uniq: PathBuf,
    /// Path to the genotype-load output file.
    #[arg(long, env = "GENOTYPE_INPUT_FILE")]
    pub path_genotype: PathBuf,
    /// Path to the curation log (appended).
    #[arg(long, env = "LOG_CUR")]
    pub path_log_cur: PathBuf,
    /// Login of the load user; only its genotypes are re-used.
    #[arg(long, env = "CREATEDBY", default_value = crate::common::DEFAULT_CREATED_BY)]
    pub created_by: String,
    /// Connection URL of the curation database.
    #[arg(long, env = "MGD_DBURL")]
    pub database_url: String,
}

/// Main entry point for the `genotype` command.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Starting `genotype`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let mut db = MgdDb::connect(&args.database_url)?;
    let lookup = db.load_genotype_lookup(&args.created_by)?;

    run_with_lookup(args, &lookup)
}

/// The resolved allele pair of one HTMP row.
struct Resolved {
    pair_state: PairState,
    marker_key: i64,
    allele_key: i64,
    mutant_key: Option<i64>,
    strain_key: i64,
    strain_id: String,
    genotype_id: String,
    mutant_id_1: String,
    allele_id_2: String,
    mutant_id_2: String,
}

/// Per-(order, MP term) row group for the sex merge.
#[derive(Debug, Default)]
struct Group {
    sexes: IndexSet<String>,
    last: Option<HtmpRow>,
}

/// Run the stage against a pre-loaded lookup snapshot.
pub fn run_with_lookup(args: &Args, lookup: &GenotypeLookup) -> Result<(), anyhow::Error> {
    let path_htmp = shellexpand::tilde(&args.path_htmp);
    let mut reader = tsv_reader(path_htmp.as_ref())?;
    let mut genotype_writer = tsv_writer(&args.path_genotype)?;
    let mut uniq_writer = tsv_writer(&args.path_uniq)?;
    let mut dup_writer = tsv_writer(&args.path_dup)?;
    let mut error_writer = tsv_writer_append(&args.path_error)?;
    let mut reporter = Reporter::new();

    // order number per distinct genotype identity within this run
    let mut order_by_key: IndexMap<(i64, i64, PairState, i64, Option<i64>), u64> = IndexMap::new();
    // rows per (order, MP term), for the sex merge
    let mut groups: IndexMap<(u64, String), Group> = IndexMap::new();
    let mut next_order: u64 = 1;
    let mut count_dup = 0;

    for record in reader.deserialize() {
        let row: HtmpRow = record?;
        let Some(resolved) = resolve_row(&row, lookup, &mut reporter) else {
            error_writer.serialize(&row)?;
            continue;
        };

        let key = (
            resolved.marker_key,
            resolved.allele_key,
            resolved.pair_state,
            resolved.strain_key,
            resolved.mutant_key,
        );
        let (order, is_dup) = match order_by_key.get(&key) {
            Some(&order) => (order, true),
            None => {
                order_by_key.insert(key, next_order);
                (next_order, false)
            }
        };

        let group = groups.entry((order, row.mp_id.clone())).or_default();
        group.sexes.insert(row.sex.clone());
        group.last = Some(row.clone());

        if is_dup {
            dup_writer.serialize(&row)?;
            count_dup += 1;
            continue;
        }

        genotype_writer.serialize(GenotypeLine {
            order,
            genotype_id: resolved.genotype_id,
            strain_id: resolved.strain_id,
            strain_name: row.strain_name.clone(),
            marker_id: row.marker_id.clone(),
            allele_id_1: row.allele_id.clone(),
            mutant_id_1: resolved.mutant_id_1,
            allele_id_2: resolved.allele_id_2,
            mutant_id_2: resolved.mutant_id_2,
            conditional: CONDITIONAL.to_string(),
            exists_as: EXISTS_AS.to_string(),
            general_note: String::new(),
            private_note: String::new(),
            allele_state: resolved.pair_state.to_string(),
            compound: COMPOUND.to_string(),
            created_by: args.created_by.clone(),
        })?;
        next_order += 1;
    }

    // sex merge per (order, MP term) group; grouping is explicit, duplicate
    // rows need not be adjacent in the input
    for ((order, _mp_id), group) in &groups {
        let Some(row) = &group.last else {
            continue;
        };
        let mut row = HtmpUniqRow::new(*order, row);
        if group.sexes.len() > 1 {
            row.sex = Sex::Both.to_string();
        }
        uniq_writer.serialize(row)?;
    }

    genotype_writer.flush()?;
    uniq_writer.flush()?;
    dup_writer.flush()?;
    error_writer.flush()?;

    let mut log_cur = open_append(&args.path_log_cur)?;
    reporter.write_curation_log("genotype", &mut log_cur)?;

    tracing::info!(
        "{} distinct genotypes, {} duplicate rows, {} rejected rows",
        order_by_key.len(),
        count_dup,
        reporter.total()
    );

    Ok(())
}

/// Verify one HTMP row and refine its allele pair, or report why not.
fn resolve_row(row: &HtmpRow, lookup: &GenotypeLookup, reporter: &mut Reporter) -> Option<Resolved> {
    let line = row.tsv_line();

    let marker = lookup.markers.get(&row.marker_id).or_else(|| {
        reporter.record("markerID", &format!("Marker not in MGI: {}", row.marker_id), &line);
        None
    });
    let allele_key = lookup.alleles.get(&row.allele_id).copied().or_else(|| {
        reporter.record("alleleID", &format!("Allele not in MGI: {}", row.allele_id), &line);
        None
    });

    // a cell line the database does not associate with the allele is not an
    // error; the genotype is created with null cell lines
    let mut mutant_id = row.mutant_id.clone();
    let mutant_key = match lookup.mutant_cell_lines.get(&mutant_id).copied() {
        Some(key) if !mutant_id.is_empty() => Some(key),
        _ => {
            mutant_id.clear();
            None
        }
    };

    // the strain should have been added by the strain load; a miss is
    // logged but the row continues with a blank strain ID
    let strain = lookup.find_strain(&row.strain_name, &row.colony_id);
    if strain.is_none() {
        reporter.record(
            "strainName",
            &format!("Strain not in MGI: {}|{}", row.strain_name, row.colony_id),
            &line,
        );
    }

    let (Some(marker), Some(allele_key)) = (marker, allele_key) else {
        return None;
    };

    let zygosity: Zygosity = match row.allele_state.parse() {
        Ok(zygosity) => zygosity,
        Err(_) => {
            reporter.record(
                "alleleState",
                &format!("Unrecognized allele state {}", row.allele_state),
                &line,
            );
            return None;
        }
    };

    let (pair_state, allele_id_2, mutant_id_2) = match zygosity {
        Zygosity::Homozygous => (PairState::Homozygous, row.allele_id.clone(), mutant_id.clone()),
        Zygosity::Heterozygous => match &marker.wild_type_allele {
            Some(wild_type) if wild_type != &row.allele_id => {
                (PairState::Heterozygous, wild_type.clone(), String::new())
            }
            _ => {
                reporter.record(
                    "wildType",
                    &format!("no wild type allele exists for marker {}", row.marker_id),
                    &line,
                );
                return None;
            }
        },
        Zygosity::Hemizygous => match marker.chromosome.as_str() {
            "X" => (PairState::HemizygousXLinked, String::new(), String::new()),
            "Y" => (PairState::HemizygousYLinked, String::new(), String::new()),
            chromosome => {
                reporter.record(
                    "alleleState",
                    &format!("pair state Hemizygous does not match chromosome {chromosome}"),
                    &line,
                );
                return None;
            }
        },
        Zygosity::Indeterminate => (PairState::Indeterminate, String::new(), String::new()),
    };

    let (strain_key, strain_id) = strain
        .map(|s| (s.key, s.strain_id.clone()))
        .unwrap_or((0, String::new()));

    let genotype_id = lookup
        .find_genotype(&GenotypeQuery {
            marker_key: marker.key,
            allele_key,
            mutant_key,
            pair_state,
            strain_key,
        })
        .map(|g| g.genotype_id.clone())
        .unwrap_or_default();

    Some(Resolved {
        pair_state,
        marker_key: marker.key,
        allele_key,
        mutant_key,
        strain_key,
        strain_id,
        genotype_id,
        mutant_id_1: mutant_id,
        allele_id_2,
        mutant_id_2,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use crate::db::{GenotypeLookup, GenotypeRecord, MarkerInfo, StrainRecord};

    use super::{run_with_lookup, Args, GenotypeLine, HtmpUniqRow};

    fn lookup() -> GenotypeLookup {
        GenotypeLookup {
            markers: HashMap::from([
                (
                    "MGI:6001".to_string(),
                    MarkerInfo {
                        key: 10,
                        chromosome: "5".to_string(),
                        wild_type_allele: Some("MGI:5099".to_string()),
                    },
                ),
                (
                    "MGI:6002".to_string(),
                    MarkerInfo {
                        key: 11,
                        chromosome: "X".to_string(),
                        wild_type_allele: None,
                    },
                ),
                (
                    "MGI:6003".to_string(),
                    MarkerInfo {
                        key: 12,
                        chromosome: "7".to_string(),
                        wild_type_allele: None,
                    },
                ),
            ]),
            alleles: HashMap::from([
                ("MGI:5001".to_string(), 20),
                ("MGI:5002".to_string(), 21),
                ("MGI:5003".to_string(), 22),
            ]),
            mutant_cell_lines: HashMap::from([("CELL01".to_string(), 30)]),
            strains: vec![StrainRecord {
                key: 40,
                name: "StrainX".to_string(),
                strain_id: "MGI:9001".to_string(),
                colony_note: "COL1".to_string(),
            }],
            genotypes: vec![GenotypeRecord {
                genotype_id: "MGI:7777".to_string(),
                marker_key: 10,
                allele_key_1: 20,
                allele_key_2: Some(20),
                mutant_key_1: Some(30),
                mutant_key_2: Some(30),
                pair_state: "Homozygous".to_string(),
                strain_key: 40,
            }],
        }
    }

    fn args(tmp_dir: &std::path::Path, input: &str) -> Args {
        Args {
            path_htmp: input.into(),
            path_dup: tmp_dir.join("dup.tsv"),
            path_error: tmp_dir.join("error.tsv"),
            path_uniq: tmp_dir.join("uniq.tsv"),
            path_genotype: tmp_dir.join("genotype.tsv"),
            path_log_cur: tmp_dir.join("cur.log"),
            created_by: "htmpload".into(),
            database_url: String::new(),
        }
    }

    fn read_genotypes(path: &std::path::Path) -> Result<Vec<GenotypeLine>, anyhow::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .from_path(path)?;
        Ok(reader.deserialize().collect::<Result<Vec<_>, _>>()?)
    }

    fn read_uniq(path: &std::path::Path) -> Result<Vec<HtmpUniqRow>, anyhow::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .flexible(true)
            .from_path(path)?;
        Ok(reader.deserialize().collect::<Result<Vec<_>, _>>()?)
    }

    #[test]
    fn resolves_and_deduplicates_fixture() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let args = args(&tmp_dir, "tests/genotype/htmp.tsv");

        run_with_lookup(&args, &lookup())?;

        let genotypes = read_genotypes(&tmp_dir.join("genotype.tsv"))?;
        let uniq = read_uniq(&tmp_dir.join("uniq.tsv"))?;
        let dup = std::fs::read_to_string(tmp_dir.join("dup.tsv"))?;
        let error = std::fs::read_to_string(tmp_dir.join("error.tsv"))?;

        // fixture rows: Hom female + Hom male (same genotype, same MP term),
        // Het female, Hemi X male, Indeterminate female, Hemi on autosome
        // (error), unknown allele (error)
        assert_eq!(4, genotypes.len());
        assert_eq!(1, dup.lines().count());
        assert_eq!(2, error.lines().count());

        // homozygous: allele 2 mirrors allele 1, cell lines mirror too,
        // and the load-created genotype is re-used
        let hom = &genotypes[0];
        assert_eq!(1, hom.order);
        assert_eq!("MGI:7777", hom.genotype_id);
        assert_eq!(hom.allele_id_1, hom.allele_id_2);
        assert_eq!(hom.mutant_id_1, hom.mutant_id_2);
        assert_eq!("Homozygous", hom.allele_state);
        assert_eq!("MGI:9001", hom.strain_id);

        // heterozygous: allele 2 is the marker's wild type, no cell line 2
        let het = &genotypes[1];
        assert_eq!("MGI:5099", het.allele_id_2);
        assert_ne!(het.allele_id_1, het.allele_id_2);
        assert_eq!("", het.mutant_id_2);
        assert_eq!("", het.genotype_id);

        // hemizygous on chromosome X resolves to the X-linked state
        let hemi = &genotypes[2];
        assert_eq!("Hemizygous X-linked", hemi.allele_state);
        assert_eq!("", hemi.allele_id_2);

        // indeterminate: second allele and cell line absent
        let indet = &genotypes[3];
        assert_eq!("Indeterminate", indet.allele_state);
        assert_eq!("", indet.allele_id_2);
        assert_eq!("", indet.mutant_id_2);

        // the Hom male/female pair merged into one row with sex Both
        let merged = uniq.iter().find(|r| r.order == 1).unwrap();
        assert_eq!("Both", merged.sex);
        // single-sex groups stay untouched
        let het_row = uniq.iter().find(|r| r.order == 2).unwrap();
        assert_eq!("Female", het_row.sex);

        Ok(())
    }

    #[test]
    fn duplicate_rows_reuse_the_first_order_number() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let input = tmp_dir.join("htmp.tsv");
        // same genotype twice with different MP terms, not adjacent to a
        // third row of another genotype
        let rows = "\
WTSI\tWTSI\tCELL01\tMP:0001\tMGI:5001\tHomozygous\tSym<tm1a>\tMGI:6001\tEXP\tStrainX\tFemale\tCOL1\tIMPC
WTSI\tWTSI\t\tMP:0002\tMGI:5002\tIndeterminate\tTwo<em1>\tMGI:6003\tEXP\tStrainX\tMale\tCOL1\tIMPC
WTSI\tWTSI\tCELL01\tMP:0003\tMGI:5001\tHomozygous\tSym<tm1a>\tMGI:6001\tEXP\tStrainX\tMale\tCOL1\tIMPC
";
        std::fs::write(&input, rows)?;
        let args = args(&tmp_dir, input.to_str().unwrap());

        run_with_lookup(&args, &lookup())?;

        let genotypes = read_genotypes(&tmp_dir.join("genotype.tsv"))?;
        assert_eq!(2, genotypes.len());

        let uniq = read_uniq(&tmp_dir.join("uniq.tsv"))?;
        // rows 1 and 3 share order 1 (same genotype), row 2 is order 2;
        // different MP terms keep separate uniq rows with unmerged sex
        let orders = uniq.iter().map(|r| r.order).collect::<Vec<_>>();
        assert!(orders.contains(&1));
        assert!(orders.contains(&2));
        assert_eq!(3, uniq.len());
        assert!(uniq.iter().all(|r| r.sex != "Both"));

        Ok(())
    }

    #[test]
    fn hemizygous_autosome_is_a_hard_error() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let input = tmp_dir.join("htmp.tsv");
        let rows = "\
WTSI\tWTSI\t\tMP:0001\tMGI:5003\tHemizygous\tThree<em1>\tMGI:6003\tEXP\tStrainX\tMale\tCOL1\tIMPC
";
        std::fs::write(&input, rows)?;
        let args = args(&tmp_dir, input.to_str().unwrap());

        run_with_lookup(&args, &lookup())?;

        let genotypes = std::fs::read_to_string(tmp_dir.join("genotype.tsv"))?;
        assert_eq!(0, genotypes.lines().count());
        let error = std::fs::read_to_string(tmp_dir.join("error.tsv"))?;
        assert_eq!(1, error.lines().count());
        let log = std::fs::read_to_string(tmp_dir.join("cur.log"))?;
        assert!(log.contains("does not match chromosome 7"));

        Ok(())
    }

    #[test]
    fn heterozygous_without_wild_type_is_a_hard_error() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let input = tmp_dir.join("htmp.tsv");
        let rows = "\
WTSI\tWTSI\t\tMP:0001\tMGI:5003\tHeterozygous\tThree<em1>\tMGI:6003\tEXP\tStrainX\tFemale\tCOL1\tIMPC
";
        std::fs::write(&input, rows)?;
        let args = args(&tmp_dir, input.to_str().unwrap());

        run_with_lookup(&args, &lookup())?;

        let genotypes = std::fs::read_to_string(tmp_dir.join("genotype.tsv"))?;
        assert_eq!(0, genotypes.lines().count());
        let log = std::fs::read_to_string(tmp_dir.join("cur.log"))?;
        assert!(log.contains("no wild type allele exists"));

        Ok(())
    }

    #[test]
    fn error_file_is_appended_not_truncated() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let input = tmp_dir.join("htmp.tsv");
        let rows = "\
WTSI\tWTSI\t\tMP:0001\tMGI:9999\tHomozygous\tNine<em1>\tMGI:6001\tEXP\tStrainX\tMale\tCOL1\tIMPC
";
        std::fs::write(&input, rows)?;
        let args = args(&tmp_dir, input.to_str().unwrap());
        std::fs::write(&args.path_error, "earlier line\n")?;

        run_with_lookup(&args, &lookup())?;

        let error = std::fs::read_to_string(tmp_dir.join("error.tsv"))?;
        assert_eq!(2, error.lines().count());
        assert!(error.starts_with("earlier line\n"));

        Ok(())
    }
}
