//! Strain loading.
//!
//! Reads the strain-load file written by the preprocess stage, verifies
//! each record against the vocabulary snapshots, and writes one bulk table
//! file per target table.  `load` mode additionally copies the files into
//! the database and advances the accession maximum; `preview` stops after
//! writing the files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::common::io::{open_append, tsv_reader};
use crate::common::StrainMode;
use crate::db::pg::MgdDb;
use crate::db::StrainVocab;
use crate::htmp::preprocess::strains::StrainLine;

/// MGI type key of strains.
const MGITYPE_STRAIN: i32 = 10;
/// Note type key of the colony-ID note.
const NOTETYPE_COLONY_ID: i32 = 1012;
/// Note type key of the mutant-cell-line-of-origin note.
const NOTETYPE_MUTANT_ORIGIN: i32 = 1038;
/// Annotation type key of strain attributes.
const ANNOTTYPE_STRAIN_ATTR: i32 = 1009;
/// The null qualifier of strain attribute annotations.
const QUALIFIER_NULL: i32 = 1614158;
/// Strain/marker qualifier: nomenclature.
const QUALIFIER_NOMENCLATURE: i32 = 615427;

/// Target tables, in copy order.
const TABLES: [&str; 5] = [
    "PRB_Strain",
    "PRB_Strain_Marker",
    "ACC_Accession",
    "VOC_Annot",
    "MGI_Note",
];

/// Command line arguments for `strains load` sub command.
#[derive(Parser, Debug)]
#[command(about = "Load new strains from the strain-load file", long_about = None)]
pub struct Args {
    /// Path to the strain-load input file.
    #[arg(long, env = "STRAIN_INPUT_FILE")]
    pub path_input: String,
    /// Directory receiving the bulk table files.
    #[arg(long, env = "OUTPUTDIR")]
    pub path_output: PathBuf,
    /// Directory receiving the error report.
    #[arg(long, env = "LOGDIR")]
    pub path_log: PathBuf,
    /// Processing mode.
    #[arg(long, env = "STRAINMODE", value_enum)]
    pub mode: StrainMode,
    /// Connection URL of the curation database.
    #[arg(long, env = "MGD_DBURL")]
    pub database_url: String,
}

/// What the table-file pass produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    /// New strain records.
    pub strains: u64,
    /// MGI accession IDs allocated.
    pub accessions: u64,
    /// Colony notes attached to already-existing strains.
    pub notes_attached: u64,
    /// Records rejected by verification.
    pub errors: u64,
}

/// Main entry point for the `strains load` command.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Starting `strains load`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let mut db = MgdDb::connect(&args.database_url)?;
    let vocab = db.load_strain_vocab()?;

    let file_name = Path::new(&args.path_input)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "strainload".to_string());
    let mut error_file = open_append(args.path_log.join(format!("{file_name}.error")))?;

    let counts = write_table_files(&args.path_input, &vocab, &args.path_output, &mut error_file)?;
    error_file.flush()?;
    tracing::info!(
        "{} new strains, {} accession IDs, {} colony notes attached, {} rejected",
        counts.strains,
        counts.accessions,
        counts.notes_attached,
        counts.errors
    );

    if let StrainMode::Load = args.mode {
        for table in TABLES {
            db.bulk_copy(table, &args.path_output.join(format!("{table}.bcp")))?;
        }
        db.set_accession_max(counts.accessions as i64)?;
    } else {
        tracing::info!("preview mode, nothing copied");
    }

    Ok(())
}

/// Open table files for writing.
struct TableFiles {
    strain: BufWriter<File>,
    marker: BufWriter<File>,
    accession: BufWriter<File>,
    annot: BufWriter<File>,
    note: BufWriter<File>,
}

impl TableFiles {
    fn create(dir: &Path) -> Result<Self, anyhow::Error> {
        let open = |table: &str| -> Result<BufWriter<File>, anyhow::Error> {
            Ok(BufWriter::new(File::create(dir.join(format!("{table}.bcp")))?))
        };
        Ok(Self {
            strain: open("PRB_Strain")?,
            marker: open("PRB_Strain_Marker")?,
            accession: open("ACC_Accession")?,
            annot: open("VOC_Annot")?,
            note: open("MGI_Note")?,
        })
    }

    fn flush(&mut self) -> Result<(), anyhow::Error> {
        self.strain.flush()?;
        self.marker.flush()?;
        self.accession.flush()?;
        self.annot.flush()?;
        self.note.flush()?;
        Ok(())
    }
}

/// Verify the strain-load records and write the bulk table files.
pub fn write_table_files(
    path_input: &str,
    vocab: &StrainVocab,
    output_dir: &Path,
    error_file: &mut dyn Write,
) -> Result<Counts, anyhow::Error> {
    let date = crate::common::load_date();
    let mut keys = vocab.max_keys;
    let mut files = TableFiles::create(output_dir)?;
    let mut counts = Counts::default();

    let path_input = shellexpand::tilde(path_input);
    let mut reader = tsv_reader(path_input.as_ref())?;
    for (index, record) in reader.deserialize().enumerate() {
        let line_num = index + 1;
        let record: StrainLine = record?;

        let user_key = match vocab.users.get(&record.created_by) {
            Some(&key) => key,
            None => {
                writeln!(error_file, "Invalid User ({}) {}", line_num, record.created_by)?;
                counts.errors += 1;
                continue;
            }
        };

        // an existing strain only receives its colony-ID note, and only
        // when it has none yet
        if let Some(&existing_key) = vocab.strains.get(&record.strain_name) {
            writeln!(
                error_file,
                "Strain Already Exists ({}) {}",
                line_num, record.strain_name
            )?;
            if !vocab.colony_noted.contains(&existing_key) && !record.colony_note.is_empty() {
                write_note(
                    &mut files.note,
                    &mut keys.note,
                    existing_key,
                    NOTETYPE_COLONY_ID,
                    &record.colony_note,
                    user_key,
                    &date,
                )?;
                counts.notes_attached += 1;
            }
            continue;
        }

        let strain_type_key = vocab.strain_types.get(&record.strain_type);
        if strain_type_key.is_none() {
            writeln!(
                error_file,
                "Invalid Strain Type ({}) {}",
                line_num, record.strain_type
            )?;
        }
        let species_key = vocab.species.get(&record.species);
        if species_key.is_none() {
            writeln!(error_file, "Invalid Species ({}) {}", line_num, record.species)?;
        }
        let (Some(&strain_type_key), Some(&species_key)) = (strain_type_key, species_key) else {
            counts.errors += 1;
            continue;
        };

        writeln!(
            files.strain,
            "{}\t{}\t{}\t{}\t{}\t0\t0\t{}\t{}\t{}\t{}",
            keys.strain,
            species_key,
            strain_type_key,
            record.strain_name,
            record.standard,
            user_key,
            user_key,
            date,
            date
        )?;

        // resolve each associated allele to its marker
        for allele_id in record.allele_id.split('|').filter(|s| !s.is_empty()) {
            let Some(&(allele_key, marker_key)) = vocab.allele_markers.get(allele_id) else {
                writeln!(error_file, "Invalid Allele ({}) {}", line_num, allele_id)?;
                continue;
            };
            writeln!(
                files.marker,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                keys.strain_marker,
                keys.strain,
                marker_key,
                allele_key,
                QUALIFIER_NOMENCLATURE,
                user_key,
                user_key,
                date,
                date
            )?;
            keys.strain_marker += 1;
        }

        if record.standard == "1" {
            writeln!(
                files.accession,
                "{}\tMGI:{}\tMGI:\t{}\t1\t{}\t{}\t0\t1\t{}\t{}\t{}\t{}",
                keys.accession,
                keys.mgi_id,
                keys.mgi_id,
                keys.strain,
                MGITYPE_STRAIN,
                user_key,
                user_key,
                date,
                date
            )?;
            keys.accession += 1;
            counts.accessions += 1;
        }

        if !record.colony_note.is_empty() {
            write_note(
                &mut files.note,
                &mut keys.note,
                keys.strain,
                NOTETYPE_COLONY_ID,
                &record.colony_note,
                user_key,
                &date,
            )?;
        }
        if !record.mutant_note.is_empty() {
            write_note(
                &mut files.note,
                &mut keys.note,
                keys.strain,
                NOTETYPE_MUTANT_ORIGIN,
                &record.mutant_note,
                user_key,
                &date,
            )?;
        }

        for attribute in record.attributes.split('|').filter(|s| !s.is_empty()) {
            let Some(&term_key) = vocab.attribute_terms.get(attribute) else {
                writeln!(error_file, "Invalid Strain Attribute ({}) {}", line_num, attribute)?;
                continue;
            };
            writeln!(
                files.annot,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                keys.annot,
                ANNOTTYPE_STRAIN_ATTR,
                keys.strain,
                term_key,
                QUALIFIER_NULL,
                date,
                date
            )?;
            keys.annot += 1;
        }

        keys.strain += 1;
        keys.mgi_id += 1;
        counts.strains += 1;
    }

    files.flush()?;

    Ok(counts)
}

/// Write one note row; the note text is carried in the row itself.
#[allow(clippy::too_many_arguments)]
fn write_note(
    note_file: &mut BufWriter<File>,
    note_key: &mut i64,
    object_key: i64,
    note_type: i32,
    text: &str,
    user_key: i64,
    date: &str,
) -> Result<(), anyhow::Error> {
    writeln!(
        note_file,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        note_key, object_key, MGITYPE_STRAIN, note_type, text, user_key, user_key, date, date
    )?;
    *note_key += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use pretty_assertions::assert_eq;

    use crate::db::{StrainMaxKeys, StrainVocab};

    use super::{write_table_files, Counts};

    fn vocab() -> StrainVocab {
        StrainVocab {
            species: HashMap::from([("laboratory mouse".to_string(), 100)]),
            strain_types: HashMap::from([("coisogenic".to_string(), 200)]),
            attribute_terms: HashMap::from([
                ("chromosome aberration".to_string(), 300),
                ("mutant strain".to_string(), 301),
            ]),
            users: HashMap::from([("htmpload".to_string(), 400)]),
            allele_markers: HashMap::from([("MGI:5001".to_string(), (500, 600))]),
            strains: HashMap::from([("Existing/Strain".to_string(), 700)]),
            colony_noted: HashSet::new(),
            max_keys: StrainMaxKeys {
                strain: 1000,
                strain_marker: 2000,
                accession: 3000,
                mgi_id: 7000000,
                annot: 4000,
                note: 5000,
            },
        }
    }

    #[test]
    fn writes_all_table_files() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let input = tmp_dir.join("strains.tsv");
        let rows = "\
C57BL/6N-Sym<tm1a>/Wtsi\tMGI:5001\tcoisogenic\tlaboratory mouse\t1\thtmpload\tEPD001\tCOL1\tchromosome aberration|mutant strain
Existing/Strain\tMGI:5001\tcoisogenic\tlaboratory mouse\t1\thtmpload\tEPD002\tCOL2\tmutant strain
Bad/Strain\tMGI:5001\tunknown type\tlaboratory mouse\t1\thtmpload\t\tCOL3\tmutant strain
";
        std::fs::write(&input, rows)?;

        let mut errors = Vec::new();
        let counts =
            write_table_files(input.to_str().unwrap(), &vocab(), &tmp_dir, &mut errors)?;

        assert_eq!(
            Counts {
                strains: 1,
                accessions: 1,
                notes_attached: 1,
                errors: 1
            },
            counts
        );

        let strain = std::fs::read_to_string(tmp_dir.join("PRB_Strain.bcp"))?;
        assert_eq!(1, strain.lines().count());
        assert!(strain.starts_with("1000\t100\t200\tC57BL/6N-Sym<tm1a>/Wtsi\t1\t0\t0\t400\t400\t"));

        let marker = std::fs::read_to_string(tmp_dir.join("PRB_Strain_Marker.bcp"))?;
        assert!(marker.starts_with("2000\t1000\t600\t500\t615427\t"));

        let accession = std::fs::read_to_string(tmp_dir.join("ACC_Accession.bcp"))?;
        assert!(accession.starts_with("3000\tMGI:7000000\tMGI:\t7000000\t1\t1000\t10\t0\t1\t"));

        // colony + mutant notes for the new strain, colony note for the
        // existing one
        let note = std::fs::read_to_string(tmp_dir.join("MGI_Note.bcp"))?;
        assert_eq!(3, note.lines().count());
        assert!(note.contains("\t700\t10\t1012\tCOL2\t"));
        assert!(note.contains("\t1000\t10\t1038\tEPD001\t"));

        let annot = std::fs::read_to_string(tmp_dir.join("VOC_Annot.bcp"))?;
        assert_eq!(2, annot.lines().count());

        let errors = String::from_utf8(errors)?;
        assert!(errors.contains("Strain Already Exists (2) Existing/Strain"));
        assert!(errors.contains("Invalid Strain Type (3) unknown type"));

        Ok(())
    }

    #[test]
    fn existing_strain_with_colony_note_is_skipped() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let input = tmp_dir.join("strains.tsv");
        let rows = "\
Existing/Strain\tMGI:5001\tcoisogenic\tlaboratory mouse\t1\thtmpload\tEPD002\tCOL2\tmutant strain
";
        std::fs::write(&input, rows)?;
        let mut vocab = vocab();
        vocab.colony_noted.insert(700);

        let mut errors = Vec::new();
        let counts =
            write_table_files(input.to_str().unwrap(), &vocab, &tmp_dir, &mut errors)?;

        assert_eq!(0, counts.strains);
        assert_eq!(0, counts.notes_attached);
        let note = std::fs::read_to_string(tmp_dir.join("MGI_Note.bcp"))?;
        assert_eq!(0, note.lines().count());

        Ok(())
    }
}
