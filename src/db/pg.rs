//! Synchronous Postgres access to the curation database (MGD).
//!
//! One client per run, per the batch model: every method either pulls one
//! read-only snapshot into the structs of the parent module or performs one
//! post-load update.  All queries are parameterized; vocabulary and type
//! keys are fixed properties of the MGD schema and kept as named constants.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use postgres::{Client, NoTls};

use super::{
    AlleleInfo, AlleleLookup, CenterLookup, GenotypeLookup, GenotypeRecord, MarkerInfo,
    StrainLookup, StrainMaxKeys, StrainRecord, StrainVocab,
};

/// MGI type key of markers.
const MGITYPE_MARKER: i32 = 2;
/// MGI type key of strains.
const MGITYPE_STRAIN: i32 = 10;
/// MGI type key of alleles.
const MGITYPE_ALLELE: i32 = 11;
/// MGI type key of genotypes.
const MGITYPE_GENOTYPE: i32 = 12;
/// MGI type key of mutant cell lines.
const MGITYPE_CELL_LINE: i32 = 28;

/// Note type key of the strain colony-ID note.
const NOTETYPE_COLONY_ID: i32 = 1012;

/// Allele status: In Progress, Approved, Autoload.
const ALLELE_STATUS_KEYS: [i32; 3] = [847111, 847114, 3983021];
/// Allele types: Targeted, Endonuclease-mediated.
const ALLELE_TYPE_KEYS: [i32; 2] = [847116, 11927650];
/// Strain types carrying colony-ID notes: coisogenic, congenic, Not Specified.
const COLONY_STRAIN_TYPE_KEYS: [i32; 3] = [3410530, 3410535, 6508969];

/// Vocabulary of production centers (term abbreviation is the lab code).
const VOCAB_PRODUCTION_CENTER: i32 = 98;
/// Vocabulary of phenotyping centers.
const VOCAB_PHENOTYPING_CENTER: i32 = 99;
/// Vocabulary of allele pair states.
const VOCAB_PAIR_STATE: i32 = 39;
/// Vocabulary of species.
const VOCAB_SPECIES: i32 = 26;
/// Vocabulary of strain types.
const VOCAB_STRAIN_TYPE: i32 = 55;
/// Vocabulary of strain attributes.
const VOCAB_STRAIN_ATTRIBUTE: i32 = 27;

/// Annotation type of MP/Genotype annotations.
const ANNOTTYPE_MP_GENOTYPE: i32 = 1002;
/// Transmission states that may be upgraded: Chimeric, Not Applicable.
const TRANSMISSION_UPGRADEABLE: [i32; 2] = [3982952, 3982953];
/// Transmission state: Germline.
const TRANSMISSION_GERMLINE: i32 = 3982951;
/// User key handed to the header/reference stored procedures.
const PROC_USER_KEY: i32 = 1001;

/// The one database connection of a load run.
pub struct MgdDb {
    client: Client,
}

impl MgdDb {
    /// Connect with a libpq-style URL.
    pub fn connect(url: &str) -> Result<Self, anyhow::Error> {
        tracing::debug!("connecting to MGD");
        let client = Client::connect(url, NoTls)
            .map_err(|e| anyhow::anyhow!("could not connect to MGD: {}", e))?;
        Ok(Self { client })
    }

    /// Load the allele snapshot: targeted and endonuclease-mediated alleles
    /// with preferred MGI IDs and their mutant cell lines.
    pub fn load_allele_lookup(&mut self) -> Result<AlleleLookup, anyhow::Error> {
        let mut result = AlleleLookup::default();

        let rows = self.client.query(
            "SELECT a1.accID AS allele_id, a2.accID AS marker_id, ll.symbol, c.cellLine
             FROM ALL_Allele ll
             JOIN ACC_Accession a1 ON ll._Allele_key = a1._Object_key
                  AND a1._MGIType_key = $1 AND a1.preferred = 1 AND a1.prefixPart = 'MGI:'
             JOIN ACC_Accession a2 ON ll._Marker_key = a2._Object_key
                  AND a2._MGIType_key = $2 AND a2.preferred = 1 AND a2.prefixPart = 'MGI:'
             LEFT JOIN ALL_Allele_CellLine ac ON ll._Allele_key = ac._Allele_key
             LEFT JOIN ALL_CellLine c ON ac._MutantCellLine_key = c._CellLine_key
             WHERE ll._Allele_Status_key = ANY($3)
               AND ll._Allele_Type_key = ANY($4)",
            &[
                &MGITYPE_ALLELE,
                &MGITYPE_MARKER,
                &ALLELE_STATUS_KEYS.as_slice(),
                &ALLELE_TYPE_KEYS.as_slice(),
            ],
        )?;
        for row in rows {
            let allele_id: String = row.get("allele_id");
            let marker_id: String = row.get("marker_id");
            let symbol: String = row.get("symbol");
            let mutant_id: Option<String> = row.get("cellline");

            let info = result
                .alleles
                .entry(allele_id)
                .or_insert_with(|| AlleleInfo {
                    symbol: symbol.clone(),
                    marker_id,
                    mutant_ids: Vec::new(),
                });
            if let Some(mutant_id) = mutant_id {
                result
                    .mcl_alleles
                    .entry(mutant_id.clone())
                    .or_default()
                    .push(symbol);
                info.mutant_ids.push(mutant_id);
            }
        }
        tracing::debug!("loaded {} alleles", result.alleles.len());

        Ok(result)
    }

    /// Load the production-center lab codes and the phenotyping-center
    /// vocabulary.
    pub fn load_center_lookup(&mut self) -> Result<CenterLookup, anyhow::Error> {
        let mut result = CenterLookup::default();

        let rows = self.client.query(
            "SELECT term, abbreviation FROM VOC_Term WHERE _Vocab_key = $1",
            &[&VOCAB_PRODUCTION_CENTER],
        )?;
        for row in rows {
            result.lab_codes.insert(row.get("term"), row.get("abbreviation"));
        }

        let rows = self.client.query(
            "SELECT term FROM VOC_Term WHERE _Vocab_key = $1",
            &[&VOCAB_PHENOTYPING_CENTER],
        )?;
        for row in rows {
            result.phenotyping.insert(row.get("term"));
        }

        Ok(result)
    }

    /// Load the strain snapshot used by strain reconciliation: colony-ID
    /// notes, existing genotype pairs, private strains.
    pub fn load_strain_lookup(&mut self) -> Result<StrainLookup, anyhow::Error> {
        let mut result = StrainLookup::default();

        let rows = self.client.query(
            "SELECT s.strain, trim(n.note) AS colony_note
             FROM PRB_Strain s
             JOIN MGI_Note n ON s._Strain_key = n._Object_key
                  AND n._NoteType_key = $1 AND n._MGIType_key = $2
             WHERE s._StrainType_key = ANY($3)",
            &[
                &NOTETYPE_COLONY_ID,
                &MGITYPE_STRAIN,
                &COLONY_STRAIN_TYPE_KEYS.as_slice(),
            ],
        )?;
        for row in rows {
            let strain: String = row.get("strain");
            let colony_note: Option<String> = row.get("colony_note");
            // a colony note can hold several IDs, pipe-delimited
            let colony_ids = colony_note
                .unwrap_or_default()
                .split('|')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>();
            for colony_id in &colony_ids {
                result.colony_strains.insert(colony_id.clone(), strain.clone());
            }
            if result.strain_colonies.contains_key(&strain) {
                result.multi_object_names.insert(strain);
            } else {
                result.strain_colonies.insert(strain, colony_ids);
            }
        }

        let rows = self.client.query(
            "SELECT DISTINCT s.strain, a.accID AS allele_id, cl.cellLine
             FROM PRB_Strain s
             JOIN GXD_Genotype g ON g._Strain_key = s._Strain_key
             JOIN GXD_AllelePair ap ON g._Genotype_key = ap._Genotype_key
             JOIN ALL_CellLine cl ON ap._MutantCellLine_key_1 = cl._CellLine_key
             JOIN ACC_Accession a ON ap._Allele_key_1 = a._Object_key
                  AND a._MGIType_key = $1 AND a._LogicalDB_key = 1
                  AND a.preferred = 1 AND a.prefixPart = 'MGI:'
             WHERE s._Strain_key != -1 AND s.standard = 1",
            &[&MGITYPE_ALLELE],
        )?;
        for row in rows {
            let strain: String = row.get("strain");
            result
                .strain_genotypes
                .entry(strain)
                .or_default()
                .push((row.get("allele_id"), row.get("cellline")));
        }

        let rows = self
            .client
            .query("SELECT strain FROM PRB_Strain WHERE private = 1", &[])?;
        for row in rows {
            result.private.insert(row.get("strain"));
        }

        tracing::debug!(
            "loaded {} colony IDs, {} strains with genotypes, {} private strains",
            result.colony_strains.len(),
            result.strain_genotypes.len(),
            result.private.len()
        );

        Ok(result)
    }

    /// Load the genotype-stage snapshot: markers with chromosome and
    /// wild-type allele, allele and cell line keys, colony strains, and the
    /// genotypes created by `created_by`.
    pub fn load_genotype_lookup(&mut self, created_by: &str) -> Result<GenotypeLookup, anyhow::Error> {
        let mut result = GenotypeLookup::default();

        let rows = self.client.query(
            "SELECT a.accID, m._Marker_key, m.chromosome, awt.accID AS wild_type_id
             FROM MRK_Marker m
             JOIN ACC_Accession a ON m._Marker_key = a._Object_key
                  AND a._MGIType_key = $1 AND a._LogicalDB_key = 1 AND a.preferred = 1
             LEFT JOIN ALL_Allele wt ON wt._Marker_key = m._Marker_key AND wt.name = 'wild type'
             LEFT JOIN ACC_Accession awt ON wt._Allele_key = awt._Object_key
                  AND awt._MGIType_key = $2 AND awt._LogicalDB_key = 1 AND awt.preferred = 1",
            &[&MGITYPE_MARKER, &MGITYPE_ALLELE],
        )?;
        for row in rows {
            result.markers.insert(
                row.get("accid"),
                MarkerInfo {
                    key: row.get::<_, i32>("_marker_key") as i64,
                    chromosome: row.get("chromosome"),
                    wild_type_allele: row.get("wild_type_id"),
                },
            );
        }

        let rows = self.client.query(
            "SELECT a.accID, a._Object_key
             FROM ACC_Accession a
             WHERE a._MGIType_key = $1 AND a._LogicalDB_key = 1 AND a.preferred = 1",
            &[&MGITYPE_ALLELE],
        )?;
        for row in rows {
            result
                .alleles
                .insert(row.get("accid"), row.get::<_, i32>("_object_key") as i64);
        }

        let rows = self.client.query(
            "SELECT a.accID, a._Object_key
             FROM ACC_Accession a
             WHERE a._MGIType_key = $1 AND a.preferred = 1",
            &[&MGITYPE_CELL_LINE],
        )?;
        for row in rows {
            result
                .mutant_cell_lines
                .insert(row.get("accid"), row.get::<_, i32>("_object_key") as i64);
        }

        // strains with colony-ID notes plus the generic "Not Specified"
        let rows = self.client.query(
            "SELECT s._Strain_key, s.strain, a.accID, trim(n.note) AS colony_note
             FROM PRB_Strain s
             JOIN ACC_Accession a ON s._Strain_key = a._Object_key
                  AND a._MGIType_key = $1 AND a._LogicalDB_key = 1 AND a.preferred = 1
             JOIN MGI_Note n ON s._Strain_key = n._Object_key AND n._NoteType_key = $2
             UNION
             SELECT s._Strain_key, s.strain, a.accID, ''
             FROM PRB_Strain s
             JOIN ACC_Accession a ON s._Strain_key = a._Object_key
                  AND a._MGIType_key = $1 AND a._LogicalDB_key = 1 AND a.preferred = 1
             WHERE s._Strain_key = -1",
            &[&MGITYPE_STRAIN, &NOTETYPE_COLONY_ID],
        )?;
        for row in rows {
            result.strains.push(StrainRecord {
                key: row.get::<_, i32>("_strain_key") as i64,
                name: row.get("strain"),
                strain_id: row.get("accid"),
                colony_note: row.get::<_, Option<String>>("colony_note").unwrap_or_default(),
            });
        }

        // non-conditional genotypes created by the load user itself; a
        // curator-created genotype must never be re-used
        let rows = self.client.query(
            "SELECT a.accID, ap._Marker_key, ap._Allele_key_1, ap._Allele_key_2,
                    ap._MutantCellLine_key_1, ap._MutantCellLine_key_2, t.term, g._Strain_key
             FROM GXD_Genotype g
             JOIN ACC_Accession a ON g._Genotype_key = a._Object_key
                  AND a._MGIType_key = $1 AND a._LogicalDB_key = 1 AND a.preferred = 1
             JOIN GXD_AllelePair ap ON g._Genotype_key = ap._Genotype_key
             JOIN VOC_Term t ON ap._PairState_key = t._Term_key AND t._Vocab_key = $2
             JOIN MGI_User u ON g._CreatedBy_key = u._User_key
             WHERE g.isConditional = 0 AND u.login = $3",
            &[&MGITYPE_GENOTYPE, &VOCAB_PAIR_STATE, &created_by],
        )?;
        for row in rows {
            result.genotypes.push(GenotypeRecord {
                genotype_id: row.get("accid"),
                marker_key: row.get::<_, i32>("_marker_key") as i64,
                allele_key_1: row.get::<_, i32>("_allele_key_1") as i64,
                allele_key_2: row.get::<_, Option<i32>>("_allele_key_2").map(|k| k as i64),
                mutant_key_1: row
                    .get::<_, Option<i32>>("_mutantcellline_key_1")
                    .map(|k| k as i64),
                mutant_key_2: row
                    .get::<_, Option<i32>>("_mutantcellline_key_2")
                    .map(|k| k as i64),
                pair_state: row.get("term"),
                strain_key: row.get::<_, i32>("_strain_key") as i64,
            });
        }

        tracing::debug!(
            "loaded {} markers, {} alleles, {} cell lines, {} strains, {} genotypes",
            result.markers.len(),
            result.alleles.len(),
            result.mutant_cell_lines.len(),
            result.strains.len(),
            result.genotypes.len()
        );

        Ok(result)
    }

    /// Load the vocabularies and key maxima used by the strain loader.
    pub fn load_strain_vocab(&mut self) -> Result<StrainVocab, anyhow::Error> {
        let mut result = StrainVocab::default();

        result.species = self.load_term_map(VOCAB_SPECIES)?;
        result.strain_types = self.load_term_map(VOCAB_STRAIN_TYPE)?;
        result.attribute_terms = self.load_term_map(VOCAB_STRAIN_ATTRIBUTE)?;

        let rows = self
            .client
            .query("SELECT login, _User_key FROM MGI_User", &[])?;
        for row in rows {
            result
                .users
                .insert(row.get("login"), row.get::<_, i32>("_user_key") as i64);
        }

        let rows = self.client.query(
            "SELECT a.accID, ll._Allele_key, ll._Marker_key
             FROM ALL_Allele ll
             JOIN ACC_Accession a ON ll._Allele_key = a._Object_key
                  AND a._MGIType_key = $1 AND a._LogicalDB_key = 1 AND a.preferred = 1",
            &[&MGITYPE_ALLELE],
        )?;
        for row in rows {
            result.allele_markers.insert(
                row.get("accid"),
                (
                    row.get::<_, i32>("_allele_key") as i64,
                    row.get::<_, i32>("_marker_key") as i64,
                ),
            );
        }

        let rows = self
            .client
            .query("SELECT strain, _Strain_key FROM PRB_Strain", &[])?;
        for row in rows {
            result
                .strains
                .insert(row.get("strain"), row.get::<_, i32>("_strain_key") as i64);
        }

        let rows = self.client.query(
            "SELECT _Object_key FROM MGI_Note WHERE _MGIType_key = $1 AND _NoteType_key = $2",
            &[&MGITYPE_STRAIN, &NOTETYPE_COLONY_ID],
        )?;
        for row in rows {
            result
                .colony_noted
                .insert(row.get::<_, i32>("_object_key") as i64);
        }

        result.max_keys = StrainMaxKeys {
            strain: self.next_key("PRB_Strain", "_Strain_key")?,
            strain_marker: self.next_key("PRB_Strain_Marker", "_StrainMarker_key")?,
            accession: self.next_key("ACC_Accession", "_Accession_key")?,
            mgi_id: self
                .client
                .query_one(
                    "SELECT maxNumericPart + 1 AS next FROM ACC_AccessionMax WHERE prefixPart = 'MGI:'",
                    &[],
                )?
                .get::<_, i32>("next") as i64,
            annot: self.next_key("VOC_Annot", "_Annot_key")?,
            note: self.next_key("MGI_Note", "_Note_key")?,
        };

        Ok(result)
    }

    fn load_term_map(&mut self, vocab_key: i32) -> Result<HashMap<String, i64>, anyhow::Error> {
        let rows = self.client.query(
            "SELECT term, _Term_key FROM VOC_Term WHERE _Vocab_key = $1",
            &[&vocab_key],
        )?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get("term"), row.get::<_, i32>("_term_key") as i64))
            .collect())
    }

    fn next_key(&mut self, table: &str, column: &str) -> Result<i64, anyhow::Error> {
        // table/column names come from the fixed set above, not from input
        let row = self
            .client
            .query_one(&format!("SELECT max({column}) + 1 AS next FROM {table}"), &[])?;
        Ok(row.get::<_, i32>("next") as i64)
    }

    /// Bulk-copy one tab-delimited table file written by the strain loader.
    pub fn bulk_copy(&mut self, table: &str, path: &Path) -> Result<u64, anyhow::Error> {
        tracing::info!("bulk copying {:?} into {}", path, table);
        let mut contents = Vec::new();
        std::fs::File::open(path)?.read_to_end(&mut contents)?;

        let mut writer = self
            .client
            .copy_in(&format!("COPY {table} FROM STDIN WITH (FORMAT text)"))?;
        std::io::Write::write_all(&mut writer, &contents)?;
        let rows = writer.finish()?;
        tracing::info!("copied {} rows", rows);

        Ok(rows)
    }

    /// Advance the MGI accession maximum after `count` new IDs (opaque
    /// stored procedure).
    pub fn set_accession_max(&mut self, count: i64) -> Result<(), anyhow::Error> {
        self.client
            .execute("SELECT * FROM ACC_setMax($1)", &[&(count as i32)])?;
        Ok(())
    }

    /// Resolve a user login to its key.
    pub fn user_key(&mut self, login: &str) -> Result<i64, anyhow::Error> {
        let row = self
            .client
            .query_opt("SELECT _User_key FROM MGI_User WHERE login = $1", &[&login])?
            .ok_or_else(|| anyhow::anyhow!("unknown user login: {:?}", login))?;
        Ok(row.get::<_, i32>("_user_key") as i64)
    }

    /// Delete the MP annotation headers of every genotype annotated under
    /// the given references.
    pub fn delete_annot_headers(&mut self, refs_keys: &[i32]) -> Result<u64, anyhow::Error> {
        let deleted = self.client.execute(
            "DELETE FROM VOC_AnnotHeader h
             WHERE h._AnnotType_key = $1
               AND h._Object_key IN (
                   SELECT v._Object_key
                   FROM VOC_Annot v
                   JOIN VOC_Evidence e ON v._Annot_key = e._Annot_key
                   WHERE v._AnnotType_key = $1 AND e._Refs_key = ANY($2))",
            &[&ANNOTTYPE_MP_GENOTYPE, &refs_keys],
        )?;
        Ok(deleted)
    }

    /// Genotypes with MP annotations but no header rows.
    pub fn genotypes_missing_headers(&mut self) -> Result<Vec<i32>, anyhow::Error> {
        let rows = self.client.query(
            "SELECT DISTINCT v._Object_key
             FROM VOC_Annot v
             WHERE v._AnnotType_key = $1
               AND NOT EXISTS (
                   SELECT 1 FROM VOC_AnnotHeader h
                   WHERE v._AnnotType_key = h._AnnotType_key
                     AND v._Object_key = h._Object_key)",
            &[&ANNOTTYPE_MP_GENOTYPE],
        )?;
        Ok(rows.into_iter().map(|r| r.get("_object_key")).collect())
    }

    /// Recompute the annotation header rows of one genotype (opaque stored
    /// procedure).
    pub fn process_annot_header(&mut self, genotype_key: i32) -> Result<(), anyhow::Error> {
        self.client.execute(
            "SELECT * FROM VOC_processAnnotHeader($1, $2, $3)",
            &[&PROC_USER_KEY, &ANNOTTYPE_MP_GENOTYPE, &genotype_key],
        )?;
        Ok(())
    }

    /// Non-wild-type alleles annotated under `refs_key` whose transmission
    /// status can still be upgraded to germline.
    pub fn alleles_pending_transmission(&mut self, refs_key: i32) -> Result<Vec<i32>, anyhow::Error> {
        let rows = self.client.query(
            "SELECT DISTINCT aa._Allele_key
             FROM GXD_AlleleGenotype g
             JOIN VOC_Annot a ON g._Genotype_key = a._Object_key AND a._AnnotType_key = $1
             JOIN VOC_Evidence e ON a._Annot_key = e._Annot_key AND e._Refs_key = $2
             JOIN ALL_Allele aa ON g._Allele_key = aa._Allele_key
             WHERE aa.isWildType = 0 AND aa._Transmission_key = ANY($3)",
            &[
                &ANNOTTYPE_MP_GENOTYPE,
                &refs_key,
                &TRANSMISSION_UPGRADEABLE.as_slice(),
            ],
        )?;
        Ok(rows.into_iter().map(|r| r.get("_allele_key")).collect())
    }

    /// Set an allele's transmission status to germline.
    pub fn set_germline_transmission(&mut self, allele_key: i32, user_key: i64) -> Result<(), anyhow::Error> {
        self.client.execute(
            "UPDATE ALL_Allele
             SET _Transmission_key = $1, _ModifiedBy_key = $2, modification_date = now()
             WHERE _Allele_key = $3",
            &[&TRANSMISSION_GERMLINE, &(user_key as i32), &allele_key],
        )?;
        Ok(())
    }

    /// All non-wild-type alleles annotated under `refs_key` (for `Used-FC`
    /// reference associations).
    pub fn alleles_used_fc(&mut self, refs_key: i32) -> Result<Vec<i32>, anyhow::Error> {
        let rows = self.client.query(
            "SELECT DISTINCT aa._Allele_key
             FROM GXD_AlleleGenotype g
             JOIN VOC_Annot a ON g._Genotype_key = a._Object_key AND a._AnnotType_key = $1
             JOIN VOC_Evidence e ON a._Annot_key = e._Annot_key AND e._Refs_key = $2
             JOIN ALL_Allele aa ON g._Allele_key = aa._Allele_key
             WHERE aa.isWildType = 0",
            &[&ANNOTTYPE_MP_GENOTYPE, &refs_key],
        )?;
        Ok(rows.into_iter().map(|r| r.get("_allele_key")).collect())
    }

    /// Record an allele/reference association (opaque stored procedure).
    pub fn insert_reference_assoc(
        &mut self,
        allele_key: i32,
        refs_key: i32,
        assoc_type: &str,
    ) -> Result<(), anyhow::Error> {
        self.client.execute(
            "SELECT * FROM MGI_insertReferenceAssoc($1, $2, $3, $4, $5)",
            &[
                &PROC_USER_KEY,
                &MGITYPE_ALLELE,
                &allele_key,
                &refs_key,
                &assoc_type,
            ],
        )?;
        Ok(())
    }
}
