//! Read-only database snapshots and typed lookups.
//!
//! Every lookup table is pulled once per run through [`pg::MgdDb`] and then
//! passed by reference into the stage cores.  Nothing in this module talks
//! to the database, so tests construct the structs directly with fixture
//! data.

use std::collections::{HashMap, HashSet};

use multimap::MultiMap;

use crate::common::{PairState, NOT_SPECIFIED};

pub mod pg;

/// Attributes of one allele, keyed by allele MGI ID in [`AlleleLookup`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlleleInfo {
    /// Allele symbol.
    pub symbol: String,
    /// MGI ID of the allele's marker.
    pub marker_id: String,
    /// Mutant cell line IDs associated with the allele; empty for
    /// endonuclease-mediated alleles without cell lines.
    pub mutant_ids: Vec<String>,
}

/// Snapshot of the targeted/endonuclease-mediated alleles with preferred
/// MGI IDs.
#[derive(Debug, Clone, Default)]
pub struct AlleleLookup {
    /// Allele MGI ID to attributes.
    pub alleles: HashMap<String, AlleleInfo>,
    /// Mutant cell line ID to the symbols of the alleles carrying it.
    pub mcl_alleles: HashMap<String, Vec<String>>,
}

/// Center vocabularies.
#[derive(Debug, Clone, Default)]
pub struct CenterLookup {
    /// Production center to lab code.
    pub lab_codes: HashMap<String, String>,
    /// Known phenotyping centers.
    pub phenotyping: HashSet<String>,
}

/// Strain snapshot used by strain reconciliation.
#[derive(Debug, Clone, Default)]
pub struct StrainLookup {
    /// Colony ID to the names of the strains carrying it as a colony-ID
    /// note.  More than one name is a conflict the caller must report.
    pub colony_strains: MultiMap<String, String>,
    /// Strain name to its colony IDs (a colony note may be pipe-delimited).
    pub strain_colonies: HashMap<String, Vec<String>>,
    /// Strain names that resolve to more than one strain object.
    pub multi_object_names: HashSet<String>,
    /// Strain name to the (allele ID, mutant cell line ID) pairs of its
    /// existing genotypes.
    pub strain_genotypes: HashMap<String, Vec<(String, String)>>,
    /// Names of private strains.
    pub private: HashSet<String>,
}

impl StrainLookup {
    /// Return the first existing genotype of `strain` whose (allele, mutant
    /// cell line) pair differs from the input pair, if any.
    pub fn genotype_mismatch(
        &self,
        strain: &str,
        allele_id: &str,
        mutant_id: &str,
    ) -> Option<&(String, String)> {
        self.strain_genotypes
            .get(strain)
            .and_then(|pairs| pairs.iter().find(|(a, c)| a != allele_id || c != mutant_id))
    }
}

/// Attributes of one marker, keyed by marker MGI ID in [`GenotypeLookup`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerInfo {
    /// Marker key.
    pub key: i64,
    /// Chromosome of the marker.
    pub chromosome: String,
    /// MGI ID of the marker's wild-type allele, when one exists.
    pub wild_type_allele: Option<String>,
}

/// One strain row visible to the genotype stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrainRecord {
    /// Strain key.
    pub key: i64,
    /// Strain name.
    pub name: String,
    /// Preferred MGI accession ID of the strain.
    pub strain_id: String,
    /// Colony-ID note, possibly pipe-delimited; empty for `Not Specified`.
    pub colony_note: String,
}

/// One existing genotype created by the load user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenotypeRecord {
    /// Genotype MGI accession ID.
    pub genotype_id: String,
    /// Marker key of the allele pair.
    pub marker_key: i64,
    /// First allele key.
    pub allele_key_1: i64,
    /// Second allele key; `None` for hemizygous/indeterminate pairs.
    pub allele_key_2: Option<i64>,
    /// First mutant cell line key.
    pub mutant_key_1: Option<i64>,
    /// Second mutant cell line key.
    pub mutant_key_2: Option<i64>,
    /// Allele pair state term.
    pub pair_state: String,
    /// Strain key of the genotype.
    pub strain_key: i64,
}

/// Resolved allele pair to search for among the existing genotypes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenotypeQuery {
    pub marker_key: i64,
    pub allele_key: i64,
    pub mutant_key: Option<i64>,
    pub pair_state: PairState,
    pub strain_key: i64,
}

/// Snapshot bundle for the genotype stage.
#[derive(Debug, Clone, Default)]
pub struct GenotypeLookup {
    /// Marker MGI ID to attributes.
    pub markers: HashMap<String, MarkerInfo>,
    /// Allele MGI ID to allele key.
    pub alleles: HashMap<String, i64>,
    /// Mutant cell line ID to cell line key.
    pub mutant_cell_lines: HashMap<String, i64>,
    /// Strains with colony-ID notes, plus `Not Specified`.
    pub strains: Vec<StrainRecord>,
    /// Genotypes created by the load user.
    pub genotypes: Vec<GenotypeRecord>,
}

impl GenotypeLookup {
    /// Find the strain for `name`, requiring `colony_id` to appear in the
    /// strain's colony note; the generic `Not Specified` strain has no
    /// colony note and matches by name alone.
    pub fn find_strain(&self, name: &str, colony_id: &str) -> Option<&StrainRecord> {
        self.strains.iter().find(|s| {
            s.name == name && (name == NOT_SPECIFIED || s.colony_note.contains(colony_id))
        })
    }

    /// Search the snapshot for a load-created genotype matching the
    /// resolved allele pair.  The last match wins, as with the original
    /// queries.
    pub fn find_genotype(&self, query: &GenotypeQuery) -> Option<&GenotypeRecord> {
        let term = query.pair_state.to_string();
        self.genotypes
            .iter()
            .filter(|g| {
                g.marker_key == query.marker_key
                    && g.strain_key == query.strain_key
                    && g.pair_state == term
                    && g.allele_key_1 == query.allele_key
                    && g.mutant_key_1 == query.mutant_key
                    && match query.pair_state {
                        PairState::Homozygous => {
                            g.allele_key_2 == Some(query.allele_key)
                                && g.mutant_key_2 == query.mutant_key
                        }
                        PairState::Heterozygous => {
                            g.allele_key_2.map(|k| k != query.allele_key).unwrap_or(false)
                                && g.mutant_key_2.is_none()
                        }
                        PairState::HemizygousXLinked
                        | PairState::HemizygousYLinked
                        | PairState::Indeterminate => {
                            g.allele_key_2.is_none() && g.mutant_key_2.is_none()
                        }
                    }
            })
            .last()
    }
}

/// Database maxima used by the strain loader to allocate keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StrainMaxKeys {
    /// Next `PRB_Strain` key.
    pub strain: i64,
    /// Next `PRB_Strain_Marker` key.
    pub strain_marker: i64,
    /// Next `ACC_Accession` key.
    pub accession: i64,
    /// Next numeric part of an `MGI:` accession ID.
    pub mgi_id: i64,
    /// Next `VOC_Annot` key.
    pub annot: i64,
    /// Next `MGI_Note` key.
    pub note: i64,
}

/// Vocabulary snapshot for the strain loader.
#[derive(Debug, Clone, Default)]
pub struct StrainVocab {
    /// Species term to key.
    pub species: HashMap<String, i64>,
    /// Strain type term to key.
    pub strain_types: HashMap<String, i64>,
    /// Strain attribute term to key.
    pub attribute_terms: HashMap<String, i64>,
    /// User login to key.
    pub users: HashMap<String, i64>,
    /// Allele MGI ID to (allele key, marker key).
    pub allele_markers: HashMap<String, (i64, i64)>,
    /// Existing strain name to key.
    pub strains: HashMap<String, i64>,
    /// Strain keys that already carry a colony-ID note.
    pub colony_noted: HashSet<i64>,
    /// Current database maxima.
    pub max_keys: StrainMaxKeys,
}
