//! Provider input formats of the preprocess stage.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::io::tsv_reader;
use crate::common::LoadType;

/// Envelope of the provider JSON exports.
#[derive(Debug, Deserialize)]
pub struct Export<D> {
    pub response: Response<D>,
}

/// Inner document list of the export envelope.
#[derive(Debug, Deserialize)]
pub struct Response<D> {
    pub docs: Vec<D>,
}

/// One document of the IMPC phenotype (MP) export.  Providers routinely
/// omit fields, so everything defaults to empty and completeness is checked
/// downstream.
#[derive(Debug, Deserialize)]
pub struct ImpcDoc {
    #[serde(default)]
    pub resource_name: String,
    #[serde(default)]
    pub phenotyping_center: String,
    #[serde(default)]
    pub mp_term_id: String,
    #[serde(default)]
    pub allele_accession_id: String,
    #[serde(default)]
    pub zygosity: String,
    #[serde(default)]
    pub allele_symbol: String,
    #[serde(default)]
    pub strain_name: String,
    #[serde(default)]
    pub marker_accession_id: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub colony_id: String,
}

/// One document of the IMPC expression (LacZ) export.
#[derive(Debug, Deserialize)]
pub struct LaczDoc {
    #[serde(default)]
    pub biological_sample_group: String,
    #[serde(default)]
    pub phenotyping_center: String,
    #[serde(default)]
    pub allele_accession_id: String,
    #[serde(default)]
    pub zygosity: String,
    #[serde(default)]
    pub allele_symbol: String,
    #[serde(default)]
    pub strain_name: String,
    #[serde(default)]
    pub gene_accession_id: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub colony_id: String,
    /// Records without a parameter association carry no annotatable result.
    #[serde(default)]
    pub parameter_association_stable_id: Option<String>,
}

/// One normalized provider record, the common currency between the JSON
/// parsers and the validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRecord {
    pub resource_name: String,
    pub phenotyping_center: String,
    pub interpretation_center: String,
    /// Filled from the GENTAR extract during validation.
    pub production_center: String,
    /// Filled from the GENTAR extract during validation.
    pub mutant_id: String,
    pub mp_id: String,
    pub allele_id: String,
    pub allele_state: String,
    pub allele_symbol: String,
    pub input_strain: String,
    pub marker_id: String,
    pub sex: String,
    pub colony_id: String,
}

/// The data interpretation center property value for IMPC.
const INTERPRETATION_CENTER: &str = "IMPC";

impl SourceRecord {
    fn from_impc(doc: ImpcDoc) -> Self {
        Self {
            resource_name: doc.resource_name,
            phenotyping_center: doc.phenotyping_center,
            interpretation_center: INTERPRETATION_CENTER.to_string(),
            production_center: String::new(),
            mutant_id: String::new(),
            mp_id: doc.mp_term_id,
            allele_id: doc.allele_accession_id,
            allele_state: doc.zygosity,
            allele_symbol: doc.allele_symbol,
            input_strain: doc.strain_name,
            marker_id: doc.marker_accession_id,
            sex: doc.sex,
            colony_id: doc.colony_id,
        }
    }

    fn from_lacz(doc: LaczDoc) -> Self {
        Self {
            resource_name: INTERPRETATION_CENTER.to_string(),
            phenotyping_center: doc.phenotyping_center,
            interpretation_center: INTERPRETATION_CENTER.to_string(),
            production_center: String::new(),
            mutant_id: String::new(),
            mp_id: String::new(),
            allele_id: doc.allele_accession_id,
            allele_state: doc.zygosity,
            allele_symbol: doc.allele_symbol,
            input_strain: doc.strain_name,
            marker_id: doc.gene_accession_id,
            sex: doc.sex,
            colony_id: doc.colony_id,
        }
    }

    /// True when every field the load type requires is present.
    pub fn required_complete(&self, load_type: LoadType) -> bool {
        let common = !self.resource_name.is_empty()
            && !self.phenotyping_center.is_empty()
            && !self.allele_id.is_empty()
            && !self.allele_state.is_empty()
            && !self.allele_symbol.is_empty()
            && !self.input_strain.is_empty()
            && !self.marker_id.is_empty()
            && !self.sex.is_empty()
            && !self.colony_id.is_empty();
        match load_type {
            LoadType::Impc => common && !self.mp_id.is_empty(),
            LoadType::Lacz => common,
        }
    }

    /// The record as one tab-separated line, as it appears in the skip,
    /// dup and error files and the curation log.
    pub fn tsv_line(&self) -> String {
        [
            self.resource_name.as_str(),
            self.phenotyping_center.as_str(),
            self.interpretation_center.as_str(),
            self.production_center.as_str(),
            self.mutant_id.as_str(),
            self.mp_id.as_str(),
            self.allele_id.as_str(),
            self.allele_state.as_str(),
            self.allele_symbol.as_str(),
            self.input_strain.as_str(),
            self.marker_id.as_str(),
            self.sex.as_str(),
            self.colony_id.as_str(),
        ]
        .join("\t")
    }
}

/// Parse the IMPC phenotype export.
pub fn parse_impc(reader: impl BufRead) -> Result<Vec<SourceRecord>, anyhow::Error> {
    let export: Export<ImpcDoc> = serde_json::from_reader(reader)
        .map_err(|e| anyhow::anyhow!("malformed provider JSON: {}", e))?;
    Ok(export
        .response
        .docs
        .into_iter()
        .map(SourceRecord::from_impc)
        .collect())
}

/// Parse the IMPC expression export, keeping experimental-group documents
/// that carry a parameter association.
pub fn parse_lacz(reader: impl BufRead) -> Result<Vec<SourceRecord>, anyhow::Error> {
    let export: Export<LaczDoc> = serde_json::from_reader(reader)
        .map_err(|e| anyhow::anyhow!("malformed provider JSON: {}", e))?;

    let total = export.response.docs.len();
    let (mut count_control, mut count_no_association) = (0, 0);
    let records = export
        .response
        .docs
        .into_iter()
        .filter(|doc| {
            if !doc.biological_sample_group.eq_ignore_ascii_case("experimental") {
                count_control += 1;
                return false;
            }
            if doc.parameter_association_stable_id.is_none() {
                count_no_association += 1;
                return false;
            }
            true
        })
        .map(SourceRecord::from_lacz)
        .collect::<Vec<_>>();
    tracing::info!(
        "kept {} of {} documents ({} control, {} without parameter association)",
        records.len(),
        total,
        count_control,
        count_no_association
    );

    Ok(records)
}

/// GENTAR attributes of one colony.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GentarInfo {
    /// Production center of the colony.
    pub production_center: String,
    /// ES cell name (mutant cell line ID).
    pub mutant_id: String,
    /// Marker MGI ID registered for the colony.
    pub marker_id: String,
}

/// Parse the GENTAR report into a colony-ID lookup.  Later rows win when a
/// colony repeats with different attributes.
pub fn parse_gentar<P: AsRef<Path>>(path: P) -> Result<HashMap<String, GentarInfo>, anyhow::Error> {
    let mut reader = tsv_reader(path)?;
    let mut result = HashMap::new();

    for record in reader.records() {
        let record = record?;
        if record.get(0) == Some("Marker Symbol") {
            continue;
        }
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        result.insert(
            field(2),
            GentarInfo {
                marker_id: field(1),
                mutant_id: field(3),
                production_center: field(6),
            },
        );
    }
    tracing::debug!("loaded {} GENTAR colonies", result.len());

    Ok(result)
}
