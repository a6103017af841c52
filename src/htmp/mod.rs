//! The common high-throughput MP (HTMP) row shape.
//!
//! Every source adapter normalizes its provider export into this row; the
//! genotype stage consumes it.  The Europhenome and Sanger feeds predate
//! the colony-ID columns, so the two trailing fields default to empty when
//! reading their historical 11-column files.

use serde::{Deserialize, Serialize};

pub mod europheno;
pub mod preprocess;
pub mod sanger;

/// One HTMP row as written by the source adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmpRow {
    /// Phenotyping center.
    pub phenotyping_center: String,
    /// Interpretation (annotation) center.
    pub annotation_center: String,
    /// Mutant cell line ID; blank when the allele has no cell line.
    pub mutant_id: String,
    /// MP term ID; blank for expression-only rows.
    pub mp_id: String,
    /// Allele MGI ID.
    pub allele_id: String,
    /// Allele state, canonical zygosity vocabulary.
    pub allele_state: String,
    /// Allele symbol.
    pub allele_symbol: String,
    /// Marker MGI ID.
    pub marker_id: String,
    /// Evidence code.
    pub evidence_code: String,
    /// Strain name.
    pub strain_name: String,
    /// Sex.
    pub sex: String,
    /// Colony ID (IMPC-sourced rows only).
    #[serde(default)]
    pub colony_id: String,
    /// Resource name (IMPC-sourced rows only).
    #[serde(default)]
    pub resource_name: String,
}

impl HtmpRow {
    /// The row as one tab-separated line, as it appears in the curation log.
    pub fn tsv_line(&self) -> String {
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
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::HtmpRow;

    #[test]
    fn reads_historical_eleven_column_rows() -> Result<(), anyhow::Error> {
        let data = "WTSI\tWTSI\tCELL01\tMP:0001\tMGI:5001\tHomozygous\tSym<tm1a>\tMGI:6001\tEXP\tNot Specified\tFemale\n";
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(data.as_bytes());

        let row: HtmpRow = reader.deserialize().next().unwrap()?;
        assert_eq!("WTSI", row.phenotyping_center);
        assert_eq!("Female", row.sex);
        assert_eq!("", row.colony_id);
        assert_eq!("", row.resource_name);

        Ok(())
    }

    #[test]
    fn reads_thirteen_column_rows() -> Result<(), anyhow::Error> {
        let data = "MRC Harwell\tIMPC\tCELL01\tMP:0001\tMGI:5001\tHeterozygous\tSym<tm1a>\tMGI:6001\tEXP\tStrainX\tMale\tCOL1\tIMPC\n";
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(data.as_bytes());

        let row: HtmpRow = reader.deserialize().next().unwrap()?;
        assert_eq!("COL1", row.colony_id);
        assert_eq!("IMPC", row.resource_name);

        Ok(())
    }
}
