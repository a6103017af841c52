//! Common functionality.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

pub mod io;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Login of the automated load user.  Only records created by this user may
/// be re-used by the load; curator-created records are off limits.
pub const DEFAULT_CREATED_BY: &str = "htmpload";

/// Evidence code assigned to every high-throughput annotation.
pub const EVIDENCE_CODE: &str = "EXP";

/// Fallback strain name when no canonical strain can be determined.
pub const NOT_SPECIFIED: &str = "Not Specified";

/// Allele zygosity after canonicalization of the provider vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Zygosity {
    /// One mutant allele, one wild-type allele.
    #[strum(serialize = "Heterozygous")]
    Heterozygous,
    /// Two copies of the mutant allele.
    #[strum(serialize = "Homozygous")]
    Homozygous,
    /// Single-copy allele on a sex chromosome; refined by marker chromosome.
    #[strum(serialize = "Hemizygous")]
    Hemizygous,
    /// Zygosity not reported by the provider.
    #[strum(serialize = "Indeterminate")]
    Indeterminate,
}

impl std::str::FromStr for Zygosity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "het" | "heterozygote" | "heterozygous" => Zygosity::Heterozygous,
            "hom" | "homozygote" | "homozygous" => Zygosity::Homozygous,
            "hemi" | "hemizygote" | "hemizygous" => Zygosity::Hemizygous,
            "" | "indeterminate" => Zygosity::Indeterminate,
            _ => anyhow::bail!("unrecognized allele state: {:?}", s),
        })
    }
}

/// Allele pair state of a genotype; `Hemizygous` input rows are refined to
/// the X- or Y-linked state by the marker's chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum PairState {
    #[strum(serialize = "Heterozygous")]
    Heterozygous,
    #[strum(serialize = "Homozygous")]
    Homozygous,
    #[strum(serialize = "Hemizygous X-linked")]
    HemizygousXLinked,
    #[strum(serialize = "Hemizygous Y-linked")]
    HemizygousYLinked,
    #[strum(serialize = "Indeterminate")]
    Indeterminate,
}

impl std::str::FromStr for PairState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Heterozygous" => PairState::Heterozygous,
            "Homozygous" => PairState::Homozygous,
            "Hemizygous X-linked" => PairState::HemizygousXLinked,
            "Hemizygous Y-linked" => PairState::HemizygousYLinked,
            "Indeterminate" => PairState::Indeterminate,
            _ => anyhow::bail!("unrecognized pair state: {:?}", s),
        })
    }
}

/// Sex value of an HTMP row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Sex {
    #[strum(serialize = "Male")]
    Male,
    #[strum(serialize = "Female")]
    Female,
    /// Duplicate rows differing only in sex are merged to this value.
    #[strum(serialize = "Both")]
    Both,
    /// Not reported; rendered as the empty string in intermediate files.
    #[strum(serialize = "")]
    Unknown,
}

impl Sex {
    /// The code used in the annotation properties column.
    pub fn annotation_code(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Both | Sex::Unknown => "NA",
        }
    }
}

impl std::str::FromStr for Sex {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "male" => Sex::Male,
            "female" => Sex::Female,
            "both" => Sex::Both,
            "" | "no_data" => Sex::Unknown,
            _ => anyhow::bail!("unrecognized sex value: {:?}", s),
        })
    }
}

/// Select the provider flavor of the preprocess stage.
#[derive(clap::ValueEnum, Clone, Copy, Debug, strum::Display, PartialEq, Eq)]
pub enum LoadType {
    /// IMPC phenotype (MP) documents.
    #[strum(serialize = "impc")]
    Impc,
    /// IMPC expression (LacZ) documents.
    #[strum(serialize = "lacz")]
    Lacz,
}

/// Select whether the strain loader writes to the database.
#[derive(clap::ValueEnum, Clone, Copy, Debug, strum::Display, PartialEq, Eq)]
pub enum StrainMode {
    /// Write the table files only.
    #[strum(serialize = "preview")]
    Preview,
    /// Write the table files and bulk-copy them into the database.
    #[strum(serialize = "load")]
    Load,
}

/// The load date stamped into annotation rows.
pub fn load_date() -> String {
    chrono::Local::now().format("%m/%d/%Y").to_string()
}
