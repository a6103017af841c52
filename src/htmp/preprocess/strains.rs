//! Strain reconciliation.
//!
//! Records whose colony ID does not resolve to an existing strain are
//! checked against the configured reference strains and, when everything
//! holds, produce a constructed strain name plus one strain-load line.
//! The outcome of the checks is cached per unique strain key so repeated
//! input rows are not re-processed; their report lines accumulate and are
//! written in one block at the end of the run.

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::common::NOT_SPECIFIED;
use crate::db::{CenterLookup, StrainLookup};
use crate::err::ConfigError;
use crate::htmp::preprocess::input::SourceRecord;
use crate::report::{Reporter, NEW_STRAIN_MULTI_COLONY};

/// Species of every new strain record.
const SPECIES: &str = "laboratory mouse";
/// Standard flag of every new strain record.
const STANDARD: &str = "1";

/// One strain-load row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrainLine {
    /// Constructed strain name.
    pub strain_name: String,
    /// Allele MGI ID.
    pub allele_id: String,
    /// Strain type term.
    pub strain_type: String,
    /// Species term.
    pub species: String,
    /// Standard flag.
    pub standard: String,
    /// Creator login.
    pub created_by: String,
    /// Mutant cell line of origin note.
    pub mutant_note: String,
    /// Colony ID note.
    pub colony_note: String,
    /// Pipe-delimited strain attributes.
    pub attributes: String,
}

impl StrainLine {
    /// The row as one tab-separated line for the curation log.
    pub fn tsv_line(&self) -> String {
        [
            self.strain_name.as_str(),
            self.allele_id.as_str(),
            self.strain_type.as_str(),
            self.species.as_str(),
            self.standard.as_str(),
            self.created_by.as_str(),
            self.mutant_note.as_str(),
            self.colony_note.as_str(),
            self.attributes.as_str(),
        ]
        .join("\t")
    }
}

/// Configuration of one reference strain, keyed by the provider's strain
/// name in [`StrainInfo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrainEntry {
    /// Reference strain MGI ID.
    pub reference_id: String,
    /// Root plugged into the first template slot.
    pub root: String,
    /// Name template with `%s` slots for root, allele symbol and lab code.
    pub template: String,
    /// Strain type term.
    pub strain_type: String,
    /// Colon-delimited attribute list.
    pub attributes: String,
}

/// Reference-strain configuration parsed from `--strain-info`.
#[derive(Debug, Clone, Default)]
pub struct StrainInfo {
    entries: IndexMap<String, StrainEntry>,
}

impl StrainInfo {
    /// Parse the comma-separated `inputStrain|id|root|template|type|attrs`
    /// entries.
    pub fn parse(raw: &str) -> Result<Self, anyhow::Error> {
        let mut entries = IndexMap::new();
        for item in raw.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let fields = item.split('|').collect::<Vec<_>>();
            if fields.len() != 6 {
                return Err(ConfigError::StrainInfoInvalid(item.to_string()).into());
            }
            entries.insert(
                fields[0].to_string(),
                StrainEntry {
                    reference_id: fields[1].to_string(),
                    root: fields[2].to_string(),
                    template: fields[3].to_string(),
                    strain_type: fields[4].to_string(),
                    attributes: fields[5].to_string(),
                },
            );
        }
        Ok(Self { entries })
    }

    pub fn get(&self, input_strain: &str) -> Option<&StrainEntry> {
        self.entries.get(input_strain)
    }
}

/// Fill the `%s` slots of a strain name template, in order.
pub fn fill_template(template: &str, values: &[&str]) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;
    let mut values = values.iter();
    while let Some(pos) = rest.find("%s") {
        out.push_str(&rest[..pos]);
        if let Some(value) = values.next() {
            out.push_str(value);
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

/// Outcome of strain reconciliation for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrainOutcome {
    /// Use this canonical strain name.
    Resolved(String),
    /// No genotype or annotation may be created for the record.
    Rejected,
}

/// Deferred curation-log report of one cached check.
#[derive(Debug, Clone)]
struct DeferredReport {
    category: &'static str,
    msg: String,
    /// Rejecting checks also route their lines to the error file.
    is_error: bool,
}

/// Cached result of the unique-strain checks for one key.
#[derive(Debug, Clone)]
struct CachedCheck {
    outcome: StrainOutcome,
    report: Option<DeferredReport>,
    /// All input lines that hit this key.
    lines: Vec<String>,
}

/// What the reconciler leaves behind after the input pass.
#[derive(Debug, Default)]
pub struct StrainSummary {
    /// Strain-load lines to persist, one per new strain.
    pub strain_lines: Vec<StrainLine>,
    /// (strain name, colony ID) pairs whose rows must not be loaded.
    pub excluded: IndexSet<(String, String)>,
    /// Input lines belonging to rejected records, for the error file.
    pub error_lines: Vec<String>,
    /// True when a new strain carried multiple colony IDs.
    pub conflict: bool,
}

/// Strain reconciliation engine of the preprocess stage.
pub struct StrainReconciler<'a> {
    centers: &'a CenterLookup,
    strains: &'a StrainLookup,
    info: &'a StrainInfo,
    created_by: String,
    /// Cached outcome per unique strain key.
    cache: IndexMap<String, CachedCheck>,
    /// New strain name to its pending strain-load lines.
    new_strains: IndexMap<String, IndexSet<StrainLine>>,
    /// Lines rejected outside the cached checks (multi-strain colonies).
    rejected_lines: Vec<String>,
}

impl<'a> StrainReconciler<'a> {
    pub fn new(
        centers: &'a CenterLookup,
        strains: &'a StrainLookup,
        info: &'a StrainInfo,
        created_by: &str,
    ) -> Self {
        Self {
            centers,
            strains,
            info,
            created_by: created_by.to_string(),
            cache: IndexMap::new(),
            new_strains: IndexMap::new(),
            rejected_lines: Vec::new(),
        }
    }

    /// Determine the canonical strain for one validated record.
    pub fn resolve(
        &mut self,
        rec: &SourceRecord,
        line: &str,
        reporter: &mut Reporter,
    ) -> StrainOutcome {
        // the colony ID resolves directly to existing strains
        if let Some(names) = self.strains.colony_strains.get_vec(&rec.colony_id) {
            if names.len() > 1 {
                reporter.record(
                    "colIdMultiStrains",
                    &format!(
                        "Colony ID: {} associated with multiple strains in the database: {}",
                        rec.colony_id,
                        names.join(", ")
                    ),
                    line,
                );
                for name in names {
                    if self.strains.private.contains(name) {
                        reporter.record(
                            "privateStrain",
                            &format!("Strain name match to private strain via colony ID: {name}"),
                            line,
                        );
                    }
                }
                self.rejected_lines.push(line.to_string());
                return StrainOutcome::Rejected;
            }
            let name = names[0].clone();
            if self.strains.private.contains(&name) {
                reporter.record(
                    "privateStrain",
                    &format!("Strain name match to private strain via colony ID: {name}"),
                    line,
                );
                self.rejected_lines.push(line.to_string());
                return StrainOutcome::Rejected;
            }
            if let Some((db_allele, db_mutant)) =
                self.strains
                    .genotype_mismatch(&name, &rec.allele_id, &rec.mutant_id)
            {
                reporter.record(
                    "genotypeMismatch",
                    &format!(
                        "Strain name match via colony ID: {} Genotype mismatch: \
                         MGI/database AlleleID: {} Input AlleleID: {}, \
                         MGI/database MutantID: {} Input MutantID: {}",
                        name, db_allele, rec.allele_id, db_mutant, rec.mutant_id
                    ),
                    line,
                );
                self.rejected_lines.push(line.to_string());
                return StrainOutcome::Rejected;
            }
            return StrainOutcome::Resolved(name);
        }

        // unique-strain checks, cached per key
        let key = [
            rec.allele_id.as_str(),
            rec.allele_symbol.as_str(),
            rec.input_strain.as_str(),
            rec.marker_id.as_str(),
            rec.colony_id.as_str(),
            rec.mutant_id.as_str(),
            rec.production_center.as_str(),
        ]
        .join("|");
        if let Some(cached) = self.cache.get_mut(&key) {
            cached.lines.push(line.to_string());
            return cached.outcome.clone();
        }
        self.unique_strain_checks(rec, key, line)
    }

    /// First evaluation of the checks for a unique strain key.
    fn unique_strain_checks(&mut self, rec: &SourceRecord, key: String, line: &str) -> StrainOutcome {
        let Some(lab_code) = self.centers.lab_codes.get(&rec.production_center) else {
            return self.cache_outcome(
                key,
                line,
                StrainOutcome::Rejected,
                Some(DeferredReport {
                    category: "prodCtrNotInDb",
                    msg: format!(
                        "Production Center not in MGI (voc_term table): {}",
                        rec.production_center
                    ),
                    is_error: true,
                }),
            );
        };

        let Some(entry) = self.info.get(&rec.input_strain) else {
            // the row is still usable, just with the generic strain
            return self.cache_outcome(
                key,
                line,
                StrainOutcome::Resolved(NOT_SPECIFIED.to_string()),
                Some(DeferredReport {
                    category: "inputStrainNotConfigured",
                    msg: format!(
                        "Input Strain not configured, \"Not Specified\" used : {}",
                        rec.input_strain
                    ),
                    is_error: false,
                }),
            );
        };

        let strain_name = fill_template(
            &entry.template,
            &[entry.root.as_str(), rec.allele_symbol.as_str(), lab_code],
        );

        if self.strains.multi_object_names.contains(&strain_name) {
            return self.cache_outcome(
                key,
                line,
                StrainOutcome::Rejected,
                Some(DeferredReport {
                    category: "multiStrainObjects",
                    msg: format!("Multiple strain objects in MGI for strain {strain_name}"),
                    is_error: true,
                }),
            );
        }

        // a colony ID already recorded on the constructed name cannot be
        // ours, or the colony lookup would have matched above
        if let Some(colonies) = self.strains.strain_colonies.get(&strain_name) {
            if !colonies.is_empty() {
                return self.cache_outcome(
                    key,
                    line,
                    StrainOutcome::Rejected,
                    Some(DeferredReport {
                        category: "strainColonyMismatch",
                        msg: format!(
                            "MGI/database colony ID(s) {} for strain {} does not match colony id {}",
                            colonies.join(" "),
                            strain_name,
                            rec.colony_id
                        ),
                        is_error: true,
                    }),
                );
            }
        }

        if self.strains.private.contains(&strain_name) {
            return self.cache_outcome(
                key,
                line,
                StrainOutcome::Rejected,
                Some(DeferredReport {
                    category: "privateStrain",
                    msg: format!("Strain name match to private strain in database: {strain_name}"),
                    is_error: true,
                }),
            );
        }

        if let Some((db_allele, db_mutant)) =
            self.strains
                .genotype_mismatch(&strain_name, &rec.allele_id, &rec.mutant_id)
        {
            return self.cache_outcome(
                key,
                line,
                StrainOutcome::Rejected,
                Some(DeferredReport {
                    category: "genotypeMismatch",
                    msg: format!(
                        "Strain name match in database: {} Genotype mismatch: \
                         MGI/database AlleleID: {} Input AlleleID: {}, \
                         MGI/database MutantID: {} Input MutantID: {}",
                        strain_name, db_allele, rec.allele_id, db_mutant, rec.mutant_id
                    ),
                    is_error: true,
                }),
            );
        }

        // all checks passed: register the new strain
        let strain_line = StrainLine {
            strain_name: strain_name.clone(),
            allele_id: rec.allele_id.clone(),
            strain_type: entry.strain_type.clone(),
            species: SPECIES.to_string(),
            standard: STANDARD.to_string(),
            created_by: self.created_by.clone(),
            mutant_note: rec.mutant_id.clone(),
            colony_note: rec.colony_id.clone(),
            attributes: entry.attributes.replace(':', "|"),
        };
        self.new_strains
            .entry(strain_name.clone())
            .or_default()
            .insert(strain_line);

        self.cache_outcome(key, line, StrainOutcome::Resolved(strain_name), None)
    }

    fn cache_outcome(
        &mut self,
        key: String,
        line: &str,
        outcome: StrainOutcome,
        report: Option<DeferredReport>,
    ) -> StrainOutcome {
        self.cache.insert(
            key,
            CachedCheck {
                outcome: outcome.clone(),
                report,
                lines: vec![line.to_string()],
            },
        );
        outcome
    }

    /// Report the deferred checks and resolve new-strain conflicts.
    pub fn finish(self, reporter: &mut Reporter) -> StrainSummary {
        let mut summary = StrainSummary {
            error_lines: self.rejected_lines,
            ..Default::default()
        };

        for cached in self.cache.values() {
            let Some(report) = &cached.report else {
                continue;
            };
            for line in &cached.lines {
                reporter.record(report.category, &report.msg, line);
                if report.is_error {
                    summary.error_lines.push(line.clone());
                }
            }
        }

        for (name, lines) in &self.new_strains {
            if lines.len() > 1 {
                // one arbitrary colony's strain line is persisted; all of
                // the strain's annotations are withheld and reported
                summary.conflict = true;
                for strain_line in lines {
                    summary
                        .excluded
                        .insert((name.clone(), strain_line.colony_note.clone()));
                }
                let loaded = lines.first().expect("non-empty strain line set");
                let withheld = lines.iter().skip(1).map(StrainLine::tsv_line).join("\n");
                reporter.record(
                    NEW_STRAIN_MULTI_COLONY,
                    &format!(
                        "New strain with multiple Colony IDs. Strain created, with Colony ID \
                         note:{}. Genotype and annotations not created. The following colonyID \
                         note(s) not created:",
                        loaded.colony_note
                    ),
                    &withheld,
                );
                summary.strain_lines.push(loaded.clone());
            } else {
                summary
                    .strain_lines
                    .push(lines.first().expect("non-empty strain line set").clone());
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use multimap::MultiMap;
    use pretty_assertions::assert_eq;

    use crate::db::{CenterLookup, StrainLookup};
    use crate::htmp::preprocess::input::SourceRecord;
    use crate::report::Reporter;

    use super::*;

    const STRAIN_INFO: &str = "C57BL/6N|MGI:2159965|C57BL/6N|%s-%s/%s|coisogenic|chromosome aberration:mutant strain";

    fn centers() -> CenterLookup {
        CenterLookup {
            lab_codes: HashMap::from([("WTSI".to_string(), "Wtsi".to_string())]),
            phenotyping: HashSet::from(["WTSI".to_string()]),
        }
    }

    fn record(colony_id: &str) -> SourceRecord {
        SourceRecord {
            resource_name: "IMPC".into(),
            phenotyping_center: "WTSI".into(),
            interpretation_center: "IMPC".into(),
            production_center: "WTSI".into(),
            mutant_id: "EPD001".into(),
            mp_id: "MP:0001".into(),
            allele_id: "MGI:5001".into(),
            allele_state: "Homozygous".into(),
            allele_symbol: "Sym<tm1a>".into(),
            input_strain: "C57BL/6N".into(),
            marker_id: "MGI:6001".into(),
            sex: "Female".into(),
            colony_id: colony_id.into(),
        }
    }

    #[rstest::rstest]
    #[case("%s-%s/%s", &["C57BL/6N", "Sym<tm1a>", "Wtsi"], "C57BL/6N-Sym<tm1a>/Wtsi")]
    #[case("%s", &["root"], "root")]
    #[case("fixed", &[], "fixed")]
    fn fill_template_cases(#[case] template: &str, #[case] values: &[&str], #[case] expected: &str) {
        assert_eq!(expected, fill_template(template, values));
    }

    #[test]
    fn fill_template_is_deterministic() {
        let a = fill_template("%s-%s/%s", &["C57BL/6N", "Sym<tm1a>", "Wtsi"]);
        let b = fill_template("%s-%s/%s", &["C57BL/6N", "Sym<tm1a>", "Wtsi"]);
        assert_eq!(a, b);
    }

    #[test]
    fn strain_info_parses_entries() -> Result<(), anyhow::Error> {
        let info = StrainInfo::parse(STRAIN_INFO)?;
        let entry = info.get("C57BL/6N").unwrap();
        assert_eq!("MGI:2159965", entry.reference_id);
        assert_eq!("%s-%s/%s", entry.template);
        assert_eq!("coisogenic", entry.strain_type);
        assert!(info.get("BALB/c").is_none());

        Ok(())
    }

    #[test]
    fn strain_info_rejects_short_entries() {
        assert!(StrainInfo::parse("C57BL/6N|MGI:2159965").is_err());
    }

    #[test]
    fn colony_id_resolves_existing_strain() -> Result<(), anyhow::Error> {
        let centers = centers();
        let strains = StrainLookup {
            colony_strains: MultiMap::from_iter([(
                "COL1".to_string(),
                "C57BL/6N-Sym<tm1a>/Wtsi".to_string(),
            )]),
            ..Default::default()
        };
        let info = StrainInfo::parse(STRAIN_INFO)?;
        let mut reporter = Reporter::new();
        let mut reconciler = StrainReconciler::new(&centers, &strains, &info, "htmpload");

        let outcome = reconciler.resolve(&record("COL1"), "line", &mut reporter);
        assert_eq!(
            StrainOutcome::Resolved("C57BL/6N-Sym<tm1a>/Wtsi".to_string()),
            outcome
        );
        // existing strain: no new strain line
        let summary = reconciler.finish(&mut reporter);
        assert!(summary.strain_lines.is_empty());
        assert!(!summary.conflict);

        Ok(())
    }

    #[test]
    fn colony_id_with_multiple_strains_rejects() -> Result<(), anyhow::Error> {
        let centers = centers();
        let strains = StrainLookup {
            colony_strains: MultiMap::from_iter([
                ("COL1".to_string(), "StrainA".to_string()),
                ("COL1".to_string(), "StrainB".to_string()),
            ]),
            ..Default::default()
        };
        let info = StrainInfo::parse(STRAIN_INFO)?;
        let mut reporter = Reporter::new();
        let mut reconciler = StrainReconciler::new(&centers, &strains, &info, "htmpload");

        let outcome = reconciler.resolve(&record("COL1"), "line", &mut reporter);
        assert_eq!(StrainOutcome::Rejected, outcome);
        assert_eq!(1, reporter.count("colIdMultiStrains"));

        let summary = reconciler.finish(&mut reporter);
        assert_eq!(vec!["line".to_string()], summary.error_lines);

        Ok(())
    }

    #[test]
    fn constructs_new_strain_name_from_template() -> Result<(), anyhow::Error> {
        let centers = centers();
        let strains = StrainLookup::default();
        let info = StrainInfo::parse(STRAIN_INFO)?;
        let mut reporter = Reporter::new();
        let mut reconciler = StrainReconciler::new(&centers, &strains, &info, "htmpload");

        let outcome = reconciler.resolve(&record("COL1"), "line", &mut reporter);
        assert_eq!(
            StrainOutcome::Resolved("C57BL/6N-Sym<tm1a>/Wtsi".to_string()),
            outcome
        );

        let summary = reconciler.finish(&mut reporter);
        assert_eq!(1, summary.strain_lines.len());
        let line = &summary.strain_lines[0];
        assert_eq!("C57BL/6N-Sym<tm1a>/Wtsi", line.strain_name);
        assert_eq!("laboratory mouse", line.species);
        assert_eq!("chromosome aberration|mutant strain", line.attributes);
        assert_eq!("COL1", line.colony_note);

        Ok(())
    }

    #[test]
    fn unknown_production_center_rejects() -> Result<(), anyhow::Error> {
        let centers = centers();
        let strains = StrainLookup::default();
        let info = StrainInfo::parse(STRAIN_INFO)?;
        let mut reporter = Reporter::new();
        let mut reconciler = StrainReconciler::new(&centers, &strains, &info, "htmpload");

        let mut rec = record("COL1");
        rec.production_center = "NARLabs".into();
        assert_eq!(
            StrainOutcome::Rejected,
            reconciler.resolve(&rec, "line 1", &mut reporter)
        );
        // the cached outcome is reused without re-processing
        assert_eq!(
            StrainOutcome::Rejected,
            reconciler.resolve(&rec, "line 2", &mut reporter)
        );

        let summary = reconciler.finish(&mut reporter);
        assert_eq!(2, reporter.count("prodCtrNotInDb"));
        assert_eq!(2, summary.error_lines.len());

        Ok(())
    }

    #[test]
    fn unconfigured_input_strain_falls_back_to_not_specified() -> Result<(), anyhow::Error> {
        let centers = centers();
        let strains = StrainLookup::default();
        let info = StrainInfo::parse(STRAIN_INFO)?;
        let mut reporter = Reporter::new();
        let mut reconciler = StrainReconciler::new(&centers, &strains, &info, "htmpload");

        let mut rec = record("COL1");
        rec.input_strain = "B6N Unknown".into();
        assert_eq!(
            StrainOutcome::Resolved("Not Specified".to_string()),
            reconciler.resolve(&rec, "line", &mut reporter)
        );

        let summary = reconciler.finish(&mut reporter);
        assert_eq!(1, reporter.count("inputStrainNotConfigured"));
        // a discrepancy, not an error
        assert!(summary.error_lines.is_empty());

        Ok(())
    }

    #[test]
    fn constructed_name_with_foreign_colony_rejects() -> Result<(), anyhow::Error> {
        let centers = centers();
        let strains = StrainLookup {
            strain_colonies: HashMap::from([(
                "C57BL/6N-Sym<tm1a>/Wtsi".to_string(),
                vec!["OTHER".to_string()],
            )]),
            ..Default::default()
        };
        let info = StrainInfo::parse(STRAIN_INFO)?;
        let mut reporter = Reporter::new();
        let mut reconciler = StrainReconciler::new(&centers, &strains, &info, "htmpload");

        assert_eq!(
            StrainOutcome::Rejected,
            reconciler.resolve(&record("COL1"), "line", &mut reporter)
        );
        assert_eq!(0, reporter.count("strainColonyMismatch"));
        reconciler.finish(&mut reporter);
        assert_eq!(1, reporter.count("strainColonyMismatch"));

        Ok(())
    }

    #[test]
    fn private_strain_rejects() -> Result<(), anyhow::Error> {
        let centers = centers();
        let strains = StrainLookup {
            private: HashSet::from(["C57BL/6N-Sym<tm1a>/Wtsi".to_string()]),
            ..Default::default()
        };
        let info = StrainInfo::parse(STRAIN_INFO)?;
        let mut reporter = Reporter::new();
        let mut reconciler = StrainReconciler::new(&centers, &strains, &info, "htmpload");

        assert_eq!(
            StrainOutcome::Rejected,
            reconciler.resolve(&record("COL1"), "line", &mut reporter)
        );

        Ok(())
    }

    #[test]
    fn genotype_mismatch_rejects() -> Result<(), anyhow::Error> {
        let centers = centers();
        let strains = StrainLookup {
            strain_genotypes: HashMap::from([(
                "C57BL/6N-Sym<tm1a>/Wtsi".to_string(),
                vec![("MGI:9999".to_string(), "EPD001".to_string())],
            )]),
            ..Default::default()
        };
        let info = StrainInfo::parse(STRAIN_INFO)?;
        let mut reporter = Reporter::new();
        let mut reconciler = StrainReconciler::new(&centers, &strains, &info, "htmpload");

        assert_eq!(
            StrainOutcome::Rejected,
            reconciler.resolve(&record("COL1"), "line", &mut reporter)
        );

        Ok(())
    }

    #[test]
    fn new_strain_with_multiple_colonies_is_a_conflict() -> Result<(), anyhow::Error> {
        let centers = centers();
        let strains = StrainLookup::default();
        let info = StrainInfo::parse(STRAIN_INFO)?;
        let mut reporter = Reporter::new();
        let mut reconciler = StrainReconciler::new(&centers, &strains, &info, "htmpload");

        reconciler.resolve(&record("COL1"), "line 1", &mut reporter);
        reconciler.resolve(&record("COL2"), "line 2", &mut reporter);

        let summary = reconciler.finish(&mut reporter);
        assert!(summary.conflict);
        // one arbitrary colony's line is persisted
        assert_eq!(1, summary.strain_lines.len());
        assert_eq!("COL1", summary.strain_lines[0].colony_note);
        // but the strain's annotations are withheld for both colonies
        assert!(summary
            .excluded
            .contains(&("C57BL/6N-Sym<tm1a>/Wtsi".to_string(), "COL1".to_string())));
        assert!(summary
            .excluded
            .contains(&("C57BL/6N-Sym<tm1a>/Wtsi".to_string(), "COL2".to_string())));
        assert_eq!(1, reporter.count(crate::report::NEW_STRAIN_MULTI_COLONY));

        Ok(())
    }
}
