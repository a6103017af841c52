//! Curation log reporting.
//!
//! Stages collect category-tagged error records while they run and write
//! them to the curation log in one grouped block at the end, so curators
//! see all records of one error kind together.  The collector itself has
//! no file handle; tests inspect it directly.

use std::io::Write;

use indexmap::IndexMap;

/// Category of the fatal new-strain/multi-colony conflict; always written
/// before all other categories.
pub const NEW_STRAIN_MULTI_COLONY: &str = "newStrainMultiColId";

/// One collected error record.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    /// Human-readable message.
    msg: String,
    /// The input line the message refers to.
    line: String,
}

/// Collects category-tagged error records for the curation log.
#[derive(Debug, Default)]
pub struct Reporter {
    /// Records per category, in first-occurrence order.
    sections: IndexMap<String, Vec<Entry>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one error under `category`.
    pub fn record(&mut self, category: &str, msg: &str, line: &str) {
        tracing::warn!("{}: {}", category, msg);
        self.sections
            .entry(category.to_string())
            .or_default()
            .push(Entry {
                msg: msg.to_string(),
                line: line.to_string(),
            });
    }

    /// Number of records collected under `category`.
    pub fn count(&self, category: &str) -> usize {
        self.sections.get(category).map(Vec::len).unwrap_or(0)
    }

    /// Total number of records across all categories.
    pub fn total(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    /// Append the stage banner and all collected records to `out`, the
    /// fatal `newStrainMultiColId` category first.
    pub fn write_curation_log<W: Write>(&self, stage: &str, out: &mut W) -> Result<(), anyhow::Error> {
        writeln!(out, "\n\n######################################")?;
        writeln!(out, "########## {stage} log ##########")?;
        writeln!(out, "######################################\n")?;

        if let Some(entries) = self.sections.get(NEW_STRAIN_MULTI_COLONY) {
            for entry in entries {
                write_entry(out, entry)?;
            }
        }
        for (category, entries) in &self.sections {
            if category == NEW_STRAIN_MULTI_COLONY {
                continue;
            }
            for entry in entries {
                write_entry(out, entry)?;
            }
        }
        out.flush()?;

        Ok(())
    }
}

fn write_entry<W: Write>(out: &mut W, entry: &Entry) -> Result<(), anyhow::Error> {
    writeln!(out, "\n***********\nerrMsg: {}\n{}", entry.msg, entry.line)?;
    Ok(())
}
