//! Post-load housekeeping.
//!
//! After the bulk annotation load: rebuild the cached MP annotation
//! headers for the genotypes the load touched, then upgrade germline
//! transmission for the affected alleles and record their `Transmission`
//! and `Used-FC` reference associations.  Idempotent for a fixed reference
//! set; re-running converges on the same state.

use clap::Parser;

use crate::db::pg::MgdDb;

/// Command line arguments for `post-mp` sub command.
#[derive(Parser, Debug)]
#[command(about = "Post-load annotation header and transmission fixup", long_about = None)]
pub struct Args {
    /// Reference keys of the load (comma separated).
    #[arg(long, env = "JNUMKEYS", value_delimiter = ',', required = true)]
    pub jnum_keys: Vec<i32>,
    /// Login of the load user.
    #[arg(long, env = "CREATEDBY", default_value = crate::common::DEFAULT_CREATED_BY)]
    pub created_by: String,
    /// Connection URL of the curation database.
    #[arg(long, env = "MGD_DBURL")]
    pub database_url: String,
}

/// Main entry point for the `post-mp` command.
pub fn run(common_args: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    tracing::info!("Starting `post-mp`");
    tracing::info!("  common_args = {:?}", &common_args);
    tracing::info!("  args = {:?}", &args);

    let mut db = MgdDb::connect(&args.database_url)?;
    let user_key = db.user_key(&args.created_by)?;

    // annotation headers: delete the stale rows scoped to our references,
    // then recompute for every genotype left without headers
    let deleted = db.delete_annot_headers(&args.jnum_keys)?;
    tracing::info!("deleted {} annotation header rows", deleted);
    let missing = db.genotypes_missing_headers()?;
    tracing::info!("recomputing headers for {} genotypes", missing.len());
    for genotype_key in missing {
        db.process_annot_header(genotype_key)?;
    }

    for &jnum_key in &args.jnum_keys {
        let alleles = db.alleles_pending_transmission(jnum_key)?;
        tracing::info!(
            "upgrading germline transmission for {} alleles (refs key {})",
            alleles.len(),
            jnum_key
        );
        for allele_key in alleles {
            db.set_germline_transmission(allele_key, user_key)?;
            db.insert_reference_assoc(allele_key, jnum_key, "Transmission")?;
        }

        let alleles = db.alleles_used_fc(jnum_key)?;
        tracing::info!(
            "recording Used-FC associations for {} alleles (refs key {})",
            alleles.len(),
            jnum_key
        );
        for allele_key in alleles {
            db.insert_reference_assoc(allele_key, jnum_key, "Used-FC")?;
        }
    }

    Ok(())
}
