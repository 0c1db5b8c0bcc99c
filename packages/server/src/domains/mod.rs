// Business domains
pub mod backfill;
