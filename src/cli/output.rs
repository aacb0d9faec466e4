//! Output formatting for CLI commands

use crate::domain::X509CertRecord;
use crate::services::LedgerOutcome;
use anyhow::{Context, Result};
use serde::Serialize;

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Print a looked-up record, or why there is none
pub fn print_record_outcome(outcome: LedgerOutcome<Option<X509CertRecord>>) -> Result<()> {
    match outcome {
        LedgerOutcome::Completed(Some(record)) => print_json(&record),
        LedgerOutcome::Completed(None) => {
            println!("No certificate record found");
            Ok(())
        }
        LedgerOutcome::Skipped(reason) => {
            println!("No certificate record ({})", reason);
            Ok(())
        }
    }
}

/// Print the result of an insert, update or delete
pub fn print_mutation_outcome(
    action: &str,
    provider: &str,
    instance_id: &str,
    outcome: LedgerOutcome<bool>,
) -> Result<()> {
    println!("{}", describe_mutation(action, provider, instance_id, &outcome));
    if outcome.succeeded() {
        Ok(())
    } else {
        anyhow::bail!("{} did not complete for {}/{}", action, provider, instance_id)
    }
}

fn describe_mutation(
    action: &str,
    provider: &str,
    instance_id: &str,
    outcome: &LedgerOutcome<bool>,
) -> String {
    match outcome {
        LedgerOutcome::Completed(true) => format!("{}: {}/{} ok", action, provider, instance_id),
        LedgerOutcome::Completed(false) => {
            format!("{}: {}/{} rejected by the store", action, provider, instance_id)
        }
        LedgerOutcome::Skipped(reason) => {
            format!("{}: {}/{} skipped ({})", action, provider, instance_id, reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::SkipReason;

    #[test]
    fn test_describe_mutation() {
        assert_eq!(
            describe_mutation("delete", "ostk", "1001", &LedgerOutcome::Completed(true)),
            "delete: ostk/1001 ok"
        );
        assert_eq!(
            describe_mutation(
                "register",
                "ostk",
                "1001",
                &LedgerOutcome::Skipped(SkipReason::StoreNotConfigured)
            ),
            "register: ostk/1001 skipped (store_not_configured)"
        );
    }

    #[test]
    fn test_failed_mutation_is_an_error() {
        assert!(print_mutation_outcome("renew", "ostk", "1001", LedgerOutcome::Completed(false))
            .is_err());
    }
}
