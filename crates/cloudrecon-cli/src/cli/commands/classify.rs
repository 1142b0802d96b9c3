//! `cloudrecon classify <code>` – show the verdict for a vendor error code.

use anyhow::Result;
use cloudrecon_core::config::ReconConfig;
use cloudrecon_core::retry::{Cause, ClassifiedError, CodeClass, ErrorTable, Verdict};
use cloudrecon_core::{Operation, RemoteError};

use crate::cli::CallKind;

fn class_name(class: Option<CodeClass>) -> &'static str {
    match class {
        Some(CodeClass::Transient) => "transient",
        Some(CodeClass::Transport) => "transport",
        Some(CodeClass::Absent) => "absent",
        Some(CodeClass::Fatal) => "fatal",
        None => "unlisted (fatal)",
    }
}

fn verdict_name(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Retryable => "retryable",
        Verdict::Fatal => "fatal",
        Verdict::Absent => "absent",
    }
}

/// What the retry loop does with `code` at a call site of kind `kind`.
fn outcome(table: &ErrorTable, op: &Operation, kind: CallKind, code: &str) -> &'static str {
    let err = RemoteError::new(code, "");
    let converted = match kind {
        CallKind::Read => table.for_read(op, err),
        CallKind::Write => table.for_write(op, err),
        CallKind::Poll => table.for_poll(op, err),
        CallKind::Delete => match table.for_delete(op, err) {
            Ok(()) => return "stop: treated as already deleted",
            Err(e) => e,
        },
    };
    match converted {
        ClassifiedError::Retryable(Cause::Missing(_)) => "retry: resource not visible yet",
        ClassifiedError::Retryable(_) => "retry with backoff",
        ClassifiedError::Fatal(Cause::Missing(_)) => "stop: not found",
        ClassifiedError::Fatal(_) => "stop: fatal",
    }
}

pub fn run_classify(
    cfg: &ReconConfig,
    code: &str,
    non_idempotent: bool,
    kind: CallKind,
) -> Result<()> {
    let table = ErrorTable::from_config(&cfg.error_codes);
    let mut op = Operation::new("classify");
    if non_idempotent {
        op = op.non_idempotent();
    }
    let verdict = table.classify(&op, &RemoteError::new(code, ""));

    println!("{:<12} {}", "code:", code);
    println!("{:<12} {}", "class:", class_name(table.lookup(code)));
    println!("{:<12} {}", "idempotent:", op.idempotent);
    println!("{:<12} {}", "verdict:", verdict_name(verdict));
    println!(
        "{:<12} {}",
        format!("as {:?}:", kind).to_lowercase(),
        outcome(&table, &op, kind, code)
    );
    Ok(())
}
