//! Human and JSON rendering of a [`ScenarioResult`]

use std::fmt::Write;

use colored::Colorize;
use ethers::types::{Bytes, U256};
use ethers::utils::format_ether;
use serde_json::{json, Value};

use super::result::{ScenarioResult, StepRecord};
use super::snapshot::AccountState;
use super::step::StepOutput;

/// Ether amount with trailing zeros trimmed ("1", "0.5", "0")
pub fn ether(amount: U256) -> String {
    let formatted = format_ether(amount);
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

/// Signed ether delta, `+` for gains
pub fn ether_delta((magnitude, increase): (U256, bool)) -> String {
    if magnitude.is_zero() {
        "0".to_string()
    } else if increase {
        format!("+{}", ether(magnitude))
    } else {
        format!("-{}", ether(magnitude))
    }
}

/// Account code as hex, `0x` when empty
pub fn code_hex(code: &Bytes) -> String {
    format!("0x{}", hex::encode(code))
}

fn describe_state(state: &AccountState) -> String {
    match state.delegation() {
        Some(target) => format!("{} (delegates to {:?})", code_hex(&state.code), target),
        None => code_hex(&state.code),
    }
}

fn describe_output(output: &StepOutput) -> Option<String> {
    match output {
        StepOutput::Deployed { address, receipt } => Some(format!(
            "contract {:?} (tx {:?})",
            address, receipt.transaction_hash
        )),
        StepOutput::Transaction(receipt) => Some(match receipt.gas_used {
            Some(gas) => format!("tx {:?}, gas used {}", receipt.transaction_hash, gas),
            None => format!("tx {:?}", receipt.transaction_hash),
        }),
        StepOutput::Authorization(auth) => Some(format!(
            "{:?} -> {:?} (chain {}, nonce {})",
            auth.authority, auth.address, auth.chain_id, auth.nonce
        )),
        StepOutput::Observation(snapshot) => Some(
            snapshot
                .accounts
                .iter()
                .map(|entry| {
                    format!(
                        "{} code={} balance={}",
                        entry.label,
                        code_hex(&entry.state.code),
                        ether(entry.state.balance)
                    )
                })
                .collect::<Vec<_>>()
                .join("; "),
        ),
        StepOutput::Empty => None,
    }
}

fn render_step(out: &mut String, index: usize, record: &StepRecord, verbose: bool) {
    match &record.outcome {
        Ok(output) => {
            let _ = writeln!(
                out,
                "  {} {}. {} ({:.2?})",
                "✓".green(),
                index + 1,
                record.tag,
                record.elapsed
            );
            if verbose {
                if let Some(detail) = describe_output(output) {
                    let _ = writeln!(out, "       {}", detail.dimmed());
                }
            }
        }
        Err(e) => {
            let _ = writeln!(
                out,
                "  {} {}. {} ({:.2?})",
                "✗".red(),
                index + 1,
                record.tag,
                record.elapsed
            );
            let _ = writeln!(out, "       {}", e.to_string().red());
        }
    }
}

/// Human report: account changes, one line per executed step, verdict
pub fn render(result: &ScenarioResult, verbose: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "{} (chain id {})", result.name.bold(), result.chain_id);

    let _ = writeln!(out, "\n{}", "Accounts:".cyan());
    let changes = result.changes();
    for entry in &result.before.accounts {
        let _ = writeln!(out, "  {} {:?}", entry.label.bold(), entry.address);
        let _ = writeln!(out, "    code before:    {}", describe_state(&entry.state));
        let _ = writeln!(out, "    balance before: {} ETH", ether(entry.state.balance));

        let after = result.after.as_ref().and_then(|s| s.get(&entry.label));
        let change = changes.iter().find(|c| c.label == entry.label);
        match (after, change) {
            (Some(after), Some(change)) => {
                let code_after = describe_state(after);
                if change.code_changed {
                    let _ = writeln!(out, "    code after:     {}", code_after.yellow());
                } else {
                    let _ = writeln!(out, "    code after:     {}", code_after);
                }
                let _ = writeln!(out, "    balance after:  {} ETH", ether(after.balance));
                let _ = writeln!(
                    out,
                    "    balance delta:  {} ETH",
                    ether_delta(change.balance_delta)
                );
            }
            _ => {
                let _ = writeln!(out, "    after:          {}", "unavailable".red());
            }
        }
    }
    if let Some(e) = &result.after_error {
        let _ = writeln!(out, "  {} final state unavailable: {}", "✗".red(), e);
    }

    let _ = writeln!(out, "\n{}", "Steps:".cyan());
    for (i, record) in result.steps.iter().enumerate() {
        render_step(&mut out, i, record, verbose);
    }
    let skipped = result.steps_total.saturating_sub(result.steps.len());
    if skipped > 0 {
        let _ = writeln!(out, "  {} {} step(s) not run", "-".dimmed(), skipped);
    }

    let _ = writeln!(out);
    if result.cancelled {
        let _ = writeln!(out, "{}", "Scenario cancelled".yellow().bold());
    } else if result.passed() {
        let _ = writeln!(out, "{}", "Scenario completed".green().bold());
    } else {
        let _ = writeln!(out, "{}", "Scenario failed".red().bold());
    }
    out
}

/// Print the human report to stdout
pub fn print(result: &ScenarioResult, verbose: bool) {
    print!("{}", render(result, verbose));
}

/// Machine-readable form of the result
pub fn to_json(result: &ScenarioResult) -> Value {
    let changes = result.changes();
    let accounts: Vec<Value> = result
        .before
        .accounts
        .iter()
        .map(|entry| {
            let after = result.after.as_ref().and_then(|s| s.get(&entry.label));
            let change = changes.iter().find(|c| c.label == entry.label);
            json!({
                "label": entry.label,
                "address": entry.address,
                "before": {
                    "code": code_hex(&entry.state.code),
                    "delegation": entry.state.delegation(),
                    "balance": ether(entry.state.balance),
                },
                "after": after.map(|state| json!({
                    "code": code_hex(&state.code),
                    "delegation": state.delegation(),
                    "balance": ether(state.balance),
                })),
                "codeChanged": change.map(|c| c.code_changed),
                "balanceDelta": change.map(|c| ether_delta(c.balance_delta)),
            })
        })
        .collect();

    let steps: Vec<Value> = result
        .steps
        .iter()
        .map(|record| match &record.outcome {
            Ok(output) => json!({
                "tag": record.tag,
                "success": true,
                "elapsedMs": record.elapsed.as_millis() as u64,
                "output": output,
            }),
            Err(e) => json!({
                "tag": record.tag,
                "success": false,
                "elapsedMs": record.elapsed.as_millis() as u64,
                "error": e.to_string(),
            }),
        })
        .collect();

    json!({
        "name": result.name,
        "chainId": result.chain_id,
        "passed": result.passed(),
        "cancelled": result.cancelled,
        "stepsTotal": result.steps_total,
        "afterError": result.after_error.as_ref().map(|e| e.to_string()),
        "accounts": accounts,
        "steps": steps,
    })
}
