use std::{collections::BTreeMap, path::Path};

use {
    anyhow::{Context, Result},
    stubwire_messaging::{MessageStubMapping, parse_mappings},
};

const GREEN: &str = "\x1b[32m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub fn check(path: &Path, default_priority: i32, verbose: bool) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let mappings =
        parse_mappings(&raw).with_context(|| format!("parsing {}", path.display()))?;

    eprintln!("Checking {}\n", path.display());
    if verbose {
        for line in describe(&mappings, default_priority) {
            println!("  {line}");
        }
        println!();
    }
    println!("{GREEN}{BOLD}ok{RESET}: {}", summarize(&mappings));
    Ok(())
}

/// One line per mapping, in the order stubs are tried.
fn describe(mappings: &[MessageStubMapping], default_priority: i32) -> Vec<String> {
    let mut sorted: Vec<&MessageStubMapping> = mappings.iter().collect();
    sorted.sort_by_key(|m| m.priority_or(default_priority));
    sorted
        .into_iter()
        .map(|m| {
            format!(
                "[{}] {} ({}): {} trigger, {} action(s)",
                m.priority_or(default_priority),
                m.label(),
                m.id(),
                m.trigger().kind(),
                m.actions().len()
            )
        })
        .collect()
}

fn summarize(mappings: &[MessageStubMapping]) -> String {
    let mut by_kind: BTreeMap<&str, usize> = BTreeMap::new();
    for mapping in mappings {
        *by_kind.entry(mapping.trigger().kind()).or_default() += 1;
    }
    let kinds: Vec<String> = by_kind
        .iter()
        .map(|(kind, count)| format!("{count} {kind}"))
        .collect();
    if kinds.is_empty() {
        "0 message stub mappings".into()
    } else {
        format!("{} message stub mappings ({})", mappings.len(), kinds.join(", "))
    }
}
