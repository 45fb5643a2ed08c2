//! `fwup memo` command implementation

use anyhow::{Context, Result};
use fwup_workflow::{HederaBridge, HederaTransaction, MemoForm, SummaryNavigator, SummaryRoute};
use std::path::Path;

/// Navigator that keeps the route instead of opening a screen.
#[derive(Default)]
struct CapturedRoute(Option<SummaryRoute<HederaTransaction>>);

impl SummaryNavigator<HederaTransaction> for CapturedRoute {
    fn navigate(&mut self, route: SummaryRoute<HederaTransaction>) {
        self.0 = Some(route);
    }
}

pub fn load_transaction(path: &Path) -> Result<HederaTransaction> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transaction {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid transaction JSON in {}", path.display()))
}

/// Apply `memo` through the Hedera bridge and return the summary route.
pub fn edit_memo(
    account_id: &str,
    transaction: HederaTransaction,
    memo: &str,
) -> Result<SummaryRoute<HederaTransaction>> {
    let bridge = HederaBridge;
    let mut form = MemoForm::new(&bridge, account_id, transaction);
    log::debug!("Editing memo (was {:?})", form.memo());
    form.set_memo(memo);

    let mut nav = CapturedRoute::default();
    form.submit(&mut nav)?;
    nav.0.context("Memo form did not navigate to the summary")
}

pub fn run(transaction: &Path, memo: &str, account_id: &str) -> Result<()> {
    let tx = load_transaction(transaction)?;
    let route = edit_memo(account_id, tx, memo)?;
    println!("{}", serde_json::to_string_pretty(&route)?);
    Ok(())
}
