//! Memo edit form for the send flow.
//!
//! Holds one text field seeded from the transaction being built. Submitting
//! asks the account bridge for an updated transaction and hands it, as is, to
//! the summary screen.

use fwup_error::{FwupError, FwupResult};
use serde::{Deserialize, Serialize};

/// Maximum memo size accepted by the Hedera network, in bytes.
pub const HEDERA_MEMO_MAX_BYTES: usize = 100;

/// Fields a bridge may patch on a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionPatch {
    pub memo: Option<String>,
}

/// Transactions that carry a memo the form can be seeded from.
pub trait MemoCarrier {
    fn memo(&self) -> Option<&str>;
}

/// Account-family logic that turns a patch into a new transaction.
pub trait AccountBridge {
    type Transaction: MemoCarrier + Clone;

    fn update_transaction(
        &self,
        transaction: &Self::Transaction,
        patch: TransactionPatch,
    ) -> FwupResult<Self::Transaction>;
}

/// Route parameters of the send summary screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRoute<T> {
    pub account_id: String,
    pub transaction: T,
}

pub trait SummaryNavigator<T> {
    fn navigate(&mut self, route: SummaryRoute<T>);
}

pub struct MemoForm<'a, B: AccountBridge> {
    bridge: &'a B,
    account_id: String,
    transaction: B::Transaction,
    memo: String,
}

impl<'a, B: AccountBridge> MemoForm<'a, B> {
    pub fn new(bridge: &'a B, account_id: impl Into<String>, transaction: B::Transaction) -> Self {
        let memo = transaction.memo().unwrap_or_default().to_string();
        Self {
            bridge,
            account_id: account_id.into(),
            transaction,
            memo,
        }
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn set_memo(&mut self, text: impl Into<String>) {
        self.memo = text.into();
    }

    /// Build the updated transaction and navigate to the summary.
    ///
    /// Bridge errors are returned untouched and nothing is navigated.
    pub fn submit(
        &self,
        navigator: &mut dyn SummaryNavigator<B::Transaction>,
    ) -> FwupResult<()> {
        let transaction = self.bridge.update_transaction(
            &self.transaction,
            TransactionPatch {
                memo: Some(self.memo.clone()),
            },
        )?;
        navigator.navigate(SummaryRoute {
            account_id: self.account_id.clone(),
            transaction,
        });
        Ok(())
    }
}

/// Hedera transfer being assembled by the send flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HederaTransaction {
    pub recipient: String,
    /// Amount in tinybars.
    pub amount: u64,
    #[serde(default)]
    pub use_all_amount: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl MemoCarrier for HederaTransaction {
    fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HederaBridge;

impl AccountBridge for HederaBridge {
    type Transaction = HederaTransaction;

    fn update_transaction(
        &self,
        transaction: &HederaTransaction,
        patch: TransactionPatch,
    ) -> FwupResult<HederaTransaction> {
        let mut updated = transaction.clone();
        if let Some(memo) = patch.memo {
            let memo = memo.trim();
            if memo.len() > HEDERA_MEMO_MAX_BYTES {
                return Err(FwupError::Bridge(format!(
                    "memo is {} bytes, Hedera accepts at most {}",
                    memo.len(),
                    HEDERA_MEMO_MAX_BYTES
                )));
            }
            updated.memo = (!memo.is_empty()).then(|| memo.to_string());
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingNavigator {
        routes: Vec<SummaryRoute<HederaTransaction>>,
    }

    impl SummaryNavigator<HederaTransaction> for RecordingNavigator {
        fn navigate(&mut self, route: SummaryRoute<HederaTransaction>) {
            self.routes.push(route);
        }
    }

    fn transaction(memo: Option<&str>) -> HederaTransaction {
        HederaTransaction {
            recipient: "0.0.1234".to_string(),
            amount: 150_000_000,
            use_all_amount: false,
            memo: memo.map(str::to_string),
        }
    }

    #[test]
    fn form_is_seeded_from_transaction_memo() {
        let form = MemoForm::new(&HederaBridge, "acc-1", transaction(Some("rent")));
        assert_eq!(form.memo(), "rent");
        let form = MemoForm::new(&HederaBridge, "acc-1", transaction(None));
        assert_eq!(form.memo(), "");
    }

    #[test]
    fn submit_navigates_with_updated_transaction() {
        let mut form = MemoForm::new(&HederaBridge, "acc-1", transaction(Some("rent")));
        form.set_memo("rent for march");
        let mut nav = RecordingNavigator::default();

        form.submit(&mut nav).unwrap();

        assert_eq!(
            nav.routes,
            vec![SummaryRoute {
                account_id: "acc-1".to_string(),
                transaction: transaction(Some("rent for march")),
            }]
        );
    }

    #[test]
    fn clearing_memo_removes_it() {
        let mut form = MemoForm::new(&HederaBridge, "acc-1", transaction(Some("rent")));
        form.set_memo("   ");
        let mut nav = RecordingNavigator::default();
        form.submit(&mut nav).unwrap();
        assert_eq!(nav.routes[0].transaction.memo, None);
    }

    #[test]
    fn bridge_error_propagates_without_navigation() {
        let mut form = MemoForm::new(&HederaBridge, "acc-1", transaction(None));
        form.set_memo("x".repeat(HEDERA_MEMO_MAX_BYTES + 1));
        let mut nav = RecordingNavigator::default();

        let err = form.submit(&mut nav).unwrap_err();

        assert!(matches!(err, FwupError::Bridge(_)));
        assert!(nav.routes.is_empty());
    }

    #[test]
    fn summary_route_serializes_camel_case() {
        let route = SummaryRoute {
            account_id: "acc-1".to_string(),
            transaction: transaction(Some("hi")),
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["accountId"], "acc-1");
        assert_eq!(json["transaction"]["memo"], "hi");
        assert_eq!(json["transaction"]["useAllAmount"], false);
    }
}
