//! Order-preserving removal of transactions the model reported twice.

use slipscan_core::NormalizedTransaction;

/// Amounts closer than this are the same charge.
pub const AMOUNT_TOLERANCE: f64 = 0.01;

/// Same date, same description, amounts within a cent.
pub fn is_duplicate(a: &NormalizedTransaction, b: &NormalizedTransaction) -> bool {
    a.date == b.date
        && a.description == b.description
        && (a.amount - b.amount).abs() < AMOUNT_TOLERANCE
}

/// Keep the first occurrence of each transaction, in source order.
///
/// Custom-split entries are always kept and never suppress anything: several
/// of them can legitimately share date, description and amount.
pub fn dedupe(txns: Vec<NormalizedTransaction>) -> Vec<NormalizedTransaction> {
    let mut kept: Vec<NormalizedTransaction> = Vec::with_capacity(txns.len());
    for txn in txns {
        if txn.is_custom_split() {
            kept.push(txn);
            continue;
        }
        let seen = kept
            .iter()
            .filter(|k| !k.is_custom_split())
            .any(|k| is_duplicate(k, &txn));
        if !seen {
            kept.push(txn);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use slipscan_core::{Category, SplitType, TxType};

    fn txn(date: &str, desc: &str, amount: f64) -> NormalizedTransaction {
        NormalizedTransaction::new(date, desc, Category::Food.into(), amount, TxType::Expense)
    }

    #[test]
    fn test_keeps_first_of_near_equal_pair() {
        let out = dedupe(vec![
            txn("2025-01-01", "Cafe", 5.00),
            txn("2025-01-01", "Cafe", 5.004),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].amount, 5.00);
    }

    #[test]
    fn test_distinct_fields_survive() {
        let out = dedupe(vec![
            txn("2025-01-01", "Cafe", 5.00),
            txn("2025-01-02", "Cafe", 5.00),
            txn("2025-01-01", "Cafe ", 5.00),
            txn("2025-01-01", "Cafe", 5.02),
        ]);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_order_is_preserved() {
        let out = dedupe(vec![
            txn("2025-01-03", "C", 3.0),
            txn("2025-01-01", "A", 1.0),
            txn("2025-01-03", "C", 3.0),
            txn("2025-01-02", "B", 2.0),
            txn("2025-01-01", "A", 1.0),
        ]);
        let descs: Vec<_> = out.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descs, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_custom_splits_are_exempt() {
        let mut a = txn("2025-01-01", "Dinner", 60.0);
        a.split_type = Some(SplitType::Custom);
        let b = a.clone();
        let plain = txn("2025-01-01", "Dinner", 60.0);

        let out = dedupe(vec![a, b, plain]);
        assert_eq!(out.len(), 3);
    }
}
