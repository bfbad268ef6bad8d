//! # Refund Chain
//!
//! A refund points at the transaction it refunds through
//! `original_transaction_id`. The walk follows those links with an ancestor
//! set and a depth limit, so corrupt data (a cycle, or an absurdly long
//! chain) is reported instead of looping.
//!
//! ```text
//! refund R2 ──► refund R1 ──► sale S        OK, chain = [R1, S]
//! refund R1 ──► refund R2 ──► refund R1     Cycle { at: R1 }
//! ```

use std::collections::HashSet;

use crate::types::SalesTransaction;

/// Default maximum number of links followed.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Why a chain could not be walked to its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainBreak {
    /// The chain revisits a transaction.
    Cycle { at: String },
    /// The chain is longer than the depth limit.
    TooDeep { depth: usize },
}

/// Walks the refund chain starting at `start`.
///
/// Returns the ids of the ancestors in order. A link to a transaction that
/// `lookup` does not know ends the walk normally; originals from other
/// shifts are not always loaded.
///
/// ## Example
/// ```rust
/// use titan_core::refund_chain::{walk_refund_chain, ChainBreak};
/// # use titan_core::{SalesTransaction, TransactionType, PaymentMethod};
/// # fn txn(id: &str, original: Option<&str>) -> SalesTransaction {
/// #     SalesTransaction {
/// #         id: id.to_string(), shift_id: "s".to_string(),
/// #         transaction_type: TransactionType::Refund, payment_method: PaymentMethod::Cash,
/// #         total_cents: 100, cash_amount_cents: None, void_reason: None,
/// #         manager_approval_id: None, is_partial_refund: false,
/// #         original_transaction_id: original.map(str::to_string), created_at: 0,
/// #     }
/// # }
/// let a = txn("a", Some("b"));
/// let b = txn("b", Some("a"));
/// let lookup = |id: &str| [&a, &b].into_iter().find(|t| t.id == id);
///
/// assert_eq!(
///     walk_refund_chain(&a, lookup, 8),
///     Err(ChainBreak::Cycle { at: "a".to_string() })
/// );
/// ```
pub fn walk_refund_chain<'a, F>(
    start: &'a SalesTransaction,
    lookup: F,
    max_depth: usize,
) -> Result<Vec<String>, ChainBreak>
where
    F: Fn(&str) -> Option<&'a SalesTransaction>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(start.id.as_str());

    let mut chain = Vec::new();
    let mut current = start;

    while let Some(next_id) = current.original_transaction_id.as_deref() {
        if !seen.insert(next_id) {
            return Err(ChainBreak::Cycle {
                at: next_id.to_string(),
            });
        }
        if chain.len() >= max_depth {
            return Err(ChainBreak::TooDeep {
                depth: chain.len() + 1,
            });
        }
        chain.push(next_id.to_string());

        match lookup(next_id) {
            Some(next) => current = next,
            None => break,
        }
    }

    Ok(chain)
}

// =============================================================================
// Unit Tests
// =============================================================================
