//! # Checkout Finalizer
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  finalize(session)                                                      │
//! │    │                                                                    │
//! │    ├── begin_checkout()          Idle → Processing, cart frozen         │
//! │    │                                                                    │
//! │    ├── ┌─ pre-commit (abortable, bounded by settlement_timeout) ──┐     │
//! │    │   │  1. re-check: fresh products + ledger, whole cart        │     │
//! │    │   │  2. settle the total                                     │     │
//! │    │   └──────────────────────────────────────────────────────────┘     │
//! │    │        abort → Cancelled     timeout → TimedOut                    │
//! │    │                                                                    │
//! │    ├── 3. commit (one transaction, conditional decrements)              │
//! │    │        StockConflict → re-check + commit once more                 │
//! │    │        still failing → void settlement, CommitConflict             │
//! │    │                                                                    │
//! │    └── Completed (cart cleared) or Failed (cart kept) → Idle            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing before step 3 writes to the database, so every failure up to the
//! commit leaves the ledger untouched. A failed commit rolls itself back.

use std::future::Future;
#[cfg(test)]
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use lumina_core::{check_cart, Cart, Consumption, Product};
use lumina_db::{generate_checkout_id, Database, DbError, NewCheckout, NewCheckoutLine};

use super::settlement::{Settlement, SettlementReceipt, SettlementRequest};
use super::{CheckoutError, CheckoutOutcome};
use crate::state::CartState;

const DEFAULT_SETTLEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Drives one cart session through a checkout.
pub struct CheckoutFinalizer<S> {
    db: Database,
    settlement: S,
    settlement_timeout: Duration,
    #[cfg(test)]
    retry_gate: Option<RetryGate>,
}

/// Pauses a checkout between a conflicted commit and its re-check.
#[cfg(test)]
#[derive(Clone, Default)]
struct RetryGate {
    conflicted: Arc<tokio::sync::Notify>,
    resume: Arc<tokio::sync::Notify>,
}

impl<S: Settlement> CheckoutFinalizer<S> {
    pub fn new(db: Database, settlement: S) -> Self {
        CheckoutFinalizer {
            db,
            settlement,
            settlement_timeout: DEFAULT_SETTLEMENT_TIMEOUT,
            #[cfg(test)]
            retry_gate: None,
        }
    }

    #[cfg(test)]
    fn with_retry_gate(mut self, gate: RetryGate) -> Self {
        self.retry_gate = Some(gate);
        self
    }

    /// Bounds re-check plus settlement.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settlement_timeout = timeout;
        self
    }

    pub fn settlement(&self) -> &S {
        &self.settlement
    }

    /// Checks out the session's cart.
    ///
    /// ## Returns
    /// * `Ok(CheckoutOutcome)` - committed, cart cleared
    /// * `Err(CheckoutError)` - nothing committed, cart kept
    pub async fn finalize(&self, session: &CartState) -> Result<CheckoutOutcome, CheckoutError> {
        self.finalize_until(session, std::future::pending::<()>())
            .await
    }

    /// Like [`finalize`](Self::finalize), abandoning the checkout with
    /// `Cancelled` if `abort` resolves before the commit starts.
    pub async fn finalize_until<A>(
        &self,
        session: &CartState,
        abort: A,
    ) -> Result<CheckoutOutcome, CheckoutError>
    where
        A: Future<Output = ()>,
    {
        let (guard, cart) = session.begin_checkout()?;
        let checkout_id = generate_checkout_id();

        info!(
            checkout_id = %checkout_id,
            lines = cart.lines().len(),
            "Checkout started"
        );

        match self.run(&checkout_id, &cart, abort).await {
            Ok(outcome) => {
                guard.complete();
                info!(
                    checkout_id = %checkout_id,
                    total = outcome.record.total.cents(),
                    attempts = outcome.attempts,
                    "Checkout completed"
                );
                Ok(outcome)
            }
            Err(e) => {
                guard.fail();
                warn!(checkout_id = %checkout_id, error = %e, "Checkout failed");
                Err(e)
            }
        }
    }

    async fn run<A>(
        &self,
        checkout_id: &str,
        cart: &Cart,
        abort: A,
    ) -> Result<CheckoutOutcome, CheckoutError>
    where
        A: Future<Output = ()>,
    {
        let totals = cart.totals();

        let pre_commit = async {
            let consumption = self.recheck(cart).await?;
            let receipt = self
                .settlement
                .settle(SettlementRequest {
                    checkout_id: checkout_id.to_string(),
                    amount: totals.total,
                })
                .await?;
            Ok::<_, CheckoutError>((consumption, receipt))
        };

        let (consumption, receipt) = tokio::select! {
            biased;

            _ = abort => {
                info!(checkout_id = %checkout_id, "Checkout aborted before commit");
                return Err(CheckoutError::Cancelled);
            }

            result = tokio::time::timeout(self.settlement_timeout, pre_commit) => match result {
                Ok(settled) => settled?,
                Err(_) => {
                    return Err(CheckoutError::TimedOut {
                        after_ms: self.settlement_timeout.as_millis() as u64,
                    });
                }
            },
        };

        debug!(checkout_id = %checkout_id, reference = %receipt.reference, "Settled, committing");

        let mut checkout = NewCheckout {
            id: checkout_id.to_string(),
            lines: cart
                .lines()
                .iter()
                .map(|line| NewCheckoutLine {
                    product_id: line.product.id.clone(),
                    name: line.product.name.clone(),
                    unit_price: line.product.unit_price,
                    quantity: line.quantity,
                })
                .collect(),
            consumption,
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            settlement_reference: Some(receipt.reference.clone()),
        };

        let mut attempts = 0;
        loop {
            attempts += 1;

            match self.db.checkouts().commit(&checkout).await {
                Ok(record) => {
                    return Ok(CheckoutOutcome {
                        record,
                        lines: cart.snapshot().lines,
                        attempts,
                    });
                }
                Err(DbError::StockConflict { resource, .. }) if attempts == 1 => {
                    warn!(checkout_id = %checkout_id, resource = %resource, "Commit conflict, re-checking");

                    #[cfg(test)]
                    if let Some(gate) = &self.retry_gate {
                        gate.conflicted.notify_one();
                        gate.resume.notified().await;
                    }

                    match self.recheck(cart).await {
                        Ok(consumption) => checkout.consumption = consumption,
                        Err(CheckoutError::Denied(denied)) => {
                            self.void(&receipt).await;
                            return Err(CheckoutError::CommitConflict {
                                resource,
                                reasons: denied.reasons,
                            });
                        }
                        Err(e) => {
                            self.void(&receipt).await;
                            return Err(e);
                        }
                    }
                }
                Err(DbError::StockConflict { resource, .. }) => {
                    self.void(&receipt).await;
                    return Err(CheckoutError::CommitConflict {
                        resource,
                        reasons: Vec::new(),
                    });
                }
                Err(e) => {
                    self.void(&receipt).await;
                    return Err(e.into());
                }
            }
        }
    }

    /// Whole-cart check against the current catalog and ledger.
    ///
    /// Finished stock and bills of materials come from fresh product rows;
    /// quantities come from the frozen cart.
    async fn recheck(&self, cart: &Cart) -> Result<Consumption, CheckoutError> {
        let ids: Vec<String> = cart.lines().iter().map(|l| l.product.id.clone()).collect();
        let products = self.db.products().get_many(&ids).await?;

        if products.len() != ids.len() {
            let missing = ids
                .iter()
                .find(|id| !products.iter().any(|p| &p.id == *id))
                .cloned()
                .unwrap_or_default();
            return Err(CheckoutError::ProductNotFound(missing));
        }

        // get_many keeps the order of `ids`, which is cart order
        let lines: Vec<(&Product, i64)> = products
            .iter()
            .zip(cart.lines().iter().map(|l| l.quantity))
            .collect();

        let material_ids = Consumption::from_lines(lines.iter().copied()).material_ids();
        let ledger = self.db.materials().ledger_for(&material_ids).await?;

        let consumption = check_cart(lines.iter().copied(), &ledger)?;
        debug!(
            products = consumption.products.len(),
            materials = consumption.materials.len(),
            "Re-check passed"
        );
        Ok(consumption)
    }

    async fn void(&self, receipt: &SettlementReceipt) {
        match self.settlement.void(receipt).await {
            Ok(()) => info!(reference = %receipt.reference, "Settlement voided"),
            Err(e) => error!(
                reference = %receipt.reference,
                error = %e,
                "Failed to void settlement after aborted commit"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::{Barrier, Notify};

    use crate::checkout::{InstantSettlement, SettlementError};
    use crate::commands::cart::add_to_cart;
    use lumina_core::{
        CheckoutPhase, CoreError, DenialReason, Money, Quantity, RawMaterial, TaxRate,
    };
    use lumina_db::{DbConfig, SeedData};

    // =========================================================================
    // Test Settlements
    // =========================================================================

    fn receipt_for(request: SettlementRequest, prefix: &str) -> SettlementReceipt {
        SettlementReceipt {
            reference: format!("{}-{}", prefix, request.checkout_id),
            checkout_id: request.checkout_id,
            amount: request.amount,
        }
    }

    struct DecliningSettlement;

    impl Settlement for DecliningSettlement {
        async fn settle(&self, _: SettlementRequest) -> Result<SettlementReceipt, SettlementError> {
            Err(SettlementError::Declined("card rejected".to_string()))
        }

        async fn void(&self, _: &SettlementReceipt) -> Result<(), SettlementError> {
            Ok(())
        }
    }

    /// Never resolves.
    struct PendingSettlement;

    impl Settlement for PendingSettlement {
        async fn settle(&self, _: SettlementRequest) -> Result<SettlementReceipt, SettlementError> {
            std::future::pending().await
        }

        async fn void(&self, _: &SettlementReceipt) -> Result<(), SettlementError> {
            Ok(())
        }
    }

    /// Signals `entered`, then waits for `release`.
    #[derive(Clone, Default)]
    struct GateSettlement {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    impl Settlement for GateSettlement {
        async fn settle(&self, request: SettlementRequest) -> Result<SettlementReceipt, SettlementError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(receipt_for(request, "gate"))
        }

        async fn void(&self, _: &SettlementReceipt) -> Result<(), SettlementError> {
            Ok(())
        }
    }

    /// Holds every settle until all parties have settled, then counts voids.
    #[derive(Clone)]
    struct BarrierSettlement {
        barrier: Arc<Barrier>,
        voids: Arc<AtomicUsize>,
    }

    impl Settlement for BarrierSettlement {
        async fn settle(&self, request: SettlementRequest) -> Result<SettlementReceipt, SettlementError> {
            self.barrier.wait().await;
            Ok(receipt_for(request, "barrier"))
        }

        async fn void(&self, _: &SettlementReceipt) -> Result<(), SettlementError> {
            self.voids.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn seeded() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.seed(&SeedData::embedded().unwrap()).await.unwrap();
        db
    }

    fn session() -> CartState {
        CartState::new(TaxRate::from_bps(1600))
    }

    async fn add(db: &Database, state: &CartState, id: &str, times: usize) {
        for _ in 0..times {
            add_to_cart(db, state, id).await.unwrap();
        }
    }

    async fn ledger_snapshot(db: &Database) -> (Vec<Product>, Vec<RawMaterial>) {
        (
            db.products().list().await.unwrap(),
            db.materials().list().await.unwrap(),
        )
    }

    async fn material(db: &Database, id: &str) -> Quantity {
        db.materials().get_by_id(id).await.unwrap().unwrap().available
    }

    async fn stock(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().finished_stock
    }

    // =========================================================================
    // Tests
    // =========================================================================

    #[tokio::test]
    async fn test_finalize_commits_and_clears_cart() {
        let db = seeded().await;
        let state = session();
        add(&db, &state, "POS-LX-001", 2).await;
        add(&db, &state, "POS-LX-003", 1).await;

        let finalizer = CheckoutFinalizer::new(db.clone(), InstantSettlement);
        let outcome = finalizer.finalize(&state).await.unwrap();

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.record.subtotal, Money::from_major_minor(2950, 0));
        assert_eq!(outcome.record.tax, Money::from_major_minor(472, 0));
        assert_eq!(outcome.record.total, Money::from_major_minor(3422, 0));
        assert_eq!(outcome.lines.len(), 2);
        assert!(outcome
            .record
            .settlement_reference
            .as_deref()
            .unwrap()
            .starts_with("instant-"));

        assert_eq!(state.phase(), CheckoutPhase::Idle);
        assert!(state.with_cart(|c| c.is_empty()));

        assert_eq!(stock(&db, "POS-LX-001").await, 10);
        assert_eq!(stock(&db, "POS-LX-003").await, 7);
        assert_eq!(material(&db, "INS-001").await, Quantity::from_units(35));
        assert_eq!(material(&db, "INS-003").await, Quantity::from_units(1));
        assert_eq!(db.checkouts().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let db = seeded().await;
        let finalizer = CheckoutFinalizer::new(db, InstantSettlement);

        assert!(matches!(
            finalizer.finalize(&session()).await,
            Err(CheckoutError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn test_aggregated_shortage_denied_at_checkout() {
        let db = seeded().await;
        let state = session();
        // Each line fits on its own: 9 m and 40 m of the 45 m on hand
        add(&db, &state, "POS-LX-004", 3).await;
        add(&db, &state, "POS-LX-001", 8).await;
        let before = ledger_snapshot(&db).await;

        let finalizer = CheckoutFinalizer::new(db.clone(), InstantSettlement);
        let err = finalizer.finalize(&state).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Denied(_)));
        assert_eq!(
            err.denials(),
            &[DenialReason::MaterialShortage {
                material_id: "INS-001".to_string(),
                needed: Quantity::from_units(49),
                available: Quantity::from_units(45),
            }]
        );
        assert_eq!(ledger_snapshot(&db).await, before);
        assert_eq!(state.with_cart(|c| c.lines().len()), 2);
        assert_eq!(state.phase(), CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_settlement_failure_leaves_ledger_and_cart() {
        let db = seeded().await;
        let state = session();
        add(&db, &state, "POS-LX-001", 2).await;
        let before = ledger_snapshot(&db).await;

        let finalizer = CheckoutFinalizer::new(db.clone(), DecliningSettlement);
        let err = finalizer.finalize(&state).await.unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Settlement(SettlementError::Declined(_))
        ));
        assert_eq!(ledger_snapshot(&db).await, before);
        assert_eq!(db.checkouts().count().await.unwrap(), 0);
        assert_eq!(state.with_cart(|c| c.line("POS-LX-001").unwrap().quantity), 2);
        assert_eq!(state.phase(), CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_cart_frozen_while_processing() {
        let db = seeded().await;
        let state = session();
        add(&db, &state, "POS-LX-002", 1).await;

        let settlement = GateSettlement::default();
        let finalizer = CheckoutFinalizer::new(db.clone(), settlement.clone());

        let inspect = async {
            settlement.entered.notified().await;

            assert_eq!(state.phase(), CheckoutPhase::Processing);
            let err = add_to_cart(&db, &state, "POS-LX-005").await.unwrap_err();
            assert!(err.message.contains("in progress"));
            assert!(matches!(
                state.with_cart_mut(|c| Ok(c.remove("POS-LX-002"))),
                Err(CoreError::CheckoutInProgress)
            ));
            assert!(matches!(
                finalizer.finalize(&state).await,
                Err(CheckoutError::AlreadyProcessing)
            ));

            settlement.release.notify_one();
        };

        let (result, ()) = tokio::join!(finalizer.finalize(&state), inspect);

        let outcome = result.unwrap();
        assert_eq!(outcome.lines.len(), 1);
        assert_eq!(outcome.lines[0].product_id, "POS-LX-002");
        assert_eq!(state.phase(), CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_abort_cancels_without_mutation() {
        let db = seeded().await;
        let state = session();
        add(&db, &state, "POS-LX-004", 1).await;
        let before = ledger_snapshot(&db).await;

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tx.send(()).unwrap();

        let finalizer = CheckoutFinalizer::new(db.clone(), PendingSettlement);
        let err = finalizer
            .finalize_until(&state, async {
                let _ = rx.await;
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Cancelled));
        assert_eq!(ledger_snapshot(&db).await, before);
        assert_eq!(state.with_cart(|c| c.lines().len()), 1);
        assert_eq!(state.phase(), CheckoutPhase::Idle);
    }

    #[tokio::test]
    async fn test_settlement_timeout() {
        let db = seeded().await;
        let state = session();
        add(&db, &state, "POS-LX-004", 1).await;
        let before = ledger_snapshot(&db).await;

        let finalizer = CheckoutFinalizer::new(db.clone(), PendingSettlement)
            .with_timeout(Duration::from_millis(20));
        let err = finalizer.finalize(&state).await.unwrap_err();

        assert!(matches!(err, CheckoutError::TimedOut { after_ms: 20 }));
        assert_eq!(ledger_snapshot(&db).await, before);
        assert_eq!(state.with_cart(|c| c.lines().len()), 1);
    }

    #[tokio::test]
    async fn test_dropped_finalize_releases_session() {
        let db = seeded().await;
        let state = session();
        add(&db, &state, "POS-LX-004", 1).await;

        let finalizer = CheckoutFinalizer::new(db.clone(), PendingSettlement);
        let result =
            tokio::time::timeout(Duration::from_millis(20), finalizer.finalize(&state)).await;

        assert!(result.is_err());
        assert_eq!(state.phase(), CheckoutPhase::Idle);
        assert_eq!(state.with_cart(|c| c.lines().len()), 1);
        assert_eq!(db.checkouts().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_never_oversell() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let data = SeedData::from_json(
            r#"{
                "materials": [
                    { "id": "INS-001", "name": "Manguera Neón Flex 12V Cian", "unit": "Metros",
                      "available": 45000, "minimum_threshold": 100000 }
                ],
                "products": [
                    { "id": "POS-LX-900", "name": "Letrero Único", "category": "neon",
                      "unit_price": 185000, "finished_stock": 1, "max_stock": 1,
                      "required_materials": [ { "material_id": "INS-001", "quantity_per_unit": 3000 } ] }
                ]
            }"#,
        )
        .unwrap();
        db.seed(&data).await.unwrap();

        let first = session();
        let second = session();
        add(&db, &first, "POS-LX-900", 1).await;
        add(&db, &second, "POS-LX-900", 1).await;

        // Both sessions pass the re-check before either commits
        let settlement = BarrierSettlement {
            barrier: Arc::new(Barrier::new(2)),
            voids: Arc::new(AtomicUsize::new(0)),
        };
        let a = CheckoutFinalizer::new(db.clone(), settlement.clone());
        let b = CheckoutFinalizer::new(db.clone(), settlement.clone());

        let (ra, rb) = tokio::join!(a.finalize(&first), b.finalize(&second));

        let (winner, loser) = match (ra, rb) {
            (Ok(outcome), Err(err)) => ((outcome, &first), (err, &second)),
            (Err(err), Ok(outcome)) => ((outcome, &second), (err, &first)),
            other => panic!("expected exactly one completed checkout, got {:?}", other),
        };

        assert_eq!(winner.0.attempts, 1);
        assert!(winner.1.with_cart(|c| c.is_empty()));

        match loser.0 {
            CheckoutError::CommitConflict { resource, reasons } => {
                assert_eq!(resource, "POS-LX-900");
                assert!(matches!(
                    reasons.as_slice(),
                    [DenialReason::FinishedStockExceeded { available: 0, .. }]
                ));
            }
            other => panic!("expected CommitConflict, got {:?}", other),
        }
        assert_eq!(loser.1.with_cart(|c| c.lines().len()), 1);
        assert_eq!(loser.1.phase(), CheckoutPhase::Idle);

        assert_eq!(settlement.voids.load(Ordering::SeqCst), 1);
        assert_eq!(stock(&db, "POS-LX-900").await, 0);
        assert_eq!(material(&db, "INS-001").await, Quantity::from_units(42));
        assert_eq!(db.checkouts().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_retry_commits_after_restock() {
        let db = seeded().await;
        sqlx::query("UPDATE products SET finished_stock = 1 WHERE id = 'POS-LX-002'")
            .execute(db.pool())
            .await
            .unwrap();

        let slow = session();
        let fast = session();
        add(&db, &slow, "POS-LX-002", 1).await;
        add(&db, &fast, "POS-LX-002", 1).await;

        let settlement = GateSettlement::default();
        let gate = RetryGate::default();
        let slow_finalizer = CheckoutFinalizer::new(db.clone(), settlement.clone())
            .with_retry_gate(gate.clone());
        let fast_finalizer = CheckoutFinalizer::new(db.clone(), InstantSettlement);

        let interleave = async {
            // Slow checkout has passed its re-check; the last unit sells first
            settlement.entered.notified().await;
            fast_finalizer.finalize(&fast).await.unwrap();
            assert_eq!(stock(&db, "POS-LX-002").await, 0);
            settlement.release.notify_one();

            // Restock before the slow checkout re-checks
            gate.conflicted.notified().await;
            sqlx::query("UPDATE products SET finished_stock = 1 WHERE id = 'POS-LX-002'")
                .execute(db.pool())
                .await
                .unwrap();
            gate.resume.notify_one();
        };

        let (result, ()) = tokio::join!(slow_finalizer.finalize(&slow), interleave);

        let outcome = result.unwrap();
        assert_eq!(outcome.attempts, 2);
        assert!(slow.with_cart(|c| c.is_empty()));
        assert_eq!(slow.phase(), CheckoutPhase::Idle);
        assert_eq!(stock(&db, "POS-LX-002").await, 0);
        assert_eq!(db.checkouts().count().await.unwrap(), 2);
    }
}
