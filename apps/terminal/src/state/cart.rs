//! # Cart Session State
//!
//! One operator's cart plus the phase of its checkout.
//!
//! ## Thread Safety
//! The session is wrapped in `Arc<Mutex<T>>`. The lock is only held for the
//! duration of a closure and never across an `.await`, so the finalizer can
//! settle a payment while other commands read the cart.
//!
//! ## Checkout Freeze
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  phase        add / dec / rm / clear        begin_checkout()            │
//! │  ─────        ──────────────────────        ────────────────            │
//! │  Idle         applied                       → Processing + guard        │
//! │  Processing   CheckoutInProgress            AlreadyProcessing           │
//! │                                                                         │
//! │  guard.complete()  Processing → Completed → Idle, cart cleared          │
//! │  guard.fail()      Processing → Failed    → Idle, cart kept             │
//! │  guard dropped     Processing → Idle,              cart kept            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cart is never taken out of the session while processing; the
//! finalizer works on a clone, so a failed or abandoned checkout has nothing
//! to restore.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use lumina_core::{Cart, CheckoutPhase, CoreError, CoreResult, TaxRate};

use crate::checkout::CheckoutError;

#[derive(Debug)]
struct Session {
    cart: Cart,
    phase: CheckoutPhase,
}

/// Shared cart session.
///
/// Cloning gives another handle to the same session.
#[derive(Debug, Clone)]
pub struct CartState {
    session: Arc<Mutex<Session>>,
}

impl CartState {
    /// Creates an idle session with an empty cart.
    pub fn new(tax_rate: TaxRate) -> Self {
        CartState {
            session: Arc::new(Mutex::new(Session {
                cart: Cart::new(tax_rate),
                phase: CheckoutPhase::Idle,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        // A panic inside a closure cannot leave the cart half-written:
        // every Cart method validates before it mutates.
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Executes a function with read access to the cart.
    ///
    /// Reads are allowed in every phase.
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let session = self.lock();
        f(&session.cart)
    }

    /// Executes a cart mutation, unless a checkout is processing.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let snapshot = cart_state.with_cart_mut(|cart| cart.add_or_increment(&product, &ledger))?;
    /// ```
    pub fn with_cart_mut<F, R>(&self, f: F) -> CoreResult<R>
    where
        F: FnOnce(&mut Cart) -> CoreResult<R>,
    {
        let mut session = self.lock();
        if !session.phase.accepts_cart_changes() {
            debug!(phase = ?session.phase, "Cart mutation rejected");
            return Err(CoreError::CheckoutInProgress);
        }
        f(&mut session.cart)
    }

    pub fn phase(&self) -> CheckoutPhase {
        self.lock().phase
    }

    /// Freezes the cart and hands back a copy to check out.
    ///
    /// ## Returns
    /// * `Ok((guard, cart))` - session is now `Processing`
    /// * `Err(AlreadyProcessing)` - another finalize owns the session
    /// * `Err(EmptyCart)` - nothing to sell; phase unchanged
    pub fn begin_checkout(&self) -> Result<(ProcessingGuard, Cart), CheckoutError> {
        let mut session = self.lock();

        if session.phase != CheckoutPhase::Idle {
            return Err(CheckoutError::AlreadyProcessing);
        }
        if session.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        session.phase = session
            .phase
            .transition(CheckoutPhase::Processing)
            .map_err(|_| CheckoutError::AlreadyProcessing)?;

        let cart = session.cart.clone();
        drop(session);

        Ok((
            ProcessingGuard {
                state: self.clone(),
                finished: false,
            },
            cart,
        ))
    }

    /// Moves `Processing` to `outcome` and then back to `Idle`.
    fn finish(&self, outcome: CheckoutPhase) {
        let mut session = self.lock();

        match session.phase.transition(outcome) {
            Ok(phase) => {
                session.phase = phase;
                if phase == CheckoutPhase::Completed {
                    session.cart.clear();
                }
            }
            Err(e) => warn!(error = %e, "Unexpected checkout phase"),
        }

        session.phase = CheckoutPhase::Idle;
    }
}

/// Ownership of a `Processing` session.
///
/// Exactly one of `complete`/`fail` should be called; dropping the guard
/// without either (the finalize future was dropped) returns the session to
/// `Idle` with the cart untouched.
#[derive(Debug)]
pub struct ProcessingGuard {
    state: CartState,
    finished: bool,
}

impl ProcessingGuard {
    /// Checkout committed: clear the cart.
    pub fn complete(mut self) {
        self.finished = true;
        self.state.finish(CheckoutPhase::Completed);
    }

    /// Checkout failed: keep the cart.
    pub fn fail(mut self) {
        self.finished = true;
        self.state.finish(CheckoutPhase::Failed);
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Checkout abandoned, returning session to idle");
            self.state.finish(CheckoutPhase::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumina_core::{Category, Money, MaterialLedger, Product};

    fn kit() -> Product {
        Product {
            id: "POS-LX-002".to_string(),
            name: "Instalación Premium".to_string(),
            category: Category::Service,
            unit_price: Money::from_major_minor(2800, 0),
            finished_stock: 99,
            max_stock: 100,
            required_materials: vec![],
            description: None,
        }
    }

    fn with_one_line() -> CartState {
        let state = CartState::new(TaxRate::from_bps(1600));
        state
            .with_cart_mut(|cart| cart.add_or_increment(&kit(), &MaterialLedger::new()))
            .unwrap();
        state
    }

    #[test]
    fn test_empty_cart_cannot_begin() {
        let state = CartState::new(TaxRate::from_bps(1600));
        assert!(matches!(
            state.begin_checkout(),
            Err(CheckoutError::EmptyCart)
        ));
        assert_eq!(state.phase(), CheckoutPhase::Idle);
    }

    #[test]
    fn test_processing_rejects_mutation_and_second_begin() {
        let state = with_one_line();
        let (guard, cart) = state.begin_checkout().unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(state.phase(), CheckoutPhase::Processing);

        let err = state
            .with_cart_mut(|cart| {
                cart.clear();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::CheckoutInProgress));
        assert!(matches!(
            state.begin_checkout(),
            Err(CheckoutError::AlreadyProcessing)
        ));

        // Reads still work
        assert_eq!(state.with_cart(|c| c.lines().len()), 1);

        guard.fail();
        assert_eq!(state.phase(), CheckoutPhase::Idle);
        assert_eq!(state.with_cart(|c| c.lines().len()), 1);
    }

    #[test]
    fn test_complete_clears_cart() {
        let state = with_one_line();
        let (guard, _) = state.begin_checkout().unwrap();
        guard.complete();

        assert_eq!(state.phase(), CheckoutPhase::Idle);
        assert!(state.with_cart(|c| c.is_empty()));
    }

    #[test]
    fn test_dropped_guard_releases_session() {
        let state = with_one_line();
        {
            let _ = state.begin_checkout().unwrap();
        }
        assert_eq!(state.phase(), CheckoutPhase::Idle);
        assert_eq!(state.with_cart(|c| c.lines().len()), 1);
    }
}
