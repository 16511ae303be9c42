// In-process gateway double for escrow flow tests.
//
// Holds live in memory; failure injection covers the cases the real gateway
// produces: declined authorizations and transient capture outages. Call
// counters let tests assert that idempotent paths hit the gateway-side
// capture exactly once.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use homefix::core::{AppError, Result};
use homefix::modules::payments::services::gateway_trait::{
    CreateHoldRequest, GatewayHold, GatewayRefund, HoldState, PaymentGateway,
};

#[derive(Default)]
pub struct MockGateway {
    holds: Mutex<HashMap<String, GatewayHold>>,
    idempotency: Mutex<HashMap<String, String>>,
    next_id: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub capture_calls: AtomicUsize,
    pub refund_calls: AtomicUsize,
    decline_create: AtomicBool,
    capture_outage: Mutex<HashSet<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a hold in a given remote state, bypassing create_hold
    pub fn seed_hold(&self, state: HoldState, amount_minor: i64, captured_minor: i64) -> String {
        let reference = self.next_ref();
        self.holds.lock().unwrap().insert(
            reference.clone(),
            GatewayHold {
                reference: reference.clone(),
                state,
                amount_minor,
                captured_minor,
            },
        );
        reference
    }

    /// Make the next create_hold fail like a declined card
    pub fn decline_next_create(&self) {
        self.decline_create.store(true, Ordering::SeqCst);
    }

    /// Make captures of this hold fail with a transient outage until cleared
    pub fn break_capture(&self, hold_ref: &str) {
        self.capture_outage
            .lock()
            .unwrap()
            .insert(hold_ref.to_string());
    }

    pub fn restore_capture(&self, hold_ref: &str) {
        self.capture_outage.lock().unwrap().remove(hold_ref);
    }

    pub fn hold_count(&self) -> usize {
        self.holds.lock().unwrap().len()
    }

    fn next_ref(&self) -> String {
        format!("pi_mock_{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_hold(&self, request: CreateHoldRequest) -> Result<GatewayHold> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if self.decline_create.swap(false, Ordering::SeqCst) {
            return Err(AppError::GatewayRejected(
                "Your card was declined. (card_declined)".to_string(),
            ));
        }

        // Gateway-side idempotency: the same key returns the same hold
        let mut idempotency = self.idempotency.lock().unwrap();
        if let Some(existing) = idempotency.get(&request.idempotency_key) {
            let holds = self.holds.lock().unwrap();
            return Ok(holds[existing].clone());
        }

        let reference = self.next_ref();
        let hold = GatewayHold {
            reference: reference.clone(),
            state: HoldState::RequiresCapture,
            amount_minor: request.amount_minor,
            captured_minor: 0,
        };

        self.holds
            .lock()
            .unwrap()
            .insert(reference.clone(), hold.clone());
        idempotency.insert(request.idempotency_key, reference);

        Ok(hold)
    }

    async fn get_hold(&self, hold_ref: &str) -> Result<GatewayHold> {
        self.holds
            .lock()
            .unwrap()
            .get(hold_ref)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("No such hold: {}", hold_ref)))
    }

    async fn capture_hold(&self, hold_ref: &str) -> Result<GatewayHold> {
        if self.capture_outage.lock().unwrap().contains(hold_ref) {
            return Err(AppError::GatewayUnavailable(format!(
                "Timed out capturing {}",
                hold_ref
            )));
        }

        let mut holds = self.holds.lock().unwrap();
        let hold = holds
            .get_mut(hold_ref)
            .ok_or_else(|| AppError::not_found(format!("No such hold: {}", hold_ref)))?;

        match hold.state {
            HoldState::RequiresCapture => {
                hold.state = HoldState::Captured;
                hold.captured_minor = hold.amount_minor;
                self.capture_calls.fetch_add(1, Ordering::SeqCst);
                Ok(hold.clone())
            }
            HoldState::Captured => Err(AppError::HoldNotCapturable(format!(
                "Hold {} already captured",
                hold_ref
            ))),
            _ => Err(AppError::HoldNotCapturable(format!(
                "Hold {} is {:?}",
                hold_ref, hold.state
            ))),
        }
    }

    async fn refund_hold(
        &self,
        hold_ref: &str,
        amount_minor: Option<i64>,
    ) -> Result<GatewayRefund> {
        let holds = self.holds.lock().unwrap();
        let hold = holds
            .get(hold_ref)
            .ok_or_else(|| AppError::not_found(format!("No such hold: {}", hold_ref)))?;

        if hold.state != HoldState::Captured {
            return Err(AppError::RefundRejected(format!(
                "Hold {} has no captured charge",
                hold_ref
            )));
        }

        let amount = amount_minor.unwrap_or(hold.captured_minor);
        let count = self.refund_calls.fetch_add(1, Ordering::SeqCst);

        Ok(GatewayRefund {
            reference: format!("re_mock_{}", count),
            amount_minor: amount,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
