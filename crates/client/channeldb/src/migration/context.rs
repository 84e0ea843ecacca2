//! Migration context provided to each migration function.

use crate::store::StoreTransaction;
use lp_invoice::{NetworkParams, PaymentRequestDecoder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct MigrationProgress {
    pub current_step: usize,
    pub total_steps: usize,
    pub message: String,
}

impl MigrationProgress {
    pub fn new(current_step: usize, total_steps: usize, message: impl Into<String>) -> Self {
        debug_assert!(current_step <= total_steps);
        Self { current_step, total_steps, message: message.into() }
    }
}

pub type ProgressCallback = Box<dyn Fn(MigrationProgress) + Send + Sync>;

/// Context provided to each migration function.
///
/// All reads and writes of a migration go through [`MigrationContext::tx`], the transaction the
/// runner commits together with the new schema version.
pub struct MigrationContext<'a> {
    tx: &'a mut dyn StoreTransaction,
    payment_requests: &'a dyn PaymentRequestDecoder,
    networks: &'a [NetworkParams],
    progress_callback: Option<ProgressCallback>,
    abort_flag: Arc<AtomicBool>,
}

impl<'a> MigrationContext<'a> {
    pub fn new(
        tx: &'a mut dyn StoreTransaction,
        payment_requests: &'a dyn PaymentRequestDecoder,
        networks: &'a [NetworkParams],
        abort_flag: Arc<AtomicBool>,
    ) -> Self {
        Self { tx, payment_requests, networks, progress_callback: None, abort_flag }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn tx(&self) -> &dyn StoreTransaction {
        &*self.tx
    }

    pub fn tx_mut(&mut self) -> &mut dyn StoreTransaction {
        &mut *self.tx
    }

    pub fn payment_requests(&self) -> &dyn PaymentRequestDecoder {
        self.payment_requests
    }

    /// Networks payment requests are tried against, in order.
    pub fn networks(&self) -> &[NetworkParams] {
        self.networks
    }

    pub fn report_progress(&self, progress: MigrationProgress) {
        if let Some(ref callback) = self.progress_callback {
            callback(progress);
        }
    }

    pub fn should_abort(&self) -> bool {
        self.abort_flag.load(Ordering::Relaxed)
    }
}
