//! In-process Matter node: attribute table plus commissioning state.
//!
//! Implements [`AttributeStore`] and [`CommissioningPort`] over a
//! `parking_lot`-guarded table so the fan core can run without a Matter
//! stack (host simulation, integration tests). Controller writes enter
//! through [`MatterNode::write_attribute`], which runs the registered
//! [`AttributeWriteHandler`] before committing, the same order a real
//! stack uses for its pre-update callback.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use parking_lot::RwLock;

use crate::app::ports::{
    AttrValue, AttributePath, AttributeStore, AttributeWriteHandler, CommissioningPort,
    PairingCode, QrCodeUrl,
};
use crate::error::{AttributeError, Result};

/// Test-network onboarding payload (passcode 20202021, discriminator 3840).
const TEST_MANUAL_CODE: &str = "34970112332";
const TEST_QR_URL: &str = "MT:Y.K9042C00KA0648G00";

pub struct MatterNode {
    attributes: RwLock<HashMap<AttributePath, AttrValue>>,
    write_handler: RwLock<Option<Arc<dyn AttributeWriteHandler>>>,
    commissioned: AtomicBool,
    manual_code: PairingCode,
    qr_url: QrCodeUrl,
}

impl MatterNode {
    pub fn new(manual_code: &str, qr_url: &str) -> Self {
        Self {
            attributes: RwLock::new(HashMap::new()),
            write_handler: RwLock::new(None),
            commissioned: AtomicBool::new(false),
            manual_code: bounded(manual_code),
            qr_url: bounded(qr_url),
        }
    }

    /// Node using the well-known development onboarding payload.
    pub fn with_test_credentials() -> Self {
        Self::new(TEST_MANUAL_CODE, TEST_QR_URL)
    }

    pub fn set_write_handler(&self, handler: Arc<dyn AttributeWriteHandler>) {
        *self.write_handler.write() = Some(handler);
    }

    /// Controller-originated write. The handler may rewrite the value; it
    /// is stored only when accepted.
    pub fn write_attribute(&self, path: AttributePath, value: AttrValue) -> Result<AttrValue> {
        let Some(existing) = self.attributes.read().get(&path).copied() else {
            return Err(AttributeError::NotFound {
                cluster: path.cluster,
                attribute: path.attribute,
            }
            .into());
        };
        if core::mem::discriminant(&existing) != core::mem::discriminant(&value) {
            return Err(AttributeError::TypeMismatch.into());
        }

        let mut value = value;
        let handler = self.write_handler.read().clone();
        if let Some(handler) = handler {
            if !handler.on_attribute_write(path, &mut value) {
                debug!("node: write to {:?} rejected", path);
                return Err(AttributeError::UpdateRejected {
                    cluster: path.cluster,
                    attribute: path.attribute,
                }
                .into());
            }
        }
        self.attributes.write().insert(path, value);
        Ok(value)
    }

    /// Simulate a controller finishing commissioning.
    pub fn commission(&self) {
        info!("node: fabric added");
        self.commissioned.store(true, Ordering::SeqCst);
    }
}

impl AttributeStore for MatterNode {
    fn update_attribute(&self, path: AttributePath, value: AttrValue) -> bool {
        match self.attributes.write().get_mut(&path) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => {
                warn!("node: update of unknown attribute {:?}", path);
                false
            }
        }
    }

    fn read_attribute(&self, path: AttributePath) -> Option<AttrValue> {
        self.attributes.read().get(&path).copied()
    }

    fn create_attribute(&self, path: AttributePath, value: AttrValue) {
        self.attributes.write().insert(path, value);
    }
}

impl CommissioningPort for MatterNode {
    fn is_commissioned(&self) -> bool {
        self.commissioned.load(Ordering::SeqCst)
    }

    fn decommission(&self) {
        info!("node: all fabrics removed");
        self.commissioned.store(false, Ordering::SeqCst);
    }

    fn manual_pairing_code(&self) -> PairingCode {
        self.manual_code.clone()
    }

    fn qr_code_url(&self) -> QrCodeUrl {
        self.qr_url.clone()
    }
}

fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            warn!("node: pairing string truncated to {} bytes", N);
            break;
        }
    }
    out
}
