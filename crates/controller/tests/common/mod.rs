//! Test collaborators for the controller integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::path::Path;

use mesh_config::ControllerSettings;
use mesh_controller::{
    AuthorizationDecision, AuthorizationOracle, ControllerService, ErrorCode, NetworkConfig,
    OracleError, SignError, SigningCapability, Transport,
};
use mesh_crypto::{Address, Identity};

/// Everything the controller handed to the transport
#[derive(Debug, Clone)]
pub enum Sent {
    Config {
        network_id: u64,
        request_id: u64,
        recipient: Address,
        config: Box<NetworkConfig>,
        legacy: bool,
    },
    Error {
        network_id: u64,
        request_id: u64,
        recipient: Address,
        code: ErrorCode,
        payload: Vec<u8>,
    },
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// The only message sent, failing the test if there is not exactly one
    pub fn single(&self) -> Sent {
        let sent = self.sent();
        assert_eq!(sent.len(), 1, "expected exactly one transport call, got {:?}", sent);
        sent.into_iter().next().unwrap()
    }
}

impl Transport for RecordingTransport {
    fn send_config(
        &self,
        network_id: u64,
        request_id: u64,
        recipient: Address,
        config: NetworkConfig,
        use_legacy_format: bool,
    ) {
        self.sent.lock().unwrap().push(Sent::Config {
            network_id,
            request_id,
            recipient,
            config: Box::new(config),
            legacy: use_legacy_format,
        });
    }

    fn send_error(
        &self,
        network_id: u64,
        request_id: u64,
        recipient: Address,
        error_code: ErrorCode,
        payload: &[u8],
    ) {
        self.sent.lock().unwrap().push(Sent::Error {
            network_id,
            request_id,
            recipient,
            code: error_code,
            payload: payload.to_vec(),
        });
    }
}

/// Oracle returning one fixed decision
pub struct ScriptedOracle {
    decision: AuthorizationDecision,
    checks: AtomicUsize,
}

impl ScriptedOracle {
    pub fn allowing(bytes: [u8; 16]) -> Self {
        Self {
            decision: AuthorizationDecision::allowed(bytes),
            checks: AtomicUsize::new(0),
        }
    }

    pub fn denying() -> Self {
        Self {
            decision: AuthorizationDecision::denied(),
            checks: AtomicUsize::new(0),
        }
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl AuthorizationOracle for ScriptedOracle {
    fn init(&self, _controller_address: u64, _home_path: &Path) -> Result<(), OracleError> {
        Ok(())
    }

    fn check(&self, _network_id: u64, _member_address: u64) -> AuthorizationDecision {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.decision
    }

    fn reload(&self) -> Result<(), OracleError> {
        Ok(())
    }

    fn controller_address(&self) -> u64 {
        0
    }
}

/// Signs with a real identity but fails on chosen calls (1-based)
pub struct ScriptedSigner {
    identity: Identity,
    fail_on: Vec<usize>,
    calls: AtomicUsize,
}

impl ScriptedSigner {
    pub fn new(identity: Identity, fail_on: &[usize]) -> Self {
        Self {
            identity,
            fail_on: fail_on.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SigningCapability for ScriptedSigner {
    fn signer_address(&self) -> Address {
        self.identity.address()
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(SignError::Capability(format!("scripted failure on call {}", call)));
        }
        SigningCapability::sign(&self.identity, message)
    }
}

/// A controller wired to scripted collaborators
pub struct Harness {
    pub controller: Identity,
    pub transport: Arc<RecordingTransport>,
    pub oracle: Arc<ScriptedOracle>,
    pub signer: Arc<ScriptedSigner>,
    pub service: ControllerService,
}

pub const FIXED_NOW: i64 = 1_700_000_000_000;

pub fn harness(oracle: ScriptedOracle, fail_sign_on: &[usize]) -> Harness {
    let controller = Identity::generate();
    let transport = Arc::new(RecordingTransport::default());
    let oracle = Arc::new(oracle);
    let signer = Arc::new(ScriptedSigner::new(controller.clone(), fail_sign_on));

    let service = ControllerService::init_with_signer(
        controller.clone(),
        signer.clone(),
        transport.clone(),
        oracle.clone(),
        &ControllerSettings::default(),
    )
    .unwrap()
    .with_clock(|| FIXED_NOW);

    Harness {
        controller,
        transport,
        oracle,
        signer,
        service,
    }
}

pub fn ipv6_bytes(s: &str) -> [u8; 16] {
    s.parse::<std::net::Ipv6Addr>().unwrap().octets()
}
