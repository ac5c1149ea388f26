//! The controller request pipeline
//!
//! `request` runs one join request to completion:
//!
//! 1. ask the oracle whether the member may join (deny -> `ACCESS_DENIED`)
//! 2. derive the member's address and route
//! 3. build the config
//! 4. sign the membership certificate, then the ownership certificate
//!    (either failure -> `INTERNAL_SERVER_ERROR`)
//! 5. deliver the config
//!
//! Every call ends in exactly one transport call.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use mesh_config::{ControllerSettings, OracleInitPolicy};
use mesh_crypto::{Address, Identity};
use mesh_networking::AddressAssigner;
use tracing::{debug, error, info, warn};

use crate::builder::ConfigBuilder;
use crate::error::{ControllerError, Result};
use crate::network_config::NetworkConfig;
use crate::oracle::AuthorizationOracle;
use crate::signer::{CredentialSigner, SigningCapability};
use crate::transport::{ErrorCode, Transport};

/// Validity window of issued credentials (30 minutes, in milliseconds)
pub const CREDENTIAL_TIME_MAX_DELTA: i64 = mesh_config::DEFAULT_CREDENTIAL_DELTA_MS;

/// Id of the single ownership certificate issued per config
const OWNERSHIP_CERTIFICATE_ID: u32 = 1;

/// Opaque request metadata supplied by the member
pub type Metadata = BTreeMap<String, String>;

/// An inbound request to join a network
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub network_id: u64,
    pub from: Option<SocketAddr>,
    pub request_id: u64,
    pub identity: Identity,
    pub metadata: Metadata,
}

/// How a request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A signed config was handed to the transport
    Delivered,
    /// The oracle refused the member
    Denied,
    /// The member was authorized but no config could be issued
    Failed,
}

/// Process-wide controller state, fixed at `init`
#[derive(Debug, Clone)]
pub struct ControllerState {
    signing_identity: Identity,
    home_path: PathBuf,
}

impl ControllerState {
    pub fn signing_identity(&self) -> &Identity {
        &self.signing_identity
    }

    pub fn home_path(&self) -> &Path {
        &self.home_path
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub struct ControllerService {
    state: ControllerState,
    oracle: Arc<dyn AuthorizationOracle>,
    transport: Arc<dyn Transport>,
    signer: CredentialSigner,
    builder: ConfigBuilder,
    assigner: AddressAssigner,
    credential_time_max_delta: i64,
    clock: fn() -> i64,
}

impl ControllerService {
    /// Create a controller that signs with `signing_identity` itself
    pub fn init(
        signing_identity: Identity,
        transport: Arc<dyn Transport>,
        oracle: Arc<dyn AuthorizationOracle>,
        settings: &ControllerSettings,
    ) -> Result<Self> {
        let capability: Arc<dyn SigningCapability> = Arc::new(signing_identity.clone());
        Self::init_with_signer(signing_identity, capability, transport, oracle, settings)
    }

    /// Create a controller that signs through an external capability
    ///
    /// The capability must sign as `signing_identity`.
    pub fn init_with_signer(
        signing_identity: Identity,
        capability: Arc<dyn SigningCapability>,
        transport: Arc<dyn Transport>,
        oracle: Arc<dyn AuthorizationOracle>,
        settings: &ControllerSettings,
    ) -> Result<Self> {
        settings.validate()?;

        let controller_address = signing_identity.address();
        let signer_address = capability.signer_address();
        if signer_address != controller_address {
            error!(
                "signing capability {} does not belong to controller {}",
                signer_address, controller_address
            );
            return Err(ControllerError::SignerMismatch {
                identity: controller_address,
                signer: signer_address,
            });
        }
        let home_path = settings.home_path.clone();
        info!(
            "controller init: controller={} home={}",
            controller_address,
            home_path.display()
        );

        if let Err(e) = oracle.init(controller_address.to_u64(), &home_path) {
            match settings.oracle_init_policy {
                OracleInitPolicy::Continue => {
                    warn!("failed to initialize authorization oracle, continuing: {}", e);
                }
                OracleInitPolicy::Fail => {
                    error!("failed to initialize authorization oracle: {}", e);
                    return Err(e.into());
                }
            }
        }

        Ok(ControllerService {
            state: ControllerState {
                signing_identity,
                home_path,
            },
            oracle,
            transport,
            signer: CredentialSigner::new(capability),
            builder: ConfigBuilder::new(settings.credential_delta_ms),
            assigner: AddressAssigner::new(),
            credential_time_max_delta: settings.credential_delta_ms,
            clock: now_ms,
        })
    }

    /// Replace the wall clock used to stamp configs
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn home_path(&self) -> &Path {
        self.state.home_path()
    }

    pub fn signing_address(&self) -> Address {
        self.state.signing_identity.address()
    }

    pub fn credential_time_max_delta(&self) -> i64 {
        self.credential_time_max_delta
    }

    /// Address the oracle was initialized with
    pub fn controller_address(&self) -> u64 {
        self.oracle.controller_address()
    }

    /// Ask the oracle to re-read its policy
    pub fn reload(&self) -> Result<()> {
        self.oracle.reload().map_err(|e| {
            warn!("authorization oracle reload failed: {}", e);
            e.into()
        })
    }

    /// Handle a decoded join request
    pub fn handle(&self, request: &JoinRequest) -> RequestOutcome {
        self.request(
            request.network_id,
            request.from,
            request.request_id,
            &request.identity,
            &request.metadata,
        )
    }

    /// Decide one join request and answer it through the transport
    pub fn request(
        &self,
        network_id: u64,
        from_addr: Option<SocketAddr>,
        request_id: u64,
        identity: &Identity,
        metadata: &Metadata,
    ) -> RequestOutcome {
        let member = identity.address();
        info!("request: nwid={:016x} member={}", network_id, member);
        debug!("request {} from {:?} with {} metadata entries", request_id, from_addr, metadata.len());

        let decision = self.oracle.check(network_id, member.to_u64());
        if !decision.authorized {
            warn!("access denied for {} on {:016x}", member, network_id);
            self.transport
                .send_error(network_id, request_id, member, ErrorCode::AccessDenied, &[]);
            return RequestOutcome::Denied;
        }

        match self.issue(network_id, identity, decision.assigned_address_bytes) {
            Ok(config) => {
                info!("sending config to {} on {:016x}", member, network_id);
                self.transport
                    .send_config(network_id, request_id, member, config, false);
                RequestOutcome::Delivered
            }
            Err(e) => {
                error!("failed to issue config for {} on {:016x}: {}", member, network_id, e);
                self.transport.send_error(
                    network_id,
                    request_id,
                    member,
                    ErrorCode::InternalServerError,
                    &[],
                );
                RequestOutcome::Failed
            }
        }
    }

    /// Build and sign a config for an authorized member
    fn issue(&self, network_id: u64, identity: &Identity, assigned: [u8; 16]) -> Result<NetworkConfig> {
        let timestamp = (self.clock)();
        let address = self.assigner.derive_address(assigned);
        let route_target = self.assigner.derive_route_target(assigned);

        let mut config = self
            .builder
            .build(network_id, timestamp, identity, address, route_target)?;

        let com = self.signer.sign_membership(
            network_id,
            timestamp,
            self.credential_time_max_delta,
            identity,
        )?;
        let coo = self.signer.sign_ownership(
            network_id,
            timestamp,
            identity.address(),
            OWNERSHIP_CERTIFICATE_ID,
            address,
        )?;

        config.attach_credentials(com, coo)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{StaticOracle, WhitelistOracle};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        configs: AtomicUsize,
        errors: AtomicUsize,
    }

    impl Transport for CountingTransport {
        fn send_config(&self, _: u64, _: u64, _: Address, _: NetworkConfig, _: bool) {
            self.configs.fetch_add(1, Ordering::SeqCst);
        }

        fn send_error(&self, _: u64, _: u64, _: Address, _: ErrorCode, _: &[u8]) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn settings_in(home: &Path, policy: OracleInitPolicy) -> ControllerSettings {
        ControllerSettings {
            home_path: home.to_path_buf(),
            oracle_init_policy: policy,
            ..ControllerSettings::default()
        }
    }

    #[test]
    fn test_init_records_state() {
        let identity = Identity::generate();
        let oracle = Arc::new(StaticOracle::new());
        let service = ControllerService::init(
            identity.clone(),
            Arc::new(CountingTransport::default()),
            oracle,
            &settings_in(Path::new("/srv/mesh"), OracleInitPolicy::Continue),
        )
        .unwrap();

        assert_eq!(service.home_path(), Path::new("/srv/mesh"));
        assert_eq!(service.signing_address(), identity.address());
        assert_eq!(service.controller_address(), identity.address().to_u64());
        assert_eq!(service.credential_time_max_delta(), CREDENTIAL_TIME_MAX_DELTA);
    }

    #[test]
    fn test_failed_oracle_init_continues_by_default() {
        let home = tempfile::tempdir().unwrap();
        let transport = Arc::new(CountingTransport::default());
        let service = ControllerService::init(
            Identity::generate(),
            transport.clone(),
            Arc::new(WhitelistOracle::default()),
            &settings_in(home.path(), OracleInitPolicy::Continue),
        )
        .unwrap();

        let member = Identity::generate();
        let outcome = service.request(1, None, 9, &member, &Metadata::new());
        assert_eq!(outcome, RequestOutcome::Denied);
        assert_eq!(transport.errors.load(Ordering::SeqCst), 1);
        assert_eq!(transport.configs.load(Ordering::SeqCst), 0);
        assert!(service.reload().is_err());
    }

    #[test]
    fn test_failed_oracle_init_is_fatal_when_configured() {
        let home = tempfile::tempdir().unwrap();
        let result = ControllerService::init(
            Identity::generate(),
            Arc::new(CountingTransport::default()),
            Arc::new(WhitelistOracle::default()),
            &settings_in(home.path(), OracleInitPolicy::Fail),
        );
        assert!(matches!(result, Err(ControllerError::Oracle(_))));
    }

    #[test]
    fn test_signer_must_match_controller_identity() {
        let controller = Identity::generate();
        let other = Identity::generate();
        let result = ControllerService::init_with_signer(
            controller.clone(),
            Arc::new(other.clone()),
            Arc::new(CountingTransport::default()),
            Arc::new(StaticOracle::new()),
            &ControllerSettings::default(),
        );
        match result {
            Err(ControllerError::SignerMismatch { identity, signer }) => {
                assert_eq!(identity, controller.address());
                assert_eq!(signer, other.address());
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("mismatched signer accepted"),
        }

        let service = ControllerService::init_with_signer(
            controller.clone(),
            Arc::new(controller.public_only()),
            Arc::new(CountingTransport::default()),
            Arc::new(StaticOracle::new()),
            &ControllerSettings::default(),
        );
        assert!(service.is_ok());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = ControllerSettings::default();
        settings.credential_delta_ms = 0;
        let result = ControllerService::init(
            Identity::generate(),
            Arc::new(CountingTransport::default()),
            Arc::new(StaticOracle::new()),
            &settings,
        );
        assert!(matches!(result, Err(ControllerError::Config(_))));
    }
}
