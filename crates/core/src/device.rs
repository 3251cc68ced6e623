//! Device identity built from a discovery record.

use mrp_protocol::Credentials;
use uuid::Uuid;

use crate::address::select_address;
use crate::auth::DerivedKeys;
use crate::error::Result;

/// Discovery output for one appliance on the local network: service
/// name, candidate addresses, port, and the stable identifier from
/// the service's text-record metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
    pub name: String,
    pub addresses: Vec<String>,
    pub port: u16,
    pub unique_identifier: String,
}

/// Identity and reachability of a remote appliance.
///
/// The address is fixed at construction; the session identifier is
/// random per process until restored credentials overwrite it on
/// connect. One device maps to one transport connection at a time.
#[derive(Debug, Clone)]
pub struct Device {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub unique_id: String,
    session_id: String,
    credentials: Option<Credentials>,
}

impl Device {
    /// Builds a device from a discovery record, running address
    /// selection over the candidate list.
    pub fn from_service(service: &DiscoveredService) -> Result<Self> {
        Ok(Self {
            name: service.name.clone(),
            address: select_address(&service.addresses)?,
            port: service.port,
            unique_id: service.unique_identifier.clone(),
            session_id: Uuid::new_v4().to_string(),
            credentials: None,
        })
    }

    /// The identifier presented during introduction.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current credential bundle, if the session is authenticated.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Adopts a restored credential bundle's session identifier so a
    /// reconnect presents the originally negotiated identity.
    pub(crate) fn restore_session_id(&mut self, credentials: &Credentials) {
        self.session_id = credentials.session_id.clone();
    }

    pub(crate) fn attach_credentials(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
    }

    /// Stores the verification collaborator's derived keys. Written
    /// once per connect; the send path treats them as read-only.
    pub(crate) fn attach_derived_keys(&mut self, keys: DerivedKeys) {
        if let Some(credentials) = self.credentials.as_mut() {
            credentials.read_key = Some(keys.read_key);
            credentials.write_key = Some(keys.write_key);
        }
    }
}
