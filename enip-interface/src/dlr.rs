//! Device Level Ring object (class 0x47)
//!
//! The class attribute 1 carries the object revision. Get_Attributes_All on
//! instance 1 returns a device-type dependent subset of the instance
//! attributes; the subset is recognised by the reply length:
//!
//! | bytes | attributes                          | device                      |
//! |-------|-------------------------------------|-----------------------------|
//! | 2     | 1, 2                                | minimal ring node           |
//! | 16    | 1, 2, 10, 12                        | ring node (non-supervisor)  |
//! | 50    | 1-8, 10, 11                         | supervisor, revision 1      |
//! | 54    | 1-8, 10-12                          | supervisor                  |
//! | 77    | 1-8, 10-16                          | supervisor with gateway     |

use crate::error::{EnipError, EnipResult};
use bytes::Bytes;
use enip_cip::{general_status, CipMessenger};
use enip_codec::ByteReader;
use enip_session::EncapsulationTransport;
use std::net::Ipv4Addr;

/// Device Level Ring object class id
pub const DLR_CLASS_ID: u8 = 0x47;

const CLASS_INSTANCE: u8 = 0;
const REVISION_ATTRIBUTE: u8 = 1;
const DLR_INSTANCE: u8 = 1;

const GET_ALL_LAYOUTS: &[(usize, &[u8])] = &[
    (2, &[1, 2]),
    (16, &[1, 2, 10, 12]),
    (50, &[1, 2, 3, 4, 5, 6, 7, 8, 10, 11]),
    (54, &[1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12]),
    (77, &[1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12, 13, 14, 15, 16]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkTopology {
    #[default]
    Linear,
    Ring,
    Other(u8),
}

impl From<u8> for NetworkTopology {
    fn from(value: u8) -> Self {
        match value {
            0 => NetworkTopology::Linear,
            1 => NetworkTopology::Ring,
            other => NetworkTopology::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkStatus {
    #[default]
    Normal,
    RingFault,
    UnexpectedLoopDetected,
    PartialNetworkFault,
    RapidFaultRestoreCycle,
    Other(u8),
}

impl From<u8> for NetworkStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => NetworkStatus::Normal,
            1 => NetworkStatus::RingFault,
            2 => NetworkStatus::UnexpectedLoopDetected,
            3 => NetworkStatus::PartialNetworkFault,
            4 => NetworkStatus::RapidFaultRestoreCycle,
            other => NetworkStatus::Other(other),
        }
    }
}

/// IP and MAC address of a ring node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlrNode {
    pub ip_address: Ipv4Addr,
    pub mac_address: [u8; 6],
}

impl DlrNode {
    fn read(reader: &mut ByteReader<'_>) -> EnipResult<Self> {
        let ip_address = Ipv4Addr::from(reader.read_u32()?);
        let mut mac_address = [0u8; 6];
        mac_address.copy_from_slice(reader.read_bytes(6)?);
        Ok(Self {
            ip_address,
            mac_address,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingSupervisorConfig {
    pub enabled: bool,
    pub precedence: u8,
    /// Microseconds
    pub beacon_interval: u32,
    /// Microseconds
    pub beacon_timeout: u32,
    pub vlan_id: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedundantGatewayConfig {
    pub enabled: bool,
    pub precedence: u8,
    /// Microseconds
    pub advertise_interval: u32,
    /// Microseconds
    pub advertise_timeout: u32,
    pub learning_update_enabled: bool,
}

/// Instance attributes; those the device did not report are `None`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DlrInstance {
    pub network_topology: NetworkTopology,
    pub network_status: NetworkStatus,
    pub ring_supervisor_status: Option<u8>,
    pub ring_supervisor_config: Option<RingSupervisorConfig>,
    pub ring_faults_count: Option<u16>,
    pub last_active_node_port_1: Option<DlrNode>,
    pub last_active_node_port_2: Option<DlrNode>,
    pub ring_participants_count: Option<u16>,
    pub active_supervisor: Option<DlrNode>,
    pub active_supervisor_precedence: Option<u8>,
    pub capability_flags: Option<u32>,
    pub redundant_gateway_config: Option<RedundantGatewayConfig>,
    pub redundant_gateway_status: Option<u8>,
    pub active_gateway: Option<DlrNode>,
    pub active_gateway_precedence: Option<u8>,
}

impl DlrInstance {
    /// Decode a Get_Attributes_All reply
    pub fn decode_all(data: &[u8]) -> EnipResult<Self> {
        let attributes = GET_ALL_LAYOUTS
            .iter()
            .find(|(length, _)| *length == data.len())
            .map(|(_, attributes)| *attributes)
            .ok_or_else(|| {
                EnipError::Format(format!(
                    "Unrecognised DLR Get_Attributes_All length {}",
                    data.len()
                ))
            })?;

        let mut instance = Self::default();
        let mut reader = ByteReader::new(data);
        for attribute in attributes {
            instance.read_attribute(*attribute, &mut reader)?;
        }
        Ok(instance)
    }

    fn read_attribute(&mut self, attribute: u8, reader: &mut ByteReader<'_>) -> EnipResult<()> {
        match attribute {
            1 => self.network_topology = NetworkTopology::from(reader.read_u8()?),
            2 => self.network_status = NetworkStatus::from(reader.read_u8()?),
            3 => self.ring_supervisor_status = Some(reader.read_u8()?),
            4 => {
                self.ring_supervisor_config = Some(RingSupervisorConfig {
                    enabled: reader.read_u8()? != 0,
                    precedence: reader.read_u8()?,
                    beacon_interval: reader.read_u32()?,
                    beacon_timeout: reader.read_u32()?,
                    vlan_id: reader.read_u16()?,
                })
            }
            5 => self.ring_faults_count = Some(reader.read_u16()?),
            6 => self.last_active_node_port_1 = Some(DlrNode::read(reader)?),
            7 => self.last_active_node_port_2 = Some(DlrNode::read(reader)?),
            8 => self.ring_participants_count = Some(reader.read_u16()?),
            10 => self.active_supervisor = Some(DlrNode::read(reader)?),
            11 => self.active_supervisor_precedence = Some(reader.read_u8()?),
            12 => self.capability_flags = Some(reader.read_u32()?),
            13 => {
                self.redundant_gateway_config = Some(RedundantGatewayConfig {
                    enabled: reader.read_u8()? != 0,
                    precedence: reader.read_u8()?,
                    advertise_interval: reader.read_u32()?,
                    advertise_timeout: reader.read_u32()?,
                    learning_update_enabled: reader.read_u8()? != 0,
                })
            }
            14 => self.redundant_gateway_status = Some(reader.read_u8()?),
            15 => self.active_gateway = Some(DlrNode::read(reader)?),
            16 => self.active_gateway_precedence = Some(reader.read_u8()?),
            other => {
                return Err(EnipError::InvalidData(format!(
                    "DLR attribute {} is not part of Get_Attributes_All",
                    other
                )));
            }
        }
        Ok(())
    }

    pub fn is_ring(&self) -> bool {
        self.network_topology == NetworkTopology::Ring
    }
}

/// Device Level Ring object as read from a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlrObject {
    /// Class revision, `None` if the device does not report it
    pub revision: Option<u16>,
    pub instance: DlrInstance,
}

impl DlrObject {
    /// Read the class revision and the instance attributes
    pub async fn read<T: EncapsulationTransport>(messenger: &CipMessenger<T>) -> EnipResult<Self> {
        let revision = match read_attribute(messenger, CLASS_INSTANCE, REVISION_ATTRIBUTE).await? {
            Some(data) => Some(ByteReader::new(&data).read_u16()?),
            None => None,
        };

        let reply = messenger.get_attribute_all(DLR_CLASS_ID, DLR_INSTANCE).await?;
        reply.response.ensure_success()?;
        let instance = DlrInstance::decode_all(&reply.data)?;
        log::debug!(
            "DLR revision {:?}: {:?} / {:?}",
            revision,
            instance.network_topology,
            instance.network_status
        );
        Ok(Self { revision, instance })
    }
}

/// Read one DLR attribute; `None` if the device does not support it
pub async fn read_attribute<T: EncapsulationTransport>(
    messenger: &CipMessenger<T>,
    instance: u8,
    attribute: u8,
) -> EnipResult<Option<Bytes>> {
    let reply = messenger
        .get_attribute_single(DLR_CLASS_ID, instance, attribute)
        .await?;
    if reply.general_status() == general_status::ATTRIBUTE_NOT_SUPPORTED {
        return Ok(None);
    }
    reply.response.ensure_success()?;
    Ok(Some(reply.data))
}
