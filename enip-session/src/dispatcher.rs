//! Routing of decoded inbound frames

use crate::encapsulation::Command;
use crate::packet::TransportPacket;

/// Where an inbound frame goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Deliver to the waiter registered under this identifier
    Correlate(u64),
    /// Session control traffic handled by the worker itself
    Control(Command),
    /// Not handled by this client; logged and dropped
    Unsupported(Command),
}

/// Classify a decoded frame
///
/// Datagrams always correlate by their connection identifier.
pub fn route(packet: &TransportPacket) -> Route {
    let Some(command) = packet.command() else {
        return Route::Correlate(packet.response_id);
    };
    match command {
        Command::SendRRData | Command::SendUnitData => Route::Correlate(packet.response_id),
        Command::RegisterSession
        | Command::UnRegisterSession
        | Command::Nop
        | Command::ListIdentity
        | Command::ListServices
        | Command::ListInterfaces => Route::Control(command),
        other => Route::Unsupported(other),
    }
}
