//! Session worker
//!
//! One task owns every socket of a session. Each loop iteration waits for
//! whichever is ready first: a control command, inbound stream bytes, a
//! queued explicit frame, an inbound datagram, a queued datagram, or the
//! keep-alive deadline. Inbound frames are reassembled, decoded and routed;
//! outbound frames are written in queue order. Any send resets the
//! keep-alive deadline.
//!
//! The worker stops on shutdown, on an UnRegisterSession from the target,
//! at end of stream, or on a stream error. On exit it publishes
//! [`SessionState::Closed`] and wakes every pending waiter.

use crate::assembler::FrameAssembler;
use crate::correlator::Correlator;
use crate::dispatcher::{route, Route};
use crate::encapsulation::{frame, Command, EncapsulationHeader};
use crate::error::EnipResult;
use crate::packet::TransportPacket;
use crate::queue::OutboundReceiver;
use crate::state::SessionState;
use crate::statistics::SessionStatistics;
use bytes::Bytes;
use enip_transport::{TcpTransport, UdpTransport, MAX_UDP_PAYLOAD_SIZE};
use std::future::poll_fn;
use std::io;
use std::sync::{Arc, Mutex};
use std::task::Poll;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Commands from the originator to its worker
#[derive(Debug)]
pub(crate) enum WorkerCommand {
    /// Take ownership of a datagram socket
    AttachDatagram(UdpTransport),
    /// Stop the loop and close every socket
    Shutdown,
}

/// Handles the originator shares with the worker
pub(crate) struct WorkerShared {
    pub correlator: Arc<Correlator>,
    pub state: watch::Sender<SessionState>,
    pub statistics: Arc<Mutex<SessionStatistics>>,
}

/// Receiving ends of the originator's queues
pub(crate) struct WorkerInbox {
    pub explicit: OutboundReceiver,
    pub datagrams: OutboundReceiver,
    pub control: mpsc::Receiver<WorkerCommand>,
}

/// NOP scheduling
#[derive(Debug)]
struct KeepAlive {
    period: Duration,
    deadline: Instant,
}

impl KeepAlive {
    fn new(initial: Duration, period: Duration) -> Self {
        Self {
            period,
            deadline: Instant::now() + initial,
        }
    }

    fn reset(&mut self) {
        self.deadline = Instant::now() + self.period;
    }
}

pub(crate) struct SessionWorker<S> {
    stream: TcpTransport<S>,
    assembler: FrameAssembler,
    datagram_sockets: Vec<UdpTransport>,
    datagram_buffer: Vec<u8>,
    inbox: WorkerInbox,
    shared: WorkerShared,
    keep_alive: KeepAlive,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> SessionWorker<S> {
    pub(crate) fn new(
        stream: TcpTransport<S>,
        inbox: WorkerInbox,
        shared: WorkerShared,
        initial_keep_alive: Duration,
        keep_alive: Duration,
    ) -> Self {
        Self {
            stream,
            assembler: FrameAssembler::new(),
            datagram_sockets: Vec::new(),
            datagram_buffer: vec![0u8; MAX_UDP_PAYLOAD_SIZE],
            inbox,
            shared,
            keep_alive: KeepAlive::new(initial_keep_alive, keep_alive),
        }
    }

    /// Run until stopped, then close the session
    pub(crate) async fn run(mut self) {
        log::info!("Session worker started (peer {:?})", self.stream.peer_addr());
        let reason = match self.serve().await {
            Ok(reason) => {
                log::info!("Session worker stopped: {}", reason);
                reason
            }
            Err(e) => {
                log::error!("Session worker failed: {}", e);
                e.to_string()
            }
        };
        self.shared.state.send_replace(SessionState::Closed {
            reason: reason.clone(),
        });
        self.shared.correlator.close(&reason);
    }

    async fn serve(&mut self) -> EnipResult<String> {
        loop {
            let keep_alive = tokio::time::sleep_until(self.keep_alive.deadline);

            tokio::select! {
                biased;

                command = self.inbox.control.recv() => match command {
                    Some(WorkerCommand::AttachDatagram(transport)) => {
                        log::debug!("Datagram socket {:?} attached", transport.local_addr());
                        self.datagram_sockets.push(transport);
                    }
                    Some(WorkerCommand::Shutdown) => return Ok("shutdown requested".to_string()),
                    None => return Ok("originator dropped".to_string()),
                },

                read = self.stream.io_mut().read_buf(self.assembler.read_buffer()) => {
                    if read? == 0 {
                        return Ok("target closed the stream".to_string());
                    }
                    if self.drain_stream() {
                        return Ok("target unregistered the session".to_string());
                    }
                }

                Some(frame) = self.inbox.explicit.recv() => {
                    self.write_frame(&frame).await?;
                }

                (index, received) = recv_datagram(&self.datagram_sockets, &mut self.datagram_buffer) => {
                    self.handle_datagram(index, received);
                }

                Some(datagram) = self.inbox.datagrams.recv() => {
                    self.send_datagram(&datagram).await;
                }

                _ = keep_alive => {
                    self.send_keep_alive().await?;
                }
            }
        }
    }

    fn update_statistics(&self, update: impl FnOnce(&mut SessionStatistics)) {
        let mut statistics = self
            .shared
            .statistics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        update(&mut *statistics);
    }

    /// Decode and route every complete buffered frame
    ///
    /// # Returns
    /// `true` if the target unregistered the session
    fn drain_stream(&mut self) -> bool {
        let mut unregistered = false;
        while let Some(bytes) = self.assembler.next_frame() {
            match TransportPacket::decode_encapsulated(&bytes, self.stream.metadata()) {
                Ok(packet) => {
                    self.update_statistics(SessionStatistics::increment_frames_received);
                    unregistered |= self.dispatch(packet);
                }
                Err(e) => {
                    // only this frame is lost; the next one starts right after it
                    log::warn!("Discarding malformed frame of {} bytes: {}", bytes.len(), e);
                    self.update_statistics(SessionStatistics::increment_format_errors);
                }
            }
        }
        unregistered
    }

    fn dispatch(&mut self, packet: TransportPacket) -> bool {
        match route(&packet) {
            Route::Correlate(response_id) => {
                log::trace!("Reply {} ({} bytes)", response_id, packet.data.len());
                if !self.shared.correlator.publish(response_id, packet) {
                    log::debug!("No waiter for reply {}, dropped", response_id);
                    self.update_statistics(SessionStatistics::increment_unmatched_replies);
                }
                false
            }
            Route::Control(command) => match packet.header {
                Some(header) => self.handle_control(command, &header),
                None => false,
            },
            Route::Unsupported(command) => {
                log::warn!("Unsupported encapsulation command 0x{:04X}, dropped", command.code());
                self.update_statistics(SessionStatistics::increment_unsupported_commands);
                false
            }
        }
    }

    fn handle_control(&mut self, command: Command, header: &EncapsulationHeader) -> bool {
        match command {
            Command::RegisterSession => {
                let next = if header.status == 0 {
                    SessionState::Registered {
                        session_handle: header.session_handle,
                    }
                } else {
                    SessionState::Rejected {
                        status: header.status,
                    }
                };
                let applied = self.shared.state.send_if_modified(|state| {
                    if state.can_transition_to(&next) {
                        *state = next.clone();
                        true
                    } else {
                        false
                    }
                });
                if !applied {
                    log::debug!("Ignoring RegisterSession reply, handle already settled");
                } else if header.status == 0 {
                    log::info!("Session registered, handle 0x{:08X}", header.session_handle);
                } else {
                    log::warn!("RegisterSession rejected, status 0x{:08X}", header.status);
                }
                false
            }
            Command::UnRegisterSession => true,
            other => {
                log::debug!("Control frame {:?} ignored", other);
                false
            }
        }
    }

    async fn write_frame(&mut self, frame: &Bytes) -> EnipResult<()> {
        let io = self.stream.io_mut();
        io.write_all(frame).await?;
        io.flush().await?;
        self.keep_alive.reset();
        self.update_statistics(SessionStatistics::increment_frames_sent);
        Ok(())
    }

    async fn send_keep_alive(&mut self) -> EnipResult<()> {
        let session_handle = self.shared.state.borrow().session_handle();
        match session_handle {
            Some(handle) => {
                log::trace!("Keep-alive NOP");
                self.write_frame(&frame::nop(handle)).await?;
                self.update_statistics(SessionStatistics::increment_keep_alives_sent);
            }
            // nothing to keep alive before registration
            None => self.keep_alive.reset(),
        }
        Ok(())
    }

    fn handle_datagram(&mut self, index: usize, received: io::Result<usize>) {
        let length = match received {
            Ok(length) => length,
            Err(e) => {
                // ICMP errors surface here on connected sockets; the session survives them
                log::warn!("Datagram socket {} receive error: {}", index, e);
                return;
            }
        };
        let Some(socket) = self.datagram_sockets.get(index) else {
            return;
        };
        self.update_statistics(SessionStatistics::increment_datagrams_received);

        match TransportPacket::decode_datagram(&self.datagram_buffer[..length], socket.metadata()) {
            Ok(Some(packet)) => {
                let response_id = packet.response_id;
                if !self.shared.correlator.publish(response_id, packet) {
                    log::trace!("No waiter for connection 0x{:08X}", response_id);
                    self.update_statistics(SessionStatistics::increment_unmatched_replies);
                }
            }
            Ok(None) => {
                log::trace!("Dropping {} byte datagram", length);
                self.update_statistics(SessionStatistics::increment_datagrams_dropped);
            }
            Err(e) => {
                log::warn!("Malformed datagram: {}", e);
                self.update_statistics(SessionStatistics::increment_format_errors);
            }
        }
    }

    /// Outbound datagrams go to the first attached socket
    async fn send_datagram(&mut self, datagram: &Bytes) {
        let Some(socket) = self.datagram_sockets.first() else {
            log::warn!("No datagram socket attached, dropping {} bytes", datagram.len());
            self.update_statistics(SessionStatistics::increment_datagrams_dropped);
            return;
        };
        let sent = socket.socket().send(datagram).await;
        match sent {
            Ok(_) => {
                self.keep_alive.reset();
                self.update_statistics(SessionStatistics::increment_datagrams_sent);
            }
            Err(e) => {
                log::warn!("Datagram send failed: {}", e);
                self.update_statistics(SessionStatistics::increment_datagrams_dropped);
            }
        }
    }
}

/// Receive from whichever datagram socket is ready first
///
/// Never completes when no socket is attached.
async fn recv_datagram(sockets: &[UdpTransport], buffer: &mut [u8]) -> (usize, io::Result<usize>) {
    poll_fn(|cx| {
        for (index, transport) in sockets.iter().enumerate() {
            let mut read = ReadBuf::new(&mut *buffer);
            match transport.socket().poll_recv(cx, &mut read) {
                Poll::Ready(Ok(())) => return Poll::Ready((index, Ok(read.filled().len()))),
                Poll::Ready(Err(e)) => return Poll::Ready((index, Err(e))),
                Poll::Pending => {}
            }
        }
        Poll::Pending
    })
    .await
}
