//! Session originator
//!
//! [`Originator`] is the handle applications hold. It starts the session
//! worker, registers the session, builds explicit and implicit frames and
//! registers waiters for their replies. All socket I/O happens on the worker;
//! the originator only talks to it through queues and a watch channel.

use crate::config::SessionConfig;
use crate::correlator::{Correlator, PendingReply};
use crate::encapsulation::frame;
use crate::error::{EnipError, EnipResult};
use crate::identifiers::{ResponseIdAllocator, IGNORING_CONTEXT, INTERNAL_CONTEXT};
use crate::queue::{outbound_queue, OutboundQueue};
use crate::state::SessionState;
use crate::statistics::SessionStatistics;
use crate::worker::{SessionWorker, WorkerCommand, WorkerInbox, WorkerShared};
use bytes::Bytes;
use enip_transport::{TcpSettings, TcpTransport, UdpSettings, UdpTransport};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// How long to wait for the worker to exit after a shutdown request
const WORKER_STOP_TIMEOUT: Duration = Duration::from_secs(1);

const CONTROL_QUEUE_CAPACITY: usize = 8;

/// Client side of one encapsulation session
#[derive(Debug)]
pub struct Originator {
    config: SessionConfig,
    peer: Option<SocketAddr>,
    explicit: OutboundQueue,
    datagrams: OutboundQueue,
    control: mpsc::Sender<WorkerCommand>,
    state: watch::Receiver<SessionState>,
    correlator: Arc<Correlator>,
    response_ids: ResponseIdAllocator,
    registering: AtomicBool,
    statistics: Arc<Mutex<SessionStatistics>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Originator {
    /// Connect to `address` and start the worker
    ///
    /// The session is not registered yet; call [`Originator::register_session`].
    pub async fn connect(address: SocketAddr, config: SessionConfig) -> EnipResult<Self> {
        config.validate()?;
        let settings = TcpSettings::with_timeout(address, config.connect_timeout);
        let transport = TcpTransport::connect(&settings).await?;
        Self::start(transport, config)
    }

    /// Start the worker on an already-connected stream
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S>(transport: TcpTransport<S>, config: SessionConfig) -> EnipResult<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        config.validate()?;
        let (explicit, explicit_rx) = outbound_queue("explicit", config.queue_capacity);
        let (datagrams, datagram_rx) = outbound_queue("datagram", config.queue_capacity);
        let (control, control_rx) = mpsc::channel(CONTROL_QUEUE_CAPACITY);
        let (state_tx, state) = watch::channel(SessionState::Unregistered);
        let correlator = Arc::new(Correlator::new());
        let statistics = Arc::new(Mutex::new(SessionStatistics::new()));
        let peer = transport.peer_addr();

        let worker = SessionWorker::new(
            transport,
            WorkerInbox {
                explicit: explicit_rx,
                datagrams: datagram_rx,
                control: control_rx,
            },
            WorkerShared {
                correlator: Arc::clone(&correlator),
                state: state_tx,
                statistics: Arc::clone(&statistics),
            },
            config.initial_keep_alive_period(),
            config.keep_alive_period(),
        );
        let handle = tokio::spawn(worker.run());

        Ok(Self {
            response_ids: ResponseIdAllocator::new(config.response_id_ceiling),
            config,
            peer,
            explicit,
            datagrams,
            control,
            state,
            correlator,
            registering: AtomicBool::new(false),
            statistics,
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Target address, when connected over a socket
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Handle assigned by the target; `None` before registration and after close
    pub fn session_handle(&self) -> Option<u32> {
        self.state.borrow().session_handle()
    }

    /// Whether the worker is still running
    pub fn is_active(&self) -> bool {
        !self.state.borrow().is_closed() && !self.correlator.is_closed()
    }

    /// Snapshot of the worker's counters
    pub fn statistics(&self) -> SessionStatistics {
        self.statistics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Allocate a response identifier no waiter currently uses
    pub fn next_response_id(&self) -> u64 {
        self.response_ids
            .allocate_free(|id| self.correlator.is_pending(id))
    }

    /// Register the session with the target
    ///
    /// Sends RegisterSession with the internal sender context and waits up
    /// to the configured registration timeout for the target to assign a
    /// handle. Returns the existing handle if already registered.
    ///
    /// # Errors
    /// - `RegistrationTimeout` if no reply arrives; the worker is stopped
    /// - `RegistrationRejected` for a nonzero encapsulation status; the worker is stopped
    /// - `InvalidData` if another registration is already in flight
    pub async fn register_session(&self) -> EnipResult<u32> {
        if let Some(handle) = self.session_handle() {
            return Ok(handle);
        }
        if self.registering.swap(true, Ordering::AcqRel) {
            return Err(EnipError::InvalidData(
                "RegisterSession already in progress".to_string(),
            ));
        }
        let result = self.register().await;
        self.registering.store(false, Ordering::Release);
        result
    }

    async fn register(&self) -> EnipResult<u32> {
        let timeout = self.config.registration_timeout;
        self.explicit
            .enqueue(frame::register_session(
                INTERNAL_CONTEXT,
                self.config.protocol_version,
            ))
            .await?;

        let mut state = self.state.clone();
        let settled = tokio::time::timeout(timeout, async {
            state
                .wait_for(|state| !matches!(state, SessionState::Unregistered))
                .await
                .map(|state| state.clone())
        })
        .await;
        let settled = match settled {
            Ok(Ok(state)) => state,
            Ok(Err(_)) => {
                return Err(EnipError::SessionClosed(
                    "session worker gone during registration".to_string(),
                ));
            }
            Err(_) => {
                log::error!("No RegisterSession reply within {:?}", timeout);
                self.stop_worker().await;
                return Err(EnipError::RegistrationTimeout(timeout));
            }
        };

        match settled {
            SessionState::Registered { session_handle } => Ok(session_handle),
            SessionState::Rejected { status } => {
                self.stop_worker().await;
                Err(EnipError::RegistrationRejected(status))
            }
            SessionState::Closed { reason } => Err(EnipError::SessionClosed(reason)),
            SessionState::Unregistered => Err(EnipError::SessionClosed(
                "registration did not settle".to_string(),
            )),
        }
    }

    /// Unregister the session and stop the worker
    ///
    /// Frames still queued after the grace period are discarded. Calling
    /// this on a closed session is a no-op.
    pub async fn unregister_session(&self) -> EnipResult<()> {
        if !self.is_active() {
            return Ok(());
        }
        let handle = self.session_handle().unwrap_or(0);
        if self
            .explicit
            .enqueue(frame::unregister_session(handle))
            .await
            .is_ok()
        {
            tokio::time::sleep(self.config.unregister_grace).await;
        }
        self.stop_worker().await;
        log::info!("Session 0x{:08X} unregistered", handle);
        Ok(())
    }

    async fn stop_worker(&self) {
        if self.control.send(WorkerCommand::Shutdown).await.is_err() {
            log::debug!("Session worker already stopped");
        }
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(mut handle) = handle {
            match tokio::time::timeout(WORKER_STOP_TIMEOUT, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("Session worker task failed: {}", e),
                Err(_) => {
                    log::warn!("Session worker did not stop within {:?}, aborting", WORKER_STOP_TIMEOUT);
                    handle.abort();
                }
            }
        }
        self.correlator.close("session stopped");
    }

    fn registered_handle(&self) -> EnipResult<u32> {
        match &*self.state.borrow() {
            SessionState::Registered { session_handle } => Ok(*session_handle),
            SessionState::Closed { reason } => Err(EnipError::SessionClosed(reason.clone())),
            _ => Err(EnipError::NotRegistered),
        }
    }

    /// Send an explicit message
    ///
    /// With `send_id` the payload goes out connected (SendUnitData addressed
    /// to that connection id), otherwise unconnected (SendRRData). With
    /// `receive_id` a waiter is registered before the frame is queued and
    /// returned; the id is also used as the sender context. Without it the
    /// ignoring context is used and no reply is awaited.
    ///
    /// # Errors
    /// `NotRegistered` before registration, `SessionClosed` after the worker stopped.
    pub async fn send_encap(
        &self,
        data: Bytes,
        send_id: Option<u32>,
        receive_id: Option<u64>,
    ) -> EnipResult<Option<PendingReply>> {
        let session_handle = self.registered_handle()?;
        let receive_id = receive_id.filter(|id| *id != IGNORING_CONTEXT);
        let sender_context = receive_id.unwrap_or(IGNORING_CONTEXT);

        let pending = receive_id
            .map(|id| self.correlator.register(id))
            .transpose()?;
        let frame = match send_id {
            Some(connection_id) => {
                frame::send_unit_data(session_handle, sender_context, connection_id, data)?
            }
            None => frame::send_rr_data(session_handle, sender_context, data)?,
        };
        self.explicit.enqueue(frame).await?;
        Ok(pending)
    }

    /// Register a waiter without sending anything (implicit I/O arrivals)
    pub fn expect_reply(&self, response_id: u64) -> EnipResult<PendingReply> {
        self.correlator.register(response_id)
    }

    /// Queue a keep-alive NOP
    pub async fn nop(&self) -> EnipResult<()> {
        let session_handle = self.registered_handle()?;
        self.explicit.enqueue(frame::nop(session_handle)).await
    }

    /// Open a datagram socket to the target's `port` and hand it to the worker
    pub async fn add_datagram_connection(&self, port: u16) -> EnipResult<()> {
        let peer = self.peer.ok_or_else(|| {
            EnipError::InvalidData("Target address unknown, cannot open datagram socket".to_string())
        })?;
        let transport = UdpTransport::connect(&UdpSettings::new(SocketAddr::new(peer.ip(), port))).await?;
        self.attach_datagram(transport).await
    }

    /// Hand an already-connected datagram socket to the worker
    ///
    /// Outbound datagrams use the first attached socket; inbound datagrams
    /// are accepted on all of them.
    pub async fn attach_datagram(&self, transport: UdpTransport) -> EnipResult<()> {
        self.control
            .send(WorkerCommand::AttachDatagram(transport))
            .await
            .map_err(|_| EnipError::SessionClosed("session worker stopped".to_string()))
    }

    /// Queue an implicit I/O datagram
    pub async fn send_io(&self, datagram: Bytes) -> EnipResult<()> {
        self.datagrams.enqueue(datagram).await
    }
}

impl Drop for Originator {
    fn drop(&mut self) {
        if let Some(handle) = self
            .worker
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}
