use std::{
    io::{self, ErrorKind},
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use bytes::{Bytes, BytesMut};
use net::{serialize, Packet, PacketDecoder, PacketEncoder, PacketState, ServerboundPacket};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    sync::{
        mpsc::{self, error::TrySendError},
        watch,
    },
};

use crate::{
    error::{ErrorResponder, SessionError},
    logging::ServerLogger,
    metrics::SessionMetrics,
};

pub type SessionId = u64;

const MAX_CHUNK_SIZE: usize = 4096;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// One item on a session's outbound queue. Control commands take effect in
/// queue order relative to the packets around them.
#[derive(Debug)]
pub enum Outbound {
    /// A serialized `[id][fields]` body, shared between fan-out receivers.
    Packet(Bytes),
    EnableCompression(Option<usize>),
    EnableEncryption([u8; 16]),
    /// Flush what is queued, then shut the stream.
    Close,
}

/// Cloneable sending side of a session. Every producer goes through the
/// bounded queue; only the writer task touches the socket.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    inner: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    id: SessionId,
    address: SocketAddr,
    tx: mpsc::Sender<Outbound>,
    closed: watch::Sender<bool>,
}

impl SessionHandle {
    /// A handle without a socket behind it; the caller drains the receiver.
    pub fn detached(address: SocketAddr, capacity: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (closed, _) = watch::channel(false);
        let handle = Self {
            inner: Arc::new(Shared {
                id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
                address,
                tx,
                closed,
            }),
        };
        (handle, rx)
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    #[must_use]
    pub fn address(&self) -> &SocketAddr {
        &self.inner.address
    }

    pub fn send<P: Packet>(&self, packet: &P) -> Result<(), SessionError> {
        let body = serialize(packet)?;
        self.send_raw(Bytes::from(body))
    }

    pub fn send_raw(&self, body: Bytes) -> Result<(), SessionError> {
        self.push(Outbound::Packet(body))
    }

    pub fn enable_compression(&self, threshold: Option<usize>) -> Result<(), SessionError> {
        self.push(Outbound::EnableCompression(threshold))
    }

    pub fn enable_encryption(&self, key: [u8; 16]) -> Result<(), SessionError> {
        self.push(Outbound::EnableEncryption(key))
    }

    pub fn close_after_flush(&self) -> Result<(), SessionError> {
        self.push(Outbound::Close)
    }

    fn push(&self, item: Outbound) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        match self.inner.tx.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                ServerLogger::outbound_overflow(self.address());
                self.close();
                Err(SessionError::OutboundOverflow)
            }
            Err(TrySendError::Closed(_)) => {
                self.close();
                Err(SessionError::Closed)
            }
        }
    }

    /// Marks the session closed and drops anything still queued. Safe to
    /// call any number of times; only the first call returns `true`.
    pub fn close(&self) -> bool {
        !self.inner.closed.send_replace(true)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Resolves once the session is closed.
    pub async fn closed(&self) {
        let mut rx = self.inner.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

/// Reading side of one client connection: owns the decoder and the
/// protocol phase. Dropping it closes the session.
pub struct Session {
    handle: SessionHandle,
    read: OwnedReadHalf,
    decoder: PacketDecoder,
    buf: BytesMut,
    phase: PacketState,
    metrics: Arc<SessionMetrics>,
}

impl Session {
    pub fn new(
        stream: TcpStream,
        address: SocketAddr,
        outbound_capacity: usize,
        metrics: Arc<SessionMetrics>,
    ) -> Self {
        let (read, write) = stream.into_split();
        let (handle, rx) = SessionHandle::detached(address, outbound_capacity);
        tokio::spawn(run_writer(write, rx, handle.clone(), metrics.clone()));
        metrics.record_open();
        Self {
            handle,
            read,
            decoder: PacketDecoder::new(),
            buf: BytesMut::with_capacity(MAX_CHUNK_SIZE),
            phase: PacketState::Handshaking,
            metrics,
        }
    }

    #[must_use]
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    #[must_use]
    pub fn address(&self) -> &SocketAddr {
        self.handle.address()
    }

    #[must_use]
    pub fn phase(&self) -> PacketState {
        self.phase
    }

    pub fn advance(&mut self, next: PacketState) -> Result<(), SessionError> {
        let from = self.phase;
        self.phase.advance(next)?;
        ServerLogger::phase_changed(self.address(), from, next);
        Ok(())
    }

    pub fn send<P: Packet>(&self, packet: &P) -> Result<(), SessionError> {
        self.handle.send(packet)
    }

    /// Switches both directions. The outbound switch is queued, so packets
    /// sent before this call still go out uncompressed.
    pub fn enable_compression(&mut self, threshold: Option<usize>) -> Result<(), SessionError> {
        self.decoder.set_compression(threshold);
        self.handle.enable_compression(threshold)
    }

    /// Installs the shared secret negotiated by the login collaborator.
    pub fn enable_encryption(&mut self, key: &[u8; 16]) -> Result<(), SessionError> {
        self.decoder.enable_encryption(key);
        self.handle.enable_encryption(*key)
    }

    /// Reads the next packet legal in the current phase. Any error closes
    /// the session; nothing is skipped or resynchronized.
    pub async fn next_packet(&mut self) -> Result<ServerboundPacket, SessionError> {
        loop {
            if self.phase.is_closed() || self.handle.is_closed() {
                return Err(SessionError::Closed);
            }

            match self.decoder.try_next_packet() {
                Ok(Some(frame)) => {
                    return match frame.decode_serverbound(self.phase) {
                        Ok(packet) => {
                            self.metrics.record_inbound(self.phase);
                            Ok(packet)
                        }
                        Err(err) => Err(self.fail(err.into())),
                    };
                }
                Ok(None) => {}
                Err(err) => return Err(self.fail(err.into())),
            }

            self.buf.clear();
            self.buf.reserve(MAX_CHUNK_SIZE);
            let read = tokio::select! {
                biased;
                _ = self.handle.closed() => return Err(SessionError::Closed),
                read = self.read.read_buf(&mut self.buf) => read,
            };
            match read {
                Ok(0) => {
                    return Err(self.fail(io::Error::from(ErrorKind::UnexpectedEof).into()));
                }
                Ok(_) => self.decoder.queue_slice(&self.buf),
                Err(err) => return Err(self.fail(err.into())),
            }
        }
    }

    /// Tells the client why, where the phase allows it, and closes.
    pub fn fail(&mut self, err: SessionError) -> SessionError {
        if let SessionError::Malformed(proto) | SessionError::ProtocolViolation(proto) = &err {
            self.metrics.record_error(proto.kind());
            ServerLogger::protocol_violation(self.address(), proto);
        }
        if !self.phase.is_closed() {
            ErrorResponder::new().disconnect_with_error(&self.handle, self.phase, &err);
        }
        self.phase = PacketState::Closed;
        err
    }

    /// Graceful close: queued packets are flushed first.
    pub fn close(&mut self) {
        self.phase = PacketState::Closed;
        if self.handle.close_after_flush().is_err() {
            self.handle.close();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // The writer flushes a pending graceful close on its own.
        if !self.phase.is_closed() {
            self.handle.close();
        }
        self.metrics.record_close();
    }
}

async fn run_writer(
    mut write: OwnedWriteHalf,
    mut rx: mpsc::Receiver<Outbound>,
    handle: SessionHandle,
    metrics: Arc<SessionMetrics>,
) {
    if let Err(err) = write_loop(&mut write, &mut rx, &handle, &metrics).await {
        ServerLogger::writer_failed(handle.address(), &err);
    }
    let _ = write.shutdown().await;
    handle.close();
}

async fn write_loop(
    write: &mut OwnedWriteHalf,
    rx: &mut mpsc::Receiver<Outbound>,
    handle: &SessionHandle,
    metrics: &SessionMetrics,
) -> Result<(), SessionError> {
    let mut encoder = PacketEncoder::new();
    let mut closed = handle.inner.closed.subscribe();

    loop {
        let item = tokio::select! {
            biased;
            _ = closed.wait_for(|closed| *closed) => return Ok(()),
            item = rx.recv() => item,
        };
        let Some(mut item) = item else {
            return Ok(());
        };

        // Batch everything already queued into one write.
        let mut packets = 0;
        loop {
            match item {
                Outbound::Packet(body) => {
                    encoder.append_serialized(&body)?;
                    packets += 1;
                }
                Outbound::EnableCompression(threshold) => encoder.set_compression(threshold),
                Outbound::EnableEncryption(key) => {
                    flush(write, &mut encoder, metrics, &mut packets).await?;
                    encoder.enable_encryption(&key);
                }
                Outbound::Close => {
                    flush(write, &mut encoder, metrics, &mut packets).await?;
                    return Ok(());
                }
            }
            match rx.try_recv() {
                Ok(next) => item = next,
                Err(_) => break,
            }
        }
        flush(write, &mut encoder, metrics, &mut packets).await?;
    }
}

async fn flush(
    write: &mut OwnedWriteHalf,
    encoder: &mut PacketEncoder,
    metrics: &SessionMetrics,
    packets: &mut u64,
) -> Result<(), SessionError> {
    let bytes = encoder.take();
    if bytes.is_empty() {
        return Ok(());
    }
    write.write_all(&bytes).await?;
    metrics.record_outbound(*packets, bytes.len());
    *packets = 0;
    Ok(())
}
