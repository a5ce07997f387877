mod configuration;
mod login;
mod play;
mod status;

use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, PoisonError, RwLock,
    },
    time::{Duration, Instant},
};

use net::{PacketState, ServerboundPacket};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::{broadcast, mpsc, Semaphore},
};

use crate::{
    broadcast::Broadcaster,
    config::ServerConfig,
    connection::{Session, SessionId},
    error::SessionError,
    events::{ContainerEvents, NoopEvents},
    inventory::Container,
    logging::ServerLogger,
    metrics::{ContainerMetrics, HandshakeMetrics, SessionMetrics},
    registry::Registry,
    telemetry::get_meter,
    threat::{
        ratelimit::{RatelimitResult, Ratelimiter},
        ClientIntent, ThreatControlService,
    },
    world::{EntityWorld, ITEM_LIFETIME},
};

const PLAYER_COMMANDS: usize = 16;

/// Requests other tasks can make of a player who is in play.
#[derive(Debug)]
pub enum PlayerCommand {
    /// Show a container in a new window and keep it in sync with every
    /// other viewer.
    OpenContainer(Arc<Container>),
}

struct PlayerEntry {
    username: String,
    commands: mpsc::Sender<PlayerCommand>,
}

/// Shared server state; one per process, borrowed by every session task.
pub struct Server {
    config: ServerConfig,
    registry: Arc<Registry>,
    broadcaster: Arc<Broadcaster>,
    world: Arc<EntityWorld>,
    events: Arc<dyn ContainerEvents>,
    threat: ThreatControlService,
    handshake_metrics: HandshakeMetrics,
    session_metrics: Arc<SessionMetrics>,
    container_metrics: ContainerMetrics,
    online: AtomicUsize,
    players: RwLock<HashMap<SessionId, PlayerEntry>>,
}

impl Server {
    pub fn new(config: ServerConfig, registry: Arc<Registry>) -> Self {
        let meter = get_meter();
        let broadcaster = Arc::new(Broadcaster::new());
        Self {
            config,
            registry,
            world: Arc::new(EntityWorld::new(broadcaster.clone())),
            broadcaster,
            events: Arc::new(NoopEvents),
            threat: ThreatControlService::new(),
            handshake_metrics: HandshakeMetrics::new(&meter),
            session_metrics: Arc::new(SessionMetrics::new(&meter)),
            container_metrics: ContainerMetrics::new(&meter),
            online: AtomicUsize::new(0),
            players: RwLock::new(HashMap::new()),
        }
    }

    /// Replaces the container event hook.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn ContainerEvents>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    pub fn world(&self) -> &Arc<EntityWorld> {
        &self.world
    }

    #[must_use]
    pub fn online(&self) -> usize {
        self.online.load(Ordering::Relaxed)
    }

    /// Session of the player in play under `username`.
    #[must_use]
    pub fn find_player(&self, username: &str) -> Option<SessionId> {
        self.players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(_, entry)| entry.username == username)
            .map(|(id, _)| *id)
    }

    /// Opens `container` for the player on `session`. Returns `false` when
    /// the session is not in play or is not keeping up with commands.
    pub fn open_container(&self, session: SessionId, container: Arc<Container>) -> bool {
        self.command(session, PlayerCommand::OpenContainer(container))
    }

    pub fn command(&self, session: SessionId, command: PlayerCommand) -> bool {
        let players = self.players.read().unwrap_or_else(PoisonError::into_inner);
        players
            .get(&session)
            .is_some_and(|entry| entry.commands.try_send(command).is_ok())
    }

    fn join_player(&self, session: SessionId, username: String) -> mpsc::Receiver<PlayerCommand> {
        let (commands, rx) = mpsc::channel(PLAYER_COMMANDS);
        self.players
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session, PlayerEntry { username, commands });
        rx
    }

    fn leave_player(&self, session: SessionId) {
        self.players
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session);
    }

    pub async fn bind(&self) -> anyhow::Result<TcpListener> {
        ServerLogger::preparing_socket(&self.config.bind);
        let address: SocketAddr = self.config.bind.parse()?;
        Ok(TcpListener::bind(address).await?)
    }

    /// Accepts connections until `stop` fires.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        mut stop: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_conn as usize));
        let rate_limiter: Ratelimiter<IpAddr> =
            Ratelimiter::new(self.config.cooldown, Duration::from_secs(1));
        let mut sweep = tokio::time::interval(Duration::from_secs(60));

        loop {
            let (client, addr) = tokio::select! {
                _ = stop.recv() => return Ok(()),
                _ = sweep.tick() => {
                    rate_limiter.retain_recent();
                    if let Err(err) = self.world.despawn_expired(ITEM_LIFETIME) {
                        ServerLogger::despawn_failed(&err);
                    }
                    continue;
                }
                accepted = listener.accept() => accepted?,
            };

            let ip = addr.ip();
            if let RatelimitResult::Disallowed { .. } = rate_limiter.check(&ip) {
                ServerLogger::rate_limited(&ip);
                drop(client);
                continue;
            }

            // Too many connections: reject immediately.
            let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                drop(client);
                continue;
            };

            if dotenvy::var("NO_NODELAY").is_err() {
                if let Err(e) = client.set_nodelay(true) {
                    ServerLogger::tcp_nodelay_failed(&e);
                }
            }

            let server = self.clone();
            tokio::spawn(async move {
                server.handle_connection(client, addr).await;
                drop(permit);
            });
        }
    }

    pub async fn handle_connection(&self, client: TcpStream, addr: SocketAddr) {
        ServerLogger::new_connection(&addr);
        self.handshake_metrics.record_open();
        let mut session = Session::new(
            client,
            addr,
            self.config.outbound_queue,
            self.session_metrics.clone(),
        );

        if let Err(err) = self.drive(&mut session).await {
            let err = if session.phase().is_closed() {
                err
            } else {
                session.fail(err)
            };
            match err {
                SessionError::Closed => ServerLogger::connection_closed(&addr, &err),
                SessionError::Io(ref io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                    ServerLogger::connection_closed(&addr, &err)
                }
                _ => ServerLogger::connection_error(&addr, &err),
            }
        }
    }

    async fn drive(&self, session: &mut Session) -> Result<(), SessionError> {
        let addr = *session.address();
        let timeout = self.config.handshake_timeout();
        let start = Instant::now();

        let packet = self
            .threat
            .nuisance(timeout, session.next_packet(), ClientIntent::Handshake, &addr)
            .await?;
        let handshake = match packet {
            ServerboundPacket::Handshake(handshake) => handshake,
            other => return Err(SessionError::unexpected(session.phase(), &other)),
        };
        let next = PacketState::from(handshake.next_state);
        session.advance(next)?;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        ServerLogger::handshake_completed(elapsed_ms, next.label());
        self.handshake_metrics.record_attempt(next);
        self.handshake_metrics.record_duration(elapsed_ms, next);

        if next == PacketState::Status {
            return status::serve(self, session).await;
        }

        let login = self
            .threat
            .nuisance(
                timeout,
                login::login(self, session, &handshake),
                ClientIntent::Login,
                &addr,
            )
            .await;
        let profile = match login {
            Ok(Some(profile)) => profile,
            Ok(None) => return Ok(()),
            Err(err) => {
                self.handshake_metrics.record_failure(next);
                return Err(err);
            }
        };

        self.threat
            .nuisance(
                timeout,
                configuration::configure(self, session),
                ClientIntent::Configuration,
                &addr,
            )
            .await?;

        play::play(self, session, profile).await
    }
}
