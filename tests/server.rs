//! End-to-end sessions against a live listener on a loopback port.
use std::{net::SocketAddr, sync::Arc, time::Duration};

use basalt::{
    config::ServerConfig,
    inventory::{Container, ContainerKind},
    registry::Registry,
    server::Server,
};
use net::{
    decode_packet,
    proto::{
        ClickMode, ContainerClickC2s, ContainerSetContentS2c, ContainerSetSlotS2c,
        FinishConfigurationAckC2s, FinishConfigurationS2c, HandshakeC2s, KeepAliveC2s,
        LoginAcknowledgedC2s,
        LoginDisconnectS2c, LoginStartC2s, LoginSuccessS2c, OpenScreenS2c, SetCompressionS2c, SpawnPositionS2c,
        StatusPingC2s, StatusPongS2c, StatusRequestC2s, StatusResponseS2c, UpdateTagsS2c,
    },
    HandshakeNextState, ItemStack, Packet, PacketDecoder, PacketEncoder, PacketFrame, Uuid,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::broadcast,
    time::timeout,
};

const WAIT: Duration = Duration::from_secs(5);

struct Client {
    stream: TcpStream,
    encoder: PacketEncoder,
    decoder: PacketDecoder,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
            encoder: PacketEncoder::new(),
            decoder: PacketDecoder::new(),
        }
    }

    fn set_compression(&mut self, threshold: Option<usize>) {
        self.encoder.set_compression(threshold);
        self.decoder.set_compression(threshold);
    }

    async fn send<P: Packet>(&mut self, packet: &P) {
        self.encoder.write_packet(packet).unwrap();
        let bytes = self.encoder.take();
        self.stream.write_all(&bytes).await.unwrap();
    }

    /// Next frame, or `None` once the server has closed the connection.
    async fn recv(&mut self) -> Option<PacketFrame> {
        let mut buf = vec![0u8; 8192];
        loop {
            if let Some(frame) = self.decoder.try_next_packet().unwrap() {
                return Some(frame);
            }
            let read = timeout(WAIT, self.stream.read(&mut buf))
                .await
                .expect("server went quiet");
            match read {
                Ok(0) | Err(_) => return None,
                Ok(n) => self.decoder.queue_slice(&buf[..n]),
            }
        }
    }

    async fn expect<P: Packet>(&mut self) -> P {
        let frame = self.recv().await.expect("connection closed");
        decode_packet(&frame).unwrap()
    }

    async fn handshake(&mut self, port: u16, next_state: HandshakeNextState) {
        self.send(&HandshakeC2s {
            protocol_version: 767,
            server_address: "localhost".to_string(),
            server_port: port,
            next_state,
        })
        .await;
    }
}

async fn start(config: &str) -> (Arc<Server>, SocketAddr, broadcast::Sender<()>) {
    let mut config = ServerConfig::parse(config).unwrap();
    config.bind = "127.0.0.1:0".to_string();
    let server = Arc::new(Server::new(config, Registry::bundled().unwrap()));
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, rx) = broadcast::channel(1);
    tokio::spawn(server.clone().serve(listener, rx));
    (server, addr, stop)
}

async fn join(client: &mut Client, port: u16, compressed: bool) {
    join_as(client, port, compressed, "Steve").await;
}

async fn join_as(client: &mut Client, port: u16, compressed: bool, username: &str) {
    client.handshake(port, HandshakeNextState::Login).await;
    client
        .send(&LoginStartC2s {
            username: username.to_string(),
            profile_id: Uuid::from_u64s(1, 2),
        })
        .await;

    if compressed {
        let compression: SetCompressionS2c = client.expect().await;
        assert_eq!(compression.threshold, 256);
        client.set_compression(Some(256));
    }
    let success: LoginSuccessS2c = client.expect().await;
    assert_eq!(success.username, username);
    assert_eq!(success.uuid, Uuid::from_u64s(1, 2));
    client.send(&LoginAcknowledgedC2s).await;

    let _: UpdateTagsS2c = client.expect().await;
    let _: FinishConfigurationS2c = client.expect().await;
    client.send(&FinishConfigurationAckC2s).await;

    let _: SpawnPositionS2c = client.expect().await;
    let content: ContainerSetContentS2c = client.expect().await;
    assert_eq!(content.window_id, 0);
    assert_eq!(content.slots.len(), 46);
    let cursor: ContainerSetSlotS2c = client.expect().await;
    assert_eq!((cursor.window_id, cursor.slot), (-1, -1));
}

#[tokio::test]
async fn status_ping_is_answered_then_closed() {
    let (_server, addr, _stop) = start("motd = \"hello\"").await;
    let mut client = Client::connect(addr).await;
    client.handshake(addr.port(), HandshakeNextState::Status).await;

    client.send(&StatusRequestC2s).await;
    let status: StatusResponseS2c = client.expect().await;
    let json: serde_json::Value = serde_json::from_str(&status.json).unwrap();
    assert_eq!(json["description"]["text"], "hello");
    assert_eq!(json["version"]["protocol"], 767);

    client.send(&StatusPingC2s { payload: 99 }).await;
    let pong: StatusPongS2c = client.expect().await;
    assert_eq!(pong.payload, 99);
    assert!(client.recv().await.is_none());
}

#[tokio::test]
async fn login_reaches_play_with_compression() {
    let (server, addr, _stop) = start("").await;
    let mut client = Client::connect(addr).await;
    join(&mut client, addr.port(), true).await;
    assert_eq!(server.online(), 1);
}

#[tokio::test]
async fn login_without_compression() {
    let (_server, addr, _stop) = start("compression_threshold = -1").await;
    let mut client = Client::connect(addr).await;
    join(&mut client, addr.port(), false).await;
}

#[tokio::test]
async fn packet_from_another_phase_disconnects() {
    let (_server, addr, _stop) = start("").await;
    let mut client = Client::connect(addr).await;
    client.handshake(addr.port(), HandshakeNextState::Login).await;
    client.send(&KeepAliveC2s { id: 1 }).await;

    let disconnect: LoginDisconnectS2c = client.expect().await;
    assert!(disconnect.reason.contains("Disconnected"));
    assert!(client.recv().await.is_none());
}

#[tokio::test]
async fn outdated_client_is_refused() {
    let (_server, addr, _stop) = start("protocol_version = 800").await;
    let mut client = Client::connect(addr).await;
    client.handshake(addr.port(), HandshakeNextState::Login).await;
    client
        .send(&LoginStartC2s {
            username: "Alex".to_string(),
            profile_id: Uuid::from_u64s(3, 4),
        })
        .await;

    let disconnect: LoginDisconnectS2c = client.expect().await;
    assert!(disconnect.reason.contains("Outdated client"));
    assert!(client.recv().await.is_none());
}

#[tokio::test]
async fn stale_click_resyncs_the_inventory() {
    let (_server, addr, _stop) = start("").await;
    let mut client = Client::connect(addr).await;
    join(&mut client, addr.port(), true).await;

    client
        .send(&ContainerClickC2s {
            window_id: 0,
            state_id: 12,
            slot: 20,
            button: 0,
            mode: ClickMode::MouseClick,
            changed_slots: Vec::new(),
            carried: None,
        })
        .await;

    let content: ContainerSetContentS2c = client.expect().await;
    assert_eq!(content.window_id, 0);
    assert_eq!(content.state_id, 0);
    assert!(content.slots.iter().all(Option::is_none));
    let _: ContainerSetSlotS2c = client.expect().await;
}

#[tokio::test]
async fn leaving_play_unregisters_the_player() {
    let (server, addr, _stop) = start("").await;
    let mut client = Client::connect(addr).await;
    join(&mut client, addr.port(), true).await;
    assert_eq!(server.broadcaster().session_count(), 1);

    drop(client);
    timeout(WAIT, async {
        while server.online() != 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(server.broadcaster().session_count(), 0);
}

#[tokio::test]
async fn shared_chest_syncs_every_viewer() {
    let (server, addr, _stop) = start("").await;
    let mut alex = Client::connect(addr).await;
    join_as(&mut alex, addr.port(), true, "Alex").await;
    let mut steve = Client::connect(addr).await;
    join_as(&mut steve, addr.port(), true, "Steve").await;

    let chest = Container::new(ContainerKind::Chest { rows: 3 }, server.registry().clone());
    chest.set(0, Some(ItemStack::new(2, 5))).unwrap();

    for (client, name) in [(&mut alex, "Alex"), (&mut steve, "Steve")] {
        let session = server.find_player(name).unwrap();
        assert!(server.open_container(session, chest.clone()));

        let screen: OpenScreenS2c = client.expect().await;
        assert_eq!(screen.window_id, 1);
        let content: ContainerSetContentS2c = client.expect().await;
        assert_eq!(content.window_id, 1);
        assert_eq!(content.state_id, 1);
        assert_eq!(content.slots.len(), 27 + 36);
        assert_eq!(content.slots[0], Some(ItemStack::new(2, 5)));
        let _: ContainerSetSlotS2c = client.expect().await;
    }

    alex.send(&ContainerClickC2s {
        window_id: 1,
        state_id: 1,
        slot: 0,
        button: 0,
        mode: ClickMode::MouseClick,
        changed_slots: vec![(0, None)],
        carried: Some(ItemStack::new(2, 5)),
    })
    .await;

    let seen: ContainerSetContentS2c = steve.expect().await;
    assert_eq!(seen.window_id, 1);
    assert_eq!(seen.state_id, 2);
    assert_eq!(seen.slots[0], None);

    let own: ContainerSetContentS2c = alex.expect().await;
    assert_eq!(own.state_id, 2);
    let cursor: ContainerSetSlotS2c = alex.expect().await;
    assert_eq!(cursor.item, Some(ItemStack::new(2, 5)));
    assert_eq!(chest.get(0).unwrap(), None);
}

#[tokio::test]
async fn commands_need_a_player_in_play() {
    let (server, _addr, _stop) = start("").await;
    let chest = Container::new(ContainerKind::Chest { rows: 1 }, server.registry().clone());
    assert!(server.find_player("Nobody").is_none());
    assert!(!server.open_container(7, chest));
}
