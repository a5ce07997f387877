use criterion::{black_box, criterion_group, criterion_main, Criterion};
use net::{
    proto::{
        ClickMode, ContainerClickC2s, ContainerSetContentS2c, HandshakeC2s, KeepAliveC2s,
        SpawnEntityS2c, StatusPingC2s,
    },
    serialize, HandshakeNextState, ItemStack, Packet, PacketDecoder, PacketEncoder, PacketFrame,
    PacketState, ServerboundPacket, Uuid,
};

const KEY: [u8; 16] = *b"bench-secret-key";
const THRESHOLD: usize = 256;
const TRUNCATE_LEN: usize = 16;

fn inventory() -> ContainerSetContentS2c {
    ContainerSetContentS2c {
        window_id: 0,
        state_id: 12,
        slots: (0..46)
            .map(|i| (i % 3 != 0).then(|| ItemStack::new(i, 32).with_meta("name", "bench")))
            .collect(),
    }
}

fn serverbound() -> Vec<(PacketState, Vec<u8>)> {
    fn frame<P: Packet>(state: PacketState, packet: &P) -> (PacketState, Vec<u8>) {
        let mut enc = PacketEncoder::new();
        enc.write_packet(packet).unwrap();
        (state, enc.take())
    }

    vec![
        frame(
            PacketState::Handshaking,
            &HandshakeC2s {
                protocol_version: 767,
                server_address: "localhost".to_string(),
                server_port: 25565,
                next_state: HandshakeNextState::Login,
            },
        ),
        frame(PacketState::Status, &StatusPingC2s { payload: 1_234_567 }),
        frame(PacketState::Play, &KeepAliveC2s { id: 99 }),
        frame(
            PacketState::Play,
            &ContainerClickC2s {
                window_id: 0,
                state_id: 4,
                slot: 36,
                button: 0,
                mode: ClickMode::MouseClick,
                changed_slots: vec![(36, None), (37, Some(ItemStack::new(1, 64)))],
                carried: Some(ItemStack::new(1, 64)),
            },
        ),
    ]
}

fn bench_encode(c: &mut Criterion) {
    let spawn = SpawnEntityS2c {
        entity_id: 7,
        uuid: Uuid::from_u64s(1, 2),
        entity_type: 58,
        x: 0.5,
        y: 64.0,
        z: -3.25,
        pitch: 0,
        yaw: 0,
        head_yaw: 0,
        data: 0,
        velocity: [120, 2000, -120],
    };
    let inventory = inventory();

    c.bench_function("serialize_spawn_entity", |b| {
        b.iter(|| black_box(serialize(&spawn).unwrap()))
    });
    c.bench_function("serialize_inventory", |b| {
        b.iter(|| black_box(serialize(&inventory).unwrap()))
    });
}

fn bench_decode_round_robin(c: &mut Criterion) {
    let frames = serverbound();
    let mut idx = 0usize;
    let mut decoder = PacketDecoder::new();

    c.bench_function("decode_round_robin", |b| {
        b.iter(|| {
            let (state, bytes) = &frames[idx];
            idx = (idx + 1) % frames.len();
            decoder.queue_slice(bytes);
            let frame = decoder.try_next_packet().unwrap().unwrap();
            black_box(ServerboundPacket::decode(*state, &frame).unwrap());
        })
    });
}

fn bench_secure_pipeline(c: &mut Criterion) {
    let inventory = inventory();
    let mut encoder = PacketEncoder::new();
    encoder.set_compression(Some(THRESHOLD));
    encoder.enable_encryption(&KEY);
    let mut decoder = PacketDecoder::new();
    decoder.set_compression(Some(THRESHOLD));
    decoder.enable_encryption(&KEY);

    c.bench_function("compressed_encrypted_roundtrip", |b| {
        b.iter(|| {
            encoder.write_packet(&inventory).unwrap();
            decoder.queue_slice(&encoder.take());
            black_box(decoder.try_next_packet().unwrap().unwrap());
        })
    });
}

fn bench_truncated_error(c: &mut Criterion) {
    let frames = serverbound();
    let decoded: Vec<(PacketState, PacketFrame)> = frames
        .iter()
        .map(|(state, bytes)| {
            let mut dec = PacketDecoder::new();
            dec.queue_slice(bytes);
            (*state, dec.try_next_packet().unwrap().unwrap())
        })
        .collect();
    let mut idx = 0usize;

    c.bench_function("truncated_body_error", |b| {
        b.iter(|| {
            let (state, frame) = &decoded[idx];
            idx = (idx + 1) % decoded.len();
            let keep = TRUNCATE_LEN.min(frame.body.len().saturating_sub(1));
            let truncated = PacketFrame {
                id: frame.id,
                body: frame.body[..keep].to_vec(),
            };
            black_box(ServerboundPacket::decode(*state, &truncated).is_err());
        })
    });
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode_round_robin,
    bench_secure_pipeline,
    bench_truncated_error
);
criterion_main!(benches);
