use net::{proto::ClickMode, ErrorKind, PacketState};
use opentelemetry::{
    metrics::{Counter, Histogram, Meter, UpDownCounter},
    KeyValue,
};

pub struct HandshakeMetrics {
    open: Counter<u64>,
    attempts: Counter<u64>,
    failures: Counter<u64>,
    duration: Histogram<u64>,
}

impl HandshakeMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            open: meter.u64_counter("basalt_socket_open_total").build(),
            attempts: meter.u64_counter("basalt_handshake_total").build(),
            failures: meter.u64_counter("basalt_handshake_fail_total").build(),
            duration: meter.u64_histogram("basalt_handshake_time_ms").build(),
        }
    }

    pub fn record_open(&self) {
        self.open.add(1, &[]);
    }

    pub fn record_attempt(&self, state: PacketState) {
        self.attempts.add(1, &[KeyValue::new("state", state.label())]);
    }

    pub fn record_failure(&self, state: PacketState) {
        self.failures.add(1, &[KeyValue::new("state", state.label())]);
    }

    pub fn record_duration(&self, elapsed_ms: u64, state: PacketState) {
        self.duration
            .record(elapsed_ms, &[KeyValue::new("state", state.label())]);
    }
}

pub struct SessionMetrics {
    active: UpDownCounter<i64>,
    packets_in: Counter<u64>,
    packets_out: Counter<u64>,
    bytes_out: Counter<u64>,
    errors: Counter<u64>,
}

impl SessionMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            active: meter.i64_up_down_counter("basalt_sessions_active").build(),
            packets_in: meter.u64_counter("basalt_packets_in_total").build(),
            packets_out: meter.u64_counter("basalt_packets_out_total").build(),
            bytes_out: meter.u64_counter("basalt_bytes_out_total").build(),
            errors: meter.u64_counter("basalt_protocol_errors_total").build(),
        }
    }

    pub fn record_open(&self) {
        self.active.add(1, &[]);
    }

    pub fn record_close(&self) {
        self.active.add(-1, &[]);
    }

    pub fn record_inbound(&self, phase: PacketState) {
        self.packets_in.add(1, &[KeyValue::new("phase", phase.label())]);
    }

    pub fn record_outbound(&self, packets: u64, bytes: usize) {
        self.packets_out.add(packets, &[]);
        self.bytes_out.add(bytes as u64, &[]);
    }

    pub fn record_error(&self, kind: ErrorKind) {
        let kind = match kind {
            ErrorKind::MalformedPacket => "malformed",
            ErrorKind::ProtocolViolation => "violation",
        };
        self.errors.add(1, &[KeyValue::new("kind", kind)]);
    }
}

pub struct ContainerMetrics {
    clicks: Counter<u64>,
    rejected: Counter<u64>,
}

impl ContainerMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            clicks: meter.u64_counter("basalt_container_clicks_total").build(),
            rejected: meter.u64_counter("basalt_container_rejected_total").build(),
        }
    }

    pub fn record_click(&self, mode: ClickMode) {
        self.clicks
            .add(1, &[KeyValue::new("mode", format!("{mode:?}"))]);
    }

    pub fn record_rejected(&self, reason: &'static str) {
        self.rejected.add(1, &[KeyValue::new("reason", reason)]);
    }
}
