use std::{collections::HashMap, env, time::Duration};

use anyhow::bail;
use log::{info, warn};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::{metrics::SdkMeterProvider, Resource};

/// Resource attributes from the usual `OTEL_*` variables, with
/// `OTEL_RESOURCE_ATTRIBUTES` filling in anything not set explicitly.
pub fn create_resource_from_env() -> Resource {
    let mut attributes = Vec::new();

    let service_name = env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "basalt".to_string());
    attributes.push(KeyValue::new("service.name", service_name));

    for (var, key) in [
        ("OTEL_SERVICE_VERSION", "service.version"),
        ("OTEL_SERVICE_NAMESPACE", "service.namespace"),
        ("OTEL_SERVICE_INSTANCE_ID", "service.instance.id"),
        ("OTEL_DEPLOYMENT_ENVIRONMENT", "deployment.environment"),
    ] {
        if let Ok(value) = env::var(var) {
            attributes.push(KeyValue::new(key, value));
        }
    }

    if let Ok(resource_attributes) = env::var("OTEL_RESOURCE_ATTRIBUTES") {
        for (key, value) in parse_pairs(&resource_attributes) {
            if !attributes.iter().any(|kv| kv.key.as_str() == key) {
                attributes.push(KeyValue::new(key, value));
            }
        }
    }

    Resource::builder().with_attributes(attributes).build()
}

/// Parses `k1=v1,k2=v2`, skipping empty keys or values.
fn parse_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect()
}

fn build_metric_exporter(endpoint: String) -> anyhow::Result<opentelemetry_otlp::MetricExporter> {
    let protocol = dotenvy::var("OTEL_EXPORTER_OTLP_PROTOCOL")
        .unwrap_or_else(|_| "http/protobuf".into())
        .to_lowercase();

    info!("Sending metric to {}", endpoint);

    let timeout = dotenvy::var("OTEL_EXPORTER_OTLP_TIMEOUT")
        .ok()
        .and_then(|s| s.parse().ok())
        .map_or(Duration::from_secs(3), Duration::from_secs);

    let headers: HashMap<String, String> = dotenvy::var("OTEL_EXPORTER_OTLP_HEADERS")
        .map(|raw| parse_pairs(&raw).into_iter().collect())
        .unwrap_or_default();

    let protocol = match protocol.as_str() {
        "http/protobuf" => Protocol::HttpBinary,
        "http/json" => Protocol::HttpJson,
        other => bail!("Unsupported OTLP protocol: {other}"),
    };

    Ok(opentelemetry_otlp::MetricExporter::builder()
        .with_http()
        .with_protocol(protocol)
        .with_endpoint(endpoint)
        .with_timeout(timeout)
        .with_headers(headers)
        .build()?)
}

/// Installs the OTLP meter provider when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
/// Without it the global no-op provider stays in place.
pub fn init_meter() -> Option<SdkMeterProvider> {
    let endpoint = dotenvy::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;
    let exporter = match build_metric_exporter(endpoint) {
        Ok(exporter) => exporter,
        Err(err) => {
            warn!("Metrics disabled: {err}");
            return None;
        }
    };

    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .with_resource(create_resource_from_env())
        .build();
    global::set_meter_provider(meter_provider.clone());
    Some(meter_provider)
}
