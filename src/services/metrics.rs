use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::errors::{AppError, Result};

/// Prometheus collectors for the gateway, kept on a private registry so tests
/// can build as many instances as they like.
pub struct MetricsService {
    registry: Registry,
    tokens_charged: IntCounterVec,
    quota_rejections: IntCounterVec,
    http_requests: IntCounterVec,
}

impl MetricsService {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let tokens_charged = IntCounterVec::new(
            Opts::new("gateway_tokens_charged_total", "Provider tokens charged against user quotas"),
            &["provider"],
        )
        .map_err(metrics_error)?;
        let quota_rejections = IntCounterVec::new(
            Opts::new("gateway_quota_rejections_total", "Requests rejected for exceeding the daily token quota"),
            &["provider"],
        )
        .map_err(metrics_error)?;
        let http_requests = IntCounterVec::new(
            Opts::new("gateway_http_requests_total", "HTTP requests by method and status class"),
            &["method", "status"],
        )
        .map_err(metrics_error)?;

        registry.register(Box::new(tokens_charged.clone())).map_err(metrics_error)?;
        registry.register(Box::new(quota_rejections.clone())).map_err(metrics_error)?;
        registry.register(Box::new(http_requests.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry,
            tokens_charged,
            quota_rejections,
            http_requests,
        })
    }

    pub fn record_tokens(&self, provider: &str, tokens: u32) {
        self.tokens_charged
            .with_label_values(&[provider])
            .inc_by(u64::from(tokens));
    }

    pub fn record_quota_rejection(&self, provider: &str) {
        self.quota_rejections.with_label_values(&[provider]).inc();
    }

    pub fn record_request(&self, method: &str, status: u16) {
        let class = match status {
            100..=199 => "1xx",
            200..=299 => "2xx",
            300..=399 => "3xx",
            400..=499 => "4xx",
            _ => "5xx",
        };
        self.http_requests.with_label_values(&[method, class]).inc();
    }

    pub fn tokens_charged(&self, provider: &str) -> u64 {
        self.tokens_charged.with_label_values(&[provider]).get()
    }

    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| AppError::Internal(e.into()))
    }
}

fn metrics_error(e: prometheus::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("metrics error: {}", e))
}
