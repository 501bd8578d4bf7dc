use prometheus::{Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub matches_total: IntCounterVec,
    pub match_latency_seconds: HistogramVec,
    pub bookings_total: IntCounterVec,
    pub indexed_routes: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let matches_total = IntCounterVec::new(
            Opts::new("matches_total", "Total match queries by outcome"),
            &["outcome"],
        )
        .expect("valid matches_total metric");

        let match_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "match_latency_seconds",
                "Latency of match queries in seconds",
            ),
            &["outcome"],
        )
        .expect("valid match_latency_seconds metric");

        let bookings_total = IntCounterVec::new(
            Opts::new("bookings_total", "Booking lifecycle events by status"),
            &["status"],
        )
        .expect("valid bookings_total metric");

        let indexed_routes = IntGauge::new(
            "indexed_routes",
            "Number of trip routes in the spatial index",
        )
        .expect("valid indexed_routes metric");

        registry
            .register(Box::new(matches_total.clone()))
            .expect("register matches_total");
        registry
            .register(Box::new(match_latency_seconds.clone()))
            .expect("register match_latency_seconds");
        registry
            .register(Box::new(bookings_total.clone()))
            .expect("register bookings_total");
        registry
            .register(Box::new(indexed_routes.clone()))
            .expect("register indexed_routes");

        Self {
            registry,
            matches_total,
            match_latency_seconds,
            bookings_total,
            indexed_routes,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
