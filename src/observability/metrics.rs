/// Prometheusメトリクス定義。
use prometheus::{
    register_gauge_with_registry, register_histogram_vec_with_registry,
    register_int_counter_vec_with_registry, register_int_counter_with_registry, Gauge,
    HistogramVec, IntCounter, IntCounterVec, Registry,
};

/// メトリクスコレクター。
#[derive(Debug, Clone)]
pub struct Metrics {
    // counters
    pub jobs_total: IntCounterVec,
    pub scrapes_total: IntCounterVec,
    pub provider_fallback_total: IntCounterVec,
    pub images_reused_total: IntCounter,
    pub broadcast_failures_total: IntCounter,

    // histograms
    pub job_duration: HistogramVec,

    // gauges
    pub active_jobs: Gauge,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成する。
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            jobs_total: register_int_counter_vec_with_registry!(
                "recipe_jobs_total",
                "Total number of worker jobs processed",
                &["job_type", "status"],
                registry
            )?,
            scrapes_total: register_int_counter_vec_with_registry!(
                "recipe_scrapes_total",
                "Total number of post scrapes by platform",
                &["platform", "status"],
                registry
            )?,
            provider_fallback_total: register_int_counter_vec_with_registry!(
                "recipe_provider_fallback_total",
                "Number of provider fallback attempts",
                &["from_provider", "to_provider", "reason"],
                registry
            )?,
            images_reused_total: register_int_counter_with_registry!(
                "recipe_images_reused_total",
                "Uploads skipped because identical bytes were already stored",
                registry
            )?,
            broadcast_failures_total: register_int_counter_with_registry!(
                "recipe_broadcast_failures_total",
                "Progress broadcasts that failed and were dropped",
                registry
            )?,
            job_duration: register_histogram_vec_with_registry!(
                "recipe_job_duration_seconds",
                "Duration of worker job handlers",
                &["job_type"],
                vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0],
                registry
            )?,
            active_jobs: register_gauge_with_registry!(
                "recipe_active_jobs",
                "Number of currently executing jobs",
                registry
            )?,
        })
    }

    /// ジョブの結果と所要時間を記録する。
    pub fn record_job(&self, job_type: &str, status: &str, duration_seconds: f64) {
        self.jobs_total
            .with_label_values(&[job_type, status])
            .inc();
        self.job_duration
            .with_label_values(&[job_type])
            .observe(duration_seconds);
    }
}
