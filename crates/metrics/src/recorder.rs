//! Metrics recorder initialization.

use {anyhow::Result, tracing::info};

/// Handle to the installed recorder, used to render the scrape output.
#[derive(Clone)]
pub struct MetricsHandle {
    #[cfg(feature = "prometheus")]
    prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl MetricsHandle {
    /// Metrics in the Prometheus text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        {
            self.prometheus_handle.render()
        }
        #[cfg(not(feature = "prometheus"))]
        {
            String::new()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    pub enabled: bool,
    /// Labels added to every series.
    pub global_labels: Vec<(String, String)>,
}

/// Install the process-wide recorder.
///
/// Returns `None` when collection is disabled or the binary was built
/// without the `prometheus` feature; recorded values are then dropped.
/// Call once at startup: a second install fails.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<Option<MetricsHandle>> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(None);
    }

    #[cfg(feature = "prometheus")]
    {
        let prometheus_handle = install_prometheus(config)?;
        info!("prometheus metrics recorder installed");
        Ok(Some(MetricsHandle { prometheus_handle }))
    }

    #[cfg(not(feature = "prometheus"))]
    {
        info!("metrics requested but the prometheus feature is not compiled in");
        Ok(None)
    }
}

#[cfg(feature = "prometheus")]
fn install_prometheus(
    config: MetricsRecorderConfig,
) -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    let mut builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    for (key, value) in config.global_labels {
        builder = builder.add_global_label(key, value);
    }
    // No HTTP listener; the gateway serves `render()` itself.
    Ok(builder.install_recorder()?)
}
