//! Configuration file loading and CLI overrides

use anyhow::{Context, Result};
use mqtt_bench_broker::BrokerOptions;
use mqtt_bench_core::{CloseConnection, ExperimentConfig, QoS, SampleRequest, StopCondition};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::RunArgs;

/// Everything one run needs, as stored in a JSON configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Request every worker repeats
    pub request: SampleRequest,

    /// Concurrency, stop condition and sample defaults
    pub experiment: ExperimentConfig,

    /// Client tunables
    pub broker: BrokerOptions,
}

impl BenchConfig {
    /// Read a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Configuration from `--config` (if any) with every flag applied on top
    pub fn from_args(args: &RunArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(args)?;
        Ok(config)
    }

    /// Override fields with the flags that were given
    pub fn apply(&mut self, args: &RunArgs) -> Result<()> {
        let request = &mut self.request;
        if let Some(server) = &args.server {
            request.server = server.clone();
        }
        if let Some(port) = args.port {
            request.port = port;
        }
        if let Some(client_id) = &args.client_id {
            request.client_id = client_id.clone();
        }
        if let Some(username) = &args.username {
            request.username = username.clone();
        }
        if let Some(password) = &args.password {
            request.password = password.clone();
        }
        if let Some(topic) = &args.topic {
            request.topic = topic.clone();
        }
        if let Some(qos) = args.qos {
            request.qos = QoS::try_from(qos)?;
        }
        if args.retain {
            request.retain = true;
        }
        if args.no_reuse {
            request.reuse_connection = false;
        }
        if let Some(close) = args.close {
            request.close_connection = CloseConnection::from(Some(close));
        }
        if let Some(message) = &args.message {
            request.message_body = message.clone();
        }

        let experiment = &mut self.experiment;
        if let Some(codec) = args.codec {
            experiment.codec = codec;
        }
        if let Some(concurrency) = args.concurrency {
            experiment.concurrency = concurrency;
        }
        if let Some(samples) = args.samples {
            experiment.stop_condition = StopCondition::SampleCount(samples);
        }
        if let Some(secs) = args.duration {
            experiment.stop_condition = StopCondition::Duration(Duration::from_secs(secs));
        }
        if args.rate_limit.is_some() {
            experiment.rate_limit = args.rate_limit;
        }
        if let Some(close_default) = args.close_default {
            experiment.close_connection_default = close_default;
        }

        if let Some(secs) = args.keep_alive {
            self.broker.keep_alive = Duration::from_secs(secs);
        }
        if let Some(secs) = args.connect_timeout {
            self.broker.connect_timeout = Duration::from_secs(secs);
        }
        Ok(())
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.request.validate().context("invalid request")?;
        self.experiment.validate().context("invalid experiment")?;
        self.broker.validate().context("invalid broker options")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqtt_bench_core::CodecKind;
    use std::io::Write;

    fn write_config(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_config_file() {
        let file = write_config(
            r#"{
                "request": {
                    "server": "broker.local",
                    "client_id": "bench-{worker}",
                    "topic": "bench/t",
                    "qos": 1,
                    "close_connection": false
                },
                "experiment": {
                    "concurrency": 8,
                    "stop_condition": {"sample_count": 500},
                    "codec": "json"
                },
                "broker": {"keep_alive": 15}
            }"#,
        );

        let config = BenchConfig::load(file.path()).unwrap();

        assert_eq!(config.request.server, "broker.local");
        assert_eq!(config.request.port, 1883);
        assert_eq!(config.request.qos, QoS::AtLeastOnce);
        assert_eq!(config.request.close_connection, CloseConnection::KeepOpen);
        assert_eq!(config.experiment.concurrency, 8);
        assert_eq!(config.experiment.stop_condition, StopCondition::SampleCount(500));
        assert_eq!(config.experiment.codec, CodecKind::Json);
        assert_eq!(config.broker.keep_alive, Duration::from_secs(15));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = BenchConfig::load(Path::new("/nonexistent/bench.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_load_malformed_file() {
        let file = write_config("{ not json");
        let err = BenchConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn test_flags_override_file() {
        let file = write_config(
            r#"{"request": {"server": "a", "client_id": "c", "topic": "t"},
                "experiment": {"concurrency": 2}}"#,
        );
        let args = RunArgs {
            config: Some(file.path().to_path_buf()),
            server: Some("b".into()),
            no_reuse: true,
            close: Some(true),
            duration: Some(30),
            close_default: Some(true),
            ..Default::default()
        };

        let config = BenchConfig::from_args(&args).unwrap();

        assert_eq!(config.request.server, "b");
        assert_eq!(config.request.topic, "t");
        assert!(!config.request.reuse_connection);
        assert_eq!(config.request.close_connection, CloseConnection::Close);
        assert_eq!(config.experiment.concurrency, 2);
        assert_eq!(
            config.experiment.stop_condition,
            StopCondition::Duration(Duration::from_secs(30))
        );
        assert!(config.experiment.close_connection_default);
    }

    #[test]
    fn test_validate_reports_section() {
        let config = BenchConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("invalid request"));
    }
}
