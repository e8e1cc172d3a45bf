use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::completion::CompletionSettings;
use crate::player::{SequenceOptions, StopPolicy};
use crate::quantize::{GridSettings, QuantizeSettings, TimingMode, VelocityMode, VelocitySettings};
use crate::transport::OscAddresses;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    completion: CompletionConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    quantize: QuantizeConfig,
}

#[derive(Deserialize, Default)]
struct EngineConfig {
    host: Option<String>,
    port: Option<u16>,
    melody_address: Option<String>,
    chord_address: Option<String>,
    stop_address: Option<String>,
}

#[derive(Deserialize, Default)]
struct CompletionConfig {
    listen_host: Option<String>,
    listen_port: Option<u16>,
    address: Option<String>,
    history: Option<usize>,
    reconnect_delay_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct PlaybackConfig {
    sequence_loop: Option<bool>,
    watchdog_secs: Option<f64>,
    stop_retry_attempts: Option<u32>,
    stop_retry_backoff_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct QuantizeConfig {
    bpm: Option<f64>,
    division: Option<u32>,
    min_duration: Option<f64>,
    chord_threshold: Option<f64>,
    velocity_min: Option<f64>,
    velocity_max: Option<f64>,
    velocity_mode: Option<String>,
}

pub struct Config {
    engine: EngineConfig,
    completion: CompletionConfig,
    playback: PlaybackConfig,
    quantize: QuantizeConfig,
}

impl Config {
    /// Embedded defaults, overridden field by field by the user's config file.
    pub fn load() -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => merge(&mut base, user),
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        base.into()
    }

    /// Embedded defaults overridden by `contents`. Malformed input is logged
    /// and ignored.
    pub fn from_toml_str(contents: &str) -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");
        match toml::from_str::<ConfigFile>(contents) {
            Ok(user) => merge(&mut base, user),
            Err(e) => log::warn!(target: "config", "ignoring malformed config: {}", e),
        }
        base.into()
    }

    pub fn engine_addr(&self) -> SocketAddr {
        socket_addr(self.engine.host.as_deref(), self.engine.port.unwrap_or(7000))
    }

    pub fn osc_addresses(&self) -> OscAddresses {
        let fallback = OscAddresses::default();
        OscAddresses {
            melody: self.engine.melody_address.clone().unwrap_or(fallback.melody),
            chord: self.engine.chord_address.clone().unwrap_or(fallback.chord),
            stop: self.engine.stop_address.clone().unwrap_or(fallback.stop),
        }
    }

    pub fn completion_settings(&self) -> CompletionSettings {
        let fallback = CompletionSettings::default();
        CompletionSettings {
            bind: socket_addr(
                self.completion.listen_host.as_deref(),
                self.completion.listen_port.unwrap_or(fallback.bind.port()),
            ),
            address: self.completion.address.clone().unwrap_or(fallback.address),
            history: self.completion.history.unwrap_or(fallback.history),
            reconnect_delay: self
                .completion
                .reconnect_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(fallback.reconnect_delay),
        }
    }

    pub fn sequence_options(&self) -> SequenceOptions {
        SequenceOptions {
            sequence_loop: self.playback.sequence_loop.unwrap_or(false),
            watchdog: self
                .playback
                .watchdog_secs
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map(Duration::from_secs_f64),
        }
    }

    pub fn stop_policy(&self) -> StopPolicy {
        let fallback = StopPolicy::default();
        StopPolicy {
            attempts: self.playback.stop_retry_attempts.unwrap_or(fallback.attempts).max(1),
            backoff: self
                .playback
                .stop_retry_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(fallback.backoff),
        }
    }

    /// Grid-quantized melody-mode settings built from the `[quantize]` section.
    pub fn quantize_settings(&self) -> QuantizeSettings {
        let fallback = QuantizeSettings::default();
        let velocity_min = self.quantize.velocity_min.unwrap_or(0.3);
        let velocity_max = self.quantize.velocity_max.unwrap_or(0.9);
        let velocity = match self.quantize.velocity_mode.as_deref().map(parse_velocity_mode) {
            Some(Some(mode)) => Some(VelocitySettings { min: velocity_min, max: velocity_max, mode }),
            Some(None) => None,
            None => fallback.velocity,
        };
        QuantizeSettings {
            timing: TimingMode::Grid(GridSettings {
                bpm: self.quantize.bpm.unwrap_or(120.0),
                division: self.quantize.division.unwrap_or(16),
            }),
            min_duration: self.quantize.min_duration.or(fallback.min_duration),
            chord_mode: false,
            chord_threshold: self.quantize.chord_threshold.unwrap_or(fallback.chord_threshold),
            velocity,
        }
    }
}

impl From<ConfigFile> for Config {
    fn from(file: ConfigFile) -> Self {
        Config {
            engine: file.engine,
            completion: file.completion,
            playback: file.playback,
            quantize: file.quantize,
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("motif").join("config.toml"))
}

fn socket_addr(host: Option<&str>, port: u16) -> SocketAddr {
    let ip = match host.map(str::parse::<IpAddr>) {
        Some(Ok(ip)) => ip,
        Some(Err(e)) => {
            log::warn!(target: "config", "invalid host {:?} ({}), using 127.0.0.1", host, e);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
        None => IpAddr::V4(Ipv4Addr::LOCALHOST),
    };
    SocketAddr::new(ip, port)
}

fn take<T>(base: &mut Option<T>, user: Option<T>) {
    if user.is_some() {
        *base = user;
    }
}

fn merge(base: &mut ConfigFile, user: ConfigFile) {
    take(&mut base.engine.host, user.engine.host);
    take(&mut base.engine.port, user.engine.port);
    take(&mut base.engine.melody_address, user.engine.melody_address);
    take(&mut base.engine.chord_address, user.engine.chord_address);
    take(&mut base.engine.stop_address, user.engine.stop_address);

    take(&mut base.completion.listen_host, user.completion.listen_host);
    take(&mut base.completion.listen_port, user.completion.listen_port);
    take(&mut base.completion.address, user.completion.address);
    take(&mut base.completion.history, user.completion.history);
    take(&mut base.completion.reconnect_delay_ms, user.completion.reconnect_delay_ms);

    take(&mut base.playback.sequence_loop, user.playback.sequence_loop);
    take(&mut base.playback.watchdog_secs, user.playback.watchdog_secs);
    take(&mut base.playback.stop_retry_attempts, user.playback.stop_retry_attempts);
    take(&mut base.playback.stop_retry_backoff_ms, user.playback.stop_retry_backoff_ms);

    take(&mut base.quantize.bpm, user.quantize.bpm);
    take(&mut base.quantize.division, user.quantize.division);
    take(&mut base.quantize.min_duration, user.quantize.min_duration);
    take(&mut base.quantize.chord_threshold, user.quantize.chord_threshold);
    take(&mut base.quantize.velocity_min, user.quantize.velocity_min);
    take(&mut base.quantize.velocity_max, user.quantize.velocity_max);
    take(&mut base.quantize.velocity_mode, user.quantize.velocity_mode);
}

fn parse_velocity_mode(s: &str) -> Option<VelocityMode> {
    match s.to_lowercase().as_str() {
        "scale" => Some(VelocityMode::Scale),
        "constant" => Some(VelocityMode::Constant),
        _ => None,
    }
}
