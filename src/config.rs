// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::path::Path;

use config::{Environment, File};
use serde::Deserialize;

mod error;

pub use error::ConfigError;

/// Environment variables with this prefix override file values, e.g. NEOSTRIP_STRIP_ID.
const ENV_PREFIX: &str = "NEOSTRIP";

/// Separates nested keys in environment variables, e.g. NEOSTRIP_STRIP__LENGTH.
const ENV_SEPARATOR: &str = "__";

const DEFAULT_BASE_TOPIC: &str = "home";
const DEFAULT_STRIP_ID: &str = "neopixels";
const DEFAULT_BAUD: u32 = 115_200;
const DEFAULT_OSC_PORT: u16 = 43770;

/// The top level configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    /// The topic prefix shared by all strips.
    #[serde(default = "default_base_topic")]
    base_topic: String,
    /// Identifies this strip under the base topic.
    #[serde(default = "default_strip_id")]
    strip_id: String,
    /// Whether parameter-only commands modify the installed effect.
    #[serde(default)]
    retain_effect: bool,
    /// The attached strip.
    strip: Strip,
    /// How commands arrive and state leaves.
    #[serde(default)]
    transport: Transport,
}

fn default_base_topic() -> String {
    DEFAULT_BASE_TOPIC.to_string()
}

fn default_strip_id() -> String {
    DEFAULT_STRIP_ID.to_string()
}

/// The strip hardware.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Strip {
    Serial(SerialStrip),
    Simulated(SimulatedStrip),
}

/// A strip behind an Adalight compatible serial device.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct SerialStrip {
    device: String,
    #[serde(default = "default_baud")]
    baud: u32,
    length: usize,
}

fn default_baud() -> u32 {
    DEFAULT_BAUD
}

impl SerialStrip {
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

/// An in-memory strip.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct SimulatedStrip {
    length: usize,
}

impl SimulatedStrip {
    pub fn length(&self) -> usize {
        self.length
    }
}

/// The messaging transport.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Transport {
    Osc(OscTransport),
}

impl Default for Transport {
    fn default() -> Self {
        Transport::Osc(OscTransport::default())
    }
}

/// OSC over UDP.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct OscTransport {
    /// The port to listen on.
    #[serde(default = "default_osc_port")]
    port: u16,
    /// Addresses that receive every published state, in addition to known clients.
    #[serde(default)]
    broadcast_addresses: Vec<String>,
}

fn default_osc_port() -> u16 {
    DEFAULT_OSC_PORT
}

impl Default for OscTransport {
    fn default() -> Self {
        OscTransport {
            port: DEFAULT_OSC_PORT,
            broadcast_addresses: Vec::new(),
        }
    }
}

impl OscTransport {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn broadcast_addresses(&self) -> &[String] {
        &self.broadcast_addresses
    }
}

/// The topics a strip listens and reports on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topics {
    /// Commands arrive here.
    pub command: String,
    /// State snapshots are published here.
    pub state: String,
}

impl Config {
    /// Loads the configuration from a YAML file, applying environment overrides.
    pub fn deserialize(path: &Path) -> Result<Config, ConfigError> {
        Self::load(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load(path: &Path, environment: Environment) -> Result<Config, ConfigError> {
        let config = config::Config::builder()
            .add_source(File::from(path))
            .add_source(
                environment
                    .prefix_separator("_")
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("base_topic", &self.base_topic), ("strip_id", &self.strip_id)] {
            if value.is_empty() || value.contains(['/', '#', '*', '?', '[', ']', '{', '}', ' ']) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("\"{}\" is not a valid topic segment", value),
                });
            }
        }
        Ok(())
    }

    pub fn retain_effect(&self) -> bool {
        self.retain_effect
    }

    pub fn strip(&self) -> &Strip {
        &self.strip
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Derives the command and state topics for this strip.
    pub fn topics(&self) -> Topics {
        let state = format!("/{}/{}", self.base_topic, self.strip_id);
        Topics {
            command: format!("{}/set", state),
            state,
        }
    }
}

#[cfg(test)]
mod test {
    use std::{collections::HashMap, error::Error, io::Write, path::Path};

    use config::Environment;
    use tempfile::NamedTempFile;

    use super::{Config, ConfigError, OscTransport, SerialStrip, SimulatedStrip, Strip, Topics, Transport};

    fn write_config(yaml: &str) -> Result<NamedTempFile, Box<dyn Error>> {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
        file.write_all(yaml.as_bytes())?;
        Ok(file)
    }

    fn load(path: &Path, env: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::load(path, Environment::with_prefix("NEOSTRIP").source(Some(env)))
    }

    #[test]
    fn test_defaults() -> Result<(), Box<dyn Error>> {
        let file = write_config(
            r#"
strip:
  kind: simulated
  length: 30
"#,
        )?;
        let config = load(file.path(), &[])?;

        assert!(!config.retain_effect());
        assert_eq!(
            &Strip::Simulated(SimulatedStrip { length: 30 }),
            config.strip()
        );
        assert_eq!(&Transport::Osc(OscTransport::default()), config.transport());
        assert_eq!(
            Topics {
                command: "/home/neopixels/set".to_string(),
                state: "/home/neopixels".to_string(),
            },
            config.topics()
        );
        Ok(())
    }

    #[test]
    fn test_full() -> Result<(), Box<dyn Error>> {
        let file = write_config(
            r#"
base_topic: garage
strip_id: shelf
retain_effect: true
strip:
  kind: serial
  device: /dev/ttyUSB0
  length: 60
transport:
  kind: osc
  port: 9000
  broadcast_addresses: ["127.0.0.1:9001"]
"#,
        )?;
        let config = load(file.path(), &[])?;

        assert!(config.retain_effect());
        let Strip::Serial(serial) = config.strip() else {
            panic!("expected serial strip");
        };
        assert_eq!(
            &SerialStrip {
                device: "/dev/ttyUSB0".to_string(),
                baud: 115_200,
                length: 60,
            },
            serial
        );
        let Transport::Osc(osc) = config.transport();
        assert_eq!(9000, osc.port());
        assert_eq!(["127.0.0.1:9001".to_string()], osc.broadcast_addresses());
        assert_eq!("/garage/shelf/set", config.topics().command);
        Ok(())
    }

    #[test]
    fn test_environment_overrides() -> Result<(), Box<dyn Error>> {
        let file = write_config(
            r#"
strip_id: shelf
strip:
  kind: simulated
  length: 30
"#,
        )?;
        let config = load(
            file.path(),
            &[
                ("NEOSTRIP_STRIP_ID", "porch"),
                ("NEOSTRIP_RETAIN_EFFECT", "true"),
                ("NEOSTRIP_STRIP__LENGTH", "12"),
            ],
        )?;

        assert!(config.retain_effect());
        assert_eq!(&Strip::Simulated(SimulatedStrip { length: 12 }), config.strip());
        assert_eq!("/home/porch", config.topics().state);
        Ok(())
    }

    #[test]
    fn test_invalid_topic_segment() -> Result<(), Box<dyn Error>> {
        let file = write_config(
            r#"
strip_id: a/b
strip:
  kind: simulated
  length: 30
"#,
        )?;
        assert!(matches!(
            load(file.path(), &[]),
            Err(ConfigError::Invalid { field: "strip_id", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_missing_strip() -> Result<(), Box<dyn Error>> {
        let file = write_config("base_topic: home\n")?;
        assert!(matches!(load(file.path(), &[]), Err(ConfigError::Load(_))));
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load(Path::new("/nonexistent/neostrip.yaml"), &[]),
            Err(ConfigError::Load(_))
        ));
    }
}
