use crate::s3::Region;
use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::{collections::BTreeMap, fs::File, path::Path};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub hosts: BTreeMap<String, Host>,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    pub endpoint: Option<String>,
    pub region: Option<String>,
    #[serde(default)]
    pub access_key: String,
    #[serde(default = "empty_secret")]
    pub secret_key: SecretString,
    /// Default bucket, the location is then `host/key`
    pub bucket: Option<String>,
}

fn empty_secret() -> SecretString {
    SecretString::from("")
}

impl Config {
    /// # Errors
    ///
    /// Will return `Err` if the file can not be opened or parsed
    pub fn new(config_path: &Path) -> Result<Self> {
        let file = File::open(config_path)
            .with_context(|| format!("unable to open: {}", config_path.display()))?;

        let config: Self =
            serde_yaml_ng::from_reader(file).context("unable to parse config file")?;

        Ok(config)
    }

    /// Get the host from the config.yml
    ///
    /// # Errors
    ///
    /// Will return `Err` if the host is not defined
    pub fn get_host(&self, name: &str) -> Result<&Host> {
        self.hosts
            .get(name)
            .with_context(|| format!("could not find host {name}"))
    }
}

impl Host {
    /// Get the region for the host, an endpoint makes it a custom region
    ///
    /// # Errors
    ///
    /// Will return `Err` if the region is unknown and there is no endpoint
    pub fn get_region(&self) -> Result<Region> {
        match (&self.endpoint, &self.region) {
            (Some(endpoint), region) => Ok(Region::Custom {
                name: region.clone().unwrap_or_else(|| "us-east-1".to_string()),
                endpoint: endpoint.clone(),
            }),

            (None, Some(region)) => Ok(region.parse::<Region>()?),

            (None, None) => Err(anyhow::anyhow!(
                "could not parse host need an endpoint or region"
            )),
        }
    }
}
