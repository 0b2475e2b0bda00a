//! Credentials file (`~/.hopaasrc`) and the interactive first-run prompt.
//!
//! ```ini
//! [server]
//! address = https://hopaas.example.org
//! port = 443
//!
//! [auth]
//! api_token = ...
//! ```

use hp_types::{config_error, HopaasResult};
use ini::Ini;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_FILE_NAME: &str = ".hopaasrc";

/// Where to reach the server and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub address: String,
    pub port: u16,
    pub api_token: String,
}

impl ClientConfig {
    /// `$HOME/.hopaasrc`, or `./.hopaasrc` when no home directory is known.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }

    /// Base URL the client talks to.
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn from_ini_str(text: &str) -> HopaasResult<Self> {
        let ini = Ini::load_from_str(text)
            .map_err(|e| config_error!("invalid config file: {e}"))?;
        Self::from_ini(&ini)
    }

    pub fn load(path: &Path) -> HopaasResult<Self> {
        let ini = Ini::load_from_file(path)
            .map_err(|e| config_error!("cannot read {}: {e}", path.display()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> HopaasResult<Self> {
        let lookup = |section: &str, key: &str| -> HopaasResult<String> {
            ini.section(Some(section))
                .and_then(|props| props.get(key))
                .map(|value| value.trim().to_string())
                .ok_or_else(|| config_error!("missing {section}.{key}"))
        };

        let port = lookup("server", "port")?;
        Ok(Self {
            address: lookup("server", "address")?,
            port: port
                .parse()
                .map_err(|e| config_error!("server.port {port:?} is not a port number: {e}"))?,
            api_token: lookup("auth", "api_token")?,
        })
    }

    pub fn save(&self, path: &Path) -> HopaasResult<()> {
        let mut ini = Ini::new();
        ini.with_section(Some("server"))
            .set("address", self.address.as_str())
            .set("port", self.port.to_string());
        ini.with_section(Some("auth"))
            .set("api_token", self.api_token.as_str());
        ini.write_to_file(path)?;
        info!("Wrote Hopaas configuration to {}", path.display());
        Ok(())
    }

    /// Ask for address, port and token on `output`, reading answers from `input`.
    pub fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> HopaasResult<Self> {
        let address = ask(input, output, "Server address: ")?;
        let port = ask(input, output, "Server port: ")?;
        let port = port
            .parse()
            .map_err(|e| config_error!("server port {port:?} is not a port number: {e}"))?;
        let api_token = ask(input, output, "API token: ")?;
        Ok(Self {
            address,
            port,
            api_token,
        })
    }

    /// Load `path`, prompting and writing it first when it does not exist or
    /// when `force_reconfig` is set.
    pub fn load_or_prompt<R: BufRead, W: Write>(
        path: &Path,
        force_reconfig: bool,
        input: &mut R,
        output: &mut W,
    ) -> HopaasResult<Self> {
        if force_reconfig || !path.exists() {
            let config = Self::prompt(input, output)?;
            config.save(path)?;
        }
        Self::load(path)
    }
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> HopaasResult<String> {
    output.write_all(question.as_bytes())?;
    output.flush()?;
    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Err(config_error!("no answer to {:?}", question.trim_end()));
    }
    Ok(answer.trim().to_string())
}
