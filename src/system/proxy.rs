// src/system/proxy.rs

use crate::core::task_executor::{StepFailure, StepResult};
use crate::models::ProxySettings;
use crate::system::executor::CommandRunner;
use crate::system::toolchain::ToolAvailability;
use colored::Colorize;
use std::collections::HashMap;
use std::path::Path;

/// `git config --unset` exits with 5 when the key is not set.
const GIT_KEY_NOT_SET: i32 = 5;

/// Whether a proxy toggle switches the proxy on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn from_flag(on: bool) -> Self {
        if on { Toggle::On } else { Toggle::Off }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Toggle::On => "on",
            Toggle::Off => "off",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "on" => Some(Toggle::On),
            "off" => Some(Toggle::Off),
            _ => None,
        }
    }
}

/// Switches npm and git proxy settings to match the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyHandler {
    tools: ToolAvailability,
    /// `None` when the proxy is disabled or its configuration is unusable.
    urls: Option<ProxyUrls>,
    problem: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUrls {
    pub http: String,
    pub https: String,
}

impl ProxyHandler {
    pub fn new(settings: &ProxySettings, tools: ToolAvailability) -> Self {
        if !settings.use_proxy {
            return Self {
                tools,
                urls: None,
                problem: None,
            };
        }

        if !tools.git && !tools.npm {
            log::warn!("Neither npm nor git are installed. Proxy settings will not be changed.");
        }

        match validate(settings) {
            Ok(()) => Self {
                tools,
                urls: Some(ProxyUrls {
                    http: proxy_url(settings, false),
                    https: proxy_url(settings, true),
                }),
                problem: None,
            },
            Err(problem) => {
                log::error!("{}", problem);
                Self {
                    tools,
                    urls: None,
                    problem: Some(problem),
                }
            }
        }
    }

    /// Environment variables passed to the project CLI while the proxy is on.
    pub fn env_vars(&self) -> HashMap<String, String> {
        match &self.urls {
            Some(urls) => HashMap::from([
                ("http_proxy".to_string(), urls.http.clone()),
                ("https_proxy".to_string(), urls.http.clone()),
            ]),
            None => HashMap::new(),
        }
    }

    pub fn set_npm_proxy(&self, runner: &mut dyn CommandRunner, cwd: &Path, toggle: Toggle) -> StepResult {
        if !self.tools.npm {
            log::debug!("npm is not installed, skipping npm proxy settings.");
            return Ok(());
        }
        let value = match toggle {
            Toggle::On => self.url_for_on(|u| &u.http)?,
            Toggle::Off => "null".to_string(),
        };
        println!("{}", format!("\nSwitching {} npm proxy server", toggle.as_str()).yellow());

        let mut total = 0;
        for key in ["proxy", "https-proxy"] {
            total += run_silently(runner, cwd, &format!("npm config set {} {}", key, value));
        }
        to_result(total)
    }

    pub fn set_git_proxy(&self, runner: &mut dyn CommandRunner, cwd: &Path, toggle: Toggle) -> StepResult {
        if !self.tools.git {
            log::debug!("git is not installed, skipping git proxy settings.");
            return Ok(());
        }
        println!("{}", format!("Switching {} git proxy server", toggle.as_str()).yellow());

        let commands = match toggle {
            Toggle::On => {
                let http = self.url_for_on(|u| &u.http)?;
                let https = self.url_for_on(|u| &u.https)?;
                vec![
                    format!("git config --global http.proxy {}", http),
                    format!("git config --global https.proxy {}", https),
                ]
            }
            Toggle::Off => vec![
                "git config --global --unset http.proxy".to_string(),
                "git config --global --unset https.proxy".to_string(),
            ],
        };

        let total: i32 = commands
            .iter()
            .map(|c| match run_silently(runner, cwd, c) {
                GIT_KEY_NOT_SET => 0,
                code => code,
            })
            .sum();
        to_result(total)
    }

    fn url_for_on(&self, pick: impl Fn(&ProxyUrls) -> &String) -> Result<String, StepFailure> {
        match (&self.urls, &self.problem) {
            (Some(urls), _) => Ok(pick(urls).clone()),
            (None, Some(problem)) => {
                println!("{}", problem.red());
                Err(StepFailure::Code(1))
            }
            (None, None) => {
                log::warn!("Proxy requested on, but proxy.useProxy is false.");
                Err(StepFailure::Code(1))
            }
        }
    }
}

fn run_silently(runner: &mut dyn CommandRunner, cwd: &Path, command_line: &str) -> i32 {
    match runner.run(command_line, cwd, &HashMap::new(), true) {
        Ok(code) => code,
        Err(e) => {
            log::warn!("{}", e);
            1
        }
    }
}

fn to_result(total: i32) -> StepResult {
    if total == 0 { Ok(()) } else { Err(StepFailure::Code(total)) }
}

fn validate(settings: &ProxySettings) -> Result<(), String> {
    let secure_host = if settings.secure_proxy_uses_http {
        &settings.http.host
    } else {
        &settings.https.host
    };
    if settings.http.host.is_empty() || secure_host.is_empty() {
        return Err(
            "Proxy hostname configuration is not correct. Either set proxy.useProxy to false or define a proxy host and port number."
                .to_string(),
        );
    }
    if settings.use_credentials {
        if settings.proxy_user.is_empty() {
            return Err(
                "Proxy credentials are required, but proxy.proxyUser is either undefined or empty."
                    .to_string(),
            );
        }
        if settings.proxy_password.is_empty() {
            return Err(
                "Proxy credentials are required, but proxy.proxyPassword is either undefined or empty."
                    .to_string(),
            );
        }
    }
    Ok(())
}

/// Builds the proxy URL for plain (`secure == false`) or TLS traffic.
///
/// TLS traffic goes through `https.host`/`https.port` over `https://`, unless
/// `secureProxyUsesHttp` routes it through the plain HTTP proxy instead.
/// Ports default to 80 and 443.
pub fn proxy_url(settings: &ProxySettings, secure: bool) -> String {
    let through_https = secure && !settings.secure_proxy_uses_http;
    let (scheme, server, default_port) = if through_https {
        ("https", &settings.https, 443)
    } else {
        ("http", &settings.http, 80)
    };
    let port = if server.port == 0 { default_port } else { server.port };
    let credentials = if settings.use_credentials {
        format!("{}:{}@", settings.proxy_user, settings.proxy_password)
    } else {
        String::new()
    };
    format!("{}://{}{}:{}", scheme, credentials, server.host, port)
}
