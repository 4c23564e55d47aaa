//! Delivery of a single message to a single destination URL.
//!
//! The destination's scheme selects the service:
//!
//! | scheme | delivered to |
//! |---|---|
//! | `logger://` | the process log |
//! | `http://`, `https://` | JSON webhook at that URL |
//! | `generic://`, `generic+http://`, `generic+https://` | JSON webhook (`generic://` is HTTPS unless `disabletls=yes`) |
//! | `ntfy://[user:pass@]host/topic` | `https://host/topic` (`scheme=http` to opt out of TLS) |
//! | `gotify://host[/path]/token` | `https://host[/path]/message?token=token` |
//! | `discord://token@webhook_id` | Discord webhook API |

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use super::NotifyError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_TITLE: &str = "Container-Mon";
const GOTIFY_PRIORITY: u8 = 5;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, destination: &str, message: &str) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Destination {
    Logger,
    Webhook {
        url: Url,
        title: Option<String>,
    },
    Ntfy {
        url: Url,
        credentials: Option<(String, Option<String>)>,
    },
    Gotify(Url),
    Discord(Url),
}

impl Destination {
    pub(crate) fn parse(raw: &str) -> Result<Self, NotifyError> {
        let url = Url::parse(raw).map_err(|e| NotifyError::InvalidUrl(raw.to_string(), e))?;

        match url.scheme() {
            "logger" => Ok(Self::Logger),
            "http" | "https" => Ok(Self::webhook(url)),
            "generic" => {
                let scheme = if query_flag(&url, "disabletls") {
                    "http"
                } else {
                    "https"
                };
                let mut url = with_scheme(raw, scheme)?;
                remove_query_param(&mut url, "disabletls");
                Ok(Self::webhook(url))
            }
            "generic+http" => Ok(Self::webhook(with_scheme(raw, "http")?)),
            "generic+https" => Ok(Self::webhook(with_scheme(raw, "https")?)),
            "ntfy" => Self::ntfy(raw, &url),
            "gotify" => Self::gotify(raw, &url),
            "discord" => Self::discord(raw, &url),
            other => Err(NotifyError::UnsupportedScheme(other.to_string())),
        }
    }

    fn webhook(mut url: Url) -> Self {
        let title = query_value(&url, "title");
        remove_query_param(&mut url, "title");
        Self::Webhook { url, title }
    }

    fn ntfy(raw: &str, url: &Url) -> Result<Self, NotifyError> {
        let host = url
            .host_str()
            .ok_or_else(|| NotifyError::Malformed("ntfy", "missing host".to_string()))?;
        let topic = url.path().trim_matches('/');
        if topic.is_empty() {
            return Err(NotifyError::Malformed("ntfy", "missing topic".to_string()));
        }
        let scheme = match query_value(url, "scheme").as_deref() {
            Some("http") => "http",
            _ => "https",
        };
        let target = format!("{scheme}://{host}{}/{topic}", port_suffix(url));
        let target =
            Url::parse(&target).map_err(|e| NotifyError::InvalidUrl(raw.to_string(), e))?;

        let credentials = match url.username() {
            "" => None,
            user => Some((user.to_string(), url.password().map(str::to_string))),
        };

        Ok(Self::Ntfy {
            url: target,
            credentials,
        })
    }

    fn gotify(raw: &str, url: &Url) -> Result<Self, NotifyError> {
        let host = url
            .host_str()
            .ok_or_else(|| NotifyError::Malformed("gotify", "missing host".to_string()))?;
        let mut segments: Vec<&str> = url.path().split('/').filter(|s| !s.is_empty()).collect();
        let token = segments
            .pop()
            .ok_or_else(|| NotifyError::Malformed("gotify", "missing token".to_string()))?;
        let base = segments
            .iter()
            .map(|s| format!("/{s}"))
            .collect::<String>();

        let target = format!("https://{host}{}{base}/message", port_suffix(url));
        let mut target =
            Url::parse(&target).map_err(|e| NotifyError::InvalidUrl(raw.to_string(), e))?;
        target.query_pairs_mut().append_pair("token", token);
        Ok(Self::Gotify(target))
    }

    fn discord(raw: &str, url: &Url) -> Result<Self, NotifyError> {
        let token = url.username();
        let webhook_id = url.host_str().unwrap_or_default();
        if token.is_empty() || webhook_id.is_empty() {
            return Err(NotifyError::Malformed(
                "discord",
                "expected discord://token@webhook_id".to_string(),
            ));
        }
        let target = format!("https://discord.com/api/webhooks/{webhook_id}/{token}");
        let target =
            Url::parse(&target).map_err(|e| NotifyError::InvalidUrl(raw.to_string(), e))?;
        Ok(Self::Discord(target))
    }
}

fn with_scheme(raw: &str, scheme: &str) -> Result<Url, NotifyError> {
    let rest = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    Url::parse(&format!("{scheme}://{rest}"))
        .map_err(|e| NotifyError::InvalidUrl(raw.to_string(), e))
}

fn port_suffix(url: &Url) -> String {
    url.port().map(|p| format!(":{p}")).unwrap_or_default()
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn query_flag(url: &Url, key: &str) -> bool {
    matches!(
        query_value(url, key).as_deref(),
        Some("yes" | "true" | "1")
    )
}

fn remove_query_param(url: &mut Url, key: &str) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    message: &'a str,
}

#[derive(Serialize)]
struct GotifyPayload<'a> {
    title: &'a str,
    message: &'a str,
    priority: u8,
}

#[derive(Serialize)]
struct DiscordPayload<'a> {
    content: &'a str,
}

/// Sends notifications over HTTP, picking the service from the URL scheme.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, destination: &str, message: &str) -> Result<(), NotifyError> {
        let request = match Destination::parse(destination)? {
            Destination::Logger => {
                log::info!("{message}");
                return Ok(());
            }
            Destination::Webhook { url, title } => self.client.post(url).json(&WebhookPayload {
                title: title.as_deref(),
                message,
            }),
            Destination::Ntfy { url, credentials } => {
                let request = self.client.post(url).body(message.to_string());
                match credentials {
                    Some((user, password)) => request.basic_auth(user, password),
                    None => request,
                }
            }
            Destination::Gotify(url) => self.client.post(url).json(&GotifyPayload {
                title: DEFAULT_TITLE,
                message,
                priority: GOTIFY_PRIORITY,
            }),
            Destination::Discord(url) => self
                .client
                .post(url)
                .json(&DiscordPayload { content: message }),
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        log::debug!("Notification delivered ({status})");
        Ok(())
    }
}
