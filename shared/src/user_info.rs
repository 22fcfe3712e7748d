use serde::{Serialize, Deserialize};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use sha2::{Sha256, Digest};

/// Client identity for a request. `ip` keys login throttling; `fingerprint` only tags log lines,
/// since it hashes the caller-controlled user agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub fingerprint: String,
    pub ip: String,
}

impl UserInfo {
    pub fn new(ip: impl Into<String>, user_agent: Option<&str>) -> Self {
        let ip = ip.into();
        Self { fingerprint: client_fingerprint(&ip, user_agent), ip }
    }
}

pub fn client_fingerprint(ip: &str, user_agent: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    if let Some(ua) = user_agent {
        hasher.update(ua.as_bytes());
    }
    URL_SAFE.encode(hasher.finalize())
}

#[cfg(feature = "backend")]
mod backend_impl {
    use super::*;
    use rocket::request::{FromRequest, Outcome};
    use rocket::Request;

    #[rocket::async_trait]
    impl<'r> FromRequest<'r> for UserInfo {
        type Error = std::convert::Infallible;

        async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
            // `client_ip` honours Rocket's configured `ip_header` and otherwise uses the peer address.
            let ip = req.client_ip()
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| "unknown".to_string());

            Outcome::Success(UserInfo::new(ip, req.headers().get_one("User-Agent")))
        }
    }
}
