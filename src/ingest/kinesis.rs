//! Kinesis Video Streams playback-URL resolution.
//!
//! Mirrors the two-call flow of the service API: `GetDataEndpoint` against
//! the regional control endpoint, then `GetHLSStreamingSessionURL` against
//! the returned data endpoint. Both are REST-JSON `POST`s signed with AWS
//! Signature Version 4.
//!
//! Credentials come from the ambient environment
//! (`AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY`, plus `AWS_SESSION_TOKEN`
//! for temporary credentials), matching how the upstream SDKs are usually
//! configured on a camera host. The signer is deliberately small: it only
//! covers what these two requests need (no query parameters, unsigned
//! content-type), so pulling in a full async SDK is not warranted.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const SERVICE: &str = "kinesisvideo";
const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// HLS playback mode for `GetHLSStreamingSessionURL`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackMode {
    #[default]
    Live,
    LiveReplay,
    OnDemand,
}

impl PlaybackMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackMode::Live => "LIVE",
            PlaybackMode::LiveReplay => "LIVE_REPLAY",
            PlaybackMode::OnDemand => "ON_DEMAND",
        }
    }
}

impl FromStr for PlaybackMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LIVE" => Ok(PlaybackMode::Live),
            "LIVE_REPLAY" => Ok(PlaybackMode::LiveReplay),
            "ON_DEMAND" => Ok(PlaybackMode::OnDemand),
            other => Err(anyhow!(
                "unknown playback mode '{}'; expected LIVE, LIVE_REPLAY, or ON_DEMAND",
                other
            )),
        }
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static AWS credentials.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    /// Read credentials from the standard AWS environment variables.
    pub fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| anyhow!("AWS_ACCESS_KEY_ID must be set"))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| anyhow!("AWS_SECRET_ACCESS_KEY must be set"))?;
        let session_token = std::env::var("AWS_SESSION_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Minimal Kinesis Video Streams client for playback-URL resolution.
pub struct KinesisVideoClient {
    region: String,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
struct GetDataEndpointResponse {
    #[serde(rename = "DataEndpoint")]
    data_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GetHlsUrlResponse {
    #[serde(rename = "HLSStreamingSessionURL")]
    hls_streaming_session_url: String,
}

impl KinesisVideoClient {
    /// Build a client for `region` with credentials from the environment.
    pub fn from_env(region: &str) -> Result<Self> {
        Ok(Self {
            region: region.to_string(),
            credentials: Credentials::from_env()?,
        })
    }

    pub fn new(region: &str, credentials: Credentials) -> Self {
        Self {
            region: region.to_string(),
            credentials,
        }
    }

    /// Resolve the live HLS playback URL for `stream_name`.
    pub fn resolve_hls_url(&self, stream_name: &str, mode: PlaybackMode) -> Result<String> {
        let endpoint = self.get_data_endpoint(stream_name)?;
        log::debug!("data endpoint for {}: {}", stream_name, endpoint);
        self.get_hls_streaming_session_url(&endpoint, stream_name, mode)
    }

    /// `GetDataEndpoint` for the HLS streaming session API.
    pub fn get_data_endpoint(&self, stream_name: &str) -> Result<String> {
        let url = format!(
            "https://kinesisvideo.{}.amazonaws.com/getDataEndpoint",
            self.region
        );
        let body = serde_json::json!({
            "StreamName": stream_name,
            "APIName": "GET_HLS_STREAMING_SESSION_URL",
        });
        let response: GetDataEndpointResponse = self
            .signed_post(&url, &body)
            .with_context(|| format!("GetDataEndpoint failed for stream '{}'", stream_name))?;
        Ok(response.data_endpoint)
    }

    /// `GetHLSStreamingSessionURL` against the resolved data endpoint.
    pub fn get_hls_streaming_session_url(
        &self,
        data_endpoint: &str,
        stream_name: &str,
        mode: PlaybackMode,
    ) -> Result<String> {
        let url = format!(
            "{}/getHLSStreamingSessionURL",
            data_endpoint.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "StreamName": stream_name,
            "PlaybackMode": mode.as_str(),
        });
        let response: GetHlsUrlResponse = self.signed_post(&url, &body).with_context(|| {
            format!(
                "GetHLSStreamingSessionURL failed for stream '{}'",
                stream_name
            )
        })?;
        Ok(response.hls_streaming_session_url)
    }

    fn signed_post<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let url = Url::parse(url).with_context(|| format!("invalid request url {}", url))?;
        let payload = serde_json::to_vec(body)?;
        let amz_date = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
        let headers = sign_request(&self.credentials, &self.region, &url, &amz_date, &payload)?;

        let mut request = ureq::post(url.as_str()).set("Content-Type", "application/json");
        for (name, value) in &headers {
            request = request.set(name, value);
        }

        let response = match request.send_bytes(&payload) {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let detail = response
                    .into_string()
                    .unwrap_or_else(|_| "<unreadable body>".to_string());
                return Err(anyhow!("service returned HTTP {}: {}", code, detail));
            }
            Err(e) => return Err(anyhow!("request transport failed: {}", e)),
        };

        response
            .into_json::<T>()
            .context("failed to decode service response")
    }
}

/// Produce the signed headers for one request: `Host`, `X-Amz-Date`,
/// `Authorization`, and `X-Amz-Security-Token` when a session token is
/// present.
fn sign_request(
    credentials: &Credentials,
    region: &str,
    url: &Url,
    amz_date: &str,
    payload: &[u8],
) -> Result<Vec<(String, String)>> {
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("request url has no host"))?;
    let host = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    // Canonical headers must be lowercase and sorted by name.
    let mut canonical_headers: Vec<(String, String)> = vec![
        ("host".to_string(), host.clone()),
        ("x-amz-date".to_string(), amz_date.to_string()),
    ];
    if let Some(token) = &credentials.session_token {
        canonical_headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    canonical_headers.sort_by(|a, b| a.0.cmp(&b.0));

    let date = amz_date
        .get(..8)
        .ok_or_else(|| anyhow!("malformed x-amz-date '{}'", amz_date))?;
    let scope = format!("{}/{}/{}/aws4_request", date, region, SERVICE);

    let payload_hash = sha256_hex(payload);
    let canonical = canonical_request(
        "POST",
        url.path(),
        url.query().unwrap_or(""),
        &canonical_headers,
        &payload_hash,
    );
    let to_sign = string_to_sign(amz_date, &scope, &canonical);
    let key = signing_key(&credentials.secret_access_key, date, region, SERVICE)?;
    let signature = hex::encode(hmac_sha256(&key, to_sign.as_bytes())?);

    let signed_header_names = signed_header_names(&canonical_headers);
    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, credentials.access_key_id, scope, signed_header_names, signature
    );

    let mut headers = vec![
        ("Host".to_string(), host),
        ("X-Amz-Date".to_string(), amz_date.to_string()),
        ("Authorization".to_string(), authorization),
    ];
    if let Some(token) = &credentials.session_token {
        headers.push(("X-Amz-Security-Token".to_string(), token.clone()));
    }
    Ok(headers)
}

fn signed_header_names(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

/// SigV4 canonical request. `headers` must already be lowercase-named and
/// sorted.
fn canonical_request(
    method: &str,
    path: &str,
    query: &str,
    headers: &[(String, String)],
    payload_hash: &str,
) -> String {
    let path = if path.is_empty() { "/" } else { path };
    let canonical_query = {
        let mut params: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
        params.sort_unstable();
        params.join("&")
    };
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
        .collect();
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method,
        path,
        canonical_query,
        canonical_headers,
        signed_header_names(headers),
        payload_hash
    )
}

fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    )
}

/// Derive the SigV4 signing key: chained HMACs over date, region,
/// service, and the literal "aws4_request".
fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let seed = format!("AWS4{}", secret);
    let k_date = hmac_sha256(seed.as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| anyhow!("invalid hmac key: {}", e))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference values from the AWS General Reference SigV4 worked
    // example (IAM ListUsers, 20150830).
    const EXAMPLE_SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    #[test]
    fn signing_key_matches_reference_vector() {
        let key = signing_key(EXAMPLE_SECRET, "20150830", "us-east-1", "iam").unwrap();
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn canonical_request_matches_reference_vector() {
        let headers = vec![
            (
                "content-type".to_string(),
                "application/x-www-form-urlencoded; charset=utf-8".to_string(),
            ),
            ("host".to_string(), "iam.amazonaws.com".to_string()),
            ("x-amz-date".to_string(), "20150830T123600Z".to_string()),
        ];
        let canonical = canonical_request(
            "GET",
            "/",
            "Action=ListUsers&Version=2010-05-08",
            &headers,
            &sha256_hex(b""),
        );
        assert_eq!(
            sha256_hex(canonical.as_bytes()),
            "f536975d06c0309214f805bb90ccff089219ecd68b2577efef23edd43b7e1a59"
        );
    }

    #[test]
    fn signature_matches_reference_vector() {
        let scope = "20150830/us-east-1/iam/aws4_request";
        let to_sign = format!(
            "{}\n20150830T123600Z\n{}\nf536975d06c0309214f805bb90ccff089219ecd68b2577efef23edd43b7e1a59",
            ALGORITHM, scope
        );
        let key = signing_key(EXAMPLE_SECRET, "20150830", "us-east-1", "iam").unwrap();
        let signature = hex::encode(hmac_sha256(&key, to_sign.as_bytes()).unwrap());
        assert_eq!(
            signature,
            "5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d7"
        );
    }

    #[test]
    fn sign_request_emits_expected_headers() {
        let credentials = Credentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: EXAMPLE_SECRET.to_string(),
            session_token: Some("the-token".to_string()),
        };
        let url = Url::parse("https://kinesisvideo.us-east-1.amazonaws.com/getDataEndpoint")
            .unwrap();
        let headers =
            sign_request(&credentials, "us-east-1", &url, "20150830T123600Z", b"{}").unwrap();

        let names: Vec<&str> = headers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            ["Host", "X-Amz-Date", "Authorization", "X-Amz-Security-Token"]
        );

        let authorization = &headers[2].1;
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/"));
        assert!(authorization.contains("SignedHeaders=host;x-amz-date;x-amz-security-token"));
    }

    #[test]
    fn playback_mode_round_trips() {
        for mode in [
            PlaybackMode::Live,
            PlaybackMode::LiveReplay,
            PlaybackMode::OnDemand,
        ] {
            assert_eq!(mode.as_str().parse::<PlaybackMode>().unwrap(), mode);
        }
        assert!("live".parse::<PlaybackMode>().is_err());
    }

    #[test]
    fn data_endpoint_response_decodes() {
        let json = r#"{"DataEndpoint":"https://b-1234.kinesisvideo.us-east-1.amazonaws.com"}"#;
        let response: GetDataEndpointResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.data_endpoint,
            "https://b-1234.kinesisvideo.us-east-1.amazonaws.com"
        );
    }

    #[test]
    fn hls_url_response_decodes() {
        let json = r#"{"HLSStreamingSessionURL":"https://b-1234.kinesisvideo.us-east-1.amazonaws.com/hls/v1/getHLSMasterPlaylist.m3u8?SessionToken=abc"}"#;
        let response: GetHlsUrlResponse = serde_json::from_str(json).unwrap();
        assert!(response.hls_streaming_session_url.ends_with("SessionToken=abc"));
    }
}
