//! Request signing schemes
//!
//! Every venue uses one of five schemes. Each variant of [`SignScheme`] is
//! configured with the field and header names of a particular venue and turns
//! a [`SignInput`] into the final parameters, headers, and body to send.
//!
//! | Scheme | Digest | Message | Output |
//! |---|---|---|---|
//! | [`SignScheme::Form`] | HMAC-SHA256/512 | url-encoded form | hex, field or header |
//! | [`SignScheme::Prehash`] | HMAC-SHA256 | `timestamp + METHOD + path + body` | base64 header |
//! | [`SignScheme::Payload`] | HMAC-SHA384 | base64 JSON payload with nonce | hex header |
//! | [`SignScheme::Path`] | HMAC-SHA512 | `path + SHA256(nonce + form)` | base64 header |
//! | [`SignScheme::ClientId`] | HMAC-SHA256 | `nonce + client_id + api_key` | upper hex field |

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest as _, Sha256, Sha384, Sha512};

use crate::credentials::Credentials;
use crate::error::{AuthError, AuthResult};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// Hash used by the form scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Digest {
    Sha256,
    Sha512,
}

/// Where a credential value travels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Field(&'static str),
    Header(&'static str),
}

/// HMAC over the url-encoded form, nonce in milliseconds
#[derive(Debug, Clone, Copy)]
pub struct FormScheme {
    pub digest: Digest,
    pub key: Placement,
    pub nonce_field: &'static str,
    pub signature: Placement,
    /// Fixed parameters inserted before the nonce, e.g. a receive window
    pub extra_params: &'static [(&'static str, &'static str)],
    /// Sign and send the form sorted by key
    pub sorted: bool,
}

/// Timestamp rendering for the prehash scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `2019-03-08T10:59:25.789Z`
    Iso8601Millis,
    /// `1552042765789`
    UnixMillis,
}

/// How the passphrase header is filled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassphraseMode {
    Plain,
    /// base64 HMAC-SHA256 of the passphrase keyed by the secret
    Signed,
}

/// HMAC-SHA256 over `timestamp + METHOD + path + body`, base64 in a header
#[derive(Debug, Clone, Copy)]
pub struct PrehashScheme {
    pub timestamp: TimestampFormat,
    pub key_header: &'static str,
    pub sign_header: &'static str,
    pub timestamp_header: &'static str,
    pub passphrase_header: &'static str,
    pub passphrase: PassphraseMode,
    pub extra_headers: &'static [(&'static str, &'static str)],
}

/// HMAC-SHA384 over a base64 JSON payload carrying `request` and `nonce`
#[derive(Debug, Clone, Copy)]
pub struct PayloadScheme {
    pub key_header: &'static str,
    pub payload_header: &'static str,
    pub sign_header: &'static str,
}

/// HMAC-SHA512 over `path + SHA256(nonce + form)` with a base64 secret
#[derive(Debug, Clone, Copy)]
pub struct PathScheme {
    pub key_header: &'static str,
    pub sign_header: &'static str,
}

/// Upper-case HMAC-SHA256 over `nonce + client_id + api_key`
#[derive(Debug, Clone, Copy)]
pub struct ClientIdScheme {
    pub key_field: &'static str,
    pub signature_field: &'static str,
    pub nonce_field: &'static str,
}

/// Venue signing scheme
#[derive(Debug, Clone, Copy)]
pub enum SignScheme {
    Form(FormScheme),
    Prehash(PrehashScheme),
    Payload(PayloadScheme),
    Path(PathScheme),
    ClientId(ClientIdScheme),
}

/// Request to sign
#[derive(Debug, Clone)]
pub struct SignInput<'a> {
    /// Upper-case HTTP method
    pub method: &'a str,
    /// Request path without host or query, e.g. `/0/private/Balance`
    pub path: &'a str,
    /// Query or form parameters, in send order
    pub params: Vec<(String, String)>,
    /// JSON body (prehash) or JSON payload fields (payload scheme)
    pub body: Option<&'a str>,
    /// Strictly increasing nonce
    pub nonce: u64,
    /// Clock-corrected Unix milliseconds
    pub timestamp_ms: i64,
}

impl<'a> SignInput<'a> {
    pub fn new(method: &'a str, path: &'a str, nonce: u64, timestamp_ms: i64) -> Self {
        Self {
            method,
            path,
            params: Vec::new(),
            body: None,
            nonce,
            timestamp_ms,
        }
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn with_body(mut self, body: &'a str) -> Self {
        self.body = Some(body);
        self
    }
}

/// What to send after signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Final query or form parameters
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// Body to send verbatim, when the scheme fixes one
    pub body: Option<String>,
    pub signature: String,
}

/// `a=1&b=2`, the encoding every scheme signs and every adapter sends
pub fn encode_params(params: &[(String, String)]) -> AuthResult<String> {
    serde_urlencoded::to_string(params).map_err(|e| AuthError::Encoding(e.to_string()))
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> AuthResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AuthError::InvalidCredentials(e.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hmac_sha384(key: &[u8], message: &[u8]) -> AuthResult<Vec<u8>> {
    let mut mac = HmacSha384::new_from_slice(key)
        .map_err(|e| AuthError::InvalidCredentials(e.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hmac_sha512(key: &[u8], message: &[u8]) -> AuthResult<Vec<u8>> {
    let mut mac = HmacSha512::new_from_slice(key)
        .map_err(|e| AuthError::InvalidCredentials(e.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn format_timestamp(format: TimestampFormat, timestamp_ms: i64) -> AuthResult<String> {
    match format {
        TimestampFormat::UnixMillis => Ok(timestamp_ms.to_string()),
        TimestampFormat::Iso8601Millis => DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
            .ok_or_else(|| AuthError::Encoding(format!("timestamp out of range: {}", timestamp_ms))),
    }
}

impl SignScheme {
    /// Sign a request
    pub fn sign(&self, credentials: &Credentials, input: SignInput<'_>) -> AuthResult<SignedRequest> {
        match self {
            Self::Form(scheme) => sign_form(scheme, credentials, input),
            Self::Prehash(scheme) => sign_prehash(scheme, credentials, input),
            Self::Payload(scheme) => sign_payload(scheme, credentials, input),
            Self::Path(scheme) => sign_path(scheme, credentials, input),
            Self::ClientId(scheme) => sign_client_id(scheme, credentials, input),
        }
    }
}

fn sign_form(scheme: &FormScheme, credentials: &Credentials, input: SignInput<'_>) -> AuthResult<SignedRequest> {
    let mut params = input.params;
    let mut headers = Vec::new();

    match scheme.key {
        Placement::Field(name) => params.insert(0, (name.to_string(), credentials.api_key().to_string())),
        Placement::Header(name) => headers.push((name.to_string(), credentials.api_key().to_string())),
    }
    for (k, v) in scheme.extra_params {
        params.push((k.to_string(), v.to_string()));
    }
    params.push((scheme.nonce_field.to_string(), input.nonce.to_string()));
    if scheme.sorted {
        params.sort_by(|a, b| a.0.cmp(&b.0));
    }

    let payload = encode_params(&params)?;
    let digest = match scheme.digest {
        Digest::Sha256 => hmac_sha256(credentials.secret_bytes(), payload.as_bytes())?,
        Digest::Sha512 => hmac_sha512(credentials.secret_bytes(), payload.as_bytes())?,
    };
    let signature = hex::encode(digest);

    match scheme.signature {
        Placement::Field(name) => params.push((name.to_string(), signature.clone())),
        Placement::Header(name) => headers.push((name.to_string(), signature.clone())),
    }

    Ok(SignedRequest {
        params,
        headers,
        body: None,
        signature,
    })
}

fn sign_prehash(
    scheme: &PrehashScheme,
    credentials: &Credentials,
    input: SignInput<'_>,
) -> AuthResult<SignedRequest> {
    let timestamp = format_timestamp(scheme.timestamp, input.timestamp_ms)?;
    let mut path = input.path.to_string();
    if !input.params.is_empty() {
        path.push('?');
        path.push_str(&encode_params(&input.params)?);
    }
    let body = input.body.unwrap_or("");
    let prehash = format!("{}{}{}{}", timestamp, input.method.to_ascii_uppercase(), path, body);
    let signature = BASE64.encode(hmac_sha256(credentials.secret_bytes(), prehash.as_bytes())?);

    let passphrase = match scheme.passphrase {
        PassphraseMode::Plain => credentials.passphrase()?.to_string(),
        PassphraseMode::Signed => BASE64.encode(hmac_sha256(
            credentials.secret_bytes(),
            credentials.passphrase()?.as_bytes(),
        )?),
    };

    let mut headers = vec![
        (scheme.key_header.to_string(), credentials.api_key().to_string()),
        (scheme.sign_header.to_string(), signature.clone()),
        (scheme.timestamp_header.to_string(), timestamp),
        (scheme.passphrase_header.to_string(), passphrase),
    ];
    for (k, v) in scheme.extra_headers {
        headers.push((k.to_string(), v.to_string()));
    }

    Ok(SignedRequest {
        params: input.params,
        headers,
        body: input.body.map(str::to_string),
        signature,
    })
}

fn sign_payload(
    scheme: &PayloadScheme,
    credentials: &Credentials,
    input: SignInput<'_>,
) -> AuthResult<SignedRequest> {
    let mut payload = match input.body {
        Some(body) if !body.trim().is_empty() => {
            serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(body)
                .map_err(|e| AuthError::Encoding(format!("payload is not a JSON object: {}", e)))?
        }
        _ => serde_json::Map::new(),
    };
    payload.insert("request".to_string(), input.path.into());
    payload.insert("nonce".to_string(), input.nonce.to_string().into());

    let json = serde_json::Value::Object(payload).to_string();
    let encoded = BASE64.encode(json.as_bytes());
    let signature = hex::encode(hmac_sha384(credentials.secret_bytes(), encoded.as_bytes())?);

    Ok(SignedRequest {
        params: input.params,
        headers: vec![
            (scheme.key_header.to_string(), credentials.api_key().to_string()),
            (scheme.payload_header.to_string(), encoded),
            (scheme.sign_header.to_string(), signature.clone()),
        ],
        body: Some(json),
        signature,
    })
}

fn sign_path(scheme: &PathScheme, credentials: &Credentials, input: SignInput<'_>) -> AuthResult<SignedRequest> {
    let nonce = input.nonce.to_string();
    let mut params = input.params;
    params.insert(0, ("nonce".to_string(), nonce.clone()));
    let post_data = encode_params(&params)?;

    let mut sha256 = Sha256::new();
    sha256.update(nonce.as_bytes());
    sha256.update(post_data.as_bytes());
    let inner = sha256.finalize();

    let mut message = input.path.as_bytes().to_vec();
    message.extend_from_slice(&inner);

    let key = credentials.secret_base64_decoded()?;
    let signature = BASE64.encode(hmac_sha512(&key, &message)?);

    Ok(SignedRequest {
        params,
        headers: vec![
            (scheme.key_header.to_string(), credentials.api_key().to_string()),
            (scheme.sign_header.to_string(), signature.clone()),
        ],
        body: None,
        signature,
    })
}

fn sign_client_id(
    scheme: &ClientIdScheme,
    credentials: &Credentials,
    input: SignInput<'_>,
) -> AuthResult<SignedRequest> {
    let nonce = input.nonce.to_string();
    let message = format!("{}{}{}", nonce, credentials.require_client_id()?, credentials.api_key());
    let signature = hex::encode_upper(hmac_sha256(credentials.secret_bytes(), message.as_bytes())?);

    let mut params = input.params;
    params.push((scheme.key_field.to_string(), credentials.api_key().to_string()));
    params.push((scheme.signature_field.to_string(), signature.clone()));
    params.push((scheme.nonce_field.to_string(), nonce));

    Ok(SignedRequest {
        params,
        headers: Vec::new(),
        body: None,
        signature,
    })
}
