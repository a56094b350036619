// File: tls_analyzer.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, trace};
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::client::{ServerCertVerified, ServerCertVerifier};
use tokio_rustls::rustls::{self, AlertDescription, ClientConfig, ProtocolVersion, ServerName};
use tokio_rustls::TlsConnector;
use x509_parser::prelude::*;

type BoxError = Box<dyn Error + Send + Sync>;

const WEAK_PROTOCOLS: &[&str] = &["SSLv2", "SSLv3", "TLS 1.0", "TLS 1.1"];
const WEAK_CIPHER_MARKERS: &[&str] = &["NULL", "DES", "RC4", "MD5", "EXPORT", "ANON"];
const WEAK_SIGNATURES: &[&str] = &["md5", "sha1"];

#[derive(Debug, Clone, Serialize)]
pub struct Certificate {
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
    pub signature_algorithm: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub subject_alternative_names: Vec<String>,
    pub is_self_signed: bool,
}

impl Certificate {
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.valid_to - now).num_days()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_to < now
    }
}

/// What one handshake revealed.
#[derive(Debug, Clone, Serialize)]
pub struct TlsSession {
    pub tls_version: String,
    pub cipher_suite: String,
    pub certificate: Option<Certificate>,
}

/// Why a handshake produced no session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The server refused every TLS 1.2/1.3 parameter we offered, which
    /// leaves only legacy protocols or cipher suites on its side.
    Incompatible(String),
    /// Connect, timeout or other failure that says nothing about the server's TLS setup.
    Failed(String),
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incompatible(msg) => write!(f, "server rejected modern TLS: {}", msg),
            Self::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error for HandshakeError {}

impl HandshakeError {
    /// Sorts an error from the TLS connector by the rustls error it wraps.
    pub fn from_connect(error: io::Error) -> Self {
        let incompatible = error
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<rustls::Error>())
            .is_some_and(|tls| {
                matches!(
                    tls,
                    rustls::Error::PeerIncompatible(_)
                        | rustls::Error::AlertReceived(
                            AlertDescription::ProtocolVersion
                                | AlertDescription::HandshakeFailure
                                | AlertDescription::InsufficientSecurity
                        )
                )
            });
        if incompatible {
            Self::Incompatible(error.to_string())
        } else {
            Self::Failed(error.to_string())
        }
    }
}

/// Accepts any chain so expired and self-signed certificates can still be read.
struct InspectOnlyVerifier;

impl ServerCertVerifier for InspectOnlyVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::Certificate,
        _intermediates: &[rustls::Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}

pub struct TlsAnalyzer;

impl TlsAnalyzer {
    pub async fn handshake(host: &str, port: u16, limit: Duration) -> Result<TlsSession, HandshakeError> {
        debug!("Starting TLS handshake with {}:{}", host, port);

        let config = ClientConfig::builder()
            .with_safe_defaults()
            .with_custom_certificate_verifier(Arc::new(InspectOnlyVerifier))
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(config));
        let domain = ServerName::try_from(host).map_err(|e| HandshakeError::Failed(e.to_string()))?;

        let tcp_stream = timeout(limit, TcpStream::connect((host, port)))
            .await
            .map_err(|_| HandshakeError::Failed(format!("connect timed out after {:?}", limit)))?
            .map_err(|e| HandshakeError::Failed(e.to_string()))?;
        let tls_stream = timeout(limit, connector.connect(domain, tcp_stream))
            .await
            .map_err(|_| HandshakeError::Failed(format!("handshake timed out after {:?}", limit)))?
            .map_err(HandshakeError::from_connect)?;
        let (_, connection) = tls_stream.get_ref();

        let tls_version = connection
            .protocol_version()
            .map(protocol_name)
            .unwrap_or_else(|| "unknown".to_string());
        let cipher_suite = connection
            .negotiated_cipher_suite()
            .map(|suite| format!("{:?}", suite.suite()))
            .unwrap_or_else(|| "unknown".to_string());
        trace!("Negotiated {} with {}", tls_version, cipher_suite);

        let certificate = match connection.peer_certificates().and_then(|chain| chain.first()) {
            Some(leaf) => match Self::parse_certificate(&leaf.0) {
                Ok(cert) => Some(cert),
                Err(e) => {
                    debug!("Failed to decode certificate from {}: {}", host, e);
                    None
                }
            },
            None => None,
        };

        Ok(TlsSession {
            tls_version,
            cipher_suite,
            certificate,
        })
    }

    pub fn parse_certificate(der: &[u8]) -> Result<Certificate, BoxError> {
        let (_, cert) = X509Certificate::from_der(der).map_err(|e| format!("invalid certificate: {}", e))?;

        let subject_alternative_names = match cert.subject_alternative_name() {
            Ok(Some(san)) => san
                .value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(dns.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(Certificate {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial_number: cert.raw_serial_as_string(),
            signature_algorithm: signature_name(&cert.signature_algorithm.algorithm.to_id_string()),
            valid_from: to_utc(cert.validity().not_before.timestamp()),
            valid_to: to_utc(cert.validity().not_after.timestamp()),
            subject_alternative_names,
            is_self_signed: cert.subject().as_raw() == cert.issuer().as_raw(),
        })
    }

    pub fn is_weak_protocol(version: &str) -> bool {
        WEAK_PROTOCOLS.contains(&version)
    }

    pub fn is_weak_cipher(suite: &str) -> bool {
        let upper = suite.to_uppercase();
        WEAK_CIPHER_MARKERS.iter().any(|marker| {
            upper
                .split('_')
                .any(|part| part == *marker || (*marker == "DES" && part.starts_with("3DES")))
        })
    }

    pub fn is_weak_signature(algorithm: &str) -> bool {
        let lower = algorithm.to_lowercase();
        WEAK_SIGNATURES.iter().any(|weak| lower.starts_with(weak) || lower.contains(&format!("-{}", weak)))
    }
}

fn protocol_name(version: ProtocolVersion) -> String {
    match version {
        ProtocolVersion::SSLv2 => "SSLv2".to_string(),
        ProtocolVersion::SSLv3 => "SSLv3".to_string(),
        ProtocolVersion::TLSv1_0 => "TLS 1.0".to_string(),
        ProtocolVersion::TLSv1_1 => "TLS 1.1".to_string(),
        ProtocolVersion::TLSv1_2 => "TLS 1.2".to_string(),
        ProtocolVersion::TLSv1_3 => "TLS 1.3".to_string(),
        other => format!("{:?}", other),
    }
}

fn signature_name(oid: &str) -> String {
    match oid {
        "1.2.840.113549.1.1.4" => "md5WithRSAEncryption",
        "1.2.840.113549.1.1.5" => "sha1WithRSAEncryption",
        "1.2.840.10045.4.1" => "ecdsa-with-SHA1",
        "1.2.840.10040.4.3" => "dsa-with-sha1",
        "1.2.840.113549.1.1.10" => "rsassaPss",
        "1.2.840.113549.1.1.11" => "sha256WithRSAEncryption",
        "1.2.840.113549.1.1.12" => "sha384WithRSAEncryption",
        "1.2.840.113549.1.1.13" => "sha512WithRSAEncryption",
        "1.2.840.10045.4.3.2" => "ecdsa-with-SHA256",
        "1.2.840.10045.4.3.3" => "ecdsa-with-SHA384",
        "1.2.840.10045.4.3.4" => "ecdsa-with-SHA512",
        "1.3.101.112" => "ed25519",
        other => other,
    }
    .to_string()
}

fn to_utc(timestamp: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(timestamp, 0).single().unwrap_or_default()
}

#[cfg(test)]
#[path = "tls_analyzer_tests.rs"]
mod tests;
