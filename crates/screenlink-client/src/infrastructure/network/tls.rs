//! Manually-driven TLS engine for the non-blocking transport.
//!
//! The transport's readiness loop cannot block inside a TLS stream wrapper,
//! so the handshake is driven explicitly: the engine reports which direction
//! it needs next ([`HandshakeState`]) and the loop shuttles ciphertext
//! between the socket and the engine until the handshake finishes. The same
//! wrap/unwrap calls keep working during steady state, which also covers a
//! peer-initiated renegotiation without special casing.
//!
//! Certificate validation at this layer trusts every peer certificate; the
//! decision whether to talk to a given server at all is made above the
//! transport, which only moves bytes.

use std::io::{Read, Write};
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConnection, DigitallySignedStruct, SignatureScheme};
use thiserror::Error;

/// Errors from the TLS engine.
#[derive(Debug, Error)]
pub enum TlsError {
    /// The server address could not be used as a TLS server name.
    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),

    /// The client configuration was rejected by rustls.
    #[error("TLS configuration error: {0}")]
    Config(#[source] rustls::Error),

    /// The peer sent records the engine could not process.
    #[error("TLS protocol error: {0}")]
    Protocol(#[source] rustls::Error),

    /// An I/O error while moving bytes in or out of the engine.
    #[error("TLS I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the engine needs next to make handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    /// The engine is waiting for ciphertext from the peer.
    NeedUnwrap,
    /// The engine has ciphertext queued for the peer.
    NeedWrap,
    /// The handshake is complete; wrap/unwrap carry application data.
    Finished,
}

/// A TLS client session driven record-by-record by the transport loop.
pub struct TlsEngine {
    session: ClientConnection,
}

impl TlsEngine {
    /// Creates an engine for a session with `server_name`.
    ///
    /// # Errors
    ///
    /// Returns [`TlsError::InvalidServerName`] when the name is neither a
    /// hostname nor an IP address, and [`TlsError::Config`] when the session
    /// cannot be constructed.
    pub fn new(server_name: &str) -> Result<Self, TlsError> {
        let config = rustls::ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoCertVerifier))
            .with_no_client_auth();

        let name = ServerName::try_from(server_name.to_string())
            .map_err(|_| TlsError::InvalidServerName(server_name.to_string()))?;
        let session =
            ClientConnection::new(Arc::new(config), name).map_err(TlsError::Config)?;
        Ok(Self { session })
    }

    /// Reports what the engine needs next.
    ///
    /// Pending outbound records take priority: a `NeedWrap` engine must be
    /// drained with [`take_ciphertext`](Self::take_ciphertext) before waiting
    /// on the socket again.
    pub fn handshake_state(&self) -> HandshakeState {
        if self.session.wants_write() {
            HandshakeState::NeedWrap
        } else if self.session.is_handshaking() {
            HandshakeState::NeedUnwrap
        } else {
            HandshakeState::Finished
        }
    }

    pub fn is_handshaking(&self) -> bool {
        self.session.is_handshaking()
    }

    /// True when the engine holds ciphertext waiting to go to the peer.
    pub fn wants_write(&self) -> bool {
        self.session.wants_write()
    }

    /// Feeds ciphertext received from the peer into the engine and returns
    /// any plaintext that became readable.
    ///
    /// During the handshake this usually returns an empty vector while still
    /// advancing the engine's state.
    ///
    /// # Errors
    ///
    /// Returns [`TlsError::Protocol`] when the records are malformed; the
    /// session is unusable afterwards and the connection must be dropped.
    pub fn unwrap_incoming(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, TlsError> {
        let mut cursor = std::io::Cursor::new(ciphertext);
        let mut plaintext = Vec::new();

        while (cursor.position() as usize) < ciphertext.len() {
            if self.session.read_tls(&mut cursor)? == 0 {
                break;
            }
            let state = self.session.process_new_packets().map_err(TlsError::Protocol)?;
            let readable = state.plaintext_bytes_to_read();
            if readable > 0 {
                let start = plaintext.len();
                plaintext.resize(start + readable, 0);
                self.session.reader().read_exact(&mut plaintext[start..])?;
            }
        }
        Ok(plaintext)
    }

    /// Queues plaintext for encryption. The resulting records are fetched
    /// with [`take_ciphertext`](Self::take_ciphertext).
    pub fn wrap_outgoing(&mut self, plaintext: &[u8]) -> Result<(), TlsError> {
        self.session.writer().write_all(plaintext)?;
        Ok(())
    }

    /// Drains every pending ciphertext record out of the engine.
    pub fn take_ciphertext(&mut self) -> Result<Vec<u8>, TlsError> {
        let mut out = Vec::new();
        while self.session.wants_write() {
            self.session.write_tls(&mut out)?;
        }
        Ok(out)
    }
}

impl std::fmt::Debug for TlsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsEngine")
            .field("handshaking", &self.session.is_handshaking())
            .finish()
    }
}

/// Accepts any server certificate.
///
/// The protocol family historically runs on LAN peers with self-signed
/// certificates; trust is established out of band, not at the transport.
#[derive(Debug)]
struct NoCertVerifier;

impl ServerCertVerifier for NoCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ED25519,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
        ]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
