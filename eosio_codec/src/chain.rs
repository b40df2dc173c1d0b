//! Transactions and the structures they are made of, together with their
//! identifiers and signing digests.
use crate::{
    ecc::{PrivateKey, PublicKey, Signature},
    error::ResultExt,
    name::Name,
    registry::{ActionData, ActionRegistry},
    serialize::{from_bytes, serial_iter, to_bytes, write_length, Buffer, Cursor, VarUint32},
    types::{Bytes, Checksum256, TimePointSec},
    CodecError, Deserial, ParseResult, SerdeDeserialize, SerdeSerialize, Serial,
};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use log::trace;
use std::{
    borrow::Cow,
    fmt,
    io::{Read, Write},
    str::FromStr,
};

/// An authorization: an account and one of its permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serial, Deserial, SerdeSerialize, SerdeDeserialize)]
pub struct PermissionLevel {
    pub actor:      Name,
    pub permission: Name,
}

impl PermissionLevel {
    pub fn new(actor: impl Into<Name>, permission: impl Into<Name>) -> Self {
        PermissionLevel {
            actor:      actor.into(),
            permission: permission.into(),
        }
    }
}

/// A call of a contract action. The payload is kept as bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serial, Deserial, SerdeSerialize, SerdeDeserialize)]
pub struct Action {
    pub account:       Name,
    pub name:          Name,
    pub authorization: Vec<PermissionLevel>,
    pub data:          Bytes,
}

impl Action {
    /// Create an action whose payload is given as a value, encoding it with
    /// the descriptor registered for the action.
    pub fn new(
        account: impl Into<Name>,
        name: impl Into<Name>,
        authorization: Vec<PermissionLevel>,
        data: &ActionData,
        registry: &ActionRegistry,
    ) -> ParseResult<Self> {
        let account = account.into();
        let name = name.into();
        Ok(Action {
            account,
            name,
            authorization,
            data: data.to_raw(registry, account, name)?,
        })
    }

    /// The payload, decoded if the registry knows the action.
    pub fn decode_data(&self, registry: &ActionRegistry) -> ParseResult<ActionData> {
        ActionData::Raw(self.data.clone()).decode_with(registry, self.account, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serial, Deserial, SerdeSerialize, SerdeDeserialize)]
pub struct TransactionHeader {
    pub expiration:          TimePointSec,
    pub ref_block_num:       u16,
    pub ref_block_prefix:    u32,
    pub max_net_usage_words: VarUint32,
    pub max_cpu_usage_ms:    u8,
    /// Seconds the transaction is delayed, and can be cancelled, for.
    pub delay_sec:           VarUint32,
}

impl TransactionHeader {
    /// Header referencing the given block, as is required for transactions
    /// to be accepted (TaPoS).
    pub fn new(expiration: TimePointSec, head_block_id: &Checksum256) -> Self {
        let id = head_block_id.as_bytes();
        let block_num = u32::from_be_bytes([id[0], id[1], id[2], id[3]]);
        let prefix = u32::from_le_bytes([id[8], id[9], id[10], id[11]]);
        TransactionHeader {
            expiration,
            ref_block_num: block_num as u16,
            ref_block_prefix: prefix,
            max_net_usage_words: VarUint32(0),
            max_cpu_usage_ms: 0,
            delay_sec: VarUint32(0),
        }
    }
}

/// A typed blob attached to a transaction. In JSON it is the pair
/// `[kind, data]`.
#[derive(Debug, Clone, PartialEq, Eq, Serial, Deserial, SerdeSerialize, SerdeDeserialize)]
#[serde(from = "(u16, Bytes)", into = "(u16, Bytes)")]
pub struct Extension {
    pub kind: u16,
    pub data: Bytes,
}

impl From<(u16, Bytes)> for Extension {
    fn from((kind, data): (u16, Bytes)) -> Self {
        Extension {
            kind,
            data,
        }
    }
}

impl From<Extension> for (u16, Bytes) {
    fn from(e: Extension) -> Self { (e.kind, e.data) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serial, Deserial, SerdeSerialize, SerdeDeserialize)]
pub struct Transaction {
    #[serde(flatten)]
    pub header:                 TransactionHeader,
    pub context_free_actions:   Vec<Action>,
    pub actions:                Vec<Action>,
    pub transaction_extensions: Vec<Extension>,
}

/// SHA-256 of the value's wire bytes.
fn sha256_of<A: Serial + ?Sized>(value: &A) -> Checksum256 {
    let mut hasher = sha2::Sha256::start();
    value.serial(&mut hasher);
    Checksum256(hasher.result())
}

impl Transaction {
    /// The transaction id: the hash of the packed transaction.
    pub fn id(&self) -> Checksum256 { sha256_of(self) }

    /// The digest that is signed: the hash of the chain id, the packed
    /// transaction and the hash of the packed context-free data, or 32 zero
    /// bytes if there is none.
    pub fn signing_digest(&self, chain_id: &Checksum256, context_free_data: &[Bytes]) -> Checksum256 {
        let mut hasher = sha2::Sha256::start();
        chain_id.serial(&mut hasher);
        self.serial(&mut hasher);
        if context_free_data.is_empty() {
            Checksum256::default().serial(&mut hasher);
        } else {
            let mut cfd_hasher = sha2::Sha256::start();
            write_length(&mut cfd_hasher, context_free_data.len());
            serial_iter(context_free_data.iter(), &mut cfd_hasher);
            cfd_hasher.result().serial(&mut hasher);
        }
        Checksum256(hasher.result())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serial, Deserial, SerdeSerialize, SerdeDeserialize)]
pub struct SignedTransaction {
    #[serde(flatten)]
    pub transaction:       Transaction,
    pub signatures:        Vec<Signature>,
    pub context_free_data: Vec<Bytes>,
}

impl SignedTransaction {
    pub fn new(transaction: Transaction) -> Self {
        SignedTransaction {
            transaction,
            signatures: Vec::new(),
            context_free_data: Vec::new(),
        }
    }

    pub fn signing_digest(&self, chain_id: &Checksum256) -> Checksum256 {
        self.transaction.signing_digest(chain_id, &self.context_free_data)
    }

    /// Sign for the given chain and append the signature.
    pub fn sign(&mut self, key: &PrivateKey, chain_id: &Checksum256) -> ParseResult<()> {
        let digest = self.signing_digest(chain_id);
        self.signatures.push(key.sign(&digest.0)?);
        Ok(())
    }

    /// The public keys that produced the signatures.
    pub fn signers(&self, chain_id: &Checksum256) -> ParseResult<Vec<PublicKey>> {
        let digest = self.signing_digest(chain_id);
        self.signatures.iter().map(|sig| sig.recover(&digest.0)).collect()
    }
}

/// Compression applied to the packed parts of a transaction. Written as a
/// single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    #[default]
    None,
    Zlib,
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionType::None => f.write_str("none"),
            CompressionType::Zlib => f.write_str("zlib"),
        }
    }
}

impl FromStr for CompressionType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(CompressionType::None),
            "zlib" => Ok(CompressionType::Zlib),
            _ => Err(CodecError::invalid(format!("unknown compression [{}]", s))),
        }
    }
}

impl Serial for CompressionType {
    fn serial<B: Buffer>(&self, out: &mut B) { (*self as u8).serial(out) }
}

impl Deserial for CompressionType {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        match source.read_u8()? {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Zlib),
            b => Err(CodecError::invalid(format!("unknown compression type {}", b))),
        }
    }
}

crate::types::serde_via_string!(CompressionType);

/// A signed transaction in the form it is pushed to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serial, Deserial, SerdeSerialize, SerdeDeserialize)]
pub struct PackedTransaction {
    pub signatures:               Vec<Signature>,
    pub compression:              CompressionType,
    pub packed_context_free_data: Bytes,
    pub packed_trx:               Bytes,
}

fn compress(compression: CompressionType, raw: Vec<u8>) -> ParseResult<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(raw),
        CompressionType::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
            encoder.write_all(&raw)?;
            Ok(encoder.finish()?)
        }
    }
}

fn decompress(compression: CompressionType, packed: &[u8]) -> ParseResult<Cow<'_, [u8]>> {
    match compression {
        CompressionType::None => Ok(Cow::Borrowed(packed)),
        CompressionType::Zlib => {
            let mut raw = Vec::new();
            ZlibDecoder::new(packed).read_to_end(&mut raw)?;
            trace!("inflated {} bytes to {}", packed.len(), raw.len());
            Ok(Cow::Owned(raw))
        }
    }
}

impl PackedTransaction {
    /// Pack a signed transaction. Empty context-free data stays empty under
    /// every compression.
    pub fn from_signed(signed: &SignedTransaction, compression: CompressionType) -> ParseResult<Self> {
        let packed_context_free_data = if signed.context_free_data.is_empty() {
            Bytes::default()
        } else {
            Bytes(compress(compression, to_bytes(&signed.context_free_data))?)
        };
        Ok(PackedTransaction {
            signatures: signed.signatures.clone(),
            compression,
            packed_context_free_data,
            packed_trx: Bytes(compress(compression, to_bytes(&signed.transaction))?),
        })
    }

    pub fn unpack(&self) -> ParseResult<SignedTransaction> {
        let transaction = from_bytes(&decompress(self.compression, self.packed_trx.as_slice())?)
            .context_with(|| "unpack transaction")?;
        let context_free_data = if self.packed_context_free_data.is_empty() {
            Vec::new()
        } else {
            from_bytes(&decompress(self.compression, self.packed_context_free_data.as_slice())?)
                .context_with(|| "unpack context-free data")?
        };
        Ok(SignedTransaction {
            transaction,
            signatures: self.signatures.clone(),
            context_free_data,
        })
    }

    /// The id is the hash of the uncompressed transaction, whatever the
    /// compression.
    pub fn id(&self) -> ParseResult<Checksum256> {
        Ok(sha256_of(&*decompress(self.compression, self.packed_trx.as_slice())?))
    }
}

/// A peer-to-peer message envelope: a little-endian `u32` length covering
/// the type byte and the payload, the type byte, and the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    message_type: u8,
    payload:      Vec<u8>,
}

impl Packet {
    /// Fails if the length prefix cannot cover the payload.
    pub fn new(message_type: u8, payload: Vec<u8>) -> ParseResult<Self> {
        if payload.len() >= u32::MAX as usize {
            return Err(CodecError::invalid(format!(
                "packet payload of {} bytes exceeds the u32 length prefix",
                payload.len()
            )));
        }
        Ok(Packet {
            message_type,
            payload,
        })
    }

    pub fn message_type(&self) -> u8 { self.message_type }

    pub fn payload(&self) -> &[u8] { &self.payload }

    pub fn into_payload(self) -> Vec<u8> { self.payload }
}

impl Serial for Packet {
    fn serial<B: Buffer>(&self, out: &mut B) {
        // `Packet::new` keeps the payload below u32::MAX bytes.
        (self.payload.len() as u32 + 1).serial(out);
        self.message_type.serial(out);
        self.payload.as_slice().serial(out);
    }
}

impl Deserial for Packet {
    fn deserial(source: &mut Cursor<'_>) -> ParseResult<Self> {
        let length = u32::deserial(source)? as usize;
        if length == 0 {
            return Err(CodecError::invalid("packet length must cover the message type"));
        }
        let message_type = source.read_u8()?;
        let payload = source.read_bytes(length - 1)?.to_vec();
        Ok(Packet {
            message_type,
            payload,
        })
    }
}
