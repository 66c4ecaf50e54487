//! ANS-104 data items: the signed envelope Bundlr/Irys nodes accept.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256, Sha384};
use solana_sdk::{
    signature::{Keypair, Signature},
    signer::Signer,
};

/// Signature type for raw ed25519 keys, which is what a Solana keypair is.
pub const SIGNATURE_TYPE_ED25519: u16 = 2;
pub const SIGNATURE_LEN: usize = 64;
pub const OWNER_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItem {
    pub signature: [u8; SIGNATURE_LEN],
    pub owner: [u8; OWNER_LEN],
    pub anchor: Option<[u8; 32]>,
    pub tags: Vec<Tag>,
    pub data: Vec<u8>,
}

impl DataItem {
    pub fn sign(signer: &Keypair, data: Vec<u8>, tags: Vec<Tag>, anchor: Option<[u8; 32]>) -> Self {
        let mut item = Self {
            signature: [0; SIGNATURE_LEN],
            owner: signer.pubkey().to_bytes(),
            anchor,
            tags,
            data,
        };
        let signature = signer.sign_message(&item.signing_message());
        item.signature.copy_from_slice(signature.as_ref());
        item
    }

    /// Deep hash over every signed field.
    pub fn signing_message(&self) -> [u8; 48] {
        let signature_type = SIGNATURE_TYPE_ED25519.to_string();
        let anchor: &[u8] = match &self.anchor {
            Some(anchor) => anchor,
            None => &[],
        };
        let tags = encode_tags(&self.tags);
        deep_hash_list(&[
            b"dataitem",
            b"1",
            signature_type.as_bytes(),
            &self.owner,
            &[], // target
            anchor,
            &tags,
            &self.data,
        ])
    }

    pub fn verify(&self) -> bool {
        Signature::from(self.signature).verify(&self.owner, &self.signing_message())
    }

    /// base64url(sha256(signature)), the id the node files the item under.
    pub fn id(&self) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(self.signature))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let tags = encode_tags(&self.tags);
        let mut bytes = Vec::with_capacity(
            2 + SIGNATURE_LEN + OWNER_LEN + 2 + 32 + 16 + tags.len() + self.data.len(),
        );
        bytes.extend_from_slice(&SIGNATURE_TYPE_ED25519.to_le_bytes());
        bytes.extend_from_slice(&self.signature);
        bytes.extend_from_slice(&self.owner);
        bytes.push(0); // no target
        match &self.anchor {
            Some(anchor) => {
                bytes.push(1);
                bytes.extend_from_slice(anchor);
            }
            None => bytes.push(0),
        }
        bytes.extend_from_slice(&(self.tags.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&(tags.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&tags);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

/// Avro encoding of an array of `{name: bytes, value: bytes}` records.
/// Empty when there are no tags.
pub fn encode_tags(tags: &[Tag]) -> Vec<u8> {
    let mut out = Vec::new();
    if tags.is_empty() {
        return out;
    }
    write_long(&mut out, tags.len() as i64);
    for tag in tags {
        write_bytes(&mut out, tag.name.as_bytes());
        write_bytes(&mut out, tag.value.as_bytes());
    }
    write_long(&mut out, 0);
    out
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_long(out, bytes.len() as i64);
    out.extend_from_slice(bytes);
}

/// Zigzag varint.
fn write_long(out: &mut Vec<u8>, value: i64) {
    let mut n = ((value << 1) ^ (value >> 63)) as u64;
    while n >= 0x80 {
        out.push((n as u8 & 0x7f) | 0x80);
        n >>= 7;
    }
    out.push(n as u8);
}

fn sha384(parts: &[&[u8]]) -> [u8; 48] {
    let mut hasher = Sha384::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0; 48];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn deep_hash_blob(data: &[u8]) -> [u8; 48] {
    let tag = format!("blob{}", data.len());
    sha384(&[&sha384(&[tag.as_bytes()]), &sha384(&[data])])
}

fn deep_hash_list(items: &[&[u8]]) -> [u8; 48] {
    let tag = format!("list{}", items.len());
    items.iter().fold(sha384(&[tag.as_bytes()]), |acc, item| {
        sha384(&[&acc, &deep_hash_blob(item)])
    })
}
