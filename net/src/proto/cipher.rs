//! AES-128/CFB8 stream cipher applied to whole frames after login.

use aes::{
    cipher::{
        generic_array::GenericArray, BlockDecryptMut, BlockEncryptMut, BlockSizeUser, KeyIvInit,
    },
    Aes128,
};

type Encryptor = cfb8::Encryptor<Aes128>;
type Decryptor = cfb8::Decryptor<Aes128>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamDirection {
    Encrypt,
    Decrypt,
}

/// One direction of the session cipher. The shared secret is both key and IV,
/// and the internal state runs continuously across frames.
pub(crate) enum PacketCipher {
    Encrypt(Encryptor),
    Decrypt(Decryptor),
}

impl PacketCipher {
    pub(crate) fn new(key: &[u8; 16], direction: StreamDirection) -> Self {
        let key = GenericArray::from_slice(key);
        match direction {
            StreamDirection::Encrypt => PacketCipher::Encrypt(Encryptor::new(key, key)),
            StreamDirection::Decrypt => PacketCipher::Decrypt(Decryptor::new(key, key)),
        }
    }

    pub(crate) fn apply(&mut self, bytes: &mut [u8]) {
        match self {
            PacketCipher::Encrypt(cipher) => {
                for chunk in bytes.chunks_mut(Encryptor::block_size()) {
                    cipher.encrypt_block_mut(GenericArray::from_mut_slice(chunk));
                }
            }
            PacketCipher::Decrypt(cipher) => {
                for chunk in bytes.chunks_mut(Decryptor::block_size()) {
                    cipher.decrypt_block_mut(GenericArray::from_mut_slice(chunk));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 16] = *b"0123456789abcdef";

    #[test]
    fn state_carries_across_calls() {
        let plain = b"first frame|second frame".to_vec();

        let mut whole = plain.clone();
        PacketCipher::new(&KEY, StreamDirection::Encrypt).apply(&mut whole);

        let mut split = plain.clone();
        let mut enc = PacketCipher::new(&KEY, StreamDirection::Encrypt);
        let (a, b) = split.split_at_mut(11);
        enc.apply(a);
        enc.apply(b);
        assert_eq!(whole, split);
        assert_ne!(whole, plain);

        let mut dec = PacketCipher::new(&KEY, StreamDirection::Decrypt);
        let (a, b) = split.split_at_mut(5);
        dec.apply(a);
        dec.apply(b);
        assert_eq!(split, plain);
    }
}
