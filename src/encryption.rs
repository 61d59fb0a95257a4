// ==========================================
// 客户账户导入系统 - 身份证号加解密
// ==========================================
// 算法: AES-256-GCM,落库格式 hex(nonce || ciphertext)
// 说明: 校验始终针对明文；落库使用密文
// ==========================================

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use thiserror::Error;

/// AES-GCM nonce 长度（字节）
const NONCE_LEN: usize = 12;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("加密失败: {0}")]
    Encryption(String),

    #[error("解密失败: {0}")]
    Decryption(String),

    #[error("密钥非法: {0}")]
    KeyManagement(String),
}

// ==========================================
// NationalIdCipher Trait
// ==========================================
// 实现者: AesGcmCipher, PlainCipher
pub trait NationalIdCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError>;
    fn decrypt(&self, stored: &str) -> Result<String, EncryptionError>;
}

// ==========================================
// PlainCipher - 明文直通（未配置密钥时使用）
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCipher;

impl NationalIdCipher for PlainCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        Ok(plaintext.to_string())
    }

    fn decrypt(&self, stored: &str) -> Result<String, EncryptionError> {
        Ok(stored.to_string())
    }
}

// ==========================================
// AesGcmCipher
// ==========================================
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    /// 从 64 位十六进制密钥创建
    pub fn from_hex_key(key_hex: &str) -> Result<Self, EncryptionError> {
        let key_bytes = hex::decode(key_hex.trim())
            .map_err(|e| EncryptionError::KeyManagement(format!("密钥不是合法十六进制: {}", e)))?;

        let cipher = Aes256Gcm::new_from_slice(&key_bytes).map_err(|_| {
            EncryptionError::KeyManagement(format!(
                "密钥长度应为 32 字节,实际 {} 字节",
                key_bytes.len()
            ))
        })?;

        Ok(Self { cipher })
    }

    /// 生成随机密钥（十六进制）
    pub fn generate_hex_key() -> String {
        hex::encode(Aes256Gcm::generate_key(OsRng))
    }
}

impl NationalIdCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| EncryptionError::Encryption(e.to_string()))?;

        let mut out = nonce.to_vec();
        out.extend_from_slice(&ciphertext);
        Ok(hex::encode(out))
    }

    fn decrypt(&self, stored: &str) -> Result<String, EncryptionError> {
        let bytes = hex::decode(stored.trim())
            .map_err(|e| EncryptionError::Decryption(format!("密文不是合法十六进制: {}", e)))?;
        if bytes.len() <= NONCE_LEN {
            return Err(EncryptionError::Decryption("密文长度不足".to_string()));
        }

        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| EncryptionError::Decryption(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e| EncryptionError::Decryption(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aes_roundtrip_uses_fresh_nonce() {
        let cipher = AesGcmCipher::from_hex_key(&AesGcmCipher::generate_hex_key()).unwrap();

        let first = cipher.encrypt("0440888451").unwrap();
        let second = cipher.encrypt("0440888451").unwrap();
        assert_ne!(first, second);
        assert_eq!(cipher.decrypt(&first).unwrap(), "0440888451");
        assert_eq!(cipher.decrypt(&second).unwrap(), "0440888451");
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let a = AesGcmCipher::from_hex_key(&AesGcmCipher::generate_hex_key()).unwrap();
        let b = AesGcmCipher::from_hex_key(&AesGcmCipher::generate_hex_key()).unwrap();
        let stored = a.encrypt("0440888451").unwrap();
        assert!(matches!(b.decrypt(&stored), Err(EncryptionError::Decryption(_))));
    }

    #[test]
    fn test_decrypt_garbage_fails() {
        let cipher = AesGcmCipher::from_hex_key(&AesGcmCipher::generate_hex_key()).unwrap();
        assert!(cipher.decrypt("not-hex").is_err());
        assert!(cipher.decrypt("abcd").is_err());
    }

    #[test]
    fn test_bad_key_length() {
        let err = AesGcmCipher::from_hex_key("abcd").err().unwrap();
        assert!(matches!(err, EncryptionError::KeyManagement(_)));
    }

    #[test]
    fn test_plain_cipher_passthrough() {
        assert_eq!(PlainCipher.encrypt("123").unwrap(), "123");
        assert_eq!(PlainCipher.decrypt("123").unwrap(), "123");
    }
}
