// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// TOTP时间步长（秒）
const TIME_STEP: u64 = 30;
/// 验证码位数
const DIGITS: u32 = 6;

/// TOTP错误类型
#[derive(Error, Debug)]
pub enum TotpError {
    #[error("empty 2FA seed")]
    EmptySeed,

    #[error("invalid base32 character '{0}' in 2FA seed")]
    InvalidBase32(char),
}

/// 清理两步验证种子
///
/// 用户粘贴的种子常带空格或连字符分组，去除后转大写
pub fn clean_seed(seed: &str) -> String {
    seed.replace([' ', '-'], "").to_uppercase()
}

/// 生成当前时刻的TOTP验证码
///
/// RFC 6238，HMAC-SHA1，30秒步长，6位数字
pub fn generate_code(seed: &str) -> Result<String, TotpError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    code_at(seed, now)
}

/// 生成指定Unix时间的TOTP验证码
pub fn code_at(seed: &str, unix_time: u64) -> Result<String, TotpError> {
    let cleaned = clean_seed(seed);
    if cleaned.is_empty() {
        return Err(TotpError::EmptySeed);
    }

    let key = base32_decode(&cleaned)?;
    let counter = unix_time / TIME_STEP;

    let mut mac = HmacSha1::new_from_slice(&key).map_err(|_| TotpError::EmptySeed)?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    // RFC 4226 动态截断
    let offset = (digest[19] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);

    let code = binary % 10u32.pow(DIGITS);
    Ok(format!("{:0width$}", code, width = DIGITS as usize))
}

/// RFC 4648 base32解码，忽略填充
fn base32_decode(input: &str) -> Result<Vec<u8>, TotpError> {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

    let mut bits: u32 = 0;
    let mut bit_count: u32 = 0;
    let mut out = Vec::with_capacity(input.len() * 5 / 8);

    for c in input.chars() {
        if c == '=' {
            continue;
        }
        let value = ALPHABET
            .iter()
            .position(|&a| a as char == c)
            .ok_or(TotpError::InvalidBase32(c))? as u32;

        bits = (bits << 5) | value;
        bit_count += 5;
        if bit_count >= 8 {
            bit_count -= 8;
            out.push((bits >> bit_count) as u8);
            bits &= (1 << bit_count) - 1;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238附录B的SHA1测试种子："12345678901234567890"的base32编码
    const RFC_SEED: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn test_rfc6238_vectors() {
        assert_eq!(code_at(RFC_SEED, 59).unwrap(), "287082");
        assert_eq!(code_at(RFC_SEED, 1111111109).unwrap(), "081804");
        assert_eq!(code_at(RFC_SEED, 1234567890).unwrap(), "005924");
        assert_eq!(code_at(RFC_SEED, 2000000000).unwrap(), "279037");
    }

    #[test]
    fn test_seed_cleaning() {
        assert_eq!(clean_seed("gezd gnbv-gy3t"), "GEZDGNBVGY3T");
        // 清理后的种子与原始种子产生相同验证码
        let spaced = "GEZD GNBV GY3T QOJQ GEZD GNBV GY3T QOJQ";
        assert_eq!(code_at(spaced, 59).unwrap(), code_at(RFC_SEED, 59).unwrap());
    }

    #[test]
    fn test_empty_seed_rejected() {
        assert!(matches!(code_at("  ", 59), Err(TotpError::EmptySeed)));
    }

    #[test]
    fn test_invalid_base32_rejected() {
        assert!(matches!(
            code_at("GEZD1NBV", 59),
            Err(TotpError::InvalidBase32('1'))
        ));
    }
}
