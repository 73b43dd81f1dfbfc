//! Run seeds
//!
//! A seed is 1-32 ASCII alphanumeric characters. Daily seeds come from the
//! UTC calendar date so every player gets the same course that day.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const MAX_SEED_LEN: usize = 32;

/// Length of a generated random seed
pub const RANDOM_SEED_LEN: usize = 8;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Validated seed string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Seed(String);

impl Seed {
    pub fn parse(raw: &str) -> Result<Self> {
        if is_valid(raw) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(Error::InvalidSeed(raw.to_owned()))
        }
    }

    /// Drop non-alphanumerics and truncate; None if nothing is left
    pub fn sanitize(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .take(MAX_SEED_LEN)
            .collect();
        (!cleaned.is_empty()).then_some(Self(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

pub fn is_valid(raw: &str) -> bool {
    (1..=MAX_SEED_LEN).contains(&raw.len()) && raw.bytes().all(|b| b.is_ascii_alphanumeric())
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Seed {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Seed {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        if is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidSeed(value))
        }
    }
}

impl From<Seed> for String {
    fn from(seed: Seed) -> Self {
        seed.0
    }
}

impl AsRef<str> for Seed {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Seed of the day: the UTC date as `YYYYMMDD`
pub fn daily_seed(date: NaiveDate) -> Seed {
    Seed(date.format("%Y%m%d").to_string())
}

/// Moment the daily seed rolls over (UTC midnight after `date`)
pub fn next_daily_reset(date: NaiveDate) -> NaiveDateTime {
    date.checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX)
        .and_time(NaiveTime::MIN)
}

/// Seed shared by every day of the week containing `date`
pub fn weekly_seed(date: NaiveDate) -> Seed {
    let week = date.iso_week().week();
    Seed(hash_string(&format!("tilt-rift-{}-W{}", date.year(), week)))
}

/// 32-bit string hash rendered in base 36
///
/// Iterates UTF-16 code units with `h = h * 31 + c` in wrapping i32 math.
pub fn hash_string(input: &str) -> String {
    let hash = input.encode_utf16().fold(0i32, |h, c| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(c))
    });
    to_base36(i64::from(hash).unsigned_abs())
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_owned();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.iter().rev().map(|&b| b as char).collect()
}

/// Fresh non-deterministic seed of lowercase alphanumerics
pub fn random_seed() -> Seed {
    let mut rng = rand::rng();
    let s = (0..RANDOM_SEED_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    Seed(s)
}

/// Compact URL form of a seed
pub fn encode_seed(seed: &Seed) -> String {
    URL_SAFE_NO_PAD.encode(seed.as_str())
}

/// Inverse of [`encode_seed`]
///
/// Also accepts the standard alphabet and trailing padding so older links
/// still open.
pub fn decode_seed(encoded: &str) -> Result<Seed> {
    let trimmed = encoded.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))?;
    Seed::try_from(String::from_utf8(bytes)?)
}

/// Decode a link seed, falling back to the daily seed for `today`
pub fn decode_seed_or_daily(encoded: &str, today: NaiveDate) -> Seed {
    decode_seed(encoded).unwrap_or_else(|err| {
        log::warn!("Bad seed in link ({err}), using daily seed");
        daily_seed(today)
    })
}
